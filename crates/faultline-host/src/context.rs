//! Host context snapshots.
//!
//! The hosting application exposes its current request, response, session and
//! identity through [`HostContext`]. Every part is optional and every read may
//! fail; the collector isolates failures per part.

use std::sync::Arc;

use faultline_core::FieldValue;

use crate::error::HostResult;

/// Authenticated identity of the current user.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Whether the identity is authenticated.
    pub is_authenticated: bool,
    /// User name.
    pub name: Option<String>,
    /// Authentication scheme.
    pub authentication_type: Option<String>,
}

impl Identity {
    /// Create an authenticated identity.
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            name: Some(name.into()),
            authentication_type: None,
        }
    }

    /// Set the authentication scheme.
    pub fn with_authentication_type(mut self, scheme: impl Into<String>) -> Self {
        self.authentication_type = Some(scheme.into());
        self
    }
}

/// An uploaded file attached to a request.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Client-supplied file name.
    pub file_name: String,
    /// Declared content type.
    pub content_type: Option<String>,
    /// Size in bytes.
    pub content_length: u64,
}

/// Metadata of the current request.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Raw URL as received.
    pub raw_url: Option<String>,
    /// Fully qualified URL.
    pub url: Option<String>,
    /// Referrer URL.
    pub referrer: Option<String>,
    /// Content type.
    pub content_type: Option<String>,
    /// Content length in bytes.
    pub content_length: Option<u64>,
    /// Client address.
    pub client_address: Option<String>,
    /// Whether the request is authenticated.
    pub is_authenticated: bool,
    /// Headers, each with one or more values.
    pub headers: Vec<(String, Vec<String>)>,
    /// Cookies.
    pub cookies: Vec<(String, String)>,
    /// Form fields, each with one or more values.
    pub form: Vec<(String, Vec<String>)>,
    /// Uploaded files.
    pub files: Vec<UploadedFile>,
}

impl RequestInfo {
    /// Create request metadata.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a header value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.headers.push((name, vec![value])),
        }
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Add a form field value.
    pub fn with_form_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.form.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.form.push((name, vec![value])),
        }
        self
    }

    /// Add an uploaded file.
    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }
}

/// Metadata of the current response.
#[derive(Debug, Clone, Default)]
pub struct ResponseInfo {
    /// Status code.
    pub status_code: u16,
    /// Status description.
    pub status_description: Option<String>,
    /// Content type.
    pub content_type: Option<String>,
    /// Character set.
    pub charset: Option<String>,
    /// Redirect target.
    pub redirect_location: Option<String>,
    /// Whether the client is still connected.
    pub is_client_connected: bool,
}

/// State of the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    /// Session identifier.
    pub id: String,
    /// Whether the session was created by this request.
    pub is_new: bool,
    /// Session items.
    pub items: Vec<(String, FieldValue)>,
}

impl SessionInfo {
    /// Create session state.
    pub fn new(id: impl Into<String>, is_new: bool) -> Self {
        Self {
            id: id.into(),
            is_new,
            items: Vec::new(),
        }
    }

    /// Add a session item.
    pub fn with_item(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.items.push((name.into(), value.into()));
        self
    }
}

/// Read-only view of the hosting application's current context.
///
/// Every method defaults to "not available". Implementations return errors
/// for parts that exist but cannot be read.
pub trait HostContext {
    /// The authenticated identity.
    fn identity(&self) -> HostResult<Option<Identity>> {
        Ok(None)
    }

    /// The current request.
    fn request(&self) -> HostResult<Option<RequestInfo>> {
        Ok(None)
    }

    /// The raw request body.
    fn request_body(&self) -> HostResult<Option<Vec<u8>>> {
        Ok(None)
    }

    /// The current response.
    fn response(&self) -> HostResult<Option<ResponseInfo>> {
        Ok(None)
    }

    /// The current session.
    fn session(&self) -> HostResult<Option<SessionInfo>> {
        Ok(None)
    }
}

/// Supplies the host context for the current logical flow, if any.
pub trait HostContextProvider: Send + Sync {
    /// Get the current context.
    fn current(&self) -> Option<Arc<dyn HostContext>>;
}

impl<F> HostContextProvider for F
where
    F: Fn() -> Option<Arc<dyn HostContext>> + Send + Sync,
{
    fn current(&self) -> Option<Arc<dyn HostContext>> {
        self()
    }
}

/// A host context built from pre-captured snapshots.
#[derive(Debug, Clone, Default)]
pub struct StaticHostContext {
    /// Identity snapshot.
    pub identity: Option<Identity>,
    /// Request snapshot.
    pub request: Option<RequestInfo>,
    /// Request body.
    pub body: Option<Vec<u8>>,
    /// Response snapshot.
    pub response: Option<ResponseInfo>,
    /// Session snapshot.
    pub session: Option<SessionInfo>,
}

impl StaticHostContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identity.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set the request.
    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(request);
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the response.
    pub fn with_response(mut self, response: ResponseInfo) -> Self {
        self.response = Some(response);
        self
    }

    /// Set the session.
    pub fn with_session(mut self, session: SessionInfo) -> Self {
        self.session = Some(session);
        self
    }
}

impl HostContext for StaticHostContext {
    fn identity(&self) -> HostResult<Option<Identity>> {
        Ok(self.identity.clone())
    }

    fn request(&self) -> HostResult<Option<RequestInfo>> {
        Ok(self.request.clone())
    }

    fn request_body(&self) -> HostResult<Option<Vec<u8>>> {
        Ok(self.body.clone())
    }

    fn response(&self) -> HostResult<Option<ResponseInfo>> {
        Ok(self.response.clone())
    }

    fn session(&self) -> HostResult<Option<SessionInfo>> {
        Ok(self.session.clone())
    }
}
