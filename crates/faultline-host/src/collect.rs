//! Collection of host facts into a record.

use faultline_core::{
    CaptureConfig, CategorizedRecord, FieldMap, FieldValue, RedactionPolicy, catch_panic,
    truncate,
};
use tracing::debug;

use crate::context::{HostContext, Identity, RequestInfo, ResponseInfo, SessionInfo};
use crate::error::{HostError, HostPart, HostResult};

/// Category for the authenticated identity.
pub const USER_CATEGORY: &str = "HttpUser";
/// Category for request metadata.
pub const REQUEST_CATEGORY: &str = "HttpRequest";
/// Category for response metadata.
pub const RESPONSE_CATEGORY: &str = "HttpResponse";
/// Category for session state.
pub const SESSION_CATEGORY: &str = "HttpSession";

const TEXT_CONTENT_MARKERS: &[&str] = &[
    "application/json",
    "text/",
    "html/",
    "application/xml",
    "+xml",
];

/// Copies the readable parts of a [`HostContext`] into a record.
///
/// Each part is read independently. A part that fails (or panics) is reported
/// through the supplied callback and skipped; the remaining parts are still
/// collected.
#[derive(Debug, Clone)]
pub struct HostCollector {
    policy: RedactionPolicy,
    max_form_value_length: usize,
    max_body_length: usize,
    include_session_items: bool,
}

impl HostCollector {
    /// Create a collector from capture configuration.
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            policy: config.redaction_policy(),
            max_form_value_length: config.max_form_value_length,
            max_body_length: config.max_body_length,
            include_session_items: config.include_session_items,
        }
    }

    /// Collect every available part of `ctx` into `record`.
    pub fn collect(
        &self,
        record: &mut CategorizedRecord,
        ctx: &dyn HostContext,
        on_error: &mut dyn FnMut(HostError),
    ) {
        match guarded(HostPart::Identity, || ctx.identity()) {
            Ok(Some(identity)) => self.append_identity(record, &identity),
            Ok(None) => {}
            Err(e) => on_error(e),
        }

        match guarded(HostPart::Request, || ctx.request()) {
            Ok(Some(request)) => {
                self.append_request(record, &request);
                if self.wants_body(&request) {
                    match guarded(HostPart::RequestBody, || ctx.request_body()) {
                        Ok(Some(body)) => self.append_body(record, &body),
                        Ok(None) => {}
                        Err(e) => on_error(e),
                    }
                }
            }
            Ok(None) => {}
            Err(e) => on_error(e),
        }

        match guarded(HostPart::Response, || ctx.response()) {
            Ok(Some(response)) => self.append_response(record, &response),
            Ok(None) => {}
            Err(e) => on_error(e),
        }

        match guarded(HostPart::Session, || ctx.session()) {
            Ok(Some(session)) => self.append_session(record, &session),
            Ok(None) => {}
            Err(e) => on_error(e),
        }
    }

    fn append_identity(&self, record: &mut CategorizedRecord, identity: &Identity) {
        if !identity.is_authenticated {
            return;
        }
        record.set(USER_CATEGORY, "IsAuthenticated", true);
        record.set(USER_CATEGORY, "Name", identity.name.clone());
        record.set(
            USER_CATEGORY,
            "AuthenticationType",
            identity.authentication_type.clone(),
        );
    }

    fn append_request(&self, record: &mut CategorizedRecord, req: &RequestInfo) {
        let Some(cat) = record.get_or_create_category(REQUEST_CATEGORY) else {
            return;
        };

        cat.insert("ContentLength".into(), req.content_length.into());
        cat.insert("ContentType".into(), req.content_type.clone().into());
        cat.insert("HttpMethod".into(), req.method.clone().into());
        cat.insert("IsAuthenticated".into(), req.is_authenticated.into());
        cat.insert("Path".into(), req.path.clone().into());
        cat.insert("RawUrl".into(), req.raw_url.clone().into());
        cat.insert("Url".into(), req.url.clone().into());
        cat.insert("Referrer".into(), req.referrer.clone().into());
        cat.insert("UserHostAddress".into(), req.client_address.clone().into());

        let cookies: FieldMap = req
            .cookies
            .iter()
            .map(|(name, value)| (name.clone(), self.policy.apply(name, value).into()))
            .collect();
        cat.insert("Cookies".into(), FieldValue::Map(cookies));

        let mut headers = FieldMap::new();
        for (name, values) in &req.headers {
            match values.as_slice() {
                [] => {
                    headers.insert(name.clone(), "".into());
                }
                [single] => {
                    headers.insert(name.clone(), self.policy.apply(name, single).into());
                }
                many => {
                    for (i, value) in many.iter().enumerate() {
                        headers.insert(format!("{}({})", name, i), self.policy.apply(name, value).into());
                    }
                }
            }
        }
        cat.insert("Headers".into(), FieldValue::Map(headers));

        if self.max_form_value_length > 0 && !req.form.is_empty() {
            cat.insert("Form".into(), FieldValue::Map(self.form_fields(&req.form)));
        }

        if !req.files.is_empty() {
            let mut files = FieldMap::new();
            for (i, file) in req.files.iter().enumerate() {
                files.insert(format!("File:{}:FileName", i), file.file_name.clone().into());
                files.insert(format!("File:{}:ContentType", i), file.content_type.clone().into());
                files.insert(format!("File:{}:ContentLength", i), file.content_length.into());
            }
            cat.insert("Files".into(), FieldValue::Map(files));
        }
    }

    fn form_fields(&self, form: &[(String, Vec<String>)]) -> FieldMap {
        let mut fields = FieldMap::new();
        for (key, values) in form {
            let key_name = format!("Form:{}", key);
            let sensitive = self.policy.is_sensitive(key);

            match values.as_slice() {
                [] => {
                    fields.insert(key_name, "".into());
                }
                [single] => {
                    fields.insert(key_name, self.form_value(single, sensitive).into());
                }
                many => {
                    for (i, value) in many.iter().enumerate() {
                        fields.insert(format!("{}:{}", key_name, i), self.form_value(value, sensitive).into());
                    }
                }
            }
        }
        fields
    }

    fn form_value(&self, value: &str, sensitive: bool) -> String {
        if sensitive && !value.trim().is_empty() {
            return self.policy.placeholder(value);
        }
        truncate(value, self.max_form_value_length).unwrap_or_default()
    }

    fn wants_body(&self, req: &RequestInfo) -> bool {
        if self.max_body_length == 0 {
            return false;
        }
        let content_type = req.content_type.as_deref().unwrap_or("").to_lowercase();
        TEXT_CONTENT_MARKERS.iter().any(|m| content_type.contains(m))
    }

    fn append_body(&self, record: &mut CategorizedRecord, body: &[u8]) {
        let text = String::from_utf8_lossy(body);
        if let Some(body) = truncate(&text, self.max_body_length) {
            record.set(REQUEST_CATEGORY, "Body", body);
        }
    }

    fn append_response(&self, record: &mut CategorizedRecord, resp: &ResponseInfo) {
        record.set(RESPONSE_CATEGORY, "StatusCode", resp.status_code);
        record.set(
            RESPONSE_CATEGORY,
            "StatusDescription",
            resp.status_description.clone(),
        );
        record.set(RESPONSE_CATEGORY, "ContentType", resp.content_type.clone());
        record.set(RESPONSE_CATEGORY, "Charset", resp.charset.clone());
        record.set(
            RESPONSE_CATEGORY,
            "RedirectLocation",
            resp.redirect_location.clone(),
        );
        record.set(RESPONSE_CATEGORY, "IsClientConnected", resp.is_client_connected);
    }

    fn append_session(&self, record: &mut CategorizedRecord, session: &SessionInfo) {
        record.set(SESSION_CATEGORY, "SessionID", session.id.clone());
        record.set(SESSION_CATEGORY, "IsNewSession", session.is_new);

        if !self.include_session_items {
            return;
        }
        for (key, value) in &session.items {
            let value = if self.policy.is_sensitive(key) {
                FieldValue::Text(self.policy.placeholder(&value.to_string()))
            } else {
                value.clone()
            };
            record.set(SESSION_CATEGORY, key, value);
        }
    }
}

fn guarded<T>(part: HostPart, read: impl FnOnce() -> HostResult<T>) -> HostResult<T> {
    catch_panic(read).unwrap_or_else(|message| {
        debug!(part = %part, message = %message, "Host context reader panicked");
        Err(HostError::Panicked { part, message })
    })
}
