//! Human-readable HTML rendering of a record.

use std::borrow::Cow;
use std::fmt::Write;

use quick_xml::escape::escape;

use crate::record::CategorizedRecord;
use crate::value::{FieldMap, FieldValue};

const NULL_MARKER: &str = "(null)";

impl CategorizedRecord {
    /// Render a self-contained HTML report, suitable for an email body.
    ///
    /// All interpolated text is escaped.
    pub fn render_report(&self) -> String {
        let mut out = String::with_capacity(4096);

        out.push_str(r#"<div style="font-family: arial;max-width: 72em;">"#);
        let _ = write!(
            out,
            r#"<p style="font-size:160%;margin-bottom:0;">{}: {}</p>"#,
            self.kind(),
            escape(self.message())
        );
        out.push_str(r#"<div style="color:#888;font-size:80%;">"#);
        let _ = write!(
            out,
            "<div>Local Time: {} | UTC: {}</div>",
            escape(&self.created_at_local().to_rfc3339()),
            escape(&self.created_at_utc().to_rfc3339())
        );
        let _ = write!(
            out,
            "<div>UID: {} | Signature: {}</div>",
            self.id(),
            escape(self.signature().unwrap_or(""))
        );
        out.push_str("</div>");

        for (name, fields) in self.categories() {
            let _ = write!(
                out,
                r#"<h3 style="margin-bottom: 0px;background:#ddd;padding:5px;">{}</h3>"#,
                escape(name)
            );
            render_fields(&mut out, fields);
        }

        out.push_str("</div>");
        out
    }
}

fn render_fields(out: &mut String, fields: &FieldMap) {
    for (key, value) in fields {
        match value {
            FieldValue::Map(map) if map.is_empty() => continue,
            FieldValue::List(list) if list.is_empty() => continue,
            _ => {}
        }

        let _ = write!(
            out,
            r#"<div><i style="display:inline-block;min-width:6em">{}</i> "#,
            escape(key.as_str())
        );
        match value {
            FieldValue::Null => {
                let _ = write!(out, ": {}", NULL_MARKER);
            }
            FieldValue::Map(map) => {
                out.push_str(r#"(dictionary):<div style="padding-left:2em;">"#);
                for (k, v) in map {
                    let _ = write!(out, "<div><i>{}</i>: {}</div>", escape(k.as_str()), inline(v));
                }
                out.push_str("</div>");
            }
            FieldValue::List(list) => {
                out.push_str(r#"(list):<div style="padding-left:2em;">"#);
                for (i, v) in list.iter().enumerate() {
                    let _ = write!(out, "<div><i>{}</i>: {}</div>", i, inline(v));
                }
                out.push_str("</div>");
            }
            FieldValue::Int(i) => {
                let _ = write!(out, ": {} (0x{:X})", group_thousands(&i.to_string()), i);
            }
            FieldValue::UInt(u) => {
                let _ = write!(out, ": {} (0x{:X})", group_thousands(&u.to_string()), u);
            }
            other => {
                let _ = write!(out, ": {}", escape(&other.to_string()));
            }
        }
        out.push_str("</div>");
    }
}

fn inline(value: &FieldValue) -> Cow<'static, str> {
    match value {
        FieldValue::Null => Cow::Borrowed(NULL_MARKER),
        other => Cow::Owned(escape(&other.to_string()).into_owned()),
    }
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    grouped.push_str(sign);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EventKind;

    fn sample() -> CategorizedRecord {
        let mut record = CategorizedRecord::with_message(EventKind::Error, "Error <b>message</b>");
        record.set_signature("1234");
        let test = record.get_or_create_category("Test").unwrap();
        test.insert("a".into(), "abc".into());
        test.insert("b".into(), 27.into());
        test.insert("c".into(), 13.1.into());
        test.insert("d".into(), vec!["abc", "def"].into());
        test.insert("n".into(), FieldValue::Null);
        test.insert("empty".into(), FieldValue::List(Vec::new()));
        test.insert("nested".into(), FieldValue::Map(FieldMap::new()));
        record
    }

    #[test]
    fn test_report_header() {
        let html = sample().render_report();
        assert!(html.contains("Error: Error &lt;b&gt;message&lt;/b&gt;"));
        assert!(html.contains("Signature: 1234"));
        assert!(html.contains(">Test</h3>"));
        assert!(!html.contains("<b>message"));
    }

    #[test]
    fn test_report_field_shapes() {
        let html = sample().render_report();
        assert!(html.contains(": 27 (0x1B)"));
        assert!(html.contains(": 13.1"));
        assert!(html.contains("(list):"));
        assert!(html.contains("<div><i>1</i>: def</div>"));
        assert!(html.contains(": (null)"));
        assert!(!html.contains(">empty</i>"));
        assert!(!html.contains(">nested</i>"));
    }

    #[test]
    fn test_report_escapes_keys() {
        let mut record = CategorizedRecord::new(EventKind::Info);
        record.set("<script>", "x&y", "\"quoted\"");
        let html = record.render_report();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("x&amp;y"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1234567"), "1,234,567");
        assert_eq!(group_thousands("-1234"), "-1,234");
        assert_eq!(group_thousands("12"), "12");
    }
}
