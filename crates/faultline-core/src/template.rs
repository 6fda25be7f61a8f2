//! Positional message templates (`"copy {0} to {1}"`).

use crate::value::FieldValue;

/// Check if a template contains at least one `{N}` placeholder.
pub fn has_placeholders(template: &str) -> bool {
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
            }
            '{' => {
                let mut digits = 0;
                while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    chars.next();
                    digits += 1;
                }
                if digits > 0 && chars.peek() == Some(&'}') {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Substitute `{N}` placeholders with the display form of `args[N]`.
///
/// `{{` and `}}` produce literal braces. A placeholder whose index has no
/// argument is left in place.
pub fn format_template(template: &str, args: &[FieldValue]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut index = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    index.push(d);
                    chars.next();
                }
                if !index.is_empty() && chars.peek() == Some(&'}') {
                    chars.next();
                    match index.parse::<usize>().ok().and_then(|i| args.get(i)) {
                        Some(arg) => out.push_str(&arg.to_string()),
                        None => {
                            out.push('{');
                            out.push_str(&index);
                            out.push('}');
                        }
                    }
                } else {
                    out.push('{');
                    out.push_str(&index);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_placeholders() {
        assert!(has_placeholders("This is an error {0}"));
        assert!(has_placeholders("{12} items"));
        assert!(!has_placeholders("Warning 1"));
        assert!(!has_placeholders("literal {{0}} braces"));
        assert!(!has_placeholders("json {\"a\": 1}"));
    }

    #[test]
    fn test_format_template() {
        let args = vec![FieldValue::from("abc"), FieldValue::from(42)];
        assert_eq!(
            format_template("This is an error {0}", &args),
            "This is an error abc"
        );
        assert_eq!(format_template("{1}/{0}", &args), "42/abc");
        assert_eq!(format_template("{{{0}}}", &args), "{abc}");
        assert_eq!(format_template("missing {5}", &args), "missing {5}");
        assert_eq!(format_template("open {x", &args), "open {x");
    }
}
