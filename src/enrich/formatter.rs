use crate::domain::PropertyValue;
use std::fmt::Write;

/// Formats a property value the way it appears in `data` and in rendered titles.
///
/// Strings pass through unchanged. Lists are comma-joined with string elements
/// quoted; maps render as `"key"="value"` pairs so they can be parsed back by
/// `render_items`.
pub fn format_value(value: &PropertyValue) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &PropertyValue) {
    match value {
        PropertyValue::Null => {}
        PropertyValue::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        PropertyValue::Integer(i) => {
            let _ = write!(out, "{i}");
        }
        PropertyValue::Float(f) => {
            let _ = write!(out, "{f}");
        }
        PropertyValue::String(s) => out.push_str(s),
        PropertyValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match item {
                    PropertyValue::String(s) => {
                        let _ = write!(out, "\"{s}\"");
                    }
                    other => write_value(out, other),
                }
            }
        }
        PropertyValue::Map(entries) => {
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "\"{key}\"=\"");
                write_value(out, item);
                out.push('"');
            }
        }
    }
}
