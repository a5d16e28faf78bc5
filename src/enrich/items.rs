use crate::domain::Item;
use serde_json::Value;
use tracing::debug;

const ENTRY_SEPARATOR: &str = "\", \"";
const PAIR_SEPARATOR: &str = "\"=\"";

/// Parses a rendered multi-value field (cookies, form, query string, headers)
/// into an ordered list of items.
///
/// Accepts either a JSON array of flat objects, as produced by web-host
/// integrations, or the `"key"="value", "key2"="value2"` form produced by
/// structured logging. Never fails: malformed input yields whatever entries
/// could be recovered, possibly none.
pub fn render_items(rendered: &str) -> Vec<Item> {
    let trimmed = rendered.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return render_json_items(trimmed);
    }

    render_delimited_items(trimmed)
}

fn render_json_items(rendered: &str) -> Vec<Item> {
    let values: Vec<Value> = match serde_json::from_str(rendered) {
        Ok(values) => values,
        Err(e) => {
            debug!("Discarding malformed item list: {}", e);
            return Vec::new();
        }
    };

    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(object) => Some(object),
            _ => None,
        })
        .flat_map(|object| {
            object
                .into_iter()
                .map(|(key, value)| Item::new(key, json_value_to_string(value)))
        })
        .collect()
}

fn json_value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn render_delimited_items(rendered: &str) -> Vec<Item> {
    rendered
        .split(ENTRY_SEPARATOR)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let mut parts = entry.split(PAIR_SEPARATOR);
            let key = parts.next()?.trim_matches('"');
            if key.trim().is_empty() {
                return None;
            }
            let value = parts.next().map(|v| v.trim_matches('"').to_string());
            Some(Item::new(key, value))
        })
        .collect()
}
