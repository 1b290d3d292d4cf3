//! Structural JSON comparison

use serde_json::Value;

/// Remove the value at a JSON pointer, if present
pub fn strip_pointer(value: &mut Value, pointer: &str) {
    let Some((parent, key)) = pointer.rsplit_once('/') else {
        return;
    };
    let key = unescape(key);
    match value.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            map.remove(&key);
        }
        Some(Value::Array(items)) => {
            if let Ok(index) = key.parse::<usize>() {
                if index < items.len() {
                    items.remove(index);
                }
            }
        }
        _ => {}
    }
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// First difference between two documents: (pointer, expected, actual).
///
/// Missing values are rendered as `<absent>`.
pub fn first_difference(expected: &Value, actual: &Value) -> Option<(String, String, String)> {
    diff_at(String::new(), expected, actual)
}

fn diff_at(path: String, expected: &Value, actual: &Value) -> Option<(String, String, String)> {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => {
            for (key, exp_value) in exp {
                let child = format!("{}/{}", path, escape(key));
                match act.get(key) {
                    Some(act_value) => {
                        if let Some(diff) = diff_at(child, exp_value, act_value) {
                            return Some(diff);
                        }
                    }
                    None => return Some((child, exp_value.to_string(), ABSENT.to_string())),
                }
            }
            act.iter()
                .find(|(key, _)| !exp.contains_key(*key))
                .map(|(key, value)| {
                    (
                        format!("{}/{}", path, escape(key)),
                        ABSENT.to_string(),
                        value.to_string(),
                    )
                })
        }
        (Value::Array(exp), Value::Array(act)) => {
            for (index, exp_value) in exp.iter().enumerate() {
                let child = format!("{}/{}", path, index);
                match act.get(index) {
                    Some(act_value) => {
                        if let Some(diff) = diff_at(child, exp_value, act_value) {
                            return Some(diff);
                        }
                    }
                    None => return Some((child, exp_value.to_string(), ABSENT.to_string())),
                }
            }
            act.get(exp.len()).map(|extra| {
                (
                    format!("{}/{}", path, exp.len()),
                    ABSENT.to_string(),
                    extra.to_string(),
                )
            })
        }
        _ if expected == actual => None,
        _ => {
            let path = if path.is_empty() { "/".to_string() } else { path };
            Some((path, expected.to_string(), actual.to_string()))
        }
    }
}

const ABSENT: &str = "<absent>";
