//! Flattens a JSON document into `(path, scalar)` events in document order.
//!
//! Paths join object keys and array indices with `/`, so
//! `{"metrics": ["a"]}` yields `("metrics/0", Some("a"))`. Numbers and
//! booleans are reported as their JSON text, `null` as `None`. Empty
//! containers produce no events.

use serde_json::Value;

pub fn walk<F>(doc: &Value, mut visit: F)
where
    F: FnMut(&str, Option<&str>),
{
    let mut path = String::new();
    walk_value(doc, &mut path, &mut visit);
}

/// Collects every event of [`walk`].
#[cfg(test)]
pub fn events(doc: &Value) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    walk(doc, |path, value| {
        out.push((path.to_string(), value.map(str::to_string)))
    });
    out
}

fn walk_value<F>(value: &Value, path: &mut String, visit: &mut F)
where
    F: FnMut(&str, Option<&str>),
{
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                descend(path, key, |p| walk_value(child, p, visit));
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                descend(path, &idx.to_string(), |p| walk_value(child, p, visit));
            }
        }
        Value::String(s) => visit(path, Some(s)),
        Value::Number(n) => visit(path, Some(&n.to_string())),
        Value::Bool(b) => visit(path, Some(if *b { "true" } else { "false" })),
        Value::Null => visit(path, None),
    }
}

fn descend(path: &mut String, segment: &str, f: impl FnOnce(&mut String)) {
    let saved = path.len();
    if !path.is_empty() {
        path.push('/');
    }
    path.push_str(segment);
    f(path);
    path.truncate(saved);
}
