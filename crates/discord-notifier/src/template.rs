//! `{{ path }}` placeholder substitution against an event payload.
//!
//! A path is a dot-separated list of keys into the JSON context, e.g.
//! `{{ author.name }}`. Anything that does not resolve renders as an empty
//! string. An opening `{{` with no closing `}}` is copied through literally.

use serde_json::{Map, Value};

/// Interpolation context: the payload of the event being handled.
pub type Context = Map<String, Value>;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

pub fn resolve(template: &str, context: &Context) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        let path = after_open[..end].trim();
        if let Some(value) = lookup(context, path) {
            render(value, &mut out);
        }
        rest = &after_open[end + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

fn lookup<'a>(context: &'a Context, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn render(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Array(_) | Value::Object(_) => out.push_str(&value.to_string()),
    }
}
