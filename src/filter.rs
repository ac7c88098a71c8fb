//! Response field projection.
//!
//! Best-effort: bodies that are not a JSON object or array pass through
//! untouched. For arrays, each object element is projected on its own.

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::config::ResponseFilterPolicy;

/// Apply `include` then `exclude` to the top-level keys of a JSON body.
pub fn apply(body: &Bytes, policy: &ResponseFilterPolicy) -> Bytes {
    if policy.is_empty() {
        return body.clone();
    }

    let value = match serde_json::from_slice::<Value>(body) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
        _ => return body.clone(),
    };

    let filtered = match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(project(map, policy)),
                    other => other,
                })
                .collect(),
        ),
        Value::Object(map) => Value::Object(project(map, policy)),
        other => other,
    };

    match serde_json::to_vec(&filtered) {
        Ok(encoded) => Bytes::from(encoded),
        Err(_) => body.clone(),
    }
}

fn project(mut map: Map<String, Value>, policy: &ResponseFilterPolicy) -> Map<String, Value> {
    if !policy.include.is_empty() {
        // Output follows the include list order.
        map = policy
            .include
            .iter()
            .filter_map(|key| map.get(key).map(|v| (key.clone(), v.clone())))
            .collect();
    }
    for key in &policy.exclude {
        map.remove(key);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = r#"{"id":1,"name":"John Doe","email":"john@example.com","age":30}"#;

    fn policy(include: &[&str], exclude: &[&str]) -> ResponseFilterPolicy {
        ResponseFilterPolicy {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn run(body: &str, policy: &ResponseFilterPolicy) -> String {
        String::from_utf8(apply(&Bytes::from(body.to_string()), policy).to_vec()).unwrap()
    }

    #[test]
    fn test_include() {
        assert_eq!(run(USER, &policy(&["id", "name"], &[])), r#"{"id":1,"name":"John Doe"}"#);
    }

    #[test]
    fn test_exclude() {
        assert_eq!(run(USER, &policy(&[], &["email", "age"])), r#"{"id":1,"name":"John Doe"}"#);
    }

    #[test]
    fn test_include_then_exclude() {
        assert_eq!(
            run(USER, &policy(&["id", "name", "email", "age"], &["age"])),
            r#"{"id":1,"name":"John Doe","email":"john@example.com"}"#
        );
    }

    #[test]
    fn test_missing_include_keys_are_omitted() {
        assert_eq!(run(USER, &policy(&["id", "nickname"], &[])), r#"{"id":1}"#);
    }

    #[test]
    fn test_exclude_outside_include_is_noop() {
        assert_eq!(run(USER, &policy(&["id"], &["email"])), r#"{"id":1}"#);
    }

    #[test]
    fn test_invalid_json_unchanged() {
        assert_eq!(run("{invalid: json}", &policy(&["id"], &[])), "{invalid: json}");
    }

    #[test]
    fn test_scalar_json_unchanged() {
        assert_eq!(run("42", &policy(&["id"], &[])), "42");
    }

    #[test]
    fn test_empty_policy_returns_body_verbatim() {
        let spaced = r#"{ "id" : 1 }"#;
        assert_eq!(run(spaced, &policy(&[], &[])), spaced);
    }

    #[test]
    fn test_array_elements_are_projected() {
        let body = r#"[{"id":1,"secret":"a"},{"id":2,"secret":"b"},7]"#;
        assert_eq!(run(body, &policy(&[], &["secret"])), r#"[{"id":1},{"id":2},7]"#);
    }
}
