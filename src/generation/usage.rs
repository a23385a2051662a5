use serde_json::Value;

const COUNTERS: [(&str, &str); 3] = [
    ("prompt_token_count", "promptTokenCount"),
    ("candidates_token_count", "candidatesTokenCount"),
    ("total_token_count", "totalTokenCount"),
];

/// Renders provider usage metadata as `name: N` lines.
///
/// Counters may be camelCase (REST) or snake_case; missing ones read as 0.
/// A value that is not an object is kept as its JSON text.
pub fn describe_usage(usage: Option<&Value>) -> Option<String> {
    let usage = usage?;
    let Some(object) = usage.as_object() else {
        return Some(usage.to_string());
    };

    let mut rendered = String::new();
    for (name, camel) in COUNTERS {
        let count = object
            .get(name)
            .or_else(|| object.get(camel))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        rendered.push_str(&format!("{name}: {count}\n"));
    }
    Some(rendered)
}
