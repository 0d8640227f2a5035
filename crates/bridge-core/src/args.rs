//! Argument Engine (spec.md §4.2): path normalisation, default inference,
//! initial argument construction, sanitisation and discovery extraction.

use bridge_types::{InputSchema, ToolDescriptor};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

const QUERY_LIKE_KEYS: &[&str] = &["query", "input", "text", "prompt", "q", "question", "content"];

fn path_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            (?:\./|/)[^\s,;]*\.[A-Za-z0-9]+   # leading ./ or / with a dotted extension
            | [^\s,;]+/[^\s,;]+                # two segments separated by /
            | \b[^\s,;]+\.md\b                 # bare name ending in .md
            | [^\s,;]+/                        # bare name ending in /
            ",
        )
        .expect("valid path token regex")
    })
}

fn has_path_hint(s: &str) -> bool {
    s.contains('/') || s.contains('.')
}

fn dedupe_nonempty(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for item in items {
        let trimmed = item.trim().to_string();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.clone()) {
            out.push(trimmed);
        }
    }
    out
}

/// Extract path-like substrings from a free-text seed string.
///
/// `normalize(normalize(s)) == normalize(s)` — re-running on an
/// already-normalised, comma-joined string reproduces the same set.
pub fn normalize_path_string(input: &str) -> Vec<String> {
    let matches: Vec<String> = path_token_re()
        .find_iter(input)
        .map(|m| m.as_str().to_string())
        .collect();

    if !matches.is_empty() {
        return dedupe_nonempty(matches);
    }

    let tokens: Vec<&str> = input
        .split([';', ',', '\n'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if tokens.len() == 1 {
        let token = tokens[0];
        if token.contains(' ') || !has_path_hint(token) {
            return Vec::new();
        }
    }

    dedupe_nonempty(tokens.into_iter().map(|s| s.to_string()))
}

/// Coerce a JSON array into a deduplicated, trimmed, non-empty string list.
pub fn normalize_path_array(values: &[Value]) -> Vec<String> {
    dedupe_nonempty(values.iter().map(value_to_trimmed_string))
}

fn value_to_trimmed_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Normalise a JSON value that may be a string or an array of strings into
/// a path list, dispatching to the right normaliser.
fn normalize_paths_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => normalize_path_string(s),
        Value::Array(items) => normalize_path_array(items),
        _ => Vec::new(),
    }
}

/// Inject schema-implied default arguments. Currently: `output_path` if the
/// tool declares that property, defaults to `"output.md"`.
pub fn infer_default_arguments(schema: &InputSchema) -> Map<String, Value> {
    let mut out = Map::new();
    if schema.has_property("output_path") {
        out.insert("output_path".to_string(), Value::String("output.md".to_string()));
    }
    out
}

/// Choose the initial argument shape for a freshly-selected tool, stopping
/// at the first matching rule (spec.md §4.2 "Initial argument construction").
pub fn build_initial_arguments(tool: &ToolDescriptor, seed: &str) -> Map<String, Value> {
    let schema = &tool.input_schema;
    let requires_paths = schema.requires("paths");
    let requires_output_path = schema.requires("output_path");
    let has_paths = schema.has_property("paths");

    if tool.name.contains("rebuild_summary") || (requires_paths && requires_output_path) {
        let mut out = infer_default_arguments(schema);
        out.insert("paths".to_string(), paths_to_value(normalize_path_string(seed)));
        out.insert("output_path".to_string(), Value::String("output.md".to_string()));
        return out;
    }

    if requires_paths && has_paths {
        let mut out = infer_default_arguments(schema);
        out.insert("paths".to_string(), paths_to_value(normalize_path_string(seed)));
        if requires_output_path {
            out.insert("output_path".to_string(), Value::String("output.md".to_string()));
        }
        return out;
    }

    if has_paths {
        let mut out = infer_default_arguments(schema);
        out.insert("paths".to_string(), paths_to_value(normalize_path_string(seed)));
        return out;
    }

    if requires_output_path && !schema.has_property("query") {
        let mut out = infer_default_arguments(schema);
        out.insert("output_path".to_string(), Value::String("output.md".to_string()));
        if let Some(other) = schema.required.iter().find(|k| k.as_str() != "output_path") {
            out.insert(other.clone(), Value::String(seed.to_string()));
        }
        return out;
    }

    if let Some(key) = QUERY_LIKE_KEYS.iter().find(|k| schema.has_property(k)) {
        let mut out = infer_default_arguments(schema);
        out.insert(key.to_string(), Value::String(seed.to_string()));
        return out;
    }

    let mut out = infer_default_arguments(schema);
    if let Some(key) = schema.required.first() {
        out.insert(key.clone(), Value::String(seed.to_string()));
    } else if let Some(key) = schema.properties.keys().next() {
        out.insert(key.clone(), Value::String(seed.to_string()));
    } else {
        out.insert("query".to_string(), Value::String(seed.to_string()));
    }
    out
}

fn paths_to_value(paths: Vec<String>) -> Value {
    Value::Array(paths.into_iter().map(Value::String).collect())
}

/// Sanitise planned arguments against the tool's schema. Idempotent:
/// `sanitize(sanitize(args)) == sanitize(args)` for a fixed schema.
pub fn sanitize_arguments(
    tool: &ToolDescriptor,
    planned: &Map<String, Value>,
    routed_query: &str,
    default_paths: &[String],
) -> Map<String, Value> {
    let schema = &tool.input_schema;
    let mut out = planned.clone();

    if schema.has_property("paths") {
        let provided = out
            .get("paths")
            .or_else(|| out.get("path"))
            .or_else(|| out.get("path_list"))
            .map(normalize_paths_value)
            .filter(|v| !v.is_empty());

        let paths = provided
            .or_else(|| {
                let parsed = normalize_path_string(routed_query);
                (!parsed.is_empty()).then_some(parsed)
            })
            .unwrap_or_else(|| default_paths.to_vec());

        out.insert("paths".to_string(), paths_to_value(paths));
    }

    if schema.has_property("output_path") || schema.requires("output_path") {
        let needs_default = match out.get("output_path") {
            Some(Value::String(s)) => s.is_empty(),
            Some(_) | None => true,
        };
        if needs_default {
            out.insert("output_path".to_string(), Value::String("output.md".to_string()));
        }
    }

    let keys: Vec<String> = out.keys().cloned().collect();
    for key in keys {
        if key == "paths" || !schema.has_property(&key) {
            continue;
        }
        let value = out.get(&key).cloned().unwrap_or(Value::Null);
        if let Value::Array(items) = &value {
            out.insert(key.clone(), paths_to_value(normalize_path_array(items)));
            continue;
        }
        if schema.property_type(&key) == Some("string") && !value.is_string() {
            out.insert(key, Value::String(value_to_trimmed_string(&value)));
        }
    }

    for required_key in &schema.required {
        if out.contains_key(required_key) {
            continue;
        }
        match required_key.as_str() {
            "paths" => {
                let paths = {
                    let parsed = normalize_path_string(routed_query);
                    if parsed.is_empty() {
                        default_paths.to_vec()
                    } else {
                        parsed
                    }
                };
                out.insert("paths".to_string(), paths_to_value(paths));
            }
            "output_path" => {
                out.insert("output_path".to_string(), Value::String("output.md".to_string()));
            }
            other => {
                out.insert(other.to_string(), Value::String(routed_query.to_string()));
            }
        }
    }

    let has_query_key = QUERY_LIKE_KEYS.iter().any(|k| out.contains_key(*k));
    if !has_query_key {
        if let Some(key) = QUERY_LIKE_KEYS.iter().find(|k| schema.has_property(k)) {
            out.insert(key.to_string(), Value::String(routed_query.to_string()));
        }
    }

    out
}

/// Walk a tool-call result collecting path-like strings: declared
/// collection keys (`paths`, `files`, `results`, `hits`, `docs`,
/// `documents`), any key containing `"path"`, and `content[].text`.
pub fn extract_discovery_paths(result: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_path_like(result, &mut found);

    if let Some(content) = result.get("content").and_then(|c| c.as_array()) {
        for item in content {
            if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
                found.extend(normalize_path_string(text));
            }
        }
    }

    dedupe_nonempty(found.into_iter().flat_map(|p| normalize_path_string(&p)))
}

fn collect_path_like(value: &Value, out: &mut Vec<String>) {
    const COLLECTION_KEYS: &[&str] = &["paths", "files", "results", "hits", "docs", "documents"];

    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let key_lower = key.to_lowercase();
                if COLLECTION_KEYS.contains(&key_lower.as_str()) {
                    harvest_collection(v, out);
                } else if key_lower.contains("path") {
                    harvest_scalar_or_array(v, out);
                } else {
                    collect_path_like(v, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_path_like(item, out);
            }
        }
        _ => {}
    }
}

fn harvest_collection(value: &Value, out: &mut Vec<String>) {
    if let Some(items) = value.as_array() {
        for item in items {
            match item {
                Value::String(s) => out.push(s.clone()),
                Value::Object(_) => {
                    for key in ["path", "file", "filename"] {
                        if let Some(s) = item.get(key).and_then(|v| v.as_str()) {
                            out.push(s.to_string());
                            break;
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn harvest_scalar_or_array(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                if let Some(s) = item.as_str() {
                    out.push(s.to_string());
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_path_string_finds_bare_md_names() {
        let result = normalize_path_string("notes/a.md, notes/b.md");
        assert_eq!(result, vec!["notes/a.md".to_string(), "notes/b.md".to_string()]);
    }

    #[test]
    fn normalize_path_string_rejects_single_non_path_token() {
        assert!(normalize_path_string("hello world").is_empty());
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_path_string("notes/a.md;notes/b.md");
        let joined = once.join(",");
        let twice = normalize_path_string(&joined);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_path_array_dedupes_and_trims() {
        let values = vec![json!(" notes/a.md "), json!("notes/a.md"), json!("")];
        assert_eq!(normalize_path_array(&values), vec!["notes/a.md".to_string()]);
    }

    #[test]
    fn discovery_extraction_harvests_nested_path_keys() {
        let result = json!({
            "structuredContent": {
                "paths": ["notes/a.md", "notes/b.md"],
            }
        });
        let paths = extract_discovery_paths(&result["structuredContent"]);
        assert_eq!(paths, vec!["notes/a.md".to_string(), "notes/b.md".to_string()]);
    }

    #[test]
    fn discovery_extraction_harvests_result_objects_with_path_field() {
        let result = json!({
            "results": [{"path": "notes/a.md", "title": "A"}, {"path": "notes/b.md", "title": "B"}],
        });
        let paths = extract_discovery_paths(&result);
        assert_eq!(paths, vec!["notes/a.md".to_string(), "notes/b.md".to_string()]);
    }
}
