//! Response Formatters (spec.md §4.9): deterministic structured-JSON to
//! Markdown conversion, tried in order until one shape matches.

use serde_json::Value;

pub fn format_result(value: &Value, tool_name: &str) -> String {
    if let Some(summary) = value.get("summary").and_then(|s| s.as_str()) {
        return render_summary(value, summary);
    }

    if value.get("ok").and_then(|v| v.as_bool()) == Some(true) {
        if let Some(summary) = value.get("summary").and_then(|s| s.as_str()) {
            return render_summary(value, summary);
        }
        if let Some(output_path) = value.get("output_path").and_then(|v| v.as_str()) {
            return format!("## 실행 결과\n- output_path: {output_path}\n");
        }
    }

    if let Some(results) = value.get("results").and_then(|v| v.as_array()) {
        return render_grouped_results(results, "## 실행 결과");
    }

    if let Some(docs) = value.get("docs").and_then(|v| v.as_array()) {
        return render_grouped_results(docs, "## 문서 목록");
    }

    if let Some(hits) = value.get("hits").and_then(|v| v.as_array()) {
        return render_grouped_results(hits, "## 검색 결과");
    }

    if let Some(content) = value.get("content").and_then(|v| v.as_array()) {
        let bullets: Vec<String> = content
            .iter()
            .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
            .map(|text| format!("- {text}"))
            .collect();
        if !bullets.is_empty() {
            return format!("## MCP 응답\n{}\n", bullets.join("\n"));
        }
    }

    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("## 실행 결과 - 도구: {tool_name}\n```json\n{pretty}\n```\n")
}

fn render_summary(value: &Value, summary: &str) -> String {
    let mut out = String::from("## 실행 결과\n");
    if let Some(output_path) = value.get("output_path").and_then(|v| v.as_str()) {
        out.push_str(&format!("- output_path: {output_path}\n"));
    }
    out.push_str(summary);
    out.push('\n');
    out
}

fn render_grouped_results(items: &[Value], heading: &str) -> String {
    use std::collections::BTreeMap;

    let mut by_path: BTreeMap<String, Vec<&Value>> = BTreeMap::new();
    for item in items {
        let path = item
            .get("path")
            .and_then(|p| p.as_str())
            .unwrap_or("(알 수 없는 경로)")
            .to_string();
        by_path.entry(path).or_default().push(item);
    }

    let mut out = format!("{heading}\n");
    for (path, group) in by_path {
        out.push_str(&format!("### {path}\n"));
        for item in group {
            let title = item.get("title").and_then(|t| t.as_str()).unwrap_or(&path);
            let line = item.get("line").and_then(|l| l.as_u64());
            let snippet = item.get("snippet").and_then(|s| s.as_str());

            let mut entry = format!("- {title}");
            if let Some(line) = line {
                entry.push_str(&format!(" (line {line})"));
            }
            if let Some(snippet) = snippet {
                entry.push_str(&format!(" - {snippet}"));
            }
            out.push_str(&entry);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_summary_with_output_path() {
        let value = json!({"summary": "done", "output_path": "output.md"});
        let rendered = format_result(&value, "rebuild_summary");
        assert!(rendered.contains("## 실행 결과"));
        assert!(rendered.contains("output_path: output.md"));
        assert!(rendered.contains("done"));
    }

    #[test]
    fn renders_results_grouped_by_path() {
        let value = json!({"results": [
            {"path": "notes/a.md", "title": "A", "line": 3, "snippet": "hello"},
            {"path": "notes/a.md", "title": "A2"},
        ]});
        let rendered = format_result(&value, "search");
        assert!(rendered.contains("### notes/a.md"));
        assert!(rendered.contains("- A (line 3) - hello"));
        assert!(rendered.contains("- A2"));
    }

    #[test]
    fn falls_back_to_fenced_json() {
        let value = json!({"weird": true});
        let rendered = format_result(&value, "custom_tool");
        assert!(rendered.contains("도구: custom_tool"));
        assert!(rendered.contains("```json"));
    }
}
