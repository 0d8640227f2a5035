//! Manifest-URL derivation (spec.md §4.1 step 2).

/// Derive the manifest URL from the tool-host endpoint URL.
///
/// Rules: trailing slash stripped from the path; then `/` or
/// `/api/mcp/chat` maps to `/mcp/manifest`; a path ending in `/mcp` appends
/// `/manifest`; otherwise the path also just gets `/manifest` appended.
pub fn manifest_url(endpoint: &str) -> String {
    let parsed = match url::Url::parse(endpoint) {
        Ok(u) => u,
        Err(_) => return format!("{}/manifest", endpoint.trim_end_matches('/')),
    };

    let path = parsed.path().trim_end_matches('/');

    let manifest_path = if path.is_empty() || path == "/api/mcp/chat" {
        "/mcp/manifest".to_string()
    } else {
        format!("{}/manifest", path)
    };

    let mut out = parsed.clone();
    out.set_path(&manifest_path);
    out.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_maps_to_mcp_manifest() {
        assert_eq!(manifest_url("http://localhost:4000/"), "http://localhost:4000/mcp/manifest");
    }

    #[test]
    fn chat_path_maps_to_mcp_manifest() {
        assert_eq!(
            manifest_url("http://localhost:4000/api/mcp/chat"),
            "http://localhost:4000/mcp/manifest"
        );
    }

    #[test]
    fn mcp_suffix_appends_manifest() {
        assert_eq!(
            manifest_url("http://localhost:8080/mcp"),
            "http://localhost:8080/mcp/manifest"
        );
    }

    #[test]
    fn arbitrary_path_appends_manifest() {
        assert_eq!(
            manifest_url("http://localhost:8080/tools"),
            "http://localhost:8080/tools/manifest"
        );
    }

    #[test]
    fn trailing_slash_stripped_first() {
        assert_eq!(
            manifest_url("http://localhost:8080/mcp/"),
            "http://localhost:8080/mcp/manifest"
        );
    }
}
