//! Process-wide immutable configuration (spec.md §6), loaded from
//! environment variables only. Read once at startup; never mutated after.

use std::env;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub port: u16,
    pub front_origin: Option<String>,
    pub local_mcp_endpoint: String,
    pub local_mcp_token: Option<String>,
    pub default_paths: Vec<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl BridgeConfig {
    /// Load from environment variables, falling back to defaults. Callers
    /// typically load a `.env` file first via `dotenvy::dotenv()` so real
    /// process env vars still take precedence ("later wins").
    pub fn from_env() -> Self {
        let default_paths = env::var("LOCAL_MCP_DEFAULT_PATHS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vec!["notes/".to_string()]);

        Self {
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(4000),
            front_origin: env::var("FRONT_ORIGIN").ok(),
            local_mcp_endpoint: env::var("LOCAL_MCP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4100/mcp".to_string()),
            local_mcp_token: env::var("LOCAL_MCP_TOKEN").ok(),
            default_paths,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_fall_back_to_notes() {
        // SAFETY: test-only, single-threaded mutation of process env.
        unsafe {
            env::remove_var("LOCAL_MCP_DEFAULT_PATHS");
        }
        let config = BridgeConfig::from_env();
        assert_eq!(config.default_paths, vec!["notes/".to_string()]);
    }

    #[test]
    fn default_paths_parses_comma_separated_env() {
        unsafe {
            env::set_var("LOCAL_MCP_DEFAULT_PATHS", "a/, b/ ,c/");
        }
        let config = BridgeConfig::from_env();
        assert_eq!(config.default_paths, vec!["a/".to_string(), "b/".to_string(), "c/".to_string()]);
        unsafe {
            env::remove_var("LOCAL_MCP_DEFAULT_PATHS");
        }
    }
}
