use std::env;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_DARK_CODE_THEME: &str = "base16-ocean.dark";
pub const DEFAULT_LIGHT_CODE_THEME: &str = "InspiredGitHub";

/// Runtime settings, read from the environment (a `.env` file is loaded by the binary first).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub server_url: String,
    pub dark_code_theme: String,
    pub light_code_theme: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            dark_code_theme: DEFAULT_DARK_CODE_THEME.to_string(),
            light_code_theme: DEFAULT_LIGHT_CODE_THEME.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, fallback: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            server_url: read("STREAMDESK_SERVER_URL", DEFAULT_SERVER_URL)
                .trim_end_matches('/')
                .to_string(),
            dark_code_theme: read("STREAMDESK_CODE_THEME_DARK", DEFAULT_DARK_CODE_THEME),
            light_code_theme: read("STREAMDESK_CODE_THEME_LIGHT", DEFAULT_LIGHT_CODE_THEME),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.server_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset_or_blank() {
        let vars: HashMap<&str, &str> = HashMap::from([("STREAMDESK_CODE_THEME_DARK", "  ")]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn server_url_is_normalized() {
        let config = Config::from_lookup(|key| {
            (key == "STREAMDESK_SERVER_URL").then(|| "http://chat.local:8080/".to_string())
        });
        assert_eq!(config.server_url, "http://chat.local:8080");
        assert_eq!(config.endpoint("/stream/abc"), "http://chat.local:8080/stream/abc");
        assert_eq!(config.endpoint("chat"), "http://chat.local:8080/chat");
    }
}
