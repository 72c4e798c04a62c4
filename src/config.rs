const DEFAULT_PORT: u16 = 3000;
const DEFAULT_UPSTREAM_URL: &str = "https://api.dynamicore.io";

/// Process configuration, read once at startup and injected into the
/// composed service. Internal functions never reach for the environment
/// themselves.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub verbose: bool,
    pub upstream_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            verbose: false,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            verbose: std::env::var("GATEWAY_VERBOSE")
                .map(|v| flag_enabled(&v))
                .unwrap_or(false),
            upstream_url: std::env::var("GATEWAY_UPSTREAM_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string()),
        }
    }
}

fn flag_enabled(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployment_contract() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 3000);
        assert!(!config.verbose);
        assert_eq!(config.upstream_url, "https://api.dynamicore.io");
    }

    #[test]
    fn verbose_flag_accepts_common_truthy_values() {
        assert!(flag_enabled("1"));
        assert!(flag_enabled("true"));
        assert!(flag_enabled(" yes "));
        assert!(!flag_enabled("0"));
        assert!(!flag_enabled(""));
    }
}
