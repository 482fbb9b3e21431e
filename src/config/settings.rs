use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH_ENV: &str = "DNSIMPLE_DDNS_CONFIG";

const PRODUCTION_API_BASE: &str = "https://api.dnsimple.com";
const SANDBOX_API_BASE: &str = "https://api.sandbox.dnsimple.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub records: RecordDefaults,
    #[serde(default)]
    pub ip: IpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDefaults {
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpConfig {
    #[serde(default = "default_ipv4_services")]
    pub ipv4_services: Vec<String>,
    #[serde(default = "default_ipv6_services")]
    pub ipv6_services: Vec<String>,
}

fn default_base_url() -> String {
    PRODUCTION_API_BASE.to_string()
}

fn default_user_agent() -> String {
    concat!("dnsimple-ddns/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ttl() -> u32 {
    300
}

fn default_ipv4_services() -> Vec<String> {
    vec![
        "https://v4.ident.me/.json".to_string(),
        "https://api.ipify.org".to_string(),
    ]
}

fn default_ipv6_services() -> Vec<String> {
    vec![
        "https://v6.ident.me/.json".to_string(),
        "https://api6.ipify.org".to_string(),
    ]
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            sandbox: false,
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// API root the client talks to. `sandbox` wins over `base_url`.
    pub fn api_base(&self) -> &str {
        if self.sandbox {
            SANDBOX_API_BASE
        } else {
            self.base_url.trim_end_matches('/')
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

impl Default for IpConfig {
    fn default() -> Self {
        Self {
            ipv4_services: default_ipv4_services(),
            ipv6_services: default_ipv6_services(),
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        #[cfg(unix)]
        {
            PathBuf::from("/etc/dnsimple-ddns")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\ProgramData\dnsimple-ddns")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[client]
sandbox = true
timeout_seconds = 10
log_level = "debug"

[records]
ttl = 60

[ip]
ipv4_services = ["https://ip.example.net"]
"#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert!(settings.client.sandbox);
        assert_eq!(settings.client.api_base(), SANDBOX_API_BASE);
        assert_eq!(settings.client.timeout(), Duration::from_secs(10));
        assert_eq!(settings.client.log_level, "debug");
        assert_eq!(settings.records.ttl, 60);
        assert_eq!(settings.ip.ipv4_services, vec!["https://ip.example.net"]);
        assert_eq!(settings.ip.ipv6_services, default_ipv6_services());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.client.api_base(), PRODUCTION_API_BASE);
        assert_eq!(settings.records.ttl, 300);
        assert_eq!(settings.client.log_level, "info");
        assert!(settings.client.user_agent.starts_with("dnsimple-ddns/"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ClientConfig {
            base_url: "http://127.0.0.1:8080/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(client.api_base(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings.records.ttl, 300);
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[records]\nttl = \"soon\"\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
