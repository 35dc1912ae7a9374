//! Configuration file parser for ~/.config/folio/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
//!
//! ```toml
//! default_catalog = "gutenberg"
//! allow_private_networks = true
//!
//! [[catalogs]]
//! name = "gutenberg"
//! url = "https://www.gutenberg.org/ebooks.opds/"
//!
//! [[catalogs]]
//! name = "home"
//! url = "http://192.168.1.20:8080/opds"
//! username = "reader"
//! password = "hunter2"
//!
//! [keybindings]
//! load_more = "m"
//! ```
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::fetch::{Credentials, FetchSettings};
use crate::util::HostPolicy;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// A bookmarked catalog.
///
/// SEC-015: `password` is held as a `SecretString` and never printed.
#[derive(Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog opened when no URL or `--catalog` is given.
    pub default_catalog: Option<String>,

    /// Bookmarked catalogs, in menu order.
    pub catalogs: Vec<CatalogEntry>,

    /// Permit localhost and private address ranges (self-hosted servers).
    pub allow_private_networks: bool,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted feed size in megabytes.
    pub max_feed_size_mb: usize,

    /// Retries on 429 and 5xx responses.
    pub max_retries: u32,

    /// Number of feeds kept in the response cache (0 disables caching).
    pub cache_entries: usize,

    /// Seconds a cached feed stays fresh.
    pub cache_ttl_secs: u64,

    /// Custom keybinding overrides. Keys are action names, values are key strings.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_catalog: None,
            catalogs: Vec::new(),
            allow_private_networks: false,
            request_timeout_secs: 30,
            max_feed_size_mb: 10,
            max_retries: 3,
            cache_entries: 32,
            cache_ttl_secs: 300,
            keybindings: HashMap::new(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "default_catalog",
        "catalogs",
        "allow_private_networks",
        "request_timeout_secs",
        "max_feed_size_mb",
        "max_retries",
        "cache_entries",
        "cache_ttl_secs",
        "keybindings",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parses config text; blank input yields the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(catalogs = config.catalogs.len(), "Loaded configuration");
        Ok(config)
    }

    /// Looks up a bookmarked catalog by name (case-insensitive).
    pub fn catalog(&self, name: &str) -> Option<&CatalogEntry> {
        self.catalogs.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn host_policy(&self) -> HostPolicy {
        if self.allow_private_networks {
            HostPolicy::AllowPrivate
        } else {
            HostPolicy::PublicOnly
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            max_feed_size: self.max_feed_size_mb.max(1).saturating_mul(1024 * 1024),
            max_retries: self.max_retries,
            host_policy: self.host_policy(),
            cache_capacity: self.cache_entries,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            ..FetchSettings::default()
        }
    }

    /// Basic-auth credentials for every catalog that has a username.
    ///
    /// Entries with an unparseable URL are skipped.
    pub fn credentials(&self) -> Vec<Credentials> {
        self.catalogs
            .iter()
            .filter_map(|entry| {
                let username = entry.username.clone()?;
                let host = url::Url::parse(&entry.url).ok()?.host_str()?.to_string();
                Some(Credentials {
                    host,
                    username,
                    password: SecretString::from(
                        entry
                            .password
                            .as_ref()
                            .map(|p| p.expose_secret())
                            .unwrap_or_default()
                            .to_owned(),
                    ),
                })
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.catalogs.is_empty());
        assert!(config.default_catalog.is_none());
        assert!(!config.allow_private_networks);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert!(config.keybindings.is_empty());
        assert_eq!(config.host_policy(), HostPolicy::PublicOnly);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/folio_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_whitespace_only_returns_default() {
        let config = Config::parse("   \n  \n  ").unwrap();
        assert_eq!(config.cache_entries, 32);
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("folio_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
default_catalog = "home"
allow_private_networks = true
request_timeout_secs = 10
max_feed_size_mb = 2
max_retries = 1
cache_entries = 0
cache_ttl_secs = 60

[[catalogs]]
name = "gutenberg"
url = "https://www.gutenberg.org/ebooks.opds/"

[[catalogs]]
name = "home"
url = "http://192.168.1.20:8080/opds"
username = "reader"
password = "hunter2"

[keybindings]
quit = "Ctrl+q"
load_more = "m"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.default_catalog.as_deref(), Some("home"));
        assert_eq!(config.catalogs.len(), 2);
        assert_eq!(config.catalog("HOME").unwrap().url, "http://192.168.1.20:8080/opds");
        assert!(config.catalog("missing").is_none());
        assert_eq!(
            config.keybindings.get("load_more").map(String::as_str),
            Some("m")
        );

        let settings = config.fetch_settings();
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.max_feed_size, 2 * 1024 * 1024);
        assert_eq!(settings.max_retries, 1);
        assert_eq!(settings.cache_capacity, 0);
        assert_eq!(settings.host_policy, HostPolicy::AllowPrivate);

        let creds = config.credentials();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].host, "192.168.1.20");
        assert_eq!(creds[0].username, "reader");
        assert_eq!(creds[0].password.expose_secret(), "hunter2");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::parse("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("max_retries = 2\ntotally_fake_key = 1\n").unwrap();
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(Config::parse("request_timeout_secs = \"soon\"\n").is_err());
    }

    #[test]
    fn test_catalog_requires_url() {
        assert!(Config::parse("[[catalogs]]\nname = \"x\"\n").is_err());
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("folio_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    // SEC-015: Debug output masks passwords
    #[test]
    fn test_debug_masks_password() {
        let config = Config::parse(
            "[[catalogs]]\nname = \"home\"\nurl = \"http://nas/opds\"\nusername = \"u\"\npassword = \"super-secret-12345\"\n",
        )
        .unwrap();
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
