use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use onboard_client::SectionRoutes;

/// Top-level configuration, read from `onboard.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct OnboardConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    /// Per-section route overrides, e.g. `experience = "/jobs"`.
    #[serde(default)]
    pub routes: SectionRoutes,
}

impl OnboardConfig {
    /// Load configuration from `path`, or use defaults if the file does not
    /// exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            toml::from_str("")?
        };
        Ok(config)
    }
}

/// Onboarding backend connection.
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Optional bearer key sent with every request.
    pub api_key: Option<String>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            api_key: None,
        }
    }
}

/// Where drafts and snapshots are kept between runs.
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Which backend to use: `"file"` or `"memory"`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Directory for the `file` backend.
    #[serde(default = "default_storage_directory")]
    pub directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            directory: default_storage_directory(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    /// Quiet period before an edited draft is written.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_owned()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_storage_backend() -> String {
    "file".to_owned()
}

fn default_storage_directory() -> PathBuf {
    PathBuf::from(".onboard/drafts")
}

fn default_debounce_ms() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use onboard_core::Section;

    use super::*;

    #[test]
    fn defaults() {
        let config: OnboardConfig = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert!(config.api.api_key.is_none());
        assert_eq!(config.storage.backend, "file");
        assert_eq!(config.storage.directory, PathBuf::from(".onboard/drafts"));
        assert_eq!(config.sync.debounce(), Duration::from_millis(300));
        assert_eq!(
            config.routes.route(Section::Address),
            "/employee-upload/address-details"
        );
    }

    #[test]
    fn custom_config() {
        let toml = r#"
            [api]
            base_url = "https://hr.example.com/api"
            timeout_seconds = 5
            api_key = "k-123"

            [storage]
            backend = "memory"

            [sync]
            debounce_ms = 50

            [routes]
            experience = "/jobs"
        "#;

        let config: OnboardConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api.base_url, "https://hr.example.com/api");
        assert_eq!(config.api.timeout_seconds, 5);
        assert_eq!(config.api.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.storage.backend, "memory");
        // Unset fields in a present table still get defaults.
        assert_eq!(config.storage.directory, PathBuf::from(".onboard/drafts"));
        assert_eq!(config.sync.debounce_ms, 50);
        assert_eq!(config.routes.route(Section::Experience), "/jobs");
        assert_eq!(
            config.routes.route(Section::Personal),
            "/employee-upload/personal-details"
        );
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = OnboardConfig::load(Path::new("/nonexistent/onboard.toml")).unwrap();
        assert_eq!(config.storage.backend, "file");
    }

    #[test]
    fn unknown_section_in_routes_is_rejected() {
        let toml = r#"
            [routes]
            payroll = "/pay"
        "#;
        assert!(toml::from_str::<OnboardConfig>(toml).is_err());
    }
}
