//! Configuration for the pod runtime

use serde::{Deserialize, Serialize};

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodSystemConfig {
    /// Naming service configuration
    #[serde(default)]
    pub naming: NamingConfig,

    /// Membership ledger configuration
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Controller deployment configuration
    #[serde(default)]
    pub controllers: ControllerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Naming service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Root domain labels are registered under
    #[serde(default = "default_root_domain")]
    pub root_domain: String,

    /// Base URL for the pod avatar text record; the pod id is appended
    #[serde(default = "default_avatar_base_url")]
    pub avatar_base_url: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            root_domain: default_root_domain(),
            avatar_base_url: default_avatar_base_url(),
        }
    }
}

/// Membership ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Metadata URI template for membership tokens
    #[serde(default = "default_token_uri")]
    pub uri: String,

    /// Address of the ledger and registry owner
    #[serde(default = "default_owner")]
    pub owner: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            uri: default_token_uri(),
            owner: default_owner(),
        }
    }
}

/// Controller deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Register every installed controller on install
    #[serde(default = "default_true")]
    pub auto_register: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            auto_register: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_root_domain() -> String {
    "pod.xyz".to_string()
}

fn default_avatar_base_url() -> String {
    "https://pod.xyz/assets/avatars".to_string()
}

fn default_token_uri() -> String {
    "https://pod.xyz/metadata/{id}.json".to_string()
}

fn default_owner() -> String {
    "0xowner".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PodSystemConfig {
    /// Load configuration from defaults, an optional file, and `POD_` variables
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&PodSystemConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("POD")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Avatar URL written for a freshly named pod
    pub fn avatar_url(&self, pod_id: pod_types::PodId) -> String {
        format!(
            "{}/{}",
            self.naming.avatar_base_url.trim_end_matches('/'),
            pod_id.value()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PodSystemConfig::default();
        assert_eq!(config.naming.root_domain, "pod.xyz");
        assert!(config.controllers.auto_register);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = PodSystemConfig::load(None).unwrap();
        assert_eq!(config.ledger.owner, "0xowner");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_avatar_url() {
        let mut config = PodSystemConfig::default();
        config.naming.avatar_base_url = "https://img.example/".into();
        assert_eq!(
            config.avatar_url(pod_types::PodId::new(7)),
            "https://img.example/7"
        );
    }
}
