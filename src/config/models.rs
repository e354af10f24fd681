use crate::acquisition::DEFAULT_MAX_DEPTH;
use crate::formats::Capabilities;
use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Formats, DRM schemes and audio providers this build supports
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub linearizer: LinearizerSettings,
    #[serde(default)]
    pub resolution: ResolutionSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub fulfillment: FulfillmentSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinearizerSettings {
    /// Deepest indirect acquisition nesting accepted
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for LinearizerSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResolutionSettings {
    /// Fail resolution when several subtasks claim the same step
    #[serde(default)]
    pub strict: bool,
}

/// Settings for the HTTP fetcher used by built-in subtasks
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: ByteSize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    concat!("opds-fulfill/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_download_bytes() -> ByteSize {
    ByteSize::mib(512)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FulfillmentSettings {
    /// Where attempts write temporary and downloaded files
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Try the next candidate path after a subtask failure
    #[serde(default)]
    pub fallback_on_failure: bool,
}

impl Default for FulfillmentSettings {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            fallback_on_failure: false,
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("data/fulfillment")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.linearizer.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.resolution.strict);
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.http.max_download_bytes, ByteSize::mib(512));
        assert_eq!(config.fulfillment.work_dir, PathBuf::from("data/fulfillment"));
        assert!(config.capabilities.audio.is_none());
    }

    #[test]
    fn test_parse_from_toml() {
        let config: Config = toml::from_str(
            r#"
[capabilities]
pdf = true
adobe_drm = true

[capabilities.audio]
findaway = true

[http]
max_download_bytes = "64MB"
            "#,
        )
        .unwrap();

        assert!(config.capabilities.pdf);
        assert!(config.capabilities.adobe_drm);
        assert!(!config.capabilities.lcp);
        let audio = config.capabilities.audio.unwrap();
        assert!(audio.findaway);
        assert!(!audio.overdrive);
        assert_eq!(config.http.max_download_bytes, ByteSize::mib(64));
        assert_eq!(config.http.request_timeout_secs, 60);
    }
}
