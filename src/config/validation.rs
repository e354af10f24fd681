use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("linearizer.max_depth must be at least 1")]
    InvalidMaxDepth,

    #[error("http.max_retries must be at least 1 (one attempt)")]
    InvalidMaxRetries,

    #[error("Timeout must be positive: {field}")]
    InvalidTimeout { field: &'static str },

    #[error("http.user_agent must not be empty")]
    EmptyUserAgent,

    #[error("http.max_download_bytes must be positive")]
    InvalidDownloadLimit,

    #[error("LCP audio books require capabilities.lcp")]
    LcpAudioWithoutLcp,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_linearizer(config)?;
    validate_http(config)?;
    validate_capabilities(config)?;
    Ok(())
}

fn validate_linearizer(config: &Config) -> Result<(), ValidationError> {
    if config.linearizer.max_depth == 0 {
        return Err(ValidationError::InvalidMaxDepth);
    }
    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    let http = &config.http;

    if http.max_retries == 0 {
        return Err(ValidationError::InvalidMaxRetries);
    }
    if http.connect_timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "http.connect_timeout_secs",
        });
    }
    if http.request_timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout {
            field: "http.request_timeout_secs",
        });
    }
    if http.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }
    if http.max_download_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidDownloadLimit);
    }
    Ok(())
}

/// Capabilities that only make sense together
fn validate_capabilities(config: &Config) -> Result<(), ValidationError> {
    let caps = &config.capabilities;
    if caps.audio.is_some_and(|audio| audio.lcp) && !caps.lcp {
        return Err(ValidationError::LcpAudioWithoutLcp);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::AudioSupport;
    use crate::humanize::ByteSize;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate(&Config::default()), Ok(()));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let mut config = Config::default();
        config.linearizer.max_depth = 0;
        assert_eq!(validate(&config), Err(ValidationError::InvalidMaxDepth));
    }

    #[test]
    fn test_http_limits() {
        let mut config = Config::default();
        config.http.max_retries = 0;
        assert_eq!(validate(&config), Err(ValidationError::InvalidMaxRetries));

        let mut config = Config::default();
        config.http.request_timeout_secs = 0;
        assert_eq!(
            validate(&config),
            Err(ValidationError::InvalidTimeout {
                field: "http.request_timeout_secs"
            })
        );

        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert_eq!(validate(&config), Err(ValidationError::EmptyUserAgent));

        let mut config = Config::default();
        config.http.max_download_bytes = ByteSize(0);
        assert_eq!(validate(&config), Err(ValidationError::InvalidDownloadLimit));
    }

    #[test]
    fn test_lcp_audio_needs_lcp() {
        let mut config = Config::default();
        config.capabilities.audio = Some(AudioSupport {
            lcp: true,
            ..Default::default()
        });
        assert_eq!(validate(&config), Err(ValidationError::LcpAudioWithoutLcp));

        config.capabilities.lcp = true;
        assert_eq!(validate(&config), Ok(()));
    }
}
