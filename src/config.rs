//! Runtime settings for connectors.

use std::time::Duration;

/// Environment variable overriding the connect timeout, in seconds.
pub const CONNECT_TIMEOUT_ENV: &str = "DBSCOPE_CONNECT_TIMEOUT_SECS";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings shared by every connector created through the factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorSettings {
    /// Upper bound for opening a native connection
    pub connect_timeout: Duration,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ConnectorSettings {
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Defaults, overridden by `DBSCOPE_CONNECT_TIMEOUT_SECS` when it holds a
    /// positive integer.
    pub fn from_env() -> Self {
        Self::from_timeout_var(std::env::var(CONNECT_TIMEOUT_ENV).ok().as_deref())
    }

    fn from_timeout_var(value: Option<&str>) -> Self {
        let settings = Self::default();
        match value.map(str::trim).map(str::parse::<u64>) {
            Some(Ok(secs)) if secs > 0 => settings.with_connect_timeout(Duration::from_secs(secs)),
            Some(_) => {
                tracing::warn!(
                    "Ignoring invalid {} value, using {:?}",
                    CONNECT_TIMEOUT_ENV,
                    settings.connect_timeout
                );
                settings
            }
            None => settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(
            ConnectorSettings::default().connect_timeout,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_timeout_override() {
        let settings = ConnectorSettings::from_timeout_var(Some("12"));
        assert_eq!(settings.connect_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_invalid_timeout_falls_back() {
        assert_eq!(
            ConnectorSettings::from_timeout_var(Some("soon")),
            ConnectorSettings::default()
        );
        assert_eq!(
            ConnectorSettings::from_timeout_var(Some("0")),
            ConnectorSettings::default()
        );
        assert_eq!(ConnectorSettings::from_timeout_var(None), ConnectorSettings::default());
    }
}
