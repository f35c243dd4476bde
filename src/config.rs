use std::time::Duration;

use crate::scheduler::RefreshMode;

pub const DEFAULT_THREAD_NAME: &str = "feature-cache-refresh";

/// Settings for a `FeatureCache` and its refresh scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
    /// Seconds between the end of one refresh and the start of the next.
    /// Zero or negative loads once at startup and never again.
    pub refresh_interval_secs: i64,
    /// Name of the background refresh thread.
    pub thread_name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 0,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }
}

impl CacheConfig {
    pub fn new(refresh_interval_secs: i64) -> Self {
        Self {
            refresh_interval_secs,
            ..Self::default()
        }
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        match u64::try_from(self.refresh_interval_secs) {
            Ok(secs) if secs > 0 => RefreshMode::Periodic(Duration::from_secs(secs)),
            _ => RefreshMode::OneShot,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn non_positive_interval_is_one_shot() {
        assert_eq!(CacheConfig::new(0).refresh_mode(), RefreshMode::OneShot);
        assert_eq!(CacheConfig::new(-30).refresh_mode(), RefreshMode::OneShot);
        assert_eq!(CacheConfig::default().refresh_mode(), RefreshMode::OneShot);
    }

    #[test]
    fn positive_interval_is_periodic() {
        assert_eq!(
            CacheConfig::new(300).refresh_mode(),
            RefreshMode::Periodic(Duration::from_secs(300))
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn missing_fields_take_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"refresh_interval_secs": 60}"#).unwrap();
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
        assert_eq!(
            config.refresh_mode(),
            RefreshMode::Periodic(Duration::from_secs(60))
        );
    }
}
