//! `tracing-subscriber` setup

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `settings.level`, then `info`.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// Returns whether this call installed it.
pub fn init_logging(settings: &LoggingSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let settings = LoggingSettings {
            level: "not a [valid filter".to_string(),
        };
        let _ = init_logging(&settings);
        assert!(!init_logging(&LoggingSettings::default()));
    }
}
