//! Subscriber installation for binaries.

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// Test capture mode for deterministic testing
    Test,
}

impl Profile {
    /// Accepts the names used in `revlex.toml`, case-insensitively
    pub fn parse(name: &str) -> Option<Profile> {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Profile::Development),
            "production" | "prod" => Some(Profile::Production),
            "test" => Some(Profile::Test),
            _ => None,
        }
    }

    /// Filter used when `RUST_LOG` is unset
    fn default_directive(self) -> &'static str {
        match self {
            Profile::Development => "revlex=debug",
            Profile::Production | Profile::Test => "revlex=info",
        }
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the process subscriber. Later calls are no-ops, and so is a call
/// made after some other subscriber was installed.
///
/// Output goes to stderr so that stdout stays reserved for command results.
/// Development writes human-readable lines, Production writes one JSON
/// object per event, and Test installs a bare registry (collect events with
/// `init_test_capture()` instead).
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let installed = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(profile.filter())
                .with_writer(std::io::stderr)
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(profile.filter())
                .with_writer(std::io::stderr)
                .try_init(),
            Profile::Test => tracing_subscriber::registry().try_init().map_err(Into::into),
        };
        if installed.is_err() {
            tracing::debug!(component = "logging", ?profile, "subscriber already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
        init(Profile::Test);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("Production"), Some(Profile::Production));
        assert_eq!(Profile::parse(" dev "), Some(Profile::Development));
        assert_eq!(Profile::parse("test"), Some(Profile::Test));
        assert_eq!(Profile::parse("verbose"), None);
    }
}
