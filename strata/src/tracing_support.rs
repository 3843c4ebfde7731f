//! Tracing and logging support.
//!
//! The engine logs every resolution, tree-building, collection and dispatch
//! step at `debug`/`trace` level under the `strata` target. Hosting
//! applications install a subscriber with the helpers below, typically wired
//! to a `-v` counting flag on the root controller.
//!
//! `tracing` is a required dependency, so its macros are re-exported in every
//! build. The `tracing` feature only gates the subscriber helpers and the
//! `tracing-subscriber` dependency they need.

pub use tracing::{self, debug, error, info, instrument, trace, warn};

#[cfg(feature = "tracing")]
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Tracing output format.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable multi-line output.
    Pretty,

    /// One line per event.
    Compact,

    /// Newline-delimited JSON.
    Json,
}

/// Tracing configuration.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter.
    ///
    /// If None, uses RUST_LOG or falls back to "warn" so dispatch stays
    /// quiet by default.
    pub level: Option<tracing::Level>,

    pub format: TracingFormat,

    /// Include timestamps in output.
    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,

    pub thread_ids: bool,
}

#[cfg(feature = "tracing")]
impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Compact,
            timestamps: false,
            target: true,
            thread_ids: false,
        }
    }
}

#[cfg(feature = "tracing")]
impl TracingConfig {
    /// Map a `-v` repeat count onto a level: none keeps the default filter,
    /// then info, debug and trace.
    ///
    /// ```
    /// use strata::{Invocation, TracingConfig};
    ///
    /// let invocation = Invocation::default();
    /// let config = TracingConfig::from_verbosity(invocation.count("verbose"));
    /// assert!(config.level.is_none());
    /// ```
    pub fn from_verbosity(count: u64) -> Self {
        let level = match count {
            0 => None,
            1 => Some(tracing::Level::INFO),
            2 => Some(tracing::Level::DEBUG),
            _ => Some(tracing::Level::TRACE),
        };
        Self {
            level,
            ..Self::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        match self.level {
            Some(level) => EnvFilter::new(level.to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        }
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_target(self.target)
            .with_thread_ids(self.thread_ids)
            .with_writer(std::io::stderr);

        match (self.format, self.timestamps) {
            (TracingFormat::Pretty, true) => base.pretty().boxed(),
            (TracingFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (TracingFormat::Compact, true) => base.compact().boxed(),
            (TracingFormat::Compact, false) => base.compact().without_time().boxed(),
            (TracingFormat::Json, true) => base.json().boxed(),
            (TracingFormat::Json, false) => base.json().without_time().boxed(),
        }
    }
}

/// Initialize a subscriber with default settings.
///
/// # Environment Variables
///
/// - `RUST_LOG=strata=debug` - Show how controllers were resolved and routed
/// - `RUST_LOG=strata=trace` - Also show every argument being attached
#[cfg(feature = "tracing")]
pub fn init_subscriber() {
    init_subscriber_with_config(TracingConfig::default());
}

/// Initialize a subscriber with custom configuration.
///
/// Does nothing when a global subscriber is already installed, so calling
/// it from tests or from several entry points is harmless.
///
/// # Example
///
/// ```ignore
/// use strata::{init_subscriber_with_config, TracingConfig, TracingFormat};
///
/// fn main() {
///     let config = TracingConfig {
///         format: TracingFormat::Json,
///         ..TracingConfig::from_verbosity(2)
///     };
///
///     init_subscriber_with_config(config);
/// }
/// ```
#[cfg(feature = "tracing")]
pub fn init_subscriber_with_config(config: TracingConfig) {
    let _ = tracing_subscriber::registry()
        .with(config.layer())
        .with(config.filter())
        .try_init();
}

// Fallback when tracing feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macros_need_no_feature() {
        super::debug!(target: "strata", value = 1, "logged through the re-export");
        super::trace!("no subscriber installed");
    }

    #[test]
    #[cfg(feature = "tracing")]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.format, TracingFormat::Compact);
        assert!(config.level.is_none());
        assert!(!config.timestamps);
    }

    #[test]
    #[cfg(feature = "tracing")]
    fn test_from_verbosity() {
        assert_eq!(TracingConfig::from_verbosity(0).level, None);
        assert_eq!(
            TracingConfig::from_verbosity(1).level,
            Some(tracing::Level::INFO)
        );
        assert_eq!(
            TracingConfig::from_verbosity(2).level,
            Some(tracing::Level::DEBUG)
        );
        assert_eq!(
            TracingConfig::from_verbosity(7).level,
            Some(tracing::Level::TRACE)
        );
    }

    #[test]
    #[cfg(feature = "tracing")]
    fn test_init_twice_is_harmless() {
        init_subscriber();
        init_subscriber_with_config(TracingConfig::from_verbosity(3));
    }
}
