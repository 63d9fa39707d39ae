use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::MarketConfig;

/// Installs a global fmt subscriber. `RUST_LOG` wins over the configured
/// filter. Returns false when a subscriber was already installed.
pub fn init_tracing(config: &MarketConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let config = MarketConfig::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
