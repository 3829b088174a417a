use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize tracing - safe to call multiple times
pub fn init_tracing(env: &str, service: &str) {
    INIT.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = if env == "production" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
        };

        // A test harness or embedding binary may already own the global subscriber
        if let Err(e) = result {
            eprintln!("tracing subscriber already set: {}", e);
            return;
        }

        tracing::info!(service = %service, env = %env, "Tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_idempotent() {
        init_tracing("test", "chpool-exporter-test");
        init_tracing("production", "chpool-exporter-test");
    }
}
