//! Tracing subscriber and Prometheus exporter setup.
//!
//! `RUST_LOG` wins over the configured level when it is set.

mod config;

use std::net::SocketAddr;

pub(crate) use config::{LogFormat, LoggerConfig, TelemetryConfig, TelemetryMetricsConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub(crate) fn initialize(logger_config: &LoggerConfig, telemetry_config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| configured_filter(&logger_config.level));

    match logger_config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .init(),
    }

    initialize_metrics(&telemetry_config.metrics);
}

fn configured_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|error| {
        eprintln!("Invalid log level '{level}' ({error}), falling back to 'info'");
        EnvFilter::new("info")
    })
}

fn initialize_metrics(metrics_config: &TelemetryMetricsConfig) {
    if !metrics_config.enabled {
        return;
    }

    let bind_address: SocketAddr = match metrics_config.bind_address.parse() {
        Ok(address) => address,
        Err(error) => {
            tracing::warn!(
                bind_address = %metrics_config.bind_address,
                error = %error,
                "Invalid metrics bind address; metrics exporter disabled"
            );
            return;
        }
    };

    if let Err(error) = PrometheusBuilder::new()
        .with_http_listener(bind_address)
        .install()
    {
        tracing::warn!(
            bind_address = %bind_address,
            error = %error,
            "Failed to start Prometheus metrics exporter"
        );
        return;
    }

    tracing::info!(bind_address = %bind_address, "Prometheus metrics exporter enabled");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back_to_info() {
        assert_eq!(configured_filter("iot_iam_sync=loudest").to_string(), "info");
        assert_eq!(
            configured_filter("iot_iam_sync=debug").to_string(),
            "iot_iam_sync=debug"
        );
    }
}
