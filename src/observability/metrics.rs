//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Resolved metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address for the HTTP scrape endpoint.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from settings.
    #[must_use]
    pub const fn from_settings(settings: &MetricsSettings) -> Self {
        Self {
            enabled: settings.enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), settings.port),
        }
    }
}

/// Installs the Prometheus recorder.
///
/// With `expose`, also starts the HTTP listener; otherwise the returned handle
/// can render the current snapshot on demand.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if a recorder is already installed or the
/// listener cannot bind.
pub fn install_prometheus(
    config: &MetricsConfig,
    expose: bool,
) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let builder = PrometheusBuilder::new();
    if !expose {
        return builder
            .install_recorder()
            .map(Some)
            .map_err(|e| Error::OperationFailed {
                operation: "metrics_recorder_install".to_string(),
                cause: e.to_string(),
            });
    }

    let builder = builder.with_http_listener(config.listen_addr);
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(runtime) => install_on(builder, &runtime)?,
        Err(_) => install_on_own_thread(builder)?,
    };
    tracing::info!(addr = %config.listen_addr, "metrics listener started");
    Ok(Some(handle))
}

/// Builds the listener on a private runtime parked on its own thread.
fn install_on_own_thread(builder: PrometheusBuilder) -> Result<PrometheusHandle> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_runtime_init".to_string(),
            cause: e.to_string(),
        })?;
    let handle = install_on(builder, runtime.handle())?;
    std::thread::Builder::new()
        .name("factkeeper-metrics".to_string())
        .spawn(move || runtime.block_on(std::future::pending::<()>()))
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_runtime_thread".to_string(),
            cause: e.to_string(),
        })?;
    Ok(handle)
}

fn install_on(
    builder: PrometheusBuilder,
    runtime: &tokio::runtime::Handle,
) -> Result<PrometheusHandle> {
    let (recorder, exporter) = {
        let _guard = runtime.enter();
        builder.build().map_err(|e| Error::OperationFailed {
            operation: "metrics_exporter_build".to_string(),
            cause: e.to_string(),
        })?
    };
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|e| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    })?;
    runtime.spawn(async move {
        if let Err(e) = exporter.await {
            tracing::warn!(error = ?e, "metrics exporter stopped");
        }
    });
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = MetricsConfig::from_settings(&MetricsSettings::default());
        assert!(!config.enabled);
        let handle = install_prometheus(&config, false).expect("disabled install");
        assert!(handle.is_none());
    }

    #[test]
    fn test_listen_addr_uses_port() {
        let settings = MetricsSettings {
            enabled: true,
            port: 9911,
        };
        let config = MetricsConfig::from_settings(&settings);
        assert_eq!(config.listen_addr.port(), 9911);
    }
}
