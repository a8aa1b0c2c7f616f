use metrics_exporter_prometheus::PrometheusBuilder;

use crate::core::config::Settings;

/// Installs the Prometheus recorder with its own scrape listener.
pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    let telemetry = settings.telemetry();
    if !telemetry.prometheus_enabled {
        return Ok(());
    }

    PrometheusBuilder::new().with_http_listener(telemetry.prometheus_addr).install()?;
    tracing::info!(addr = %telemetry.prometheus_addr, "Prometheus exporter listening");
    Ok(())
}
