//! StatsD metrics through cadence; every helper is a no-op while disabled
use crate::config::Config;
use cadence::{
    BufferedUdpMetricSink, Counted, CountedExt, QueuingMetricSink, StatsdClient, Timed,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// Improved wrapper for StatsdClient with better error handling
pub struct StatsdClientWrapper {
    client: Arc<StatsdClient>,
    prefix: String,
    use_tags: bool,
}

impl Clone for StatsdClientWrapper {
    fn clone(&self) -> Self {
        Self { client: self.client.clone(), prefix: self.prefix.clone(), use_tags: self.use_tags }
    }
}

impl StatsdClientWrapper {
    pub fn new(client: StatsdClient, prefix: &str, use_tags: bool) -> Self {
        let wrapper = Self { client: Arc::new(client), prefix: prefix.to_string(), use_tags };

        tracing::info!("Created StatsdClient wrapper with use_tags={}", use_tags);
        wrapper
    }

    pub fn count(&self, key: &str, value: u64) {
        if self.use_tags {
            self.client.count_with_tags(key, value as i64).send();
            tracing::trace!("Sent tagged metric: {} = {}", key, value);
        } else {
            match self.client.count(key, value as i64) {
                Ok(_) => tracing::trace!("Sent metric: {} = {}", key, value),
                Err(e) => tracing::warn!("Failed to send metric {}: {}", key, e),
            }
        }
    }

    pub fn incr(&self, key: &str) {
        if self.use_tags {
            self.client.incr_with_tags(key).send();
            tracing::trace!("Sent tagged metric: {}", key);
        } else {
            match self.client.incr(key) {
                Ok(_) => tracing::trace!("Sent metric: {}", key),
                Err(e) => tracing::warn!("Failed to send metric {}: {}", key, e),
            }
        }
    }

    pub fn time(&self, key: &str, value: u64) {
        if self.use_tags {
            self.client.time_with_tags(key, value).send();
            tracing::trace!("Sent tagged metric: {} = {}ms", key, value);
        } else {
            match self.client.time(key, value) {
                Ok(_) => tracing::trace!("Sent metric: {} = {}ms", key, value),
                Err(e) => tracing::warn!("Failed to send metric {}: {}", key, e),
            }
        }
    }

    // Directly check connectivity to the StatsD server
    pub fn check_connectivity(&self) -> bool {
        let test_key = format!("{}.connectivity_test", self.prefix);
        let result = self.client.incr(&test_key);
        match result {
            Ok(_) => {
                tracing::info!("Connectivity test succeeded");
                true
            },
            Err(e) => {
                tracing::warn!("Connectivity test failed: {}", e);
                false
            },
        }
    }
}

// Static client storage
static METRICS_CLIENT: OnceCell<Option<StatsdClientWrapper>> = OnceCell::new();

pub fn setup_metrics(config: &Config) {
    METRICS_CLIENT.get_or_init(|| {
        if !config.statsd.enabled {
            tracing::info!("Metrics disabled in configuration");
            return None;
        }

        let addr = config.statsd.addr.as_str();
        let prefix = config.statsd.prefix.as_str();

        match create_statsd_client(addr, prefix) {
            Ok(client) => {
                tracing::info!("StatsD metrics initialized with endpoint {} and prefix '{}'", addr, prefix);
                let client_wrapper = StatsdClientWrapper::new(client, prefix, config.statsd.use_tags);
                if !client_wrapper.check_connectivity() {
                    tracing::warn!("StatsD connectivity test failed");
                }
                client_wrapper.incr("metrics.initialization");
                Some(client_wrapper)
            },
            Err(e) => {
                tracing::error!("Failed to create StatsD client: {}", e);
                None
            },
        }
    });
}

// Create a properly configured StatsD client
fn create_statsd_client(
    addr: &str,
    prefix: &str,
) -> Result<StatsdClient, Box<dyn std::error::Error + Send + Sync>> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
    socket.set_nonblocking(true)?;

    // The addr is already in host:port format
    let udp_sink = BufferedUdpMetricSink::from(addr, socket)?;
    let queuing_sink = QueuingMetricSink::from(udp_sink);

    Ok(StatsdClient::from_sink(prefix, queuing_sink))
}

fn get_client() -> Option<&'static StatsdClientWrapper> {
    METRICS_CLIENT.get().and_then(|client_opt| client_opt.as_ref())
}

pub fn incr(key: &str) {
    if let Some(client) = get_client() {
        client.incr(key);
    }
}

pub fn count(key: &str, value: u64) {
    if let Some(client) = get_client() {
        client.count(key, value);
    }
}

pub fn time(key: &str, duration: Duration) {
    if let Some(client) = get_client() {
        client.time(key, duration.as_millis() as u64);
    }
}

/// Reports the elapsed time as a timer metric when dropped
pub struct MetricsTimer {
    start: Instant,
    metric_name: &'static str,
}

impl MetricsTimer {
    pub fn new(metric_name: &'static str) -> Self {
        Self { start: Instant::now(), metric_name }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        time(self.metric_name, self.start.elapsed());
    }
}
