use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, RttError};

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

/// Histogram bounds for `rtt_seconds`, 100us to 2.5s.
pub const RTT_BUCKETS: [f64; 14] = [
    0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

// Counter instruments carry no `_total` suffix: the Prometheus exporter adds it.
#[derive(Clone)]
pub struct Metrics {
    pub packets_total: Counter<u64>,
    // error_type label: see HandshakeError::kind
    pub packet_errors_total: Counter<u64>,

    pub handshakes_completed_total: Counter<u64>,
    pub rtt_seconds: Histogram<f64>,
    pub rtt_anomalies_total: Counter<u64>,

    pub connections_pruned_total: Counter<u64>,
    pub connections_tracked: Gauge<u64>,

    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            packets_total: meter
                .u64_counter("handshake_rtt_packets")
                .with_description("Total number of packets handed to the correlation engine")
                .build(),
            packet_errors_total: meter
                .u64_counter("handshake_rtt_packet_errors")
                .with_description("Total number of packets dropped by the correlation engine, by error type")
                .build(),

            handshakes_completed_total: meter
                .u64_counter("handshake_rtt_handshakes_completed")
                .with_description("Total number of completed three-way handshakes")
                .build(),
            rtt_seconds: meter
                .f64_histogram("handshake_rtt_rtt_seconds")
                .with_description("Handshake round trip time in seconds")
                .with_boundaries(RTT_BUCKETS.to_vec())
                .build(),
            rtt_anomalies_total: meter
                .u64_counter("handshake_rtt_rtt_anomalies")
                .with_description("Completed handshakes discarded because their timestamps ran backwards")
                .build(),

            connections_pruned_total: meter
                .u64_counter("handshake_rtt_connections_pruned")
                .with_description("Total number of idle connections pruned before completing")
                .build(),
            connections_tracked: meter
                .u64_gauge("handshake_rtt_connections_tracked")
                .with_description("Number of incomplete handshakes currently tracked")
                .build(),

            build_info: meter
                .u64_gauge("handshake_rtt_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_packet(&self) {
        self.packets_total.add(1, &[]);
    }

    pub fn record_packet_error(&self, error_type: &'static str) {
        self.packet_errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type)]);
    }

    pub fn record_handshake(&self, rtt: Duration) {
        self.handshakes_completed_total.add(1, &[]);
        self.rtt_seconds.record(rtt.as_secs_f64(), &[]);
    }

    pub fn record_rtt_anomaly(&self) {
        self.rtt_anomalies_total.add(1, &[]);
    }

    pub fn record_pruned(&self, count: usize) {
        if count > 0 {
            self.connections_pruned_total.add(count as u64, &[]);
        }
    }

    pub fn record_connections_tracked(&self, count: usize) {
        self.connections_tracked.record(count as u64, &[]);
    }
}

/// Build [`Metrics`] exported into `registry` through a private meter provider.
///
/// The provider must outlive the instruments; dropping it shuts the export down.
pub fn build_metrics(registry: &Registry) -> Result<(Arc<Metrics>, SdkMeterProvider)> {
    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(|e| RttError::Telemetry(format!("Failed to build Prometheus exporter: {e}")))?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();
    let metrics = Arc::new(Metrics::new(meter_provider.meter("handshake-rtt")));
    metrics.set_build_info();

    Ok((metrics, meter_provider))
}

/// Build [`Metrics`] on a fresh registry and install their provider globally.
pub fn init_metrics() -> Result<(Arc<Metrics>, Registry)> {
    let registry = Registry::default();
    let (metrics, meter_provider) = build_metrics(&registry)?;
    global::set_meter_provider(meter_provider);
    Ok((metrics, registry))
}
