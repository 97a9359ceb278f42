//! Telemetry ingestion
//!
//! Nodes push observer reports on their own schedule. Each stats event names
//! the reporting service; the service name identifies the rule and the
//! counters replace the rule's stored traffic outright. Nodes reset their
//! counters after each report, so the stored values are always the most
//! recent window.

use std::sync::Arc;

use rp_core::error::StoreError;
use rp_core::model::Traffic;
use rp_core::naming::ServiceRef;
use rp_core::traits::RuleStore;
use rp_protocol::{ObserverReport, STATS_EVENT};

/// What happened to a report's events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Events written to a rule
    pub applied: usize,
    /// Events ignored (malformed, not stats, unknown service or rule)
    pub skipped: usize,
}

/// Folds observer reports into rule traffic counters
pub struct TelemetryIngest {
    store: Arc<dyn RuleStore>,
}

impl TelemetryIngest {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    /// Apply every usable event in `report`.
    ///
    /// Only a backend store failure aborts the batch.
    pub async fn ingest(&self, report: &ObserverReport) -> Result<IngestSummary, StoreError> {
        let mut summary = IngestSummary::default();

        for decoded in report.decode_events() {
            let event = match decoded {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!("Dropping malformed observer event: {}", err);
                    summary.skipped += 1;
                    continue;
                }
            };

            let stats = match (event.kind.as_str(), event.stats) {
                (STATS_EVENT, Some(stats)) => stats,
                _ => {
                    summary.skipped += 1;
                    continue;
                }
            };

            let Some(rule) = ServiceRef::parse(&event.service) else {
                tracing::warn!("Stats for unrecognized service {:?}", event.service);
                summary.skipped += 1;
                continue;
            };

            let traffic = Traffic::absolute(stats.input_bytes, stats.output_bytes, stats.total_conns);
            let written = match rule {
                ServiceRef::Forward(id) => self.store.forward_set_traffic(id, traffic).await,
                ServiceRef::Tunnel(id) => self.store.tunnel_set_traffic(id, traffic).await,
            };

            match written {
                Ok(()) => {
                    tracing::trace!(
                        "{}: in={} out={} conns={}",
                        event.service,
                        traffic.input_bytes,
                        traffic.output_bytes,
                        traffic.total_requests
                    );
                    summary.applied += 1;
                }
                Err(StoreError::NotFound(resource)) => {
                    tracing::warn!("Stats for {} which no longer exists", resource);
                    summary.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(summary)
    }
}
