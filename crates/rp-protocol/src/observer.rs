//! Observers and the stats webhook
//!
//! An observer is a webhook subscription on a node. Services bound to it push
//! periodic [`ObserverReport`]s to the configured URL and expect an
//! [`ObserverReply`] with `ok: true`; anything else counts as a failed
//! delivery and is retried by the node.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type carrying traffic counters
pub const STATS_EVENT: &str = "stats";

/// An observer as accepted by `POST /config/observers`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserverConfig {
    pub name: String,
    pub plugin: PluginConfig,
}

impl ObserverConfig {
    /// HTTP webhook observer delivering to `url`
    pub fn webhook(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plugin: PluginConfig {
                kind: "http".to_string(),
                addr: url.into(),
                timeout: "10s".to_string(),
            },
        }
    }
}

/// Observer delivery plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub addr: String,
    pub timeout: String,
}

/// A batch of events pushed by a node
///
/// Events are kept as raw JSON so one malformed entry cannot reject the
/// whole batch; decode them individually with [`ObserverReport::decode_events`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserverReport {
    #[serde(default)]
    pub events: Vec<Value>,
}

impl ObserverReport {
    /// Build a report from typed events
    pub fn from_events(events: impl IntoIterator<Item = ObserverEvent>) -> Self {
        Self {
            events: events
                .into_iter()
                .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
                .collect(),
        }
    }

    /// Decode each event independently
    pub fn decode_events(
        &self,
    ) -> impl Iterator<Item = Result<ObserverEvent, serde_json::Error>> + '_ {
        self.events.iter().map(ObserverEvent::deserialize)
    }
}

/// One observer event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserverEvent {
    /// Event type, `stats` for traffic counters
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Object kind the event is about (`service`, ...)
    #[serde(rename = "kind", default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Name of the reporting service
    #[serde(default)]
    pub service: String,
    /// Counters, present on stats events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ObserverStats>,
}

impl ObserverEvent {
    /// Stats event for `service`
    pub fn stats(service: impl Into<String>, stats: ObserverStats) -> Self {
        Self {
            kind: STATS_EVENT.to_string(),
            scope: Some("service".to_string()),
            service: service.into(),
            stats: Some(stats),
        }
    }
}

/// Traffic counters for one reporting window
///
/// Both snake_case and the daemon's camelCase spellings are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverStats {
    #[serde(default, alias = "inputBytes")]
    pub input_bytes: u64,
    #[serde(default, alias = "outputBytes")]
    pub output_bytes: u64,
    #[serde(default, alias = "totalConns")]
    pub total_conns: u64,
    #[serde(default, alias = "currentConns")]
    pub current_conns: u64,
    #[serde(default, alias = "totalErrs")]
    pub total_errs: u64,
}

/// Acknowledgement returned to the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverReply {
    pub ok: bool,
}
