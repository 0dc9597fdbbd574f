//! stats.rs - Fire-and-forget statistics events.
//!
//! Every computed result produces one [`StatsEvent`] that is offered to a
//! bounded channel with `try_send`. A full or closed channel drops the event;
//! the response path never waits on statistics.
//!
//! License: MIT OR APACHE 2.0

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::consolidate::EntityReport;
use crate::risk::RiskMetrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsEvent {
    pub id: Uuid,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub entities: Vec<EntityReport>,
    /// Pattern label to number of masked spans.
    pub pattern_matches: BTreeMap<String, usize>,
    pub risk_score: f64,
    pub metrics: RiskMetrics,
}

impl StatsEvent {
    pub fn new<'a, I>(entities: Vec<EntityReport>, pattern_labels: I, risk_score: f64, metrics: RiskMetrics) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut pattern_matches = BTreeMap::new();
        for label in pattern_labels {
            *pattern_matches.entry(label.to_string()).or_insert(0) += 1;
        }
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now().to_rfc3339(),
            entities,
            pattern_matches,
            risk_score,
            metrics,
        }
    }
}

/// Sending half of the stats channel. A publisher without a channel
/// discards everything.
#[derive(Debug, Clone, Default)]
pub struct StatsPublisher {
    tx: Option<mpsc::Sender<StatsEvent>>,
}

impl StatsPublisher {
    pub fn new(tx: mpsc::Sender<StatsEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// A publisher and the receiver for a channel of `capacity` events.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StatsEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Returns whether the event was accepted by the channel.
    pub fn publish(&self, event: StatsEvent) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                debug!("Stats channel full; dropping event {}.", event.id);
                false
            }
            Err(TrySendError::Closed(event)) => {
                debug!("Stats channel closed; dropping event {}.", event.id);
                false
            }
        }
    }
}

/// Consumes events and logs a one-line summary of each, without entity text.
pub fn spawn_logging_sink(mut rx: mpsc::Receiver<StatsEvent>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut seen = 0;
        while let Some(event) = rx.recv().await {
            seen += 1;
            let labels: Vec<&str> = event.entities.iter().map(|e| e.label.as_str()).collect();
            info!(
                "stats id={} at={} entities={:?} patterns={:?} risk={}",
                event.id, event.timestamp, labels, event.pattern_matches, event.risk_score
            );
        }
        seen
    })
}
