//! Per-worker heartbeat bookkeeping.
//!
//! The tracker records when each worker was last reached and how many probes
//! in a row have failed since. Probes themselves run elsewhere; they report
//! back with a [`ProbeReport`] which is the only way a timestamp advances.

use crate::WorkerIndex;
use core::time::Duration;
use tokio::time::Instant;

/// How a single heartbeat probe ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The worker acknowledged the probe.
    Ack,
    /// The transport reported an error.
    Failed { reason: String },
    /// No reply arrived within the probe timeout.
    TimedOut,
}

/// Result of one probe, produced by the probe task and consumed by the
/// tracker.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub worker: WorkerIndex,
    pub sent_at: Instant,
    pub outcome: ProbeOutcome,
}

/// What recording a probe report changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Contact succeeded and the worker was already healthy.
    Healthy,
    /// Contact succeeded after `after_failures` failed probes.
    Recovered { after_failures: u32 },
    /// The probe failed; `consecutive` failures so far.
    Failed { consecutive: u32 },
    /// The report referred to a worker the tracker does not know.
    Unknown,
}

/// Point-in-time view of a worker's liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStatus {
    pub index: WorkerIndex,
    pub last_heartbeat_at: Instant,
    pub consecutive_failures: u32,
    pub live: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    last_heartbeat_at: Instant,
    consecutive_failures: u32,
    probe_in_flight: bool,
}

#[derive(Debug, Default)]
pub struct LivenessTracker {
    entries: Vec<Entry>,
}

impl LivenessTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a new worker as if it had just been contacted.
    pub fn track(&mut self, now: Instant) -> WorkerIndex {
        let index = WorkerIndex::new(self.entries.len() as u32);
        self.entries.push(Entry {
            last_heartbeat_at: now,
            consecutive_failures: 0,
            probe_in_flight: false,
        });
        index
    }

    /// Number of tracked workers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no worker is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last acknowledged contact, or the tracking time if none.
    pub fn last_heartbeat_at(&self, worker: WorkerIndex) -> Option<Instant> {
        self.entries.get(worker.slot()).map(|e| e.last_heartbeat_at)
    }

    /// Failed probes since the last acknowledgement.
    pub fn consecutive_failures(&self, worker: WorkerIndex) -> Option<u32> {
        self.entries.get(worker.slot()).map(|e| e.consecutive_failures)
    }

    /// A worker is live while its last successful contact is at most
    /// `timeout` old.
    pub fn is_live(&self, worker: WorkerIndex, now: Instant, timeout: Duration) -> Option<bool> {
        self.entries
            .get(worker.slot())
            .map(|e| now.saturating_duration_since(e.last_heartbeat_at) <= timeout)
    }

    /// Marks every worker whose last contact is older than `interval` and
    /// which has no probe outstanding as probing, and returns them.
    pub fn claim_stale(&mut self, now: Instant, interval: Duration) -> Vec<WorkerIndex> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter(|(_, e)| !e.probe_in_flight)
            .filter(|(_, e)| now.saturating_duration_since(e.last_heartbeat_at) > interval)
            .map(|(slot, e)| {
                e.probe_in_flight = true;
                WorkerIndex::new(slot as u32)
            })
            .collect()
    }

    /// Applies a probe result. Only an acknowledged probe moves the timestamp,
    /// and it never moves backwards.
    pub fn record(&mut self, report: &ProbeReport, now: Instant) -> Transition {
        let Some(entry) = self.entries.get_mut(report.worker.slot()) else {
            return Transition::Unknown;
        };
        entry.probe_in_flight = false;

        match report.outcome {
            ProbeOutcome::Ack => {
                entry.last_heartbeat_at = entry.last_heartbeat_at.max(now);
                let after_failures = core::mem::take(&mut entry.consecutive_failures);
                if after_failures == 0 {
                    Transition::Healthy
                } else {
                    Transition::Recovered { after_failures }
                }
            }
            ProbeOutcome::Failed { .. } | ProbeOutcome::TimedOut => {
                entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
                Transition::Failed {
                    consecutive: entry.consecutive_failures,
                }
            }
        }
    }

    /// Status of every worker as of `now`, in index order.
    pub fn snapshot(&self, now: Instant, timeout: Duration) -> Vec<WorkerStatus> {
        self.entries
            .iter()
            .enumerate()
            .map(|(slot, e)| WorkerStatus {
                index: WorkerIndex::new(slot as u32),
                last_heartbeat_at: e.last_heartbeat_at,
                consecutive_failures: e.consecutive_failures,
                live: now.saturating_duration_since(e.last_heartbeat_at) <= timeout,
            })
            .collect()
    }
}
