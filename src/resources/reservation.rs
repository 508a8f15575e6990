// ABOUTME: Time-windowed resource reservations with priority-ordered conflict resolution
// ABOUTME: Greedy resolution shifts the losing window past the winner's expiry and never repacks

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

fn default_exclusive() -> bool {
    true
}

/// Resource a task needs while it runs, declared at task construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Resource category, e.g. "database" or "gpu".
    pub kind: String,
    /// Identifier within the category, e.g. "db_conn".
    pub id: String,
    #[serde(default = "default_exclusive")]
    pub exclusive: bool,
    /// How long the claim should last; the manager default applies when unset.
    #[serde(with = "humantime_serde", default)]
    pub duration: Option<Duration>,
}

impl ResourceRequest {
    pub fn exclusive(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            exclusive: true,
            duration: None,
        }
    }

    pub fn shared(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            exclusive: false,
            duration: None,
        }
    }
}

/// A claim on a resource for a time window.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceReservation {
    pub id: String,
    pub kind: String,
    pub resource_id: String,
    pub task_id: String,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub priority: u8,
    pub exclusive: bool,
    seq: u64,
}

impl ResourceReservation {
    fn window_overlaps(&self, other: &ResourceReservation) -> bool {
        self.reserved_at < other.expires_at && other.reserved_at < self.expires_at
    }

    fn conflicts_with(&self, other: &ResourceReservation) -> bool {
        self.exclusive
            && other.exclusive
            && self.kind == other.kind
            && self.resource_id == other.resource_id
            && self.window_overlaps(other)
    }
}

#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub task_id: String,
    pub kind: String,
    pub resource_id: String,
    /// Window start; now when unset.
    pub starts_at: Option<DateTime<Utc>>,
    /// Window length; the manager default when unset.
    pub duration: Option<Duration>,
    pub exclusive: bool,
    pub priority: u8,
}

impl ReservationRequest {
    pub fn new(
        task_id: impl Into<String>,
        kind: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            kind: kind.into(),
            resource_id: resource_id.into(),
            starts_at: None,
            duration: None,
            exclusive: true,
            priority: 3,
        }
    }

    pub fn starting_at(mut self, at: DateTime<Utc>) -> Self {
        self.starts_at = Some(at);
        self
    }

    pub fn lasting(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn shared(mut self) -> Self {
        self.exclusive = false;
        self
    }
}

/// Bookkeeper for advisory resource claims.
///
/// Conflicts (same kind and identifier, both exclusive, overlapping windows)
/// are resolved greedily: the lower-priority party is shifted to start at the
/// winner's expiry with the default duration; equal priority shifts the newer
/// claim behind the incumbent. Shifted windows only ever move later, so
/// resolution terminates and existing winners are never repacked.
pub struct ReservationManager {
    table: RwLock<Vec<ResourceReservation>>,
    default_duration: ChronoDuration,
    next_seq: AtomicU64,
}

impl ReservationManager {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Vec::new()),
            default_duration: ChronoDuration::hours(1),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration =
            ChronoDuration::from_std(duration).unwrap_or(self.default_duration);
        self
    }

    /// Claim a resource window. The returned reservation reflects any shift
    /// applied during conflict resolution; conflicts are never surfaced.
    pub async fn reserve(&self, request: ReservationRequest) -> ResourceReservation {
        let starts_at = request.starts_at.unwrap_or_else(Utc::now);
        let duration = request
            .duration
            .and_then(|d| ChronoDuration::from_std(d).ok())
            .unwrap_or(self.default_duration);

        let reservation = ResourceReservation {
            id: Uuid::new_v4().to_string(),
            kind: request.kind,
            resource_id: request.resource_id,
            task_id: request.task_id,
            reserved_at: starts_at,
            expires_at: starts_at + duration,
            priority: request.priority,
            exclusive: request.exclusive,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };

        let mut table = self.table.write().await;
        let reservation_id = reservation.id.clone();
        table.push(reservation);
        Self::resolve_conflicts(&mut table, self.default_duration);

        table
            .iter()
            .find(|r| r.id == reservation_id)
            .cloned()
            .expect("reservation was just inserted")
    }

    /// Drop every reservation held by a task, typically on completion.
    pub async fn release_task(&self, task_id: &str) {
        let mut table = self.table.write().await;
        table.retain(|r| r.task_id != task_id);
    }

    /// Drop reservations whose windows have fully elapsed.
    pub async fn prune_expired(&self) {
        let now = Utc::now();
        let mut table = self.table.write().await;
        table.retain(|r| r.expires_at > now);
    }

    pub async fn reservations_for(&self, kind: &str, resource_id: &str) -> Vec<ResourceReservation> {
        let table = self.table.read().await;
        table
            .iter()
            .filter(|r| r.kind == kind && r.resource_id == resource_id)
            .cloned()
            .collect()
    }

    pub async fn all(&self) -> Vec<ResourceReservation> {
        self.table.read().await.clone()
    }

    fn resolve_conflicts(table: &mut [ResourceReservation], default_duration: ChronoDuration) {
        while let Some((i, j)) = Self::first_conflict(table) {
            let loser = {
                let (a, b) = (&table[i], &table[j]);
                if a.priority == b.priority {
                    // FIFO: the newer claim yields to the incumbent
                    if a.seq > b.seq {
                        i
                    } else {
                        j
                    }
                } else if a.priority < b.priority {
                    i
                } else {
                    j
                }
            };
            let winner = if loser == i { j } else { i };

            let start = table[winner].expires_at;
            debug!(
                resource = %table[loser].resource_id,
                task = %table[loser].task_id,
                new_start = %start,
                "shifting conflicting reservation past higher-priority window"
            );
            table[loser].reserved_at = start;
            table[loser].expires_at = start + default_duration;
        }
    }

    fn first_conflict(table: &[ResourceReservation]) -> Option<(usize, usize)> {
        for i in 0..table.len() {
            for j in (i + 1)..table.len() {
                if table[i].conflicts_with(&table[j]) {
                    return Some((i, j));
                }
            }
        }
        None
    }
}

impl Default for ReservationManager {
    fn default() -> Self {
        Self::new()
    }
}
