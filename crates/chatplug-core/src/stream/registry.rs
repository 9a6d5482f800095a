use super::model::{StreamState, StreamStatus};
use crate::config::DEFAULT_STREAM_GRACE_PERIOD_MS;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

struct StreamEntry {
    state: StreamState,
    /// Bumped on every (re)start so stale eviction timers can be recognized.
    generation: u64,
}

/// Tracks in-flight streaming messages.
///
/// Entries that reach a terminal status stay readable for a short grace
/// period and are then evicted by a spawned timer. Must be used from within
/// a tokio runtime.
pub struct StreamRegistry {
    streams: Arc<RwLock<HashMap<String, StreamEntry>>>,
    grace_period: Duration,
    next_generation: AtomicU64,
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_STREAM_GRACE_PERIOD_MS))
    }
}

impl StreamRegistry {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            streams: Arc::new(RwLock::new(HashMap::new())),
            grace_period,
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Registers a new active stream. An existing entry with the same id is replaced.
    pub async fn start_stream(
        &self,
        stream_id: &str,
        plugin_id: &str,
        instance_id: &str,
        message_id: Option<&str>,
    ) -> StreamState {
        let state = StreamState {
            stream_id: stream_id.to_string(),
            plugin_id: plugin_id.to_string(),
            instance_id: instance_id.to_string(),
            status: StreamStatus::Active,
            start_time: Utc::now(),
            message_id: message_id.map(str::to_string),
        };
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let mut streams = self.streams.write().await;
        streams.insert(
            stream_id.to_string(),
            StreamEntry {
                state: state.clone(),
                generation,
            },
        );
        tracing::debug!(
            "[StreamRegistry] Started stream {} for instance {}",
            stream_id,
            instance_id
        );
        state
    }

    /// Moves a stream to `status`.
    ///
    /// Returns `false` for an unknown stream or a transition outside the
    /// state machine. Entering a terminal status schedules eviction.
    pub async fn update_stream_status(&self, stream_id: &str, status: StreamStatus) -> bool {
        let generation = {
            let mut streams = self.streams.write().await;
            let Some(entry) = streams.get_mut(stream_id) else {
                tracing::debug!("[StreamRegistry] Unknown stream {}", stream_id);
                return false;
            };
            if !entry.state.status.can_transition_to(status) {
                tracing::warn!(
                    "[StreamRegistry] Rejected transition {:?} -> {:?} for stream {}",
                    entry.state.status,
                    status,
                    stream_id
                );
                return false;
            }
            entry.state.status = status;
            entry.generation
        };

        if status.is_terminal() {
            self.schedule_eviction(stream_id.to_string(), generation);
        }
        true
    }

    fn schedule_eviction(&self, stream_id: String, generation: u64) {
        let streams = Arc::clone(&self.streams);
        let grace_period = self.grace_period;
        tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            let mut streams = streams.write().await;
            if streams
                .get(&stream_id)
                .is_some_and(|entry| entry.generation == generation)
            {
                streams.remove(&stream_id);
                tracing::debug!("[StreamRegistry] Evicted stream {}", stream_id);
            }
        });
    }

    pub async fn end_stream(&self, stream_id: &str, status: StreamStatus) -> bool {
        self.update_stream_status(stream_id, status).await
    }

    pub async fn cancel_stream(&self, stream_id: &str) -> bool {
        self.update_stream_status(stream_id, StreamStatus::Cancelled)
            .await
    }

    pub async fn pause_stream(&self, stream_id: &str) -> bool {
        self.update_stream_status(stream_id, StreamStatus::Paused)
            .await
    }

    pub async fn resume_stream(&self, stream_id: &str) -> bool {
        self.update_stream_status(stream_id, StreamStatus::Active)
            .await
    }

    pub async fn get_stream_state(&self, stream_id: &str) -> Option<StreamState> {
        let streams = self.streams.read().await;
        streams.get(stream_id).map(|entry| entry.state.clone())
    }

    /// The first active stream of an instance, if any.
    pub async fn get_active_stream_by_instance(&self, instance_id: &str) -> Option<StreamState> {
        let streams = self.streams.read().await;
        streams
            .values()
            .map(|entry| &entry.state)
            .find(|state| state.instance_id == instance_id && state.status == StreamStatus::Active)
            .cloned()
    }

    pub async fn has_active_stream(&self, instance_id: &str) -> bool {
        self.get_active_stream_by_instance(instance_id)
            .await
            .is_some()
    }

    pub async fn all_active_streams(&self) -> Vec<StreamState> {
        let streams = self.streams.read().await;
        streams
            .values()
            .filter(|entry| entry.state.status == StreamStatus::Active)
            .map(|entry| entry.state.clone())
            .collect()
    }

    pub async fn clear_all_streams(&self) {
        self.streams.write().await.clear();
    }

    /// Drops every stream of an instance and returns how many were removed.
    pub async fn clear_instance_streams(&self, instance_id: &str) -> usize {
        let mut streams = self.streams.write().await;
        let before = streams.len();
        streams.retain(|_, entry| entry.state.instance_id != instance_id);
        before - streams.len()
    }
}
