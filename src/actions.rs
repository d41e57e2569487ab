//! Time-boxed collective actions: reaction-voting windows and one-shot timers.
//!
//! A window attaches a fixed, ordered set of reaction symbols to a message and
//! collects choices until its deadline, then finalizes exactly once. The
//! in-memory side lives in an [`ActionRegistry`] owned by the process-lifetime
//! `Data`; the persisted side goes through a [`VoteSink`]. Open windows do not
//! survive a restart, their already-written rows do.

use crate::clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::futures_util::StreamExt;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

/// Identity of one open action, keyed in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    Poll(i64),
    MeetingRsvp(i64),
    MeetingReminder(i64),
}

/// Persistence half of a reaction window. `record` upserts one choice per
/// user; `finalize` runs exactly once at the deadline and must read the tally
/// back from storage rather than from the visible reactions.
#[async_trait]
pub trait VoteSink: Send + Sync + 'static {
    async fn record(&self, user_id: u64, option_index: usize) -> anyhow::Result<()>;
    async fn finalize(
        &self,
        ctx: &serenity::Context,
        message: &mut serenity::Message,
    ) -> anyhow::Result<()>;
}

/// Live set of open windows and timers, keyed by action id. Cancelling an
/// action aborts its task; no finalization runs for an aborted window.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    inner: Arc<Mutex<HashMap<ActionId, AbortHandle>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a reaction window on `message`: seeds one reaction per symbol in
    /// declared order, collects until `deadline`, then finalizes and clears
    /// the reactions.
    pub fn spawn_window(
        &self,
        sctx: serenity::Context,
        bot_id: u64,
        message: serenity::Message,
        id: ActionId,
        emojis: Vec<String>,
        deadline: DateTime<Utc>,
        sink: Arc<dyn VoteSink>,
    ) {
        let registry = self.clone();
        // The task deregisters itself through the same lock, so holding it
        // across the spawn keeps the insert ordered before the removal.
        let mut open = self.inner.lock().unwrap();
        let handle = tokio::spawn(async move {
            run_window(sctx, bot_id, message, id, emojis, deadline, sink).await;
            registry.remove(id);
        });
        if let Some(previous) = open.insert(id, handle.abort_handle()) {
            warn!("Action {:?} was already open, aborting the old task", id);
            previous.abort();
        }
    }

    /// Runs `task` once after `delay`. Errors are logged, never surfaced.
    pub fn spawn_timer<F>(&self, id: ActionId, delay: std::time::Duration, task: F)
    where
        F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let registry = self.clone();
        let mut open = self.inner.lock().unwrap();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = task.await {
                error!("Timed action {:?} failed: {}", id, e);
            }
            registry.remove(id);
        });
        if let Some(previous) = open.insert(id, handle.abort_handle()) {
            warn!("Action {:?} was already open, aborting the old task", id);
            previous.abort();
        }
    }

    pub fn cancel(&self, id: ActionId) -> bool {
        let handle = self.inner.lock().unwrap().remove(&id);
        match handle {
            Some(handle) => {
                handle.abort();
                debug!("Cancelled action {:?}", id);
                true
            }
            None => false,
        }
    }

    pub fn open_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    fn remove(&self, id: ActionId) {
        self.inner.lock().unwrap().remove(&id);
    }
}

async fn run_window(
    sctx: serenity::Context,
    bot_id: u64,
    mut message: serenity::Message,
    id: ActionId,
    emojis: Vec<String>,
    deadline: DateTime<Utc>,
    sink: Arc<dyn VoteSink>,
) {
    for emoji in &emojis {
        if let Err(e) = message
            .react(&sctx, serenity::ReactionType::Unicode(emoji.clone()))
            .await
        {
            error!("Failed to seed reaction {} on {:?}: {}", emoji, id, e);
        }
    }

    // The deadline is fixed at creation; the stream simply ends when it hits.
    let window = clock::delay_until(deadline, Utc::now());
    let mut last_choice: HashMap<u64, usize> = HashMap::new();
    let mut stream = serenity::ReactionCollector::new(&sctx)
        .message_id(message.id)
        .timeout(window)
        .stream();

    while let Some(reaction) = stream.next().await {
        let Some(user_id) = reaction.user_id else {
            continue;
        };
        if user_id.get() == bot_id || reaction.member.as_ref().is_some_and(|m| m.user.bot) {
            continue;
        }
        let Some(index) = emojis.iter().position(|e| reaction.emoji.unicode_eq(e)) else {
            continue;
        };

        // Keep the visible reactions consistent with the stored choice: drop
        // the user's previous, different selection before recording.
        if let Some(previous) = last_choice.insert(user_id.get(), index) {
            if previous != index {
                if let Err(e) = message
                    .channel_id
                    .delete_reaction(
                        &sctx.http,
                        message.id,
                        Some(user_id),
                        serenity::ReactionType::Unicode(emojis[previous].clone()),
                    )
                    .await
                {
                    warn!(
                        "Failed to remove previous reaction of {} on {:?}: {}",
                        user_id, id, e
                    );
                }
            }
        }

        if let Err(e) = sink.record(user_id.get(), index).await {
            error!("Failed to record choice of {} on {:?}: {}", user_id, id, e);
        }
    }
    drop(stream);

    if let Err(e) = sink.finalize(&sctx, &mut message).await {
        error!("Failed to finalize {:?}: {}", id, e);
    }
    if let Err(e) = message.delete_reactions(&sctx).await {
        warn!("Failed to clear reactions on {:?}: {}", id, e);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionResult {
    pub label: String,
    pub votes: u64,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallySummary {
    pub results: Vec<OptionResult>,
    /// Index of the winning option; ties go to the first-declared option.
    pub winner: usize,
    pub total: u64,
}

/// Turns per-option vote counts into percentages and a winner. A zero total
/// renders every option as 0% instead of dividing by zero.
pub fn summarize(labels: &[String], votes: &[u64]) -> TallySummary {
    debug_assert_eq!(labels.len(), votes.len());
    let total: u64 = votes.iter().sum();

    let results = labels
        .iter()
        .zip(votes)
        .map(|(label, &count)| OptionResult {
            label: label.clone(),
            votes: count,
            percent: if total == 0 {
                0
            } else {
                ((count * 100) as f64 / total as f64).round() as u32
            },
        })
        .collect();

    let mut winner = 0;
    for (index, &count) in votes.iter().enumerate() {
        if count > votes[winner] {
            winner = index;
        }
    }

    TallySummary {
        results,
        winner,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_summarize_zero_votes() {
        let summary = summarize(&labels(&["A", "B", "C"]), &[0, 0, 0]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.winner, 0);
        assert!(summary.results.iter().all(|r| r.percent == 0));
    }

    #[test]
    fn test_summarize_percentages_and_winner() {
        let summary = summarize(&labels(&["A", "B", "C"]), &[1, 2, 0]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.winner, 1);
        assert_eq!(summary.results[0].percent, 33);
        assert_eq!(summary.results[1].percent, 67);
        assert_eq!(summary.results[2].percent, 0);
    }

    #[test]
    fn test_summarize_tie_goes_to_first_declared() {
        let summary = summarize(&labels(&["A", "B", "C"]), &[2, 2, 1]);
        assert_eq!(summary.winner, 0);

        let summary = summarize(&labels(&["A", "B"]), &[0, 0]);
        assert_eq!(summary.winner, 0);
    }

    #[tokio::test]
    async fn test_registry_cancel() {
        let registry = ActionRegistry::new();
        registry.spawn_timer(
            ActionId::MeetingReminder(1),
            std::time::Duration::from_secs(3600),
            async { Ok(()) },
        );
        assert_eq!(registry.open_count(), 1);
        assert!(registry.cancel(ActionId::MeetingReminder(1)));
        assert_eq!(registry.open_count(), 0);
        // Cancelling twice is a no-op
        assert!(!registry.cancel(ActionId::MeetingReminder(1)));
    }

    #[tokio::test]
    async fn test_timer_runs_and_unregisters() {
        let registry = ActionRegistry::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        registry.spawn_timer(
            ActionId::MeetingReminder(2),
            std::time::Duration::from_millis(5),
            async move {
                let _ = tx.send(());
                Ok(())
            },
        );
        rx.await.expect("timer task should fire");
        // Give the task a beat to deregister itself
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(registry.open_count(), 0);
    }
}
