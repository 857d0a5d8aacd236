//! Matchmaking: FIFO waiting list per (subject, lesson) bucket.
//!
//! A joiner is paired with the head of the bucket if anyone is waiting,
//! otherwise appended to it. Entries that have not been refreshed for the
//! stale window are dropped, and a waiting player can leave explicitly.

use crate::logic::{profiles, session};
use crate::models::{
    is_known_lesson, GameMatch, PlayerId, PlayerState, Profile, PublicProfile, Question, QuizError,
    PLACEHOLDER_AVATAR, PLACEHOLDER_NAME,
};
use crate::storage::{keys, read_json, write_json, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A player waiting in a bucket.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub player_id: PlayerId,
    pub joined_at: DateTime<Utc>,
    /// Refreshed by `heartbeat` while the player waits.
    pub last_seen: DateTime<Utc>,
}

impl QueueEntry {
    fn is_stale(&self, now: DateTime<Utc>, max_idle: Duration) -> bool {
        (now - self.last_seen).to_std().unwrap_or_default() > max_idle
    }
}

/// Result of joining a bucket.
#[derive(Clone, Debug)]
pub enum JoinOutcome {
    /// Paired with the longest-waiting player.
    Matched(GameMatch),
    /// Nobody was waiting; 1-based position in the bucket.
    Queued { position: usize },
}

/// Players currently waiting in a bucket, head first.
pub fn waiting(store: &dyn KeyValueStore, subject: &str, lesson: &str) -> Vec<QueueEntry> {
    read_json(store, &keys::queue(subject, lesson)).unwrap_or_default()
}

fn save_bucket(
    store: &mut dyn KeyValueStore,
    subject: &str,
    lesson: &str,
    entries: &[QueueEntry],
) -> Result<(), QuizError> {
    write_json(store, &keys::queue(subject, lesson), &entries)?;
    Ok(())
}

/// Join the bucket for (subject, lesson).
///
/// Rejoining is idempotent: the player's own entry is removed first.
/// `questions` is only called when a match is created.
pub fn join(
    store: &mut dyn KeyValueStore,
    subject: &str,
    lesson: &str,
    player: &Profile,
    now: DateTime<Utc>,
    max_idle: Duration,
    questions: impl FnOnce() -> Vec<Question>,
) -> Result<JoinOutcome, QuizError> {
    if !is_known_lesson(subject, lesson) {
        return Err(QuizError::UnknownLesson {
            subject: subject.to_string(),
            lesson: lesson.to_string(),
        });
    }

    let mut bucket = waiting(store, subject, lesson);
    bucket.retain(|e| e.player_id != player.player_id);
    let before = bucket.len();
    bucket.retain(|e| !e.is_stale(now, max_idle));
    if bucket.len() < before {
        log::info!(
            "Dropped {} stale entr(ies) from {}/{}",
            before - bucket.len(),
            subject,
            lesson
        );
    }

    if bucket.is_empty() {
        bucket.push(QueueEntry {
            player_id: player.player_id,
            joined_at: now,
            last_seen: now,
        });
        save_bucket(store, subject, lesson, &bucket)?;
        log::info!("Player {} waiting in {}/{}", player.player_id, subject, lesson);
        return Ok(JoinOutcome::Queued { position: bucket.len() });
    }

    let opponent = bucket.remove(0);
    save_bucket(store, subject, lesson, &bucket)?;

    let opponent_profile = profiles::lookup_public(store, opponent.player_id).unwrap_or_else(|| {
        PublicProfile {
            player_id: opponent.player_id,
            name: PLACEHOLDER_NAME.to_string(),
            avatar: PLACEHOLDER_AVATAR.to_string(),
        }
    });
    let game = GameMatch::new(
        PlayerState::new(&opponent_profile),
        PlayerState::new(&player.public()),
        subject,
        lesson,
        questions(),
        now,
    );
    session::save(store, &game)?;
    session::set_active(store, opponent.player_id, &game)?;
    session::set_active(store, player.player_id, &game)?;
    log::info!(
        "Matched {} vs {} in {}/{} (match {})",
        opponent.player_id,
        player.player_id,
        subject,
        lesson,
        game.match_id
    );
    Ok(JoinOutcome::Matched(game))
}

/// Remove a player from a bucket. Returns whether they were waiting there.
pub fn leave(
    store: &mut dyn KeyValueStore,
    subject: &str,
    lesson: &str,
    player_id: PlayerId,
) -> Result<bool, QuizError> {
    let mut bucket = waiting(store, subject, lesson);
    let before = bucket.len();
    bucket.retain(|e| e.player_id != player_id);
    if bucket.len() == before {
        return Ok(false);
    }
    save_bucket(store, subject, lesson, &bucket)?;
    Ok(true)
}

/// Mark a waiting player as still present. Returns false if not waiting.
pub fn heartbeat(
    store: &mut dyn KeyValueStore,
    subject: &str,
    lesson: &str,
    player_id: PlayerId,
    now: DateTime<Utc>,
) -> Result<bool, QuizError> {
    let mut bucket = waiting(store, subject, lesson);
    let Some(entry) = bucket.iter_mut().find(|e| e.player_id == player_id) else {
        return Ok(false);
    };
    entry.last_seen = now;
    save_bucket(store, subject, lesson, &bucket)?;
    Ok(true)
}

/// Drop stale entries from every bucket. Returns the buckets that changed
/// with their new sizes.
pub fn evict_stale(
    store: &mut dyn KeyValueStore,
    now: DateTime<Utc>,
    max_idle: Duration,
) -> Result<Vec<(String, String, usize)>, QuizError> {
    let mut changed = Vec::new();
    for key in store.keys_with_prefix(keys::QUEUE_PREFIX) {
        let Some((subject, lesson)) = keys::parse_queue(&key) else {
            continue;
        };
        let (subject, lesson) = (subject.to_string(), lesson.to_string());
        let mut bucket = waiting(store, &subject, &lesson);
        let before = bucket.len();
        bucket.retain(|e| !e.is_stale(now, max_idle));
        if bucket.len() < before {
            log::info!(
                "Evicted {} stale entr(ies) from {}/{}",
                before - bucket.len(),
                subject,
                lesson
            );
            save_bucket(store, &subject, &lesson, &bucket)?;
            let remaining = bucket.len();
            changed.push((subject, lesson, remaining));
        }
    }
    Ok(changed)
}
