//! Match session: active-match slots, guarded answer submission, and the
//! one-time point award when a match finishes.

use crate::logic::{leaderboard, profiles};
use crate::models::{GameMatch, MatchId, MatchStatus, PlayerId, QuizError, SubmitOutcome};
use crate::storage::{keys, read_json, write_json, KeyValueStore};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of `submit`.
#[derive(Clone, Debug)]
pub struct Submission {
    pub game: GameMatch,
    pub outcome: SubmitOutcome,
    /// Set when finishing the match changed the leaderboard.
    pub leaderboard_version: Option<u64>,
}

pub fn load(store: &dyn KeyValueStore, match_id: MatchId) -> Option<GameMatch> {
    read_json(store, &keys::match_record(match_id))
}

pub fn save(store: &mut dyn KeyValueStore, game: &GameMatch) -> Result<(), QuizError> {
    write_json(store, &keys::match_record(game.match_id), game)?;
    Ok(())
}

/// Make `game` the player's active match, replacing any previous one.
pub fn set_active(store: &mut dyn KeyValueStore, player_id: PlayerId, game: &GameMatch) -> Result<(), QuizError> {
    write_json(store, &keys::active_match(player_id), &game.match_id)?;
    Ok(())
}

/// The player's active match, if any.
pub fn active(store: &dyn KeyValueStore, player_id: PlayerId) -> Option<GameMatch> {
    let match_id: MatchId = read_json(store, &keys::active_match(player_id))?;
    load(store, match_id)
}

/// Forget the player's active match (returning home). The record stays for
/// the opponent until it expires.
pub fn clear(store: &mut dyn KeyValueStore, player_id: PlayerId) -> Result<bool, QuizError> {
    let key = keys::active_match(player_id);
    if store.get(&key).is_none() {
        return Ok(false);
    }
    store.remove(&key)?;
    Ok(true)
}

/// Submit an answer to the player's active match.
///
/// When this answer finishes the match, both participants' profiles are
/// credited before the match is stored, at most once per match.
pub fn submit(
    store: &mut dyn KeyValueStore,
    player_id: PlayerId,
    answer: &str,
    now: DateTime<Utc>,
) -> Result<Submission, QuizError> {
    let mut game = active(store, player_id).ok_or(QuizError::NoActiveMatch(player_id))?;
    if !game.is_participant(player_id) {
        return Err(QuizError::NotParticipant(player_id));
    }
    if !game.status.accepts_answers() {
        return Err(QuizError::MatchFinished);
    }

    let outcome = game.submit_answer(player_id, answer, now);
    if !outcome.changed() {
        return Ok(Submission {
            game,
            outcome,
            leaderboard_version: None,
        });
    }

    let leaderboard_version = if outcome == SubmitOutcome::Finished {
        award_points(store, &mut game)?
    } else {
        None
    };
    save(store, &game)?;
    Ok(Submission {
        game,
        outcome,
        leaderboard_version,
    })
}

/// Credit win/draw/loss points to both participants of a finished match.
/// No-op if already done. Returns the last leaderboard version written.
pub fn award_points(store: &mut dyn KeyValueStore, game: &mut GameMatch) -> Result<Option<u64>, QuizError> {
    if game.status != MatchStatus::Finished || game.points_awarded {
        return Ok(None);
    }
    for player_id in game.participants() {
        let Some(outcome) = game.outcome_for(player_id) else {
            continue;
        };
        let Some(mut profile) = profiles::get(store, player_id) else {
            log::warn!("No profile for player {}; skipping award", player_id);
            continue;
        };
        profile.record_outcome(outcome);
        profiles::save(store, &profile)?;
        log::info!(
            "Player {} {:?} in match {}: now {} pts (level {})",
            player_id,
            outcome,
            game.match_id,
            profile.points,
            profile.level
        );
    }
    game.points_awarded = true;
    Ok(Some(leaderboard::version(store)))
}

/// Delete matches idle for longer than `ttl` and any active slots that
/// point at them. Returns how many matches were removed.
pub fn purge_expired(store: &mut dyn KeyValueStore, now: DateTime<Utc>, ttl: Duration) -> Result<usize, QuizError> {
    let mut removed = Vec::new();
    for key in store.keys_with_prefix(keys::MATCH_PREFIX) {
        let expired = match read_json::<GameMatch>(store, &key) {
            Some(game) => (now - game.last_updated).to_std().unwrap_or_default() > ttl,
            None => true,
        };
        if expired {
            store.remove(&key)?;
            removed.push(key);
        }
    }
    if removed.is_empty() {
        return Ok(0);
    }

    for slot in store.keys_with_prefix(keys::ACTIVE_MATCH_PREFIX) {
        let dangling = match read_json::<MatchId>(store, &slot) {
            Some(id) => removed.contains(&keys::match_record(id)),
            None => true,
        };
        if dangling {
            store.remove(&slot)?;
        }
    }
    Ok(removed.len())
}
