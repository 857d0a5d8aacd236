//! QuizService: the single owner of arena state.
//!
//! Every operation is a read-modify-write on the store performed while the
//! caller holds exclusive access to the service, so queue pops and point
//! awards cannot race. Each write publishes a `SyncEvent`.

use crate::config::Config;
use crate::logic::{self, leaderboard, matchmaking, profiles, session, JoinOutcome, Submission};
use crate::models::{
    GameMatch, LeaderboardEntry, PlayerId, Profile, ProfileUpdate, QuizError, Selection,
};
use crate::storage::{keys, read_json, write_json, KeyValueStore};
use crate::sync::{MatchPoll, SyncEvent, SyncHub};
use chrono::{DateTime, Utc};

/// Counts from one housekeeping sweep.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Housekeeping {
    pub evicted_buckets: usize,
    pub purged_matches: usize,
}

/// The player a request may act as: the one remembered for the caller, who
/// must also be the one the request names.
pub fn acting_player(signed_in: Option<PlayerId>, requested: PlayerId) -> Result<PlayerId, QuizError> {
    match signed_in {
        None => Err(QuizError::NotSignedIn),
        Some(id) if id == requested => Ok(id),
        Some(_) => Err(QuizError::NotOwner(requested)),
    }
}

pub struct QuizService {
    store: Box<dyn KeyValueStore>,
    hub: SyncHub,
    config: Config,
}

impl QuizService {
    pub fn new(store: Box<dyn KeyValueStore>, hub: SyncHub, config: Config) -> Self {
        Self { store, hub, config }
    }

    pub fn hub(&self) -> &SyncHub {
        &self.hub
    }

    fn publish_leaderboard(&self, version: u64) {
        self.hub.publish(SyncEvent::Leaderboard { version });
    }

    fn publish_queue(&self, subject: &str, lesson: &str) {
        let waiting = matchmaking::waiting(&*self.store, subject, lesson).len();
        self.hub.publish(SyncEvent::Queue {
            subject: subject.to_string(),
            lesson: lesson.to_string(),
            waiting,
        });
    }

    pub fn register(&mut self, name: &str, avatar: &str) -> Result<Profile, QuizError> {
        let profile = profiles::register(&mut *self.store, name, avatar)?;
        self.publish_leaderboard(leaderboard::version(&*self.store));
        Ok(profile)
    }

    pub fn profile(&self, player_id: PlayerId) -> Option<Profile> {
        profiles::get(&*self.store, player_id)
    }

    fn require_profile(&self, player_id: PlayerId) -> Result<Profile, QuizError> {
        self.profile(player_id).ok_or(QuizError::PlayerNotFound(player_id))
    }

    pub fn update_profile(&mut self, player_id: PlayerId, changes: ProfileUpdate) -> Result<Profile, QuizError> {
        let profile = profiles::update(&mut *self.store, player_id, changes)?;
        self.publish_leaderboard(leaderboard::version(&*self.store));
        Ok(profile)
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        leaderboard::list(&*self.store)
    }

    pub fn leaderboard_version(&self) -> u64 {
        leaderboard::version(&*self.store)
    }

    pub fn leaderboard_csv(&self) -> Result<String, csv::Error> {
        leaderboard::to_csv(&self.leaderboard())
    }

    pub fn selection(&self, player_id: PlayerId) -> Option<Selection> {
        read_json(&*self.store, &keys::selection(player_id))
    }

    pub fn save_selection(&mut self, player_id: PlayerId, selection: &Selection) -> Result<(), QuizError> {
        write_json(&mut *self.store, &keys::selection(player_id), selection)?;
        Ok(())
    }

    /// Look for an opponent in the (subject, lesson) bucket.
    ///
    /// Drops the player's previous active match and any earlier queue entry,
    /// and remembers the selection. Either pairs them immediately or leaves
    /// them waiting.
    pub fn find_match(
        &mut self,
        player_id: PlayerId,
        subject: &str,
        lesson: &str,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, QuizError> {
        let profile = self.require_profile(player_id)?;
        session::clear(&mut *self.store, player_id)?;
        self.cancel_search(player_id)?;
        self.save_selection(
            player_id,
            &Selection {
                subject: subject.to_string(),
                lesson: lesson.to_string(),
            },
        )?;

        let count = self.config.questions_per_match;
        let outcome = matchmaking::join(
            &mut *self.store,
            subject,
            lesson,
            &profile,
            now,
            self.config.queue_stale_after,
            || logic::generate_questions(subject, lesson, count, now, &mut rand::thread_rng()),
        )?;
        if let JoinOutcome::Matched(game) = &outcome {
            self.hub.publish(SyncEvent::for_match(game));
        }
        self.publish_queue(subject, lesson);
        Ok(outcome)
    }

    /// Leave whatever bucket the player last selected.
    pub fn cancel_search(&mut self, player_id: PlayerId) -> Result<bool, QuizError> {
        let Some(sel) = self.selection(player_id) else {
            return Ok(false);
        };
        let left = matchmaking::leave(&mut *self.store, &sel.subject, &sel.lesson, player_id)?;
        if left {
            log::info!("Player {} left {}/{}", player_id, sel.subject, sel.lesson);
            self.publish_queue(&sel.subject, &sel.lesson);
        }
        Ok(left)
    }

    /// The player's active match, or whether they are still queued. A
    /// waiting player is marked as present so their entry does not go
    /// stale; one whose entry was already evicted gets `NotQueued`.
    pub fn active_match(&mut self, player_id: PlayerId, now: DateTime<Utc>) -> Result<MatchPoll, QuizError> {
        if let Some(game) = session::active(&*self.store, player_id) {
            return Ok(MatchPoll::Active(game));
        }
        let Some(sel) = self.selection(player_id) else {
            return Ok(MatchPoll::NotQueued);
        };
        if matchmaking::heartbeat(&mut *self.store, &sel.subject, &sel.lesson, player_id, now)? {
            Ok(MatchPoll::Waiting)
        } else {
            Ok(MatchPoll::NotQueued)
        }
    }

    pub fn submit_answer(
        &mut self,
        player_id: PlayerId,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Result<Submission, QuizError> {
        let submission = session::submit(&mut *self.store, player_id, answer, now)?;
        if submission.outcome.changed() {
            self.hub.publish(SyncEvent::for_match(&submission.game));
        }
        if let Some(version) = submission.leaderboard_version {
            self.publish_leaderboard(version);
        }
        Ok(submission)
    }

    /// Leave the results (or an abandoned game) and return to the dashboard.
    pub fn return_home(&mut self, player_id: PlayerId) -> Result<bool, QuizError> {
        session::clear(&mut *self.store, player_id)
    }

    /// Evict stale queue entries and expired matches.
    pub fn housekeeping(&mut self, now: DateTime<Utc>) -> Result<Housekeeping, QuizError> {
        let changed = matchmaking::evict_stale(&mut *self.store, now, self.config.queue_stale_after)?;
        for (subject, lesson, waiting) in &changed {
            self.hub.publish(SyncEvent::Queue {
                subject: subject.clone(),
                lesson: lesson.clone(),
                waiting: *waiting,
            });
        }
        let purged = session::purge_expired(&mut *self.store, now, self.config.match_ttl)?;
        Ok(Housekeeping {
            evicted_buckets: changed.len(),
            purged_matches: purged,
        })
    }
}
