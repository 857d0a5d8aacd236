//! Change propagation between the arena and its clients.
//!
//! The server side is a broadcast channel of sequenced `SyncEvent`s
//! published after every write, with a bounded replay buffer so a client
//! that reconnects with its last cursor does not miss anything in between.
//! `ClientSync` is the client side: it decides which fetched match
//! snapshots to adopt and which view the client should show.

use crate::models::{GameMatch, MatchId, MatchStatus, PlayerId};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

/// Poll cadence while waiting for an opponent.
pub const LOBBY_POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Poll cadence while a match is on screen.
pub const GAME_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A change to shared state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Leaderboard {
        version: u64,
    },
    Match {
        match_id: MatchId,
        players: Vec<PlayerId>,
        status: MatchStatus,
        version: u64,
    },
    Queue {
        subject: String,
        lesson: String,
        waiting: usize,
    },
    /// The subscriber missed events; re-read everything.
    Resync,
}

impl SyncEvent {
    pub fn for_match(game: &GameMatch) -> Self {
        SyncEvent::Match {
            match_id: game.match_id,
            players: game.participants(),
            status: game.status,
            version: game.version,
        }
    }

    /// Whether a client playing as `player_id` needs to react.
    pub fn concerns(&self, player_id: PlayerId) -> bool {
        match self {
            SyncEvent::Match { players, .. } => players.contains(&player_id),
            SyncEvent::Leaderboard { .. } | SyncEvent::Queue { .. } | SyncEvent::Resync => true,
        }
    }
}

/// An event with its position in the feed. Sequence numbers start at 1.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FeedItem {
    pub seq: u64,
    #[serde(flatten)]
    pub event: SyncEvent,
}

#[derive(Debug)]
struct Backlog {
    last_seq: u64,
    recent: VecDeque<FeedItem>,
    capacity: usize,
}

impl Backlog {
    /// Items after `cursor` for `player_id`, or `Resync` if some of them
    /// have already been dropped.
    fn replay(&self, cursor: u64, player_id: PlayerId) -> Option<FeedItem> {
        let oldest = self.recent.front().map_or(self.last_seq + 1, |item| item.seq);
        if cursor > self.last_seq || cursor + 1 < oldest {
            return Some(FeedItem {
                seq: self.last_seq,
                event: SyncEvent::Resync,
            });
        }
        self.recent
            .iter()
            .find(|item| item.seq > cursor && item.event.concerns(player_id))
            .cloned()
    }
}

/// Fan-out of change events to any number of subscribers.
#[derive(Clone, Debug)]
pub struct SyncHub {
    tx: broadcast::Sender<FeedItem>,
    backlog: Arc<Mutex<Backlog>>,
}

impl SyncHub {
    /// `capacity` bounds both the channel and the replay buffer.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            backlog: Arc::new(Mutex::new(Backlog {
                last_seq: 0,
                recent: VecDeque::with_capacity(capacity),
                capacity,
            })),
        }
    }

    fn backlog(&self) -> std::sync::MutexGuard<'_, Backlog> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, event: SyncEvent) -> u64 {
        let mut backlog = self.backlog();
        backlog.last_seq += 1;
        let item = FeedItem {
            seq: backlog.last_seq,
            event,
        };
        log::debug!("Publishing {:?}", item);
        if backlog.recent.len() == backlog.capacity {
            backlog.recent.pop_front();
        }
        backlog.recent.push_back(item.clone());
        // No subscribers is fine: pollers will pick the change up.
        let _ = self.tx.send(item);
        backlog.last_seq
    }

    /// Sequence number of the newest event, 0 before the first.
    pub fn last_seq(&self) -> u64 {
        self.backlog().last_seq
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedItem> {
        self.tx.subscribe()
    }

    /// Wait up to `timeout` for the first event after `after` that concerns
    /// `player_id`. Without a cursor only events published from now on are
    /// returned. Buffered events are answered immediately; a cursor older
    /// than the buffer gets `Resync`.
    pub async fn next_for(&self, player_id: PlayerId, after: Option<u64>, timeout: Duration) -> Option<FeedItem> {
        let (mut rx, cursor) = {
            let backlog = self.backlog();
            let cursor = after.unwrap_or(backlog.last_seq);
            if let Some(item) = backlog.replay(cursor, player_id) {
                return Some(item);
            }
            // Subscribed under the lock: nothing can be published in between.
            (self.tx.subscribe(), cursor)
        };

        let deadline = Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Err(_) => return None,
                Ok(Ok(item)) if item.seq > cursor && item.event.concerns(player_id) => return Some(item),
                Ok(Ok(_)) => continue,
                Ok(Err(RecvError::Lagged(skipped))) => {
                    log::warn!("Subscriber for {} lagged by {} event(s)", player_id, skipped);
                    return Some(FeedItem {
                        seq: self.last_seq(),
                        event: SyncEvent::Resync,
                    });
                }
                Ok(Err(RecvError::Closed)) => return None,
            }
        }
    }
}

/// What polling a player's active match found.
#[derive(Clone, Debug)]
pub enum MatchPoll {
    Active(GameMatch),
    /// In a queue, waiting for an opponent.
    Waiting,
    /// Neither in a match nor in a queue (e.g. evicted as stale).
    NotQueued,
}

/// Which screen a client shows.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Register,
    Dashboard,
    Lobby,
    Game,
    Results,
}

/// What the client should do after observing a match snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncAction {
    /// Not ours, not newer, or already left behind.
    Ignore,
    /// Newer state adopted; view unchanged.
    Adopt,
    /// Switch to the game view.
    EnterGame,
    /// Switch to results and re-read own profile and the leaderboard.
    ShowResults,
    /// The queue entry lapsed while in the lobby; search again.
    Rejoin,
}

/// Client-side mirror of the active match and current view.
#[derive(Clone, Debug)]
pub struct ClientSync {
    player_id: PlayerId,
    view: View,
    current: Option<GameMatch>,
    /// Matches dismissed or replaced by a later one.
    retired: HashSet<MatchId>,
    leaderboard_version: u64,
}

impl ClientSync {
    /// Client for a registered player, starting on the dashboard.
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            view: View::Dashboard,
            current: None,
            retired: HashSet::new(),
            leaderboard_version: 0,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn current_match(&self) -> Option<&GameMatch> {
        self.current.as_ref()
    }

    /// How often to re-fetch the active match in the current view.
    pub fn poll_interval(&self) -> Option<Duration> {
        match self.view {
            View::Lobby => Some(LOBBY_POLL_INTERVAL),
            View::Game => Some(GAME_POLL_INTERVAL),
            View::Register | View::Dashboard | View::Results => None,
        }
    }

    /// Queued without an opponent yet.
    pub fn enter_lobby(&mut self) {
        self.view = View::Lobby;
    }

    /// Search cancelled or results dismissed.
    pub fn go_home(&mut self) {
        if let Some(game) = self.current.take() {
            self.retired.insert(game.match_id);
        }
        self.view = View::Dashboard;
    }

    /// Apply the result of polling the active match.
    pub fn observe_poll(&mut self, poll: MatchPoll) -> SyncAction {
        match poll {
            MatchPoll::Active(game) => self.observe_match(game),
            MatchPoll::Waiting => SyncAction::Ignore,
            MatchPoll::NotQueued if self.view == View::Lobby => SyncAction::Rejoin,
            MatchPoll::NotQueued => SyncAction::Ignore,
        }
    }

    /// Apply a fetched or pushed match snapshot.
    ///
    /// A snapshot is adopted only if this player is seated in it and it is
    /// either a strictly newer version of the held match or a match that
    /// started later and was never left behind.
    pub fn observe_match(&mut self, incoming: GameMatch) -> SyncAction {
        if !incoming.is_participant(self.player_id) || self.retired.contains(&incoming.match_id) {
            return SyncAction::Ignore;
        }
        if let Some(held) = &self.current {
            let stale = if held.match_id == incoming.match_id {
                incoming.version <= held.version
            } else {
                incoming.start_time < held.start_time
            };
            if stale {
                return SyncAction::Ignore;
            }
            if held.match_id != incoming.match_id {
                self.retired.insert(held.match_id);
            }
        }

        let status = incoming.status;
        self.current = Some(incoming);
        match status {
            MatchStatus::Starting | MatchStatus::Playing if self.view != View::Game => {
                self.view = View::Game;
                SyncAction::EnterGame
            }
            MatchStatus::Finished if self.view != View::Results => {
                self.view = View::Results;
                SyncAction::ShowResults
            }
            _ => SyncAction::Adopt,
        }
    }

    /// Returns true if `version` is newer than the last seen leaderboard.
    pub fn observe_leaderboard(&mut self, version: u64) -> bool {
        if version <= self.leaderboard_version {
            return false;
        }
        self.leaderboard_version = version;
        true
    }
}
