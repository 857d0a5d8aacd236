//! Quiz arena web app: library with models, matchmaking, and match logic.

pub mod config;
pub mod logic;
pub mod models;
pub mod service;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use logic::{generate_questions, JoinOutcome, QueueEntry, Submission};
pub use models::{
    GameMatch, LeaderboardEntry, MatchId, MatchOutcome, MatchStatus, PlayerId, PlayerState, Profile,
    ProfileEdit, ProfileStats, ProfileUpdate, PublicProfile, Question, QuizError, Selection, SubmitOutcome, Winner,
};
pub use service::{acting_player, Housekeeping, QuizService};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use sync::{ClientSync, FeedItem, MatchPoll, SyncAction, SyncEvent, SyncHub, View};
