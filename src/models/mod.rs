//! Data structures for the quiz arena: profiles, matches, questions, catalog.

mod error;
mod game;
mod profile;
mod subject;

pub use error::QuizError;
pub use game::{
    GameMatch, MatchId, MatchPlayers, MatchStatus, PlayerState, Slot, SubmitOutcome, Winner,
    POINTS_PER_CORRECT_ANSWER,
};
pub use profile::{
    level_for_points, LeaderboardEntry, MatchOutcome, PlayerId, Profile, ProfileEdit, ProfileStats,
    ProfileUpdate, PublicProfile, POINTS_PER_LEVEL,
};
pub use subject::{
    find_subject, is_known_lesson, Question, Selection, Subject, AVATARS, PLACEHOLDER_AVATAR,
    PLACEHOLDER_NAME, SUBJECTS,
};
