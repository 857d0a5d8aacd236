//! Arena business logic: profiles, leaderboard, matchmaking, match sessions.

pub mod leaderboard;
pub mod matchmaking;
pub mod profiles;
pub mod questions;
pub mod session;

pub use matchmaking::{JoinOutcome, QueueEntry};
pub use questions::{generate_questions, DEFAULT_QUESTIONS_PER_MATCH};
pub use session::Submission;
