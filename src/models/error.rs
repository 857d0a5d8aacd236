//! Errors returned by profile, matchmaking, and match operations.

use crate::models::profile::PlayerId;

#[derive(Debug)]
pub enum QuizError {
    /// Registration or rename with a blank name.
    EmptyName,
    PlayerNotFound(PlayerId),
    /// Subject/lesson pair is not in the catalog.
    UnknownLesson { subject: String, lesson: String },
    /// Player has no active match.
    NoActiveMatch(PlayerId),
    /// Player is not seated in the match they tried to act on.
    NotParticipant(PlayerId),
    /// Match is already finished; no more answers.
    MatchFinished,
    /// Request carries no registered player.
    NotSignedIn,
    /// Request tried to act as a player other than its own.
    NotOwner(PlayerId),
    /// The backing store could not be written.
    Storage(std::io::Error),
}

impl std::fmt::Display for QuizError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuizError::EmptyName => write!(f, "Name must not be empty"),
            QuizError::PlayerNotFound(id) => write!(f, "Player {} not found", id),
            QuizError::UnknownLesson { subject, lesson } => {
                write!(f, "Unknown lesson '{}' for subject '{}'", lesson, subject)
            }
            QuizError::NoActiveMatch(id) => write!(f, "Player {} has no active match", id),
            QuizError::NotParticipant(id) => write!(f, "Player {} is not in this match", id),
            QuizError::MatchFinished => write!(f, "Match is already finished"),
            QuizError::NotSignedIn => write!(f, "Not registered in this browser"),
            QuizError::NotOwner(id) => write!(f, "Not allowed to act as player {}", id),
            QuizError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for QuizError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuizError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for QuizError {
    fn from(e: std::io::Error) -> Self {
        QuizError::Storage(e)
    }
}
