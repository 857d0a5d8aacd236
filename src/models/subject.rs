//! Subject/lesson catalog, avatars, and the Question type.

use serde::{Deserialize, Serialize};

/// A subject and the lessons players can queue for.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
    pub lessons: &'static [&'static str],
}

pub const SUBJECTS: &[Subject] = &[
    Subject {
        id: "math",
        name: "Mathematics",
        lessons: &["Algebra Basics", "Geometry", "Mental Math"],
    },
    Subject {
        id: "science",
        name: "Science",
        lessons: &["Physics 101", "Chemistry", "Biology"],
    },
    Subject {
        id: "history",
        name: "History",
        lessons: &["Ancient Rome", "World War II", "Cold War"],
    },
];

pub const AVATARS: &[&str] = &[
    "🤖", "👽", "🦊", "🐯", "🦁", "🐸", "🐙", "🦄", "🐲", "🧙",
];

/// Shown for an opponent missing from the public directory.
pub const PLACEHOLDER_NAME: &str = "Player 2";
pub const PLACEHOLDER_AVATAR: &str = "👤";

pub fn find_subject(id: &str) -> Option<&'static Subject> {
    SUBJECTS.iter().find(|s| s.id == id)
}

/// True if `lesson` belongs to subject `subject`.
pub fn is_known_lesson(subject: &str, lesson: &str) -> bool {
    find_subject(subject).is_some_and(|s| s.lessons.contains(&lesson))
}

/// A multiple-choice question. Immutable once generated.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    /// Four choices in shuffled order; one equals `correct_answer`.
    pub choices: Vec<String>,
    pub correct_answer: String,
}

/// A player's remembered subject/lesson choice.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub subject: String,
    pub lesson: String,
}
