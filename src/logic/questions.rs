//! Question generation for a (subject, lesson) pair.

use crate::models::{find_subject, Question};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

/// Questions per match unless configured otherwise.
pub const DEFAULT_QUESTIONS_PER_MATCH: usize = 5;

/// Generate `count` placeholder questions with four shuffled choices each.
pub fn generate_questions<R: Rng + ?Sized>(
    subject: &str,
    lesson: &str,
    count: usize,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<Question> {
    let subject_name = find_subject(subject).map_or(subject, |s| s.name);
    let stamp = now.timestamp_millis();
    (1..=count)
        .map(|i| {
            let correct = format!("Correct Answer {i}");
            let mut choices = vec![
                correct.clone(),
                "Wrong Answer A".to_string(),
                "Wrong Answer B".to_string(),
                "Wrong Answer C".to_string(),
            ];
            choices.shuffle(rng);
            Question {
                id: format!("q-{stamp}-{i}"),
                text: format!("Question {i} about {lesson} ({subject_name})"),
                choices,
                correct_answer: correct,
            }
        })
        .collect()
}
