//! GameMatch, PlayerState, and the per-question answer state machine.

use crate::models::profile::{MatchOutcome, PlayerId, PublicProfile};
use crate::models::subject::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Score added for each correct answer.
pub const POINTS_PER_CORRECT_ANSWER: u32 = 100;

/// Lifecycle of a match. Only `Finished` is terminal.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Waiting,
    /// Created by matchmaking; no answer submitted yet.
    Starting,
    Playing,
    Finished,
}

impl MatchStatus {
    /// `Starting` and `Playing` both take answers.
    pub fn accepts_answers(self) -> bool {
        matches!(self, MatchStatus::Starting | MatchStatus::Playing)
    }
}

/// Result of a finished match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Player(PlayerId),
    /// Scores were tied.
    Draw,
}

/// One participant inside a match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub score: u32,
    /// Cleared at the start of every round.
    pub current_answer: Option<String>,
}

impl PlayerState {
    pub fn new(profile: &PublicProfile) -> Self {
        Self {
            player_id: profile.player_id,
            name: profile.name.clone(),
            avatar: profile.avatar.clone(),
            score: 0,
            current_answer: None,
        }
    }

    /// An empty string does not count as an answer.
    pub fn has_answered(&self) -> bool {
        self.current_answer.as_deref().is_some_and(|a| !a.is_empty())
    }
}

/// Which player slot of a match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Slot {
    One,
    Two,
}

/// The two player slots. `p2` stays `None` until an opponent is seated.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchPlayers {
    pub p1: PlayerState,
    pub p2: Option<PlayerState>,
}

/// What `GameMatch::submit_answer` did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    /// Player is not seated in this match; nothing changed.
    NotParticipant,
    /// Player already answered this question; nothing changed.
    Ignored,
    /// Answer stored, waiting for the other player.
    Recorded,
    /// Both answered; scores applied and the next question is current.
    RoundResolved,
    /// Both answered the last question; match is finished.
    Finished,
}

impl SubmitOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, SubmitOutcome::NotParticipant | SubmitOutcome::Ignored)
    }
}

/// Shared record of one quiz game between two players.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameMatch {
    pub match_id: MatchId,
    pub status: MatchStatus,
    pub players: MatchPlayers,
    pub subject: String,
    pub lesson: String,
    pub current_question_index: usize,
    pub total_questions: usize,
    pub questions: Vec<Question>,
    /// Set once the match is finished.
    pub winner: Option<Winner>,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Incremented on every accepted change; clients compare versions, not clocks.
    pub version: u64,
    /// Profile points for this match have been handed out.
    #[serde(default)]
    pub points_awarded: bool,
}

impl GameMatch {
    /// New match in `Starting` with both players seated and scores at zero.
    pub fn new(
        p1: PlayerState,
        p2: PlayerState,
        subject: impl Into<String>,
        lesson: impl Into<String>,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            match_id: Uuid::new_v4(),
            status: MatchStatus::Starting,
            players: MatchPlayers { p1, p2: Some(p2) },
            subject: subject.into(),
            lesson: lesson.into(),
            current_question_index: 0,
            total_questions: questions.len(),
            questions,
            winner: None,
            start_time: now,
            last_updated: now,
            version: 1,
            points_awarded: false,
        }
    }

    pub fn slot_of(&self, player_id: PlayerId) -> Option<Slot> {
        if self.players.p1.player_id == player_id {
            Some(Slot::One)
        } else if self.players.p2.as_ref().is_some_and(|p| p.player_id == player_id) {
            Some(Slot::Two)
        } else {
            None
        }
    }

    pub fn is_participant(&self, player_id: PlayerId) -> bool {
        self.slot_of(player_id).is_some()
    }

    /// Seated player ids, p1 first.
    pub fn participants(&self) -> Vec<PlayerId> {
        std::iter::once(self.players.p1.player_id)
            .chain(self.players.p2.as_ref().map(|p| p.player_id))
            .collect()
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerState> {
        match self.slot_of(player_id)? {
            Slot::One => Some(&self.players.p1),
            Slot::Two => self.players.p2.as_ref(),
        }
    }

    fn player_mut(&mut self, slot: Slot) -> Option<&mut PlayerState> {
        match slot {
            Slot::One => Some(&mut self.players.p1),
            Slot::Two => self.players.p2.as_mut(),
        }
    }

    /// The other seated player, if any.
    pub fn opponent_of(&self, player_id: PlayerId) -> Option<&PlayerState> {
        match self.slot_of(player_id)? {
            Slot::One => self.players.p2.as_ref(),
            Slot::Two => Some(&self.players.p1),
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// Outcome for a participant once the match is finished.
    pub fn outcome_for(&self, player_id: PlayerId) -> Option<MatchOutcome> {
        if !self.is_participant(player_id) {
            return None;
        }
        match self.winner? {
            Winner::Draw => Some(MatchOutcome::Draw),
            Winner::Player(id) if id == player_id => Some(MatchOutcome::Win),
            Winner::Player(_) => Some(MatchOutcome::Loss),
        }
    }

    /// Record an answer for the current question.
    ///
    /// A second submission for the same question is ignored. Once both players
    /// have answered, each correct answer scores `POINTS_PER_CORRECT_ANSWER`;
    /// then either the next question becomes current (answers cleared) or the
    /// match finishes with a winner or a draw. Answers outside the choices are
    /// stored and score nothing.
    ///
    /// Does not check `status`: callers must not submit to a finished match.
    pub fn submit_answer(
        &mut self,
        player_id: PlayerId,
        answer: impl Into<String>,
        now: DateTime<Utc>,
    ) -> SubmitOutcome {
        let Some(slot) = self.slot_of(player_id) else {
            return SubmitOutcome::NotParticipant;
        };
        let Some(player) = self.player_mut(slot) else {
            return SubmitOutcome::NotParticipant;
        };
        if player.has_answered() {
            return SubmitOutcome::Ignored;
        }
        player.current_answer = Some(answer.into());

        if self.status == MatchStatus::Starting {
            self.status = MatchStatus::Playing;
        }

        let both_answered = self.players.p1.has_answered()
            && self.players.p2.as_ref().is_some_and(PlayerState::has_answered);
        let outcome = if both_answered {
            self.resolve_round()
        } else {
            SubmitOutcome::Recorded
        };
        self.touch(now);
        outcome
    }

    fn resolve_round(&mut self) -> SubmitOutcome {
        let correct = self.current_question().map(|q| q.correct_answer.clone());
        let p2 = self.players.p2.iter_mut();
        for p in std::iter::once(&mut self.players.p1).chain(p2) {
            if correct.is_some() && p.current_answer == correct {
                p.score += POINTS_PER_CORRECT_ANSWER;
            }
        }

        if self.current_question_index + 1 < self.total_questions {
            self.current_question_index += 1;
            self.players.p1.current_answer = None;
            if let Some(p2) = self.players.p2.as_mut() {
                p2.current_answer = None;
            }
            SubmitOutcome::RoundResolved
        } else {
            self.status = MatchStatus::Finished;
            self.winner = Some(self.decide_winner());
            SubmitOutcome::Finished
        }
    }

    fn decide_winner(&self) -> Winner {
        let p1 = &self.players.p1;
        let p2_score = self.players.p2.as_ref().map_or(0, |p| p.score);
        match p1.score.cmp(&p2_score) {
            std::cmp::Ordering::Greater => Winner::Player(p1.player_id),
            std::cmp::Ordering::Less => match &self.players.p2 {
                Some(p2) => Winner::Player(p2.player_id),
                None => Winner::Draw,
            },
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }

    /// Mark a change: refresh `last_updated` and bump `version`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now;
        self.version += 1;
    }
}
