//! Profile, ProfileStats, and the projections other players see.

use serde::{Deserialize, Serialize};

/// Unique identifier for a player, assigned sequentially at registration.
pub type PlayerId = u64;

/// Points needed per level.
pub const POINTS_PER_LEVEL: u32 = 100;

/// Level for a point total: one level per 100 points, starting at 1.
pub fn level_for_points(points: u32) -> u32 {
    points / POINTS_PER_LEVEL + 1
}

/// Win/loss counters of a profile.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub wins: u32,
    pub losses: u32,
    pub games_played: u32,
}

/// How a finished match ended for one participant.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Win,
    Draw,
    Loss,
}

impl MatchOutcome {
    /// Profile points awarded for this outcome.
    pub fn award(self) -> u32 {
        match self {
            MatchOutcome::Win => 50,
            MatchOutcome::Draw => 10,
            MatchOutcome::Loss => 5,
        }
    }
}

/// A registered player.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub player_id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub points: u32,
    /// Always `level_for_points(points)`.
    pub level: u32,
    pub stats: ProfileStats,
}

impl Profile {
    /// Fresh profile: zero points, level 1, no games.
    pub fn new(player_id: PlayerId, name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            player_id,
            name: name.into(),
            avatar: avatar.into(),
            points: 0,
            level: level_for_points(0),
            stats: ProfileStats::default(),
        }
    }

    /// Set points and recompute the level.
    pub fn set_points(&mut self, points: u32) {
        self.points = points;
        self.level = level_for_points(points);
    }

    /// Apply the award and counters for a finished match.
    pub fn record_outcome(&mut self, outcome: MatchOutcome) {
        self.set_points(self.points.saturating_add(outcome.award()));
        self.stats.games_played += 1;
        match outcome {
            MatchOutcome::Win => self.stats.wins += 1,
            MatchOutcome::Loss => self.stats.losses += 1,
            MatchOutcome::Draw => {}
        }
    }

    pub fn public(&self) -> PublicProfile {
        PublicProfile {
            player_id: self.player_id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }

    pub fn leaderboard_entry(&self) -> LeaderboardEntry {
        LeaderboardEntry {
            player_id: self.player_id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            points: self.points,
            level: self.level,
        }
    }
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub stats: Option<ProfileStats>,
}

/// The fields a player may change on their own profile. Points and stats
/// only move through match results.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileEdit {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl From<ProfileEdit> for ProfileUpdate {
    fn from(edit: ProfileEdit) -> Self {
        ProfileUpdate {
            name: edit.name,
            avatar: edit.avatar,
            ..ProfileUpdate::default()
        }
    }
}

/// Name and avatar as published to other players.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub player_id: PlayerId,
    pub name: String,
    pub avatar: String,
}

/// One row of the leaderboard.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub points: u32,
    pub level: u32,
}
