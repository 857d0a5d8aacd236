//! Leaderboard index: one entry per player, highest points first.

use crate::models::{LeaderboardEntry, Profile, QuizError};
use crate::storage::{keys, read_json, write_json, KeyValueStore};

/// Points descending; equal points keep lower player ids first.
pub fn sort_entries(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| b.points.cmp(&a.points).then(a.player_id.cmp(&b.player_id)));
}

/// Current standings; empty if nothing is stored.
pub fn list(store: &dyn KeyValueStore) -> Vec<LeaderboardEntry> {
    read_json(store, keys::LEADERBOARD).unwrap_or_default()
}

/// Bumped on every upsert so clients can tell whether their copy is stale.
pub fn version(store: &dyn KeyValueStore) -> u64 {
    read_json(store, keys::LEADERBOARD_VERSION).unwrap_or(0)
}

/// Replace the profile's entry with its latest values and re-sort.
/// Returns the new leaderboard version.
pub fn upsert(store: &mut dyn KeyValueStore, profile: &Profile) -> Result<u64, QuizError> {
    let mut entries = list(store);
    entries.retain(|e| e.player_id != profile.player_id);
    entries.push(profile.leaderboard_entry());
    sort_entries(&mut entries);
    write_json(store, keys::LEADERBOARD, &entries)?;

    let next = version(store) + 1;
    write_json(store, keys::LEADERBOARD_VERSION, &next)?;
    Ok(next)
}

/// Standings as CSV with a 1-based rank column.
pub fn to_csv(entries: &[LeaderboardEntry]) -> Result<String, csv::Error> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["rank", "player_id", "name", "avatar", "points", "level"])?;
    for (idx, e) in entries.iter().enumerate() {
        wtr.write_record([
            (idx + 1).to_string(),
            e.player_id.to_string(),
            e.name.clone(),
            e.avatar.clone(),
            e.points.to_string(),
            e.level.to_string(),
        ])?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
