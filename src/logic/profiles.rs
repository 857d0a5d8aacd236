//! Profile store: registration, updates, and the public profile directory.

use crate::logic::leaderboard;
use crate::models::{
    PlayerId, Profile, ProfileUpdate, PublicProfile, QuizError, AVATARS,
};
use crate::storage::{keys, read_json, write_json, KeyValueStore};
use std::collections::BTreeMap;

/// Value of the id counter before the first registration.
const INITIAL_LAST_PLAYER_ID: PlayerId = 9999;

fn avatar_or_default(avatar: &str) -> &str {
    match avatar.trim() {
        "" => AVATARS[0],
        a => a,
    }
}

pub fn get(store: &dyn KeyValueStore, player_id: PlayerId) -> Option<Profile> {
    read_json(store, &keys::profile(player_id))
}

/// Register a new player with the next sequential id (the first is 10000).
pub fn register(store: &mut dyn KeyValueStore, name: &str, avatar: &str) -> Result<Profile, QuizError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QuizError::EmptyName);
    }
    let avatar = avatar_or_default(avatar);

    let last: PlayerId = read_json(store, keys::LAST_PLAYER_ID).unwrap_or(INITIAL_LAST_PLAYER_ID);
    let player_id = last + 1;
    write_json(store, keys::LAST_PLAYER_ID, &player_id)?;

    let profile = Profile::new(player_id, name, avatar);
    save(store, &profile)?;
    log::info!("Registered player {} ({})", profile.player_id, profile.name);
    Ok(profile)
}

/// Merge the given fields into a stored profile. Level follows points.
pub fn update(
    store: &mut dyn KeyValueStore,
    player_id: PlayerId,
    changes: ProfileUpdate,
) -> Result<Profile, QuizError> {
    let mut profile = get(store, player_id).ok_or(QuizError::PlayerNotFound(player_id))?;
    if let Some(name) = changes.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(QuizError::EmptyName);
        }
        profile.name = name.to_string();
    }
    if let Some(avatar) = changes.avatar {
        profile.avatar = avatar_or_default(&avatar).to_string();
    }
    if let Some(points) = changes.points {
        profile.set_points(points);
    }
    if let Some(stats) = changes.stats {
        profile.stats = stats;
    }
    save(store, &profile)?;
    Ok(profile)
}

/// Persist a profile, publish it, and refresh its leaderboard entry.
pub fn save(store: &mut dyn KeyValueStore, profile: &Profile) -> Result<(), QuizError> {
    write_json(store, &keys::profile(profile.player_id), profile)?;
    publish(store, profile)?;
    leaderboard::upsert(store, profile)?;
    Ok(())
}

/// Put the profile's name and avatar into the shared directory.
pub fn publish(store: &mut dyn KeyValueStore, profile: &Profile) -> Result<(), QuizError> {
    let mut directory: BTreeMap<PlayerId, PublicProfile> =
        read_json(store, keys::PUBLIC_PROFILES).unwrap_or_default();
    directory.insert(profile.player_id, profile.public());
    write_json(store, keys::PUBLIC_PROFILES, &directory)?;
    Ok(())
}

pub fn lookup_public(store: &dyn KeyValueStore, player_id: PlayerId) -> Option<PublicProfile> {
    let mut directory: BTreeMap<PlayerId, PublicProfile> = read_json(store, keys::PUBLIC_PROFILES)?;
    directory.remove(&player_id)
}
