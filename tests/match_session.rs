//! Integration tests for answer submission and match completion.

use chrono::Utc;
use quiz_arena_web::logic::{matchmaking, profiles, session};
use quiz_arena_web::{
    GameMatch, JoinOutcome, MatchStatus, MemoryStore, PlayerState, Profile, PublicProfile, Question,
    QuizError, SubmitOutcome, Winner,
};
use std::time::Duration;

const P1: u64 = 10000;
const P2: u64 = 10001;

fn question(i: usize) -> Question {
    Question {
        id: format!("q-{i}"),
        text: format!("Question {i}"),
        choices: vec![
            "Wrong A".to_string(),
            "Right".to_string(),
            "Wrong B".to_string(),
            "Wrong C".to_string(),
        ],
        correct_answer: "Right".to_string(),
    }
}

fn seat(player_id: u64, name: &str) -> PlayerState {
    PlayerState::new(&PublicProfile {
        player_id,
        name: name.to_string(),
        avatar: "🦊".to_string(),
    })
}

fn game_with(questions: usize) -> GameMatch {
    GameMatch::new(
        seat(P1, "Alice"),
        seat(P2, "Bob"),
        "math",
        "Algebra Basics",
        (1..=questions).map(question).collect(),
        Utc::now(),
    )
}

#[test]
fn correct_answer_on_last_question_wins() {
    let mut game = game_with(1);
    assert_eq!(game.submit_answer(P1, "Right", Utc::now()), SubmitOutcome::Recorded);
    assert_eq!(game.submit_answer(P2, "Wrong A", Utc::now()), SubmitOutcome::Finished);

    assert_eq!(game.players.p1.score, 100);
    assert_eq!(game.players.p2.as_ref().unwrap().score, 0);
    assert_eq!(game.status, MatchStatus::Finished);
    assert_eq!(game.winner, Some(Winner::Player(P1)));
}

#[test]
fn resolving_a_round_advances_and_clears_answers() {
    let mut game = game_with(3);
    game.submit_answer(P2, "Right", Utc::now());
    assert_eq!(game.status, MatchStatus::Playing);
    assert_eq!(game.submit_answer(P1, "Right", Utc::now()), SubmitOutcome::RoundResolved);

    assert_eq!(game.current_question_index, 1);
    assert_eq!(game.players.p1.score, 100);
    assert_eq!(game.players.p2.as_ref().unwrap().score, 100);
    assert!(game.players.p1.current_answer.is_none());
    assert!(game.players.p2.as_ref().unwrap().current_answer.is_none());
    assert_eq!(game.status, MatchStatus::Playing);
    assert!(game.winner.is_none());
}

#[test]
fn equal_scores_are_a_draw() {
    let mut game = game_with(2);
    for _ in 0..2 {
        game.submit_answer(P1, "Right", Utc::now());
        game.submit_answer(P2, "Right", Utc::now());
    }
    assert_eq!(game.status, MatchStatus::Finished);
    assert_eq!(game.winner, Some(Winner::Draw));
    assert_eq!(game.outcome_for(P1), Some(quiz_arena_web::MatchOutcome::Draw));
}

#[test]
fn second_submission_for_same_question_is_ignored() {
    let mut game = game_with(2);
    game.submit_answer(P1, "Wrong B", Utc::now());
    let before = game.clone();
    assert_eq!(game.submit_answer(P1, "Right", Utc::now()), SubmitOutcome::Ignored);
    assert_eq!(game, before);
}

#[test]
fn answers_outside_the_choices_score_nothing() {
    let mut game = game_with(1);
    game.submit_answer(P1, "banana", Utc::now());
    game.submit_answer(P2, "Right", Utc::now());
    assert_eq!(game.players.p1.current_answer.as_deref(), Some("banana"));
    assert_eq!(game.players.p1.score, 0);
    assert_eq!(game.winner, Some(Winner::Player(P2)));
}

#[test]
fn strangers_cannot_answer() {
    let mut game = game_with(1);
    let before = game.clone();
    assert_eq!(game.submit_answer(7, "Right", Utc::now()), SubmitOutcome::NotParticipant);
    assert_eq!(game, before);
}

#[test]
fn every_change_bumps_the_version() {
    let mut game = game_with(2);
    assert_eq!(game.version, 1);
    game.submit_answer(P1, "Right", Utc::now());
    assert_eq!(game.version, 2);
    game.submit_answer(P1, "Right", Utc::now());
    assert_eq!(game.version, 2);
    game.submit_answer(P2, "Right", Utc::now());
    assert_eq!(game.version, 3);
}

fn matched_pair(store: &mut MemoryStore, questions: usize) -> (Profile, Profile) {
    let alice = profiles::register(store, "Alice", "🦊").unwrap();
    let bob = profiles::register(store, "Bob", "🐸").unwrap();
    let now = Utc::now();
    let stale = Duration::from_secs(120);
    let make = || -> Vec<Question> { (1..=questions).map(question).collect() };
    matchmaking::join(store, "math", "Algebra Basics", &alice, now, stale, make).unwrap();
    let outcome = matchmaking::join(store, "math", "Algebra Basics", &bob, now, stale, make).unwrap();
    assert!(matches!(outcome, JoinOutcome::Matched(_)));
    (alice, bob)
}

#[test]
fn finishing_awards_both_players_once() {
    let mut store = MemoryStore::new();
    let (alice, bob) = matched_pair(&mut store, 1);

    session::submit(&mut store, alice.player_id, "Right", Utc::now()).unwrap();
    let done = session::submit(&mut store, bob.player_id, "Wrong C", Utc::now()).unwrap();
    assert_eq!(done.outcome, SubmitOutcome::Finished);
    assert!(done.game.points_awarded);
    assert!(done.leaderboard_version.is_some());

    let alice = profiles::get(&store, alice.player_id).unwrap();
    let bob = profiles::get(&store, bob.player_id).unwrap();
    assert_eq!(alice.points, 50);
    assert_eq!(alice.stats.wins, 1);
    assert_eq!(alice.stats.games_played, 1);
    assert_eq!(bob.points, 5);
    assert_eq!(bob.stats.losses, 1);

    // The finished match takes no more answers and awards nothing further.
    let err = session::submit(&mut store, bob.player_id, "Right", Utc::now()).unwrap_err();
    assert!(matches!(err, QuizError::MatchFinished));
    let mut stored = session::active(&store, alice.player_id).unwrap();
    assert_eq!(session::award_points(&mut store, &mut stored).unwrap(), None);
    assert_eq!(profiles::get(&store, alice.player_id).unwrap().points, 50);
}

#[test]
fn draw_awards_ten_points_each() {
    let mut store = MemoryStore::new();
    let (alice, bob) = matched_pair(&mut store, 1);
    session::submit(&mut store, alice.player_id, "Wrong A", Utc::now()).unwrap();
    session::submit(&mut store, bob.player_id, "Wrong B", Utc::now()).unwrap();

    assert_eq!(profiles::get(&store, alice.player_id).unwrap().points, 10);
    assert_eq!(profiles::get(&store, bob.player_id).unwrap().points, 10);
}

#[test]
fn submit_without_a_match_fails() {
    let mut store = MemoryStore::new();
    let alice = profiles::register(&mut store, "Alice", "🦊").unwrap();
    assert!(matches!(
        session::submit(&mut store, alice.player_id, "Right", Utc::now()),
        Err(QuizError::NoActiveMatch(_))
    ));
}

#[test]
fn clearing_only_affects_one_player() {
    let mut store = MemoryStore::new();
    let (alice, bob) = matched_pair(&mut store, 2);
    assert!(session::clear(&mut store, alice.player_id).unwrap());
    assert!(session::active(&store, alice.player_id).is_none());
    assert!(session::active(&store, bob.player_id).is_some());
    assert!(!session::clear(&mut store, alice.player_id).unwrap());
}

#[test]
fn expired_matches_are_purged_with_their_slots() {
    let mut store = MemoryStore::new();
    let (alice, bob) = matched_pair(&mut store, 2);
    let ttl = Duration::from_secs(60);

    assert_eq!(session::purge_expired(&mut store, Utc::now(), ttl).unwrap(), 0);
    let later = Utc::now() + chrono::Duration::seconds(120);
    assert_eq!(session::purge_expired(&mut store, later, ttl).unwrap(), 1);
    assert!(session::active(&store, alice.player_id).is_none());
    assert!(session::active(&store, bob.player_id).is_none());
}
