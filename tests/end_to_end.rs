//! End-to-end tests through QuizService, with ClientSync playing the clients.

use chrono::{Duration, Utc};
use quiz_arena_web::{
    acting_player,
    ClientSync, Config, FeedItem, GameMatch, JoinOutcome, MatchPoll, MatchStatus, MemoryStore, QuizError,
    QuizService, SyncAction, SyncEvent, SyncHub, View, Winner,
};

const SUBJECT: &str = "math";
const LESSON: &str = "Algebra Basics";

fn service() -> QuizService {
    QuizService::new(Box::new(MemoryStore::new()), SyncHub::new(256), Config::default())
}

fn correct(game: &GameMatch) -> String {
    game.current_question().unwrap().correct_answer.clone()
}

#[test]
fn two_players_play_a_full_match() {
    let mut svc = service();
    let mut events = svc.hub().subscribe();
    let alice = svc.register("Alice", "🦊").unwrap();
    let bob = svc.register("Bob", "🐸").unwrap();
    let mut alice_client = ClientSync::new(alice.player_id);
    let mut bob_client = ClientSync::new(bob.player_id);

    let queued = svc.find_match(alice.player_id, SUBJECT, LESSON, Utc::now()).unwrap();
    assert!(matches!(queued, JoinOutcome::Queued { position: 1 }));
    alice_client.enter_lobby();
    assert!(matches!(svc.active_match(alice.player_id, Utc::now()).unwrap(), MatchPoll::Waiting));

    let JoinOutcome::Matched(game) = svc.find_match(bob.player_id, SUBJECT, LESSON, Utc::now()).unwrap() else {
        panic!("Bob should be matched with Alice");
    };
    assert_eq!(game.total_questions, 5);
    assert_eq!(game.players.p1.score, 0);
    assert_eq!(game.players.p2.as_ref().unwrap().score, 0);
    assert_eq!(bob_client.observe_match(game.clone()), SyncAction::EnterGame);

    // Alice's lobby poll picks up the match.
    let polled = svc.active_match(alice.player_id, Utc::now()).unwrap();
    assert_eq!(alice_client.observe_poll(polled), SyncAction::EnterGame);
    assert_eq!(alice_client.view(), View::Game);

    let mut last = game;
    for round in 0..5 {
        let answer = correct(&last);
        let bob_answer = if round == 0 { answer.clone() } else { "Wrong Answer A".to_string() };
        svc.submit_answer(alice.player_id, &answer, Utc::now()).unwrap();
        last = svc.submit_answer(bob.player_id, &bob_answer, Utc::now()).unwrap().game;

        if round < 4 {
            assert_eq!(last.current_question_index, round + 1);
            assert!(last.players.p1.current_answer.is_none());
            assert!(last.players.p2.as_ref().unwrap().current_answer.is_none());
            assert_eq!(alice_client.observe_match(last.clone()), SyncAction::Adopt);
        }
    }

    assert_eq!(last.status, MatchStatus::Finished);
    assert_eq!(last.winner, Some(Winner::Player(alice.player_id)));
    assert_eq!(last.players.p1.score, 500);
    assert_eq!(last.players.p2.as_ref().unwrap().score, 100);

    assert_eq!(alice_client.observe_match(last.clone()), SyncAction::ShowResults);
    assert_eq!(alice_client.observe_match(last.clone()), SyncAction::Ignore);
    assert_eq!(alice_client.poll_interval(), None);

    let alice_now = svc.profile(alice.player_id).unwrap();
    let bob_now = svc.profile(bob.player_id).unwrap();
    assert_eq!(alice_now.points, 50);
    assert_eq!(alice_now.stats.wins, 1);
    assert_eq!(bob_now.points, 5);
    assert_eq!(bob_now.stats.losses, 1);

    let board = svc.leaderboard();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].player_id, alice.player_id);
    assert_eq!(board[0].points, 50);
    assert_eq!(board[1].points, 5);

    let mut saw_finish = false;
    let mut saw_board = false;
    while let Ok(FeedItem { event, .. }) = events.try_recv() {
        match event {
            SyncEvent::Match { status: MatchStatus::Finished, .. } => saw_finish = true,
            SyncEvent::Leaderboard { version } if version == svc.leaderboard_version() => saw_board = true,
            _ => {}
        }
    }
    assert!(saw_finish && saw_board);

    // Returning home dismisses the finished match for good.
    assert!(svc.return_home(alice.player_id).unwrap());
    alice_client.go_home();
    assert_eq!(alice_client.view(), View::Dashboard);
    assert_eq!(alice_client.observe_match(last), SyncAction::Ignore);
    assert!(matches!(svc.active_match(alice.player_id, Utc::now()).unwrap(), MatchPoll::NotQueued));
}

#[test]
fn stale_snapshots_are_not_adopted() {
    let mut svc = service();
    let alice = svc.register("Alice", "🦊").unwrap();
    let bob = svc.register("Bob", "🐸").unwrap();
    svc.find_match(alice.player_id, SUBJECT, LESSON, Utc::now()).unwrap();
    let JoinOutcome::Matched(first) = svc.find_match(bob.player_id, SUBJECT, LESSON, Utc::now()).unwrap() else {
        panic!("expected a match");
    };

    let mut client = ClientSync::new(alice.player_id);
    client.observe_match(first.clone());
    let newer = svc.submit_answer(bob.player_id, "anything", Utc::now()).unwrap().game;
    assert_eq!(client.observe_match(newer.clone()), SyncAction::Adopt);
    assert_eq!(client.observe_match(first), SyncAction::Ignore);
    assert_eq!(client.current_match().unwrap().version, newer.version);
}

#[test]
fn outsiders_do_not_adopt_a_match() {
    let mut svc = service();
    let alice = svc.register("Alice", "🦊").unwrap();
    let bob = svc.register("Bob", "🐸").unwrap();
    let carol = svc.register("Carol", "🐙").unwrap();
    svc.find_match(alice.player_id, SUBJECT, LESSON, Utc::now()).unwrap();
    let JoinOutcome::Matched(game) = svc.find_match(bob.player_id, SUBJECT, LESSON, Utc::now()).unwrap() else {
        panic!("expected a match");
    };

    let mut client = ClientSync::new(carol.player_id);
    assert_eq!(client.observe_match(game), SyncAction::Ignore);
    assert!(client.current_match().is_none());
    assert!(matches!(
        svc.submit_answer(carol.player_id, "x", Utc::now()),
        Err(QuizError::NoActiveMatch(_))
    ));
}

#[test]
fn cancelled_search_is_not_matched() {
    let mut svc = service();
    let alice = svc.register("Alice", "🦊").unwrap();
    let bob = svc.register("Bob", "🐸").unwrap();

    svc.find_match(alice.player_id, SUBJECT, LESSON, Utc::now()).unwrap();
    assert!(svc.cancel_search(alice.player_id).unwrap());
    assert!(!svc.cancel_search(alice.player_id).unwrap());

    let outcome = svc.find_match(bob.player_id, SUBJECT, LESSON, Utc::now()).unwrap();
    assert!(matches!(outcome, JoinOutcome::Queued { position: 1 }));
}

#[test]
fn switching_lessons_leaves_the_old_bucket() {
    let mut svc = service();
    let alice = svc.register("Alice", "🦊").unwrap();
    let bob = svc.register("Bob", "🐸").unwrap();

    svc.find_match(alice.player_id, SUBJECT, LESSON, Utc::now()).unwrap();
    svc.find_match(alice.player_id, "science", "Biology", Utc::now()).unwrap();
    assert_eq!(svc.selection(alice.player_id).unwrap().lesson, "Biology");

    let outcome = svc.find_match(bob.player_id, SUBJECT, LESSON, Utc::now()).unwrap();
    assert!(matches!(outcome, JoinOutcome::Queued { position: 1 }));
}

#[test]
fn unknown_players_cannot_queue() {
    let mut svc = service();
    assert!(matches!(
        svc.find_match(12345, SUBJECT, LESSON, Utc::now()),
        Err(QuizError::PlayerNotFound(12345))
    ));
}

#[test]
fn housekeeping_drops_abandoned_waiters() {
    let mut svc = service();
    let alice = svc.register("Alice", "🦊").unwrap();
    let then = Utc::now();
    svc.find_match(alice.player_id, SUBJECT, LESSON, then).unwrap();

    let later = then + Duration::seconds(600);
    let done = svc.housekeeping(later).unwrap();
    assert_eq!(done.evicted_buckets, 1);
    assert_eq!(done.purged_matches, 0);

    let bob = svc.register("Bob", "🐸").unwrap();
    let outcome = svc.find_match(bob.player_id, SUBJECT, LESSON, later).unwrap();
    assert!(matches!(outcome, JoinOutcome::Queued { position: 1 }));
}

#[test]
fn evicted_waiter_is_told_to_search_again_and_gets_matched() {
    let mut svc = service();
    let alice = svc.register("Alice", "🦊").unwrap();
    let then = Utc::now();
    svc.find_match(alice.player_id, SUBJECT, LESSON, then).unwrap();
    let mut client = ClientSync::new(alice.player_id);
    client.enter_lobby();

    let later = then + Duration::seconds(600);
    svc.housekeeping(later).unwrap();
    let poll = svc.active_match(alice.player_id, later).unwrap();
    assert!(matches!(poll, MatchPoll::NotQueued));
    assert_eq!(client.observe_poll(poll), SyncAction::Rejoin);

    let sel = svc.selection(alice.player_id).unwrap();
    let again = svc.find_match(alice.player_id, &sel.subject, &sel.lesson, later).unwrap();
    assert!(matches!(again, JoinOutcome::Queued { position: 1 }));

    let bob = svc.register("Bob", "🐸").unwrap();
    let outcome = svc.find_match(bob.player_id, SUBJECT, LESSON, later).unwrap();
    assert!(matches!(outcome, JoinOutcome::Matched(_)));
    let poll = svc.active_match(alice.player_id, later).unwrap();
    assert_eq!(client.observe_poll(poll), SyncAction::EnterGame);
}

#[tokio::test]
async fn feed_cursor_delivers_a_match_created_between_polls() {
    let mut svc = service();
    let alice = svc.register("Alice", "🦊").unwrap();
    let bob = svc.register("Bob", "🐸").unwrap();
    svc.find_match(alice.player_id, SUBJECT, LESSON, Utc::now()).unwrap();
    let cursor = svc.hub().last_seq();

    // Published while Alice has no long-poll open.
    let JoinOutcome::Matched(game) = svc.find_match(bob.player_id, SUBJECT, LESSON, Utc::now()).unwrap() else {
        panic!("expected a match");
    };

    let hub = svc.hub().clone();
    let item = hub
        .next_for(alice.player_id, Some(cursor), std::time::Duration::from_millis(100))
        .await
        .unwrap();
    assert!(item.seq > cursor);
    assert_eq!(item.event, SyncEvent::for_match(&game));
}

#[test]
fn late_snapshot_of_a_previous_match_is_ignored() {
    let mut svc = service();
    let alice = svc.register("Alice", "🦊").unwrap();
    let bob = svc.register("Bob", "🐸").unwrap();
    let t0 = Utc::now();
    let mut client = ClientSync::new(alice.player_id);

    svc.find_match(alice.player_id, SUBJECT, LESSON, t0).unwrap();
    let JoinOutcome::Matched(first) = svc.find_match(bob.player_id, SUBJECT, LESSON, t0).unwrap() else {
        panic!("expected a match");
    };
    assert_eq!(client.observe_match(first.clone()), SyncAction::EnterGame);
    let mut finished = first.clone();
    for _ in 0..first.total_questions {
        svc.submit_answer(alice.player_id, "x", t0).unwrap();
        finished = svc.submit_answer(bob.player_id, "y", t0).unwrap().game;
    }
    assert_eq!(client.observe_match(finished.clone()), SyncAction::ShowResults);

    // Straight from results into a new search, without returning home.
    let t1 = t0 + Duration::seconds(10);
    svc.find_match(alice.player_id, SUBJECT, LESSON, t1).unwrap();
    let JoinOutcome::Matched(second) = svc.find_match(bob.player_id, SUBJECT, LESSON, t1).unwrap() else {
        panic!("expected a second match");
    };
    assert_eq!(client.observe_match(second.clone()), SyncAction::EnterGame);

    assert_eq!(client.observe_match(finished), SyncAction::Ignore);
    assert_eq!(client.observe_match(first), SyncAction::Ignore);
    assert_eq!(client.current_match().unwrap().match_id, second.match_id);
    assert_eq!(client.view(), View::Game);
}

#[test]
fn requests_may_only_act_as_their_own_player() {
    assert_eq!(acting_player(Some(10000), 10000).unwrap(), 10000);
    assert!(matches!(acting_player(Some(10000), 10001), Err(QuizError::NotOwner(10001))));
    assert!(matches!(acting_player(None, 10000), Err(QuizError::NotSignedIn)));
}
