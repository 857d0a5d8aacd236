//! Single binary web server: landing page from templates/, API via REST.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. See `quiz_arena_web::config` for the
//! environment variables it reads.

use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::{
    cookie::Key,
    delete, get, patch, post,
    web::{self, Data, Json, Path, Query},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::Utc;
use quiz_arena_web::{
    models::{AVATARS, SUBJECTS},
    acting_player, Config, JoinOutcome, JsonFileStore, KeyValueStore, MatchPoll, MemoryStore, PlayerId,
    ProfileEdit, QuizError, QuizService, SyncHub,
};
use serde::Deserialize;
use std::sync::RwLock;
use std::time::Duration;

/// The arena behind one lock: every operation is a single critical section.
type AppState = Data<RwLock<QuizService>>;

/// Session key holding the player registered from this browser.
const SESSION_PLAYER_ID: &str = "player_id";

/// Housekeeping cadence: stale queue entries and expired matches.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound for one long-poll on the event feed.
const MAX_EVENT_WAIT: Duration = Duration::from_secs(30);

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    #[serde(default)]
    avatar: String,
}

#[derive(Deserialize)]
struct FindMatchBody {
    subject: String,
    lesson: String,
}

#[derive(Deserialize)]
struct AnswerBody {
    answer: String,
}

/// Path segment: player id (e.g. /api/players/{player_id})
#[derive(Deserialize)]
struct PlayerPath {
    player_id: PlayerId,
}

#[derive(Deserialize)]
struct MatchQuery {
    /// Only return the match if its version is newer than this.
    since: Option<u64>,
}

#[derive(Deserialize)]
struct EventsQuery {
    /// Sequence number of the last event seen.
    after: Option<u64>,
    timeout_ms: Option<u64>,
}

fn error_response(e: &QuizError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        QuizError::PlayerNotFound(_) | QuizError::NoActiveMatch(_) => HttpResponse::NotFound().json(body),
        QuizError::NotSignedIn => HttpResponse::Unauthorized().json(body),
        QuizError::NotParticipant(_) | QuizError::NotOwner(_) => HttpResponse::Forbidden().json(body),
        QuizError::MatchFinished => HttpResponse::Conflict().json(body),
        QuizError::EmptyName | QuizError::UnknownLesson { .. } => HttpResponse::BadRequest().json(body),
        QuizError::Storage(_) => {
            log::error!("{}", e);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Player id stored in this browser's session, if any.
fn session_player(session: &Session) -> Option<PlayerId> {
    match session.get::<PlayerId>(SESSION_PLAYER_ID) {
        Ok(id) => id,
        Err(e) => {
            log::warn!("Unreadable session: {}", e);
            None
        }
    }
}

/// The session's player, if it is the one named in the path.
fn authorize(session: &Session, path: &PlayerPath) -> Result<PlayerId, HttpResponse> {
    acting_player(session_player(session), path.player_id).map_err(|e| error_response(&e))
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "quiz-arena-web",
    })
}

/// Avoid 404 in browser tab: favicon not required for app logic.
#[get("/favicon.ico")]
async fn favicon() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

/// Subjects with their lessons, and the avatars to pick from.
#[get("/api/catalog")]
async fn api_catalog() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "subjects": SUBJECTS, "avatars": AVATARS }))
}

/// Register a new player and remember them in this browser's session.
#[post("/api/profiles")]
async fn api_register(state: AppState, session: Session, body: Json<RegisterBody>) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.register(&body.name, &body.avatar) {
        Ok(profile) => {
            if let Err(e) = session.insert(SESSION_PLAYER_ID, profile.player_id) {
                log::warn!("Could not store player {} in session: {}", profile.player_id, e);
            }
            HttpResponse::Ok().json(profile)
        }
        Err(e) => error_response(&e),
    }
}

/// Profile of the player registered from this browser (404 if none).
#[get("/api/me")]
async fn api_me(state: AppState, session: Session) -> HttpResponse {
    let player_id = match session.get::<PlayerId>(SESSION_PLAYER_ID) {
        Ok(Some(id)) => id,
        Ok(None) => return HttpResponse::NotFound().json(serde_json::json!({ "error": "Not registered" })),
        Err(e) => return HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() })),
    };
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.profile(player_id) {
        Some(profile) => HttpResponse::Ok().json(profile),
        None => error_response(&QuizError::PlayerNotFound(player_id)),
    }
}

#[get("/api/players/{player_id}")]
async fn api_get_player(state: AppState, path: Path<PlayerPath>) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.profile(path.player_id) {
        Some(profile) => HttpResponse::Ok().json(profile),
        None => error_response(&QuizError::PlayerNotFound(path.player_id)),
    }
}

/// Rename or change avatar. Only the session's own player.
#[patch("/api/players/{player_id}")]
async fn api_update_player(
    state: AppState,
    session: Session,
    path: Path<PlayerPath>,
    body: Json<ProfileEdit>,
) -> HttpResponse {
    let player_id = match authorize(&session, &path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.update_profile(player_id, body.into_inner().into()) {
        Ok(profile) => HttpResponse::Ok().json(profile),
        Err(e) => error_response(&e),
    }
}

#[get("/api/leaderboard")]
async fn api_leaderboard(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    HttpResponse::Ok().json(serde_json::json!({
        "version": g.leaderboard_version(),
        "entries": g.leaderboard(),
    }))
}

#[get("/api/leaderboard.csv")]
async fn api_leaderboard_csv(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.leaderboard_csv() {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header(("Content-Disposition", "attachment; filename=\"leaderboard.csv\""))
            .body(csv),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// Find an opponent: returns the match right away or a queue position.
#[post("/api/players/{player_id}/queue")]
async fn api_find_match(
    state: AppState,
    session: Session,
    path: Path<PlayerPath>,
    body: Json<FindMatchBody>,
) -> HttpResponse {
    let player_id = match authorize(&session, &path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.find_match(player_id, &body.subject, &body.lesson, Utc::now()) {
        Ok(JoinOutcome::Matched(game)) => {
            HttpResponse::Ok().json(serde_json::json!({ "status": "matched", "match": game }))
        }
        Ok(JoinOutcome::Queued { position }) => {
            HttpResponse::Ok().json(serde_json::json!({ "status": "queued", "position": position }))
        }
        Err(e) => error_response(&e),
    }
}

/// Cancel a search.
#[delete("/api/players/{player_id}/queue")]
async fn api_cancel_search(state: AppState, session: Session, path: Path<PlayerPath>) -> HttpResponse {
    let player_id = match authorize(&session, &path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.cancel_search(player_id) {
        Ok(left) => HttpResponse::Ok().json(serde_json::json!({ "left": left })),
        Err(e) => error_response(&e),
    }
}

/// Active match: 304 if not newer than `since`, 204 while still waiting in
/// a queue, 410 when neither matched nor queued (search again).
#[get("/api/players/{player_id}/match")]
async fn api_active_match(
    state: AppState,
    session: Session,
    path: Path<PlayerPath>,
    query: Query<MatchQuery>,
) -> HttpResponse {
    let player_id = match authorize(&session, &path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.active_match(player_id, Utc::now()) {
        Ok(MatchPoll::Active(game)) if query.since.is_some_and(|v| game.version <= v) => {
            HttpResponse::NotModified().finish()
        }
        Ok(MatchPoll::Active(game)) => HttpResponse::Ok().json(game),
        Ok(MatchPoll::Waiting) => HttpResponse::NoContent().finish(),
        Ok(MatchPoll::NotQueued) => HttpResponse::Gone().json(serde_json::json!({ "status": "not_queued" })),
        Err(e) => error_response(&e),
    }
}

/// Answer the current question of the active match.
#[post("/api/players/{player_id}/answer")]
async fn api_submit_answer(
    state: AppState,
    session: Session,
    path: Path<PlayerPath>,
    body: Json<AnswerBody>,
) -> HttpResponse {
    let player_id = match authorize(&session, &path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.submit_answer(player_id, &body.answer, Utc::now()) {
        Ok(submission) => HttpResponse::Ok().json(submission.game),
        Err(e) => error_response(&e),
    }
}

/// Return to the dashboard: forget the active match.
#[delete("/api/players/{player_id}/match")]
async fn api_return_home(state: AppState, session: Session, path: Path<PlayerPath>) -> HttpResponse {
    let player_id = match authorize(&session, &path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.return_home(player_id) {
        Ok(cleared) => HttpResponse::Ok().json(serde_json::json!({ "cleared": cleared })),
        Err(e) => error_response(&e),
    }
}

/// Long-poll for the next change relevant to the player after the `after`
/// cursor (204 on timeout). Pass back the returned `seq` on the next call.
#[get("/api/players/{player_id}/events")]
async fn api_events(
    hub: Data<SyncHub>,
    session: Session,
    path: Path<PlayerPath>,
    query: Query<EventsQuery>,
) -> HttpResponse {
    let player_id = match authorize(&session, &path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let wait = query
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(MAX_EVENT_WAIT)
        .min(MAX_EVENT_WAIT);
    match hub.next_for(player_id, query.after, wait).await {
        Some(event) => HttpResponse::Ok().json(event),
        None => HttpResponse::NoContent().finish(),
    }
}

fn open_store(config: &Config) -> std::io::Result<Box<dyn KeyValueStore>> {
    match &config.data_file {
        Some(path) => Ok(Box::new(JsonFileStore::open(path)?)),
        None => {
            log::info!("No DATA_FILE set; state is kept in memory only");
            Ok(Box::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let hub = SyncHub::new(config.sync_capacity);
    let store = open_store(&config)?;
    let state = Data::new(RwLock::new(QuizService::new(store, hub.clone(), config)));
    let hub = Data::new(hub);

    // Background task: drop stale queue entries and expired matches
    let state_cleanup = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(HOUSEKEEPING_INTERVAL);
        loop {
            interval.tick().await;
            let mut g = match state_cleanup.write() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            match g.housekeeping(Utc::now()) {
                Ok(done) if done.evicted_buckets > 0 || done.purged_matches > 0 => log::info!(
                    "Housekeeping: {} queue(s) trimmed, {} match(es) purged",
                    done.evicted_buckets,
                    done.purged_matches
                ),
                Ok(_) => {}
                Err(e) => log::error!("Housekeeping failed: {}", e),
            }
        }
    });

    // Sessions only identify the browser's player; a restart invalidates them.
    let session_key = Key::generate();

    HttpServer::new(move || {
        App::new()
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(false)
                    .build(),
            )
            .app_data(state.clone())
            .app_data(hub.clone())
            .route("/", web::get().to(serve_index_async))
            .service(api_health)
            .service(favicon)
            .service(api_catalog)
            .service(api_register)
            .service(api_me)
            .service(api_leaderboard)
            .service(api_leaderboard_csv)
            .service(api_get_player)
            .service(api_update_player)
            .service(api_find_match)
            .service(api_cancel_search)
            .service(api_active_match)
            .service(api_submit_answer)
            .service(api_return_home)
            .service(api_events)
    })
    .bind(bind)?
    .run()
    .await
}

async fn serve_index_async() -> HttpResponse {
    let html = include_str!("../../templates/index.html");
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}
