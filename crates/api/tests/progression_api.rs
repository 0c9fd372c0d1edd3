//! End-to-end tests for recording XP, levels, and achievements.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json, post_json_auth};
use homestead_api::error::AppError;
use homestead_api::progression::{ProgressionUpdate, RecordEvent};
use homestead_core::error::CoreError;
use serde_json::json;
use sqlx::PgPool;

const EVENTS: &str = "/api/v1/progression/events";
const STATS: &str = "/api/v1/progression/stats";

/// Award an explicit amount through the in-process facade.
async fn award(pool: &PgPool, user_id: i64, action: &str, xp: i32) -> ProgressionUpdate {
    common::test_service(pool.clone())
        .record_event(
            user_id,
            RecordEvent {
                action: action.to_string(),
                xp: Some(xp),
                metadata: None,
                idempotency_key: None,
            },
        )
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn three_awards_sum_into_level_two(pool: PgPool) {
    for xp in [10, 45, 50] {
        award(&pool, 7, "garden_chore", xp).await;
    }

    let app = common::build_test_app(pool);
    let response = get_auth(app, STATS, 7).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let stats = &json["data"];
    assert_eq!(stats["total_xp"], 105);
    assert_eq!(stats["level"], 2);
    assert_eq!(stats["progress"]["current_level_base"], 100);
    assert_eq!(stats["progress"]["xp_into_level"], 5);
    assert_eq!(stats["progress"]["xp_to_next_level"], 200);
    assert_eq!(stats["progress"]["percent"], 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn known_action_uses_default_reward_and_unlocks(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json_auth(app, EVENTS, 3, json!({ "action": "property_added" })).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["event"]["xp"], 25);
    assert_eq!(data["event"]["user_id"], 3);
    assert_eq!(data["duplicate"], false);
    assert_eq!(data["stats"]["total_xp"], 25);

    let unlocked: Vec<&str> = data["newly_unlocked"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(unlocked, vec!["first_property"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn crossing_a_boundary_reports_level_up(pool: PgPool) {
    let first = award(&pool, 1, "garden_chore", 95).await;
    assert!(!first.leveled_up);
    assert_eq!(first.previous_level, 1);

    let second = award(&pool, 1, "garden_chore", 10).await;
    assert!(second.leveled_up);
    assert_eq!(second.previous_level, 1);
    assert_eq!(second.stats.level, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn idempotency_key_records_once(pool: PgPool) {
    let body = json!({ "action": "harvest_logged", "idempotency_key": "harvest-991" });

    let app = common::build_test_app(pool.clone());
    let first = post_json_auth(app, EVENTS, 5, body.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = body_json(first).await;

    let app = common::build_test_app(pool.clone());
    let second = post_json_auth(app, EVENTS, 5, body).await;
    assert_eq!(second.status(), StatusCode::OK);
    let second = body_json(second).await;

    assert_eq!(second["data"]["duplicate"], true);
    assert_eq!(second["data"]["event"]["id"], first["data"]["event"]["id"]);
    assert_eq!(second["data"]["stats"]["total_xp"], 15);
    assert_eq!(second["data"]["newly_unlocked"].as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_actions_are_rejected(pool: PgPool) {
    let cases = [
        json!({ "action": "" }),
        json!({ "action": "Not A Tag" }),
        json!({ "action": "garden_chore" }),
        json!({ "action": "daily_login" }),
        json!({ "action": "harvest_logged", "idempotency_key": "   " }),
    ];

    for body in cases {
        let app = common::build_test_app(pool.clone());
        let response = post_json_auth(app, EVENTS, 1, body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR", "body: {body}");
    }

    // Nothing was written.
    let app = common::build_test_app(pool);
    let json = body_json(get_auth(app, STATS, 1).await).await;
    assert_eq!(json["data"]["total_xp"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn clients_cannot_choose_their_award(pool: PgPool) {
    for body in [
        json!({ "action": "harvest_logged", "xp": 10_000 }),
        json!({ "action": "garden_chore", "xp": 10 }),
    ] {
        let app = common::build_test_app(pool.clone());
        let response = post_json_auth(app, EVENTS, 1, body.clone()).await;
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "body: {body}"
        );
    }

    let app = common::build_test_app(pool);
    let json = body_json(get_auth(app, STATS, 1).await).await;
    assert_eq!(json["data"]["total_xp"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn explicit_awards_are_bounded(pool: PgPool) {
    let service = common::test_service(pool);
    for xp in [0, -5, 10_001] {
        let result = service
            .record_event(
                1,
                RecordEvent {
                    action: "garden_chore".to_string(),
                    xp: Some(xp),
                    metadata: None,
                    idempotency_key: None,
                },
            )
            .await;
        assert_matches!(result, Err(AppError::Core(CoreError::Validation(_))), "xp: {xp}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recording_requires_authentication(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json(app, EVENTS, json!({ "action": "harvest_logged" })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let app = common::build_test_app(pool);
    let response = get(app, STATS).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recent_events_are_newest_first(pool: PgPool) {
    for xp in [1, 2, 3] {
        award(&pool, 9, "garden_chore", xp).await;
    }

    let app = common::build_test_app(pool);
    let json = body_json(get_auth(app, "/api/v1/progression/events?limit=2", 9).await).await;
    let xps: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["xp"].as_i64().unwrap())
        .collect();
    assert_eq!(xps, vec![3, 2]);
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn stats_for_new_user_start_at_level_one(pool: PgPool) {
    let app = common::build_test_app(pool);
    let json = body_json(get_auth(app, STATS, 404).await).await;

    assert_eq!(json["data"]["total_xp"], 0);
    assert_eq!(json["data"]["level"], 1);
    assert_eq!(json["data"]["progress"]["xp_to_next_level"], 100);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn level_calculator_is_public(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/progression/level?total_xp=250").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["level"], 3);
    assert_eq!(json["data"]["xp_into_level"], 50);
    assert_eq!(json["data"]["percent"], 50);

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/progression/level?total_xp=-1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn achievement_list_marks_unlocks(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    post_json_auth(app, EVENTS, 2, json!({ "action": "animal_added" })).await;

    let app = common::build_test_app(pool);
    let json = body_json(get_auth(app, "/api/v1/progression/achievements", 2).await).await;
    let list = json["data"].as_array().unwrap();

    assert_eq!(list.len(), homestead_core::achievements::CATALOG.len());
    let first_animal = list.iter().find(|a| a["id"] == "first_animal").unwrap();
    assert_eq!(first_animal["unlocked"], true);
    assert!(first_animal["unlocked_at"].is_string());
    let herd = list.iter().find(|a| a["id"] == "growing_herd").unwrap();
    assert_eq!(herd["unlocked"], false);
    assert!(herd["unlocked_at"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn xp_milestone_unlocks_level_achievement(pool: PgPool) {
    let update = award(&pool, 11, "garden_chore", 400).await;
    let ids: Vec<&str> = update.newly_unlocked.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec!["level_5"]);

    // A second evaluation pass finds nothing new.
    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        "/api/v1/progression/achievements/evaluate",
        11,
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["counters"]["total_xp"], 400);
    assert_eq!(json["data"]["newly_unlocked"].as_array().unwrap().len(), 0);
    assert!(json["data"]["unlocked"]
        .as_array()
        .unwrap()
        .iter()
        .any(|id| id == "level_5"));
}

// ---------------------------------------------------------------------------
// Check-in
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn check_in_counts_once_per_day(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let first = post_json_auth(app, "/api/v1/progression/check-in", 8, json!({})).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = body_json(first).await;
    assert_eq!(first["data"]["event"]["action"], "daily_login");
    assert_eq!(first["data"]["event"]["xp"], 5);

    let app = common::build_test_app(pool.clone());
    let second = post_json_auth(app, "/api/v1/progression/check-in", 8, json!({})).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["data"]["duplicate"], true);

    let app = common::build_test_app(pool);
    let stats = body_json(get_auth(app, STATS, 8).await).await;
    assert_eq!(stats["data"]["total_xp"], 5);
}
