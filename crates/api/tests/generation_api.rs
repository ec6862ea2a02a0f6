//! Integration tests for the `/api/v1/generation` endpoints, driven by a
//! scripted generator.

mod common;

use axum::http::StatusCode;
use common::{
    assert_error_code, body_bytes, body_json, get, post_empty, post_json, post_multipart,
    FakeGenerator, FAKE_ARTIFACT, FAKE_REFINE_ID, FAKE_TASK_ID,
};
use dalma_meshy::TaskStatus;
use serde_json::json;
use sqlx::PgPool;

fn photo_parts<'a>(extra: &[(&'a str, Option<&'a str>, &'a [u8])]) -> Vec<(&'a str, Option<&'a str>, &'a [u8])> {
    let mut parts: Vec<(&str, Option<&str>, &[u8])> =
        vec![("photo", Some("dog.jpg"), b"jpeg-bytes")];
    parts.extend_from_slice(extra);
    parts
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_photo_returns_task_id(pool: PgPool) {
    let generator = FakeGenerator::new([(TaskStatus::Pending, None)]);
    let app = common::build_test_app(pool, generator.clone());

    let response = post_multipart(app, "/api/v1/generation", &photo_parts(&[])).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["task_id"], FAKE_TASK_ID);
    assert_eq!(data["stage"], "preview");
    assert_eq!(generator.submitted.lock().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn out_of_range_polycount_is_clamped_not_rejected(pool: PgPool) {
    let generator = FakeGenerator::new([(TaskStatus::Pending, None)]);
    let app = common::build_test_app(pool, generator.clone());

    let response = post_multipart(
        app,
        "/api/v1/generation",
        &photo_parts(&[("polycount", None, b"999999")]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    // The generator saw the clamped value, not the requested one.
    let submitted = generator.submitted.lock().unwrap();
    assert_eq!(submitted[0].target_polycount, 300_000);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_symmetry_falls_back_to_auto(pool: PgPool) {
    let generator = FakeGenerator::new([(TaskStatus::Pending, None)]);
    let app = common::build_test_app(pool, generator.clone());

    let response = post_multipart(
        app,
        "/api/v1/generation",
        &photo_parts(&[("symmetry", None, b"sideways")]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let submitted = generator.submitted.lock().unwrap();
    assert_eq!(submitted[0].symmetry_mode, dalma_meshy::SymmetryMode::Auto);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_photo_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool, FakeGenerator::succeeded());
    let parts: Vec<(&str, Option<&str>, &[u8])> = vec![("topology", None, b"quad")];
    let response = post_multipart(app, "/api/v1/generation", &parts).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Status and waiting
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn status_probe_reports_progress_without_urls(pool: PgPool) {
    let generator = FakeGenerator::new([(TaskStatus::Generating, Some(40))]);
    let app = common::build_test_app(pool, generator);

    let response = get(app, &format!("/api/v1/generation/{FAKE_TASK_ID}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["status"], "GENERATING");
    assert_eq!(data["progress"], 40);
    assert_eq!(data["model_urls"], json!({}));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wait_returns_succeeded_task_with_urls(pool: PgPool) {
    let generator = FakeGenerator::new([
        (TaskStatus::Pending, None),
        (TaskStatus::Generating, Some(60)),
        (TaskStatus::Succeeded, Some(100)),
    ]);
    let app = common::build_test_app(pool, generator);

    let response = get(app, &format!("/api/v1/generation/{FAKE_TASK_ID}/wait")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["status"], "SUCCEEDED");
    assert!(data["model_urls"]["glb"].is_string());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wait_times_out_when_budget_is_exhausted(pool: PgPool) {
    // Never reaches a terminal state within the 3-attempt test budget.
    let generator = FakeGenerator::new([(TaskStatus::Generating, Some(10))]);
    let app = common::build_test_app(pool, generator);

    let response = get(app, &format!("/api/v1/generation/{FAKE_TASK_ID}/wait")).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_error_code(&body_json(response).await, "GENERATION_TIMEOUT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wait_surfaces_generator_failure_as_bad_gateway(pool: PgPool) {
    let generator = FakeGenerator::new([
        (TaskStatus::Generating, Some(10)),
        (TaskStatus::Failed, None),
    ]);
    let app = common::build_test_app(pool, generator);

    let response = get(app, &format!("/api/v1/generation/{FAKE_TASK_ID}/wait")).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_error_code(&body_json(response).await, "GENERATION_FAILED");
}

// ---------------------------------------------------------------------------
// Refine
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn refine_requires_succeeded_preview(pool: PgPool) {
    let generator = FakeGenerator::new([(TaskStatus::Generating, Some(50))]);
    let app = common::build_test_app(pool, generator);

    let response = post_empty(app, &format!("/api/v1/generation/{FAKE_TASK_ID}/refine")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_error_code(&body_json(response).await, "RESULT_NOT_READY");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn refine_starts_a_new_task(pool: PgPool) {
    let generator = FakeGenerator::succeeded();
    let app = common::build_test_app(pool, generator.clone());

    let response = post_empty(app, &format!("/api/v1/generation/{FAKE_TASK_ID}/refine")).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["task_id"], FAKE_REFINE_ID);
    assert_eq!(data["stage"], "refine");
    assert_eq!(generator.refines.lock().unwrap()[0], FAKE_TASK_ID);
}

// ---------------------------------------------------------------------------
// Artifact download
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn download_before_success_is_a_conflict(pool: PgPool) {
    let generator = FakeGenerator::new([(TaskStatus::Pending, None)]);
    let app = common::build_test_app(pool, generator);

    let response = get(app, &format!("/api/v1/generation/{FAKE_TASK_ID}/model")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_error_code(&body_json(response).await, "RESULT_NOT_READY");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn download_unproduced_format_lists_available(pool: PgPool) {
    let app = common::build_test_app(pool, FakeGenerator::succeeded());

    // The scripted task produced glb and obj only.
    let response = get(
        app,
        &format!("/api/v1/generation/{FAKE_TASK_ID}/model?format=usdz"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_error_code(&json, "UNSUPPORTED_FORMAT");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("glb"), "message should list formats: {message}");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn download_unknown_format_name_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool, FakeGenerator::succeeded());

    let response = get(
        app,
        &format!("/api/v1/generation/{FAKE_TASK_ID}/model?format=stl"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error_code(&body_json(response).await, "BAD_REQUEST");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn download_serves_bytes_with_format_content_type(pool: PgPool) {
    let app = common::build_test_app(pool, FakeGenerator::succeeded());

    let response = get(app, &format!("/api/v1/generation/{FAKE_TASK_ID}/model")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "model/gltf-binary"
    );
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains(".glb"));
    assert_eq!(body_bytes(response).await, FAKE_ARTIFACT);
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

fn save_body() -> serde_json::Value {
    json!({
        "name": "Fido",
        "breed": "Labrador",
        "description": "Generated from a photo",
        "tags": ["dog"],
    })
}

#[sqlx::test(migrations = "../db/migrations")]
async fn save_before_success_is_a_conflict(pool: PgPool) {
    let generator = FakeGenerator::new([(TaskStatus::Generating, Some(70))]);
    let app = common::build_test_app(pool, generator);

    let response = post_json(
        app,
        &format!("/api/v1/generation/{FAKE_TASK_ID}/save"),
        save_body(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_error_code(&body_json(response).await, "RESULT_NOT_READY");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn save_creates_generation_linked_asset(pool: PgPool) {
    let app = common::build_test_app(pool.clone(), FakeGenerator::succeeded());

    let response = post_json(
        app,
        &format!("/api/v1/generation/{FAKE_TASK_ID}/save"),
        save_body(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let asset = body_json(response).await["data"].clone();
    assert_eq!(asset["name"], "Fido");
    assert_eq!(asset["generated_from_image"], true);
    assert_eq!(asset["meshy_task_id"], FAKE_TASK_ID);
    assert_eq!(asset["model_filename"], "fido.glb");

    // Saving the same task again returns the same asset.
    let first_id = asset["id"].as_i64().unwrap();
    let app = common::build_test_app(pool, FakeGenerator::succeeded());
    let response = post_json(
        app,
        &format!("/api/v1/generation/{FAKE_TASK_ID}/save"),
        save_body(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let again = body_json(response).await["data"].clone();
    assert_eq!(again["id"].as_i64().unwrap(), first_id);
}
