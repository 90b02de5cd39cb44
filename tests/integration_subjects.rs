mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    create_test_material, create_test_subject, create_test_user, generate_unique_subject_name,
    generate_unique_username,
};
use http_body_util::BodyExt;
use lrims::config::cors::CorsConfig;
use lrims::config::jwt::JwtConfig;
use lrims::router::init_router;
use lrims::state::AppState;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

async fn setup_test_app(pool: PgPool) -> axum::Router {
    dotenvy::dotenv().ok();
    let state = AppState {
        db: pool,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
    };
    init_router(state)
}

async fn get_auth_token(app: axum::Router, username: &str, password: &str) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&json!({
                "username": username,
                "password": password
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    body["data"]["token"].as_str().unwrap().to_string()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_subject(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;
    let subject_name = generate_unique_subject_name();

    let request = Request::builder()
        .method("POST")
        .uri("/api/subjects")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "name": subject_name,
                "category": "Core",
                "educationStage": "ELEMENTARY"
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], subject_name);
    assert_eq!(body["data"]["category"], "Core");
    assert_eq!(body["data"]["educationStage"], "ELEMENTARY");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_subject_duplicate_name_and_stage(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;

    let subject_name = generate_unique_subject_name();
    create_test_subject(&mut tx, &subject_name, "ELEMENTARY").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/subjects")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "name": subject_name,
                "educationStage": "ELEMENTARY"
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body["message"],
        "A subject with this name already exists for this education stage"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_subject_same_name_different_stage(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;

    let subject_name = generate_unique_subject_name();
    create_test_subject(&mut tx, &subject_name, "ELEMENTARY").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/subjects")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "name": subject_name,
                "educationStage": "JUNIOR_HIGH"
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["data"]["educationStage"], "JUNIOR_HIGH");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_subject_empty_name(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/subjects")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "name": "",
                "educationStage": "ELEMENTARY"
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Name and education stage are required");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_subject_missing_stage(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/subjects")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "name": generate_unique_subject_name()
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_all_subjects_includes_material_count(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;

    let subject_name = generate_unique_subject_name();
    let subject = create_test_subject(&mut tx, &subject_name, "ELEMENTARY").await;
    create_test_material(&mut tx, "Reader A", 3, 100, subject.id, "ELEMENTARY").await;
    create_test_material(&mut tx, "Reader B", 4, 50, subject.id, "ELEMENTARY").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/subjects")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let subjects = body["data"].as_array().unwrap();

    let entry = subjects
        .iter()
        .find(|s| s["name"] == subject_name)
        .expect("created subject should be listed");
    assert_eq!(entry["materialCount"], 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_subjects_without_materials_count_zero(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;

    let subject_name = generate_unique_subject_name();
    create_test_subject(&mut tx, &subject_name, "SENIOR_HIGH").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/subjects")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let subjects = body["data"].as_array().unwrap();

    let entry = subjects.iter().find(|s| s["name"] == subject_name).unwrap();
    assert_eq!(entry["materialCount"], 0);
}
