mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    create_test_material, create_test_school, create_test_subject, create_test_user,
    generate_unique_material_title, generate_unique_school_name, generate_unique_subject_name,
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
async fn test_create_material(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;
    let subject = create_test_subject(&mut tx, &generate_unique_subject_name(), "ELEMENTARY").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;
    let title = generate_unique_material_title();

    let request = Request::builder()
        .method("POST")
        .uri("/api/materials")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "name": title,
                "gradeLevel": 3,
                "quantity": 120,
                "source": "Division Office",
                "subjectId": subject.id
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["title"], title);
    assert_eq!(body["data"]["name"], title);
    assert_eq!(body["data"]["gradeLevel"], 3);
    assert_eq!(body["data"]["quantity"], 120);
    // The stage is copied from the owning subject.
    assert_eq!(body["data"]["educationStage"], "ELEMENTARY");
    assert_eq!(body["data"]["subject"]["id"], subject.id.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_material_accepts_string_grade_level(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;
    let subject = create_test_subject(&mut tx, &generate_unique_subject_name(), "JUNIOR_HIGH").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/materials")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "name": generate_unique_material_title(),
                "gradeLevel": "8",
                "subjectId": subject.id
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["data"]["gradeLevel"], 8);
    assert_eq!(body["data"]["quantity"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_material_grade_out_of_range(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;
    let subject = create_test_subject(&mut tx, &generate_unique_subject_name(), "ELEMENTARY").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    for grade in [0, 13] {
        let app = setup_test_app(pool.clone()).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/materials")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(
                serde_json::to_string(&json!({
                    "name": generate_unique_material_title(),
                    "gradeLevel": grade,
                    "subjectId": subject.id
                }))
                .unwrap(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "Grade level must be between 1 and 12");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_material_missing_fields(pool: PgPool) {
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
        .uri("/api/materials")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "quantity": 10
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Name, grade level, and subject are required");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_material_unknown_subject(pool: PgPool) {
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
        .uri("/api/materials")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "name": generate_unique_material_title(),
                "gradeLevel": 5,
                "subjectId": uuid::Uuid::new_v4()
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Subject not found");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_materials_filtered_by_search(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;
    let subject = create_test_subject(&mut tx, &generate_unique_subject_name(), "ELEMENTARY").await;
    create_test_material(&mut tx, "Alpha Reading Workbook", 2, 40, subject.id, "ELEMENTARY").await;
    create_test_material(&mut tx, "Numeracy Drill Cards", 2, 40, subject.id, "ELEMENTARY").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/materials?search=reading")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let materials = body["data"].as_array().unwrap();

    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0]["title"], "Alpha Reading Workbook");
    assert_eq!(body["pagination"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_materials_pagination_meta(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;
    let subject = create_test_subject(&mut tx, &generate_unique_subject_name(), "ELEMENTARY").await;
    for i in 0..5 {
        create_test_material(
            &mut tx,
            &format!("Paged Material {}", i),
            3,
            10,
            subject.id,
            "ELEMENTARY",
        )
        .await;
    }

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/materials?page=2&limit=2&search=Paged")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["page"], 2);
    assert_eq!(body["pagination"]["limit"], 2);
    assert_eq!(body["pagination"]["total"], 5);
    assert_eq!(body["pagination"]["totalPages"], 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_material_detail_includes_issuances(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    let user = create_test_user(&mut tx, &username, password, "USER").await;
    let subject = create_test_subject(&mut tx, &generate_unique_subject_name(), "ELEMENTARY").await;
    let material =
        create_test_material(&mut tx, &generate_unique_material_title(), 3, 90, subject.id, "ELEMENTARY")
            .await;
    let school = create_test_school(&mut tx, &generate_unique_school_name(), "Compostela").await;

    sqlx::query("INSERT INTO issuances (material_id, school_id, user_id, quantity) VALUES ($1, $2, $3, $4)")
        .bind(material.id)
        .bind(school.id)
        .bind(user.id)
        .bind(15)
        .execute(&mut *tx)
        .await
        .unwrap();

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/api/materials/{}", material.id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(body["data"]["id"], material.id.to_string());
    let issuances = body["data"]["issuances"].as_array().unwrap();
    assert_eq!(issuances.len(), 1);
    assert_eq!(issuances[0]["quantity"], 15);
    assert_eq!(issuances[0]["school"]["id"], school.id.to_string());
    assert_eq!(issuances[0]["user"]["username"], username);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_nonexistent_material(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/api/materials/{}", uuid::Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Material not found");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_material_subject_resyncs_stage(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;
    let elem = create_test_subject(&mut tx, &generate_unique_subject_name(), "ELEMENTARY").await;
    let junior = create_test_subject(&mut tx, &generate_unique_subject_name(), "JUNIOR_HIGH").await;
    let material =
        create_test_material(&mut tx, &generate_unique_material_title(), 6, 30, elem.id, "ELEMENTARY")
            .await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("PUT")
        .uri(&format!("/api/materials/{}", material.id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "gradeLevel": 7,
                "subjectId": junior.id
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(body["data"]["gradeLevel"], 7);
    assert_eq!(body["data"]["subjectId"], junior.id.to_string());
    // Moving the material to a junior-high subject re-syncs the copy.
    assert_eq!(body["data"]["educationStage"], "JUNIOR_HIGH");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_material_quantity(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;
    let subject = create_test_subject(&mut tx, &generate_unique_subject_name(), "ELEMENTARY").await;
    let material =
        create_test_material(&mut tx, &generate_unique_material_title(), 3, 30, subject.id, "ELEMENTARY")
            .await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("PUT")
        .uri(&format!("/api/materials/{}", material.id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            serde_json::to_string(&json!({
                "quantity": 75
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["data"]["quantity"], 75);
    assert_eq!(body["data"]["title"], material.title);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_material(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    create_test_user(&mut tx, &username, password, "USER").await;
    let subject = create_test_subject(&mut tx, &generate_unique_subject_name(), "ELEMENTARY").await;
    let material =
        create_test_material(&mut tx, &generate_unique_material_title(), 3, 30, subject.id, "ELEMENTARY")
            .await;

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool.clone()).await;

    let request = Request::builder()
        .method("DELETE")
        .uri(&format!("/api/materials/{}", material.id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Material deleted successfully");

    let remaining = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM materials WHERE id = $1")
        .bind(material.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_material_with_issuances_blocked(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();

    let username = generate_unique_username();
    let password = "testpass123";
    let user = create_test_user(&mut tx, &username, password, "USER").await;
    let subject = create_test_subject(&mut tx, &generate_unique_subject_name(), "ELEMENTARY").await;
    let material =
        create_test_material(&mut tx, &generate_unique_material_title(), 3, 90, subject.id, "ELEMENTARY")
            .await;
    let school = create_test_school(&mut tx, &generate_unique_school_name(), "Monkayo").await;

    sqlx::query("INSERT INTO issuances (material_id, school_id, user_id, quantity) VALUES ($1, $2, $3, $4)")
        .bind(material.id)
        .bind(school.id)
        .bind(user.id)
        .bind(10)
        .execute(&mut *tx)
        .await
        .unwrap();

    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app, &username, password).await;

    let app = setup_test_app(pool).await;

    let request = Request::builder()
        .method("DELETE")
        .uri(&format!("/api/materials/{}", material.id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Cannot delete material with existing issuance(s)");
}
