use lrims::utils::password::hash_password;
#[allow(unused_imports)]
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[allow(dead_code)]
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub password: String,
}

#[allow(dead_code)]
pub struct TestSubject {
    pub id: Uuid,
    pub name: String,
}

#[allow(dead_code)]
pub struct TestSchool {
    pub id: Uuid,
    pub schoolname: String,
}

#[allow(dead_code)]
pub struct TestMaterial {
    pub id: Uuid,
    pub title: String,
}

/// Create a test user with the given role ("ADMIN" or "USER").
pub async fn create_test_user(
    tx: &mut Transaction<'_, Postgres>,
    username: &str,
    password: &str,
    role: &str,
) -> TestUser {
    let hashed = hash_password(password).unwrap();

    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (username, password, name, role)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(username)
    .bind(hashed)
    .bind("Test User")
    .bind(role)
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    TestUser {
        id,
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[allow(dead_code)]
pub async fn create_test_subject(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    education_stage: &str,
) -> TestSubject {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO subjects (name, category, education_stage)
         VALUES ($1, $2, $3)
         RETURNING id",
    )
    .bind(name)
    .bind("Core")
    .bind(education_stage)
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    TestSubject {
        id,
        name: name.to_string(),
    }
}

#[allow(dead_code)]
pub async fn create_test_school(
    tx: &mut Transaction<'_, Postgres>,
    schoolname: &str,
    municipality: &str,
) -> TestSchool {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO schools (schoolname, schooltype, municipality, congressional_district, zone)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(schoolname)
    .bind("ELEMENTARY")
    .bind(municipality)
    .bind(1)
    .bind("Urban")
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    TestSchool {
        id,
        schoolname: schoolname.to_string(),
    }
}

/// education_stage must match the owning subject's stage.
#[allow(dead_code)]
pub async fn create_test_material(
    tx: &mut Transaction<'_, Postgres>,
    title: &str,
    grade_level: i32,
    quantity: i32,
    subject_id: Uuid,
    education_stage: &str,
) -> TestMaterial {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO materials (title, grade_level, education_stage, quantity, source, subject_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(title)
    .bind(format!("Grade {}", grade_level))
    .bind(education_stage)
    .bind(quantity)
    .bind("Test Source")
    .bind(subject_id)
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    TestMaterial {
        id,
        title: title.to_string(),
    }
}

pub fn generate_unique_username() -> String {
    format!("user-{}", Uuid::new_v4())
}

#[allow(dead_code)]
pub fn generate_unique_subject_name() -> String {
    format!("Subject {}", Uuid::new_v4())
}

#[allow(dead_code)]
pub fn generate_unique_school_name() -> String {
    format!("Test School {}", Uuid::new_v4())
}

#[allow(dead_code)]
pub fn generate_unique_material_title() -> String {
    format!("Material {}", Uuid::new_v4())
}
