//! Seeds the database with a starter dataset: the default admin account,
//! a core subject catalog, and a handful of schools and materials.
//!
//! Every insert is idempotent (conflict targets or existence checks), so
//! the command can be re-run against a populated database without
//! duplicating rows.

use sqlx::PgPool;
use std::time::Instant;

use crate::modules::materials::model::format_grade_level;
use crate::modules::schools::model::SchoolType;
use crate::modules::subjects::model::EducationStage;
use crate::modules::users::model::UserRole;
use crate::utils::password::hash_password;

const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "admin123";
const ADMIN_NAME: &str = "System Administrator";

const SUBJECTS: [(&str, EducationStage); 6] = [
    ("English", EducationStage::Elementary),
    ("Mathematics", EducationStage::Elementary),
    ("Science", EducationStage::Elementary),
    ("Filipino", EducationStage::Elementary),
    ("English", EducationStage::JuniorHigh),
    ("Mathematics", EducationStage::JuniorHigh),
];

const SCHOOLS: [(&str, SchoolType, &str, i32, &str); 3] = [
    (
        "Compostela Central Elementary School",
        SchoolType::Elementary,
        "Compostela",
        1,
        "Urban",
    ),
    (
        "Monkayo National High School",
        SchoolType::Secondary,
        "Monkayo",
        2,
        "Urban",
    ),
    (
        "Nabunturan Integrated School",
        SchoolType::Integrated,
        "Nabunturan",
        1,
        "Urban",
    ),
];

/// (title, grade level, quantity, source, subject name, subject stage)
const MATERIALS: [(&str, i32, i32, &str, &str, EducationStage); 3] = [
    (
        "English Learner's Material Grade 3",
        3,
        500,
        "DepEd Central",
        "English",
        EducationStage::Elementary,
    ),
    (
        "Mathematics Textbook Grade 4",
        4,
        350,
        "DepEd Central",
        "Mathematics",
        EducationStage::Elementary,
    ),
    (
        "English Activity Sheets Grade 5",
        5,
        1000,
        "Division Office",
        "English",
        EducationStage::Elementary,
    ),
];

/// Seeds the admin user, subjects, schools and materials in dependency
/// order (materials reference subjects by name and stage).
pub async fn seed_database(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🌱 Starting database seed...");

    seed_admin(db).await?;
    seed_subjects(db).await?;
    seed_schools(db).await?;
    seed_materials(db).await?;

    println!(
        "\n🎉 Database seeded successfully in {:?}",
        start_time.elapsed()
    );
    println!(
        "📝 Default admin credentials: {} / {}",
        ADMIN_USERNAME, ADMIN_PASSWORD
    );
    Ok(())
}

async fn seed_admin(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let hashed_password = hash_password(ADMIN_PASSWORD)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let result = sqlx::query(
        "INSERT INTO users (username, password, name, role)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(ADMIN_USERNAME)
    .bind(hashed_password)
    .bind(ADMIN_NAME)
    .bind(UserRole::Admin)
    .execute(db)
    .await?;

    if result.rows_affected() > 0 {
        println!("✅ Created admin user: {}", ADMIN_USERNAME);
    } else {
        println!("   ✓ Admin user already exists, skipping");
    }
    Ok(())
}

async fn seed_subjects(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let mut created = 0;
    for (name, stage) in SUBJECTS {
        let result = sqlx::query(
            "INSERT INTO subjects (name, category, education_stage)
             VALUES ($1, 'Core', $2)
             ON CONFLICT (name, education_stage) DO NOTHING",
        )
        .bind(name)
        .bind(stage)
        .execute(db)
        .await?;
        created += result.rows_affected();
    }
    println!("✅ Created {} subjects", created);
    Ok(())
}

async fn seed_schools(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let mut created = 0;
    for (schoolname, schooltype, municipality, district, zone) in SCHOOLS {
        // school_id ("SCH-%06d") is allocated by the column default.
        let result = sqlx::query(
            "INSERT INTO schools (schoolname, schooltype, municipality, congressional_district, zone)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (lower(schoolname), lower(municipality)) DO NOTHING",
        )
        .bind(schoolname)
        .bind(schooltype)
        .bind(municipality)
        .bind(district)
        .bind(zone)
        .execute(db)
        .await?;
        created += result.rows_affected();
    }
    println!("✅ Created {} schools", created);
    Ok(())
}

async fn seed_materials(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let mut created = 0;
    for (title, grade_level, quantity, source, subject_name, subject_stage) in MATERIALS {
        let subject_id = sqlx::query_scalar::<_, uuid::Uuid>(
            "SELECT id FROM subjects WHERE name = $1 AND education_stage = $2",
        )
        .bind(subject_name)
        .bind(subject_stage)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| format!("Subject '{}' ({}) not seeded", subject_name, subject_stage))?;

        // Materials carry no unique constraint; guard on the title instead.
        let result = sqlx::query(
            "INSERT INTO materials (title, grade_level, education_stage, quantity, source, subject_id)
             SELECT $1, $2, $3, $4, $5, $6
             WHERE NOT EXISTS (SELECT 1 FROM materials WHERE title = $1)",
        )
        .bind(title)
        .bind(format_grade_level(grade_level))
        .bind(subject_stage)
        .bind(quantity)
        .bind(source)
        .bind(subject_id)
        .execute(db)
        .await?;
        created += result.rows_affected();
    }
    println!("✅ Created {} materials", created);
    Ok(())
}
