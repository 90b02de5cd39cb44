use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use lrims::cli::create_admin_user;
use lrims::cli::seeder::seed_database;

#[derive(Parser)]
#[command(name = "lrims-cli")]
#[command(about = "LRIMS CLI - Administrative tools for LRIMS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new administrator account
    CreateAdmin {
        /// Username for the admin account
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// Display name of the admin
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed the database with the starter dataset
    Seed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let cli = Cli::parse();

    match cli.command {
        Commands::CreateAdmin {
            username,
            name,
            password,
        } => handle_create_admin(&pool, username, name, password).await,
        Commands::Seed => handle_seed(&pool).await,
    }
}

async fn handle_create_admin(
    pool: &sqlx::postgres::PgPool,
    username: Option<String>,
    name: Option<String>,
    password: Option<String>,
) {
    // Use provided values or prompt interactively
    let username = username.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Username")
            .interact_text()
            .expect("Failed to read username")
    });

    let name = name.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Display name")
            .interact_text()
            .expect("Failed to read name")
    });

    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .expect("Failed to read password")
    });

    match create_admin_user(pool, &username, &name, &password).await {
        Ok(_) => {
            println!("\n✅ Admin account created successfully!");
            println!("   Username: {}", username);
            println!("   Name: {}", name);
        }
        Err(e) => {
            eprintln!("\n❌ Error creating admin account: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_seed(pool: &sqlx::postgres::PgPool) {
    match seed_database(pool).await {
        Ok(_) => {}
        Err(e) => {
            eprintln!("\n❌ Error seeding database: {}", e);
            std::process::exit(1);
        }
    }
}
