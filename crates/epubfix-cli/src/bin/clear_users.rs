use anyhow::{Context, Result};
use clap::Parser;
use epubfix_db::{UploadRepository, UploadStore, UserRepository, UserStore};
use sqlx::postgres::PgPoolOptions;

#[derive(Parser, Debug)]
#[command(name = "clear_users")]
#[command(about = "Delete every upload record and every user from the database")]
struct Args {
    /// Skip the confirmation check
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    epubfix_cli::init_tracing();

    let args = Args::parse();
    if !args.yes {
        eprintln!("This deletes ALL users and their upload records. Re-run with --yes to proceed.");
        std::process::exit(1);
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    // Uploads reference users, so they go first.
    let uploads = UploadRepository::new(pool.clone()).delete_all().await?;
    let users = UserRepository::new(pool.clone()).delete_all().await?;

    tracing::info!(uploads, users, "Database cleared");
    println!("Deleted {} upload records", uploads);
    println!("Deleted {} users", users);

    pool.close().await;
    Ok(())
}
