use anyhow::Result;
use clap::Parser;
use epubfix_cli::api_client::{ApiClient, DEFAULT_API_URL};
use epubfix_cli::truncate_string;
use epubfix_core::models::UploadRecordResponse;

#[derive(Parser, Debug)]
#[command(name = "list_uploads")]
#[command(about = "List your processed EPUBs through the API")]
struct Args {
    /// Session token (JWT) from /api/auth/login
    #[arg(long)]
    token: String,

    /// Base URL of the API
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Print raw JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    epubfix_cli::init_tracing();

    let args = Args::parse();
    let client = ApiClient::new(&args.api_url, &args.token)?;
    let uploads = client.list_uploads().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&uploads)?);
    } else {
        print_table(&uploads);
    }

    Ok(())
}

fn print_table(uploads: &[UploadRecordResponse]) {
    if uploads.is_empty() {
        println!("No uploads.");
        return;
    }

    println!(
        "{:<36}  {:<30}  {:<9}  {:>10}  {}",
        "ID", "TITLE", "STATUS", "SIZE", "CREATED"
    );
    for upload in uploads {
        println!(
            "{:<36}  {:<30}  {:<9}  {:>10}  {}",
            upload.id,
            truncate_string(&upload.title, 30),
            format!("{:?}", upload.status).to_lowercase(),
            upload.file_size,
            upload.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    println!("\n{} upload(s)", uploads.len());
}
