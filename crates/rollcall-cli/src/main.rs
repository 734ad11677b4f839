use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance daemon CLI")]
struct Cli {
    /// Base URL of the rollcall daemon
    #[arg(long, default_value = "http://127.0.0.1:8750", env = "ROLLCALL_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check in by submitting an image for face recognition
    CheckIn {
        /// Path to the capture image (JPEG or PNG)
        #[arg(short, long)]
        image: String,
        #[arg(long)]
        latitude: Option<f64>,
        #[arg(long)]
        longitude: Option<f64>,
        /// Work mode: "wfo" or "wfh"
        #[arg(long)]
        work_mode: Option<String>,
        #[arg(long)]
        home_lat: Option<f64>,
        #[arg(long)]
        home_lng: Option<f64>,
    },
    /// Check out the current user's attendance record for today
    CheckOut {
        #[arg(short, long)]
        user_id: String,
        #[arg(long)]
        latitude: Option<f64>,
        #[arg(long)]
        longitude: Option<f64>,
    },
    /// List attendance records, newest first
    Attendance,
    /// List staff live locations
    Locations,
    /// Push a live-location update for a staff member
    UpdateLocation {
        #[arg(short, long)]
        user_id: String,
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        latitude: f64,
        #[arg(long)]
        longitude: f64,
    },
    /// Launch a background scan and print its id
    Scan,
    /// Poll a scan's status
    ScanStatus { scan_id: String },
    /// Drop a scan entry from the registry
    ClearScan { scan_id: String },
    /// Show daemon health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/').to_string();

    match cli.command {
        Commands::CheckIn {
            image,
            latitude,
            longitude,
            work_mode,
            home_lat,
            home_lng,
        } => {
            let bytes = std::fs::read(&image).with_context(|| format!("reading {image}"))?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            let body = json!({
                "image": encoded,
                "latitude": latitude,
                "longitude": longitude,
                "work_mode": work_mode,
                "home_lat": home_lat,
                "home_lng": home_lng,
            });
            let resp = post_json(&client, &format!("{base}/recognize"), &body).await?;
            print_json(&resp);
        }
        Commands::CheckOut {
            user_id,
            latitude,
            longitude,
        } => {
            let body = json!({
                "userId": user_id,
                "latitude": latitude,
                "longitude": longitude,
            });
            let resp = post_json(&client, &format!("{base}/checkout"), &body).await?;
            print_json(&resp);
        }
        Commands::Attendance => {
            let resp = get_json(&client, &format!("{base}/get-attendance")).await?;
            print_json(&resp);
        }
        Commands::Locations => {
            let resp = get_json(&client, &format!("{base}/api/staff-live-locations")).await?;
            print_json(&resp);
        }
        Commands::UpdateLocation {
            user_id,
            name,
            latitude,
            longitude,
        } => {
            let body = json!({
                "userId": user_id,
                "name": name,
                "latitude": latitude,
                "longitude": longitude,
            });
            let resp = post_json(&client, &format!("{base}/api/update-location"), &body).await?;
            print_json(&resp);
        }
        Commands::Scan => {
            let resp = get_json(&client, &format!("{base}/scan")).await?;
            print_json(&resp);
        }
        Commands::ScanStatus { scan_id } => {
            let resp = get_json(&client, &format!("{base}/scan-status/{scan_id}")).await?;
            print_json(&resp);
        }
        Commands::ClearScan { scan_id } => {
            let resp = get_json(&client, &format!("{base}/clear-scan/{scan_id}")).await?;
            print_json(&resp);
        }
        Commands::Status => {
            let resp = get_json(&client, &format!("{base}/health")).await?;
            print_json(&resp);
        }
    }

    Ok(())
}

async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    let resp = client.get(url).send().await.context("request failed")?;
    resp.json().await.context("invalid response body")
}

async fn post_json(client: &reqwest::Client, url: &str, body: &Value) -> Result<Value> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .context("request failed")?;
    resp.json().await.context("invalid response body")
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}
