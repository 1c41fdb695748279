use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target URL (e.g., http://localhost:8000)
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Number of voters (voting codes) to simulate
    #[arg(short, long, default_value_t = 100)]
    voters: usize,

    /// Number of concurrent voters
    #[arg(short, long, default_value_t = 10)]
    concurrency: usize,

    /// Admin password
    #[arg(short, long, default_value = "password")]
    password: String,

    /// Name for the election session opened by the code batch
    #[arg(short, long, default_value = "Load Test Election")]
    session_name: String,

    /// Create a small roster of positions and candidates if none exists
    #[arg(long, default_value_t = true)]
    seed: bool,

    /// Close the election and fetch final results when all ballots are in
    #[arg(long, default_value_t = true)]
    close: bool,
}

#[derive(Serialize)]
struct AdminLoginRequest {
    password: String,
}

#[derive(Serialize)]
struct GenerateCodesRequest {
    quantity: i64,
    session_name: String,
}

#[derive(Deserialize, Debug)]
struct CodeRow {
    code: String,
}

#[derive(Deserialize, Debug)]
struct CodePageResponse {
    codes: Vec<CodeRow>,
    total_pages: i64,
}

#[derive(Serialize)]
struct PositionRequest {
    name: String,
}

#[derive(Serialize)]
struct CandidateRequest {
    full_name: String,
    class_name: String,
    gender: String,
    photo_url: Option<String>,
    position_id: i32,
}

#[derive(Deserialize, Debug)]
struct Position {
    id: i32,
}

#[derive(Serialize)]
struct RedeemCodeRequest {
    code: String,
}

#[derive(Deserialize, Debug)]
struct BallotCandidate {
    id: i32,
}

#[derive(Deserialize, Debug)]
struct BallotPosition {
    position: Position,
    candidates: Vec<BallotCandidate>,
}

#[derive(Serialize)]
struct BallotRequest {
    selections: HashMap<i32, i32>,
}

struct Counters {
    success: AtomicUsize,
    failure: AtomicUsize,
    double_rejected: AtomicUsize,
}

async fn run_voter(client: &Client, base_url: &str, code: &str, counters: &Counters) -> Result<()> {
    // 1. Redeem the code
    client
        .post(format!("{}/api/vote/redeem", base_url))
        .json(&RedeemCodeRequest {
            code: code.to_string(),
        })
        .send()
        .await
        .context("Failed to send redeem request")?
        .error_for_status()
        .context("Code redemption failed")?;

    // 2. Fetch the ballot and pick a random candidate per position
    let ballot: Vec<BallotPosition> = client
        .get(format!("{}/api/vote/ballot", base_url))
        .send()
        .await
        .context("Failed to fetch ballot")?
        .error_for_status()
        .context("Ballot fetch failed")?
        .json()
        .await
        .context("Failed to parse ballot")?;

    let mut selections = HashMap::new();
    {
        let mut rng = rand::thread_rng();
        for group in &ballot {
            if let Some(candidate) = group.candidates.choose(&mut rng) {
                selections.insert(group.position.id, candidate.id);
            }
        }
    }

    // 3. Submit the ballot
    client
        .post(format!("{}/api/vote", base_url))
        .json(&BallotRequest {
            selections: selections.clone(),
        })
        .send()
        .await
        .context("Failed to send ballot")?
        .error_for_status()
        .context("Ballot submission failed")?;

    // 4. Resubmit with the spent code: the single-use gate must reject it
    let second = client
        .post(format!("{}/api/vote/redeem", base_url))
        .json(&RedeemCodeRequest {
            code: code.to_string(),
        })
        .send()
        .await
        .context("Failed to send duplicate redeem")?;

    if !second.status().is_success() {
        counters.double_rejected.fetch_add(1, Ordering::Relaxed);
    }

    Ok(())
}

async fn seed_roster(client: &Client, base_url: &str) -> Result<()> {
    let positions: Vec<Position> = client
        .get(format!("{}/api/admin/positions", base_url))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if !positions.is_empty() {
        return Ok(());
    }

    for (position_name, candidates) in [
        ("President", ["Ama Mensah", "Kofi Boateng", "Esi Owusu"]),
        ("Secretary", ["Yaw Darko", "Akosua Asante", "Kwame Addo"]),
    ] {
        let position_id: i32 = client
            .post(format!("{}/api/admin/positions", base_url))
            .json(&PositionRequest {
                name: position_name.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        for (i, full_name) in candidates.iter().enumerate() {
            client
                .post(format!("{}/api/admin/candidates", base_url))
                .json(&CandidateRequest {
                    full_name: full_name.to_string(),
                    class_name: format!("Form {}", i + 1),
                    gender: if i % 2 == 0 { "Female" } else { "Male" }.to_string(),
                    photo_url: None,
                    position_id,
                })
                .send()
                .await?
                .error_for_status()?;
        }
    }

    println!("🌱 Seeded roster with 2 positions and 6 candidates");
    Ok(())
}

async fn fetch_all_codes(client: &Client, base_url: &str) -> Result<Vec<String>> {
    let mut codes = Vec::new();
    let mut page = 1;

    loop {
        let response: CodePageResponse = client
            .get(format!("{}/api/admin/codes?page={}", base_url, page))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        codes.extend(response.codes.into_iter().map(|row| row.code));

        if page >= response.total_pages {
            break;
        }
        page += 1;
    }

    Ok(codes)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("🚀 Starting load test against {}", args.url);
    println!("👥 Voters: {}", args.voters);
    println!("⚡ Concurrency: {}", args.concurrency);

    let admin_client = Client::builder()
        .cookie_store(true)
        .build()
        .context("Failed to build admin client")?;

    // Login first
    admin_client
        .post(format!("{}/api/admin/login", args.url))
        .json(&AdminLoginRequest {
            password: args.password.clone(),
        })
        .send()
        .await
        .context("Failed to send login request")?
        .error_for_status()
        .context("Failed to login as admin")?;

    println!("🔑 Logged in as admin");

    if args.seed {
        seed_roster(&admin_client, &args.url).await?;
    }

    // Clear any leftover batch; a ledger with used codes refuses the reset,
    // and a fresh one has nothing to reset. Both are fine to ignore here.
    let _ = admin_client
        .delete(format!("{}/api/admin/codes", args.url))
        .send()
        .await;

    admin_client
        .post(format!("{}/api/admin/codes", args.url))
        .json(&GenerateCodesRequest {
            quantity: args.voters as i64,
            session_name: args.session_name.clone(),
        })
        .send()
        .await
        .context("Failed to generate codes")?
        .error_for_status()
        .context("Code generation failed (reset refused? codes already used?)")?;

    println!("🎫 Generated {} voting codes", args.voters);

    let codes = fetch_all_codes(&admin_client, &args.url).await?;
    anyhow::ensure!(
        codes.len() == args.voters,
        "Expected {} codes, got {}",
        args.voters,
        codes.len()
    );

    let base_url = Arc::new(args.url.clone());
    let counters = Arc::new(Counters {
        success: AtomicUsize::new(0),
        failure: AtomicUsize::new(0),
        double_rejected: AtomicUsize::new(0),
    });

    let pb = ProgressBar::new(args.voters as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let start_time = Instant::now();

    let results = stream::iter(codes)
        .map(|code| {
            let base_url = base_url.clone();
            let counters = counters.clone();
            let pb = pb.clone();

            async move {
                // Dedicated client per voter to isolate cookies
                let client = Client::builder().cookie_store(true).build().unwrap();

                match run_voter(&client, &base_url, &code, &counters).await {
                    Ok(_) => {
                        counters.success.fetch_add(1, Ordering::Relaxed);
                        pb.set_message(format!(
                            "Success: {}",
                            counters.success.load(Ordering::Relaxed)
                        ));
                    }
                    Err(_e) => {
                        counters.failure.fetch_add(1, Ordering::Relaxed);
                        pb.set_message(format!(
                            "Errors: {}",
                            counters.failure.load(Ordering::Relaxed)
                        ));
                    }
                }
                pb.inc(1);
            }
        })
        .buffer_unordered(args.concurrency)
        .collect::<Vec<()>>();

    results.await;

    pb.finish_with_message("Done");

    let duration = start_time.elapsed();
    let successes = counters.success.load(Ordering::Relaxed);
    let failures = counters.failure.load(Ordering::Relaxed);
    let doubles = counters.double_rejected.load(Ordering::Relaxed);
    let rps = successes as f64 / duration.as_secs_f64();

    println!("\n📊 Results:");
    println!("   Time taken: {:?}", duration);
    println!("   Ballots attempted: {}", args.voters);
    println!("   Successful ballots: {}", successes);
    println!("   Failed ballots: {}", failures);
    println!("   Duplicate redemptions rejected: {}", doubles);
    println!("   Throughput: {:.2} ballots/sec", rps);

    if args.close {
        admin_client
            .post(format!("{}/api/admin/election/close", args.url))
            .send()
            .await
            .context("Failed to close election")?
            .error_for_status()
            .context("Election close failed")?;

        let report: serde_json::Value = admin_client
            .get(format!("{}/api/admin/results/final", args.url))
            .send()
            .await?
            .error_for_status()
            .context("Final results fetch failed")?
            .json()
            .await?;

        println!("\n🏁 Election closed. Final results:");
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
