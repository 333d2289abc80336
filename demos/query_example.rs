//! Runs a command and an iterative query against a BaseX server.
//!
//! Configure via BASEX_HOST, BASEX_PORT, BASEX_USER, BASEX_PASSWORD (or .env).
//! Run with: RUST_LOG=basex_thin_rs=debug cargo run --example query_example

use basex_thin_rs::{ConnectParams, Session};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    dotenvy::dotenv().ok();

    let host = std::env::var("BASEX_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("BASEX_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(1984);
    let username = std::env::var("BASEX_USER").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("BASEX_PASSWORD").unwrap_or_else(|_| "admin".to_string());

    println!("Connecting to {}:{} as {}...", host, port, username);
    let session =
        Session::connect_with_params(&ConnectParams::new(host, port), &username, &password).await?;

    println!("\n--- Command ---");
    println!("{}", session.execute("xquery 1+1").await?);
    println!("{}", session.info());

    println!("\n--- Iterative query ---");
    let mut query = session
        .query("for $i in 1 to 10 return <xml>Text { $i }</xml>")
        .await?;
    while query.more().await? {
        println!("{}", query.value()?);
    }
    query.close().await?;
    drop(query);

    session.close().await?;
    println!("\nDone!");
    Ok(())
}
