// src/main.rs

//! # Certificate Registry - Main Entry Point
//!
//! Command-line front end for issuing, revoking and verifying certificates,
//! and for running the reference certificate API server.
//!
//! ## Environment Variables
//! - `RUST_LOG`: log filter (default: `info`)
//! - `CERTS_CLIENT__API_BASE_URL`: origin of the certificate API
//! - `CERTS_CLIENT__TOKEN_PATH`: where the admin credential is kept
//! - `CERTS_SERVER__JWT_SECRET`, `CERTS_SERVER__SIGNING_KEY`: server secrets
//!
//! A `.env` file in the working directory is loaded first.

use certificate_registry::config::Settings;
use clap::Parser;
use dotenv::dotenv;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    commands::run(cli, settings).await
}
