// ABOUTME: Tredict CLI - command-line access to the Tredict OAuth API
// ABOUTME: Handles one-time authorization, token refresh, resource queries and deregistration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers
//!
//! Usage:
//! ```bash
//! # Authorize once; prints the URL to open in a browser
//! tredict-cli authorize
//!
//! # List activities in a date range
//! tredict-cli activities --start-date 2025-01-01 --end-date 2025-02-01
//!
//! # Download the FIT file of an activity
//! tredict-cli activity-fit 123456 --output run.fit
//!
//! # Revoke the integration
//! tredict-cli deregister
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;
use tredict::logging;
use tredict::{ActivityListQuery, TredictClient, TredictConfig};

#[derive(Parser)]
#[command(
    name = "tredict-cli",
    about = "Tredict API command-line client",
    long_about = "Authorize against Tredict once, then query activities, body values and the user profile."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON config file (defaults to TREDICT_* environment variables)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interactive authorization flow and store the token
    Authorize,

    /// Force a token refresh
    Refresh,

    /// List activities
    Activities {
        /// Start of the range (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start_date: Option<DateTime<Utc>>,

        /// End of the range (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        end_date: Option<DateTime<Utc>>,

        /// Page number
        #[arg(long)]
        page: Option<u32>,

        /// Page size
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Show one activity in detail
    Activity {
        /// Activity id
        id: String,
    },

    /// Download the FIT file of an activity
    ActivityFit {
        /// Activity id
        id: String,

        /// Destination file
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Show body values
    BodyValues,

    /// Show the authorized user's profile
    Profile,

    /// Revoke the integration and remove the stored token
    Deregister,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env()?;

    let cli = Cli::parse();
    let config = TredictConfig::load(cli.config.as_deref())?;
    let client = TredictClient::new(config)?;

    match cli.command {
        Command::Authorize => {
            let code = client
                .request_auth_code_with(|url| println!("Open this URL to authorise: {url}"))
                .await
                .context("Authorization failed")?;
            let token = client.request_user_access_token(&code.code).await?;
            info!(path = %client.config().token_file.display(), "Token stored");
            println!("Authorised; access token valid until {}", token.expires_at);
        }
        Command::Refresh => {
            let token = client.refresh().await?;
            println!("Token refreshed; valid until {}", token.expires_at);
        }
        Command::Activities {
            start_date,
            end_date,
            page,
            page_size,
        } => {
            let query = ActivityListQuery {
                start_date,
                end_date,
                page,
                page_size,
            };
            print_json(&client.activity_list(&query).await?)?;
        }
        Command::Activity { id } => print_json(&client.activity(&id).await?)?,
        Command::ActivityFit { id, output } => {
            let bytes = client.activity_fit(&id).await?;
            fs::write(&output, &bytes)
                .await
                .with_context(|| format!("Cannot write {}", output.display()))?;
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
        Command::BodyValues => print_json(&client.body_values().await?)?,
        Command::Profile => print_json(&client.user_profile().await?)?,
        Command::Deregister => {
            client.deregister().await?;
            println!("Integration deregistered");
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("'{value}' is neither RFC 3339 nor YYYY-MM-DD"))
}
