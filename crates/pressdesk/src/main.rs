// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pressdesk - answers journalist source requests with human-reviewed replies.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod reapprove;
mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pressdesk_core::types::DraftId;

/// Pressdesk - answers journalist source requests with human-reviewed replies.
#[derive(Parser, Debug)]
#[command(name = "pressdesk", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the mailbox and run the review loop until interrupted.
    Serve,
    /// Show request and draft counts and drafts whose send failed.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Approve a `send_failed` draft again and send it now.
    Reapprove {
        /// Id of the draft to re-approve.
        draft_id: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => pressdesk_config::load_and_validate_path(path),
        None => pressdesk_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            pressdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        Some(Commands::Reapprove { draft_id }) => {
            reapprove::run_reapprove(&config, DraftId(draft_id)).await
        }
        None => {
            println!("pressdesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["pressdesk", "reapprove", "42"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Reapprove { draft_id: 42 })));

        let cli = Cli::try_parse_from(["pressdesk", "status", "--json", "--config", "p.toml"])
            .unwrap();
        assert!(matches!(cli.command, Some(Commands::Status { json: true })));
        assert_eq!(cli.config, Some(PathBuf::from("p.toml")));

        assert!(Cli::try_parse_from(["pressdesk", "reapprove", "abc"]).is_err());
    }

    #[test]
    fn default_config_is_valid() {
        let config = pressdesk_config::load_and_validate_str("").expect("defaults should validate");
        assert_eq!(config.service.name, "pressdesk");
    }
}
