use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use tracing::{Dispatch, debug};

use super::CURRENT_VERSION;
use crate::config::UpdateConfig;
use crate::upgrade::{GithubReleaseSource, UpdateCheck, UpdateInfo, Updater, UpdaterBuilder};

/// Command-line arguments for the tasklog upgrade command.
///
/// # Command Modes
///
/// - **Check Only** (`--check`): report whether a newer release exists
/// - **Upgrade** (default): download, verify, and install after confirmation
/// - **Rollback** (`--rollback`): restore the binary saved by the last upgrade
/// - **Dismiss** (`--dismiss`): silence the update banner until the next release
///
/// # Examples
///
/// ```bash
/// tasklog upgrade --check
/// tasklog upgrade --channel beta
/// tasklog upgrade --yes
/// tasklog upgrade --rollback
/// ```
#[derive(Parser, Debug)]
pub struct UpgradeArgs {
    /// Only check whether an update is available
    #[arg(long, conflicts_with_all = ["rollback", "dismiss"])]
    pub check: bool,

    /// Release channel to follow (alpha, beta, rc, or stable)
    #[arg(long, value_name = "NAME")]
    pub channel: Option<String>,

    /// Upgrade without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Skip SHA256 verification of the downloaded binary
    #[arg(long)]
    pub no_verify: bool,

    /// Restore the binary saved by the last upgrade
    #[arg(long, conflicts_with = "dismiss")]
    pub rollback: bool,

    /// Hide the update notification for the current latest release
    #[arg(long)]
    pub dismiss: bool,
}

/// Build an updater for the configured release repository.
pub(crate) fn build_updater(
    config: &UpdateConfig,
    dispatch: Dispatch,
    verify_checksum: bool,
) -> Updater<GithubReleaseSource> {
    UpdaterBuilder::new(config.cache_dir())
        .check_interval(config.check_interval.as_str())
        .verify_checksum(verify_checksum)
        .log_dispatch(dispatch)
        .build(GithubReleaseSource::new(&config.owner, &config.repo))
}

/// Execute the upgrade command.
pub async fn execute(args: UpgradeArgs, config: &UpdateConfig, dispatch: Dispatch) -> Result<()> {
    let channel = args.channel.clone().unwrap_or_else(|| config.channel.clone());
    let verify_checksum = config.verify_checksum && !args.no_verify;
    let updater = build_updater(config, dispatch, verify_checksum);

    if args.rollback {
        return handle_rollback(&updater).await;
    }

    if args.dismiss {
        return handle_dismiss(&updater).await;
    }

    if args.check {
        return check_for_updates(&updater, &channel).await;
    }

    perform_upgrade(&updater, &channel, args.yes).await
}

async fn handle_rollback(updater: &Updater<GithubReleaseSource>) -> Result<()> {
    println!("{}", "Rolling back to previous version...".yellow());

    let backup_path = updater.backup_path().context("Failed to locate the tasklog binary")?;
    updater.rollback_upgrade(&backup_path).await.context("Failed to restore from backup")?;

    println!("{}", "Successfully rolled back to previous version".green());
    Ok(())
}

async fn handle_dismiss(updater: &Updater<GithubReleaseSource>) -> Result<()> {
    if updater.dismiss_update().await {
        println!("Update notification dismissed until the next release");
    } else {
        println!("No pending update notification");
    }
    Ok(())
}

async fn check_for_updates(updater: &Updater<GithubReleaseSource>, channel: &str) -> Result<()> {
    println!("{}", "Checking for updates...".cyan());

    let notification = updater
        .check_for_update(CURRENT_VERSION, channel)
        .await
        .context("Failed to check for updates")?;

    if notification.available {
        let label = if notification.is_prerelease {
            " (pre-release)"
        } else {
            ""
        };
        let headline = format!(
            "Update available: {} -> {}{}",
            notification.current_version, notification.latest_version, label
        );
        println!("{}", headline.green());
        println!("Release notes: {}", notification.release_url);
        println!("Run `tasklog upgrade` to install it");
    } else {
        let headline = format!("You are on the latest version ({})", notification.current_version);
        println!("{}", headline.green());
    }

    Ok(())
}

async fn perform_upgrade(
    updater: &Updater<GithubReleaseSource>,
    channel: &str,
    assume_yes: bool,
) -> Result<()> {
    println!("{}", "Checking for updates...".cyan());

    let info = match updater
        .get_update_info(CURRENT_VERSION, channel)
        .await
        .context("Failed to fetch release information")?
    {
        UpdateCheck::Available(info) => info,
        UpdateCheck::UpToDate {
            current_version, ..
        } => {
            println!("{}", format!("Already on the latest version ({current_version})").green());
            return Ok(());
        }
        UpdateCheck::DevelopmentBuild {
            version,
        } => {
            println!("Development build {version} cannot be upgraded automatically");
            return Ok(());
        }
    };

    let result = updater.perform_upgrade(&info, |prompt| confirm(prompt, &info, assume_yes)).await;

    match result {
        Ok(backup_path) => {
            println!("{}", format!("Upgraded tasklog to {}", info.latest_version).green());
            println!("Previous version saved to {}", backup_path.display());
            println!("Run `tasklog upgrade --rollback` to restore it");
            Ok(())
        }
        Err(failure) if failure.error.is_user_cancelled() => {
            println!("{}", "Upgrade cancelled".yellow());
            Ok(())
        }
        Err(failure) => {
            if let Some(backup_path) = &failure.backup_path {
                eprintln!("The previous version is saved at {}", backup_path.display());
                eprintln!("Run `tasklog upgrade --rollback` to restore it");
            }
            Err(anyhow::Error::new(failure.error).context("Upgrade failed"))
        }
    }
}

fn confirm(prompt: &str, info: &UpdateInfo, assume_yes: bool) -> bool {
    if assume_yes {
        println!("{}", info.summary());
        return true;
    }

    print!("{prompt} [y/N] ");
    if let Err(e) = io::stdout().flush() {
        debug!("Failed to flush stdout: {}", e);
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_affirmative(&answer),
        Err(e) => {
            debug!("Failed to read confirmation: {}", e);
            false
        }
    }
}

pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
