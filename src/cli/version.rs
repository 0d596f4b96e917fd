use anyhow::Result;
use colored::Colorize;
use tracing::Dispatch;

use super::CURRENT_VERSION;
use super::upgrade::build_updater;
use crate::config::UpdateConfig;
use crate::upgrade::UpdateNotification;

/// Print the version, followed by an update banner when one is pending.
pub async fn execute(config: &UpdateConfig, dispatch: Dispatch) -> Result<()> {
    println!("tasklog {CURRENT_VERSION}");

    if config.check_on_startup {
        let updater = build_updater(config, dispatch, config.verify_checksum);
        if let Some(notification) = updater.pending_notice(CURRENT_VERSION, &config.channel).await {
            eprintln!("{}", update_banner(&notification));
        }
    }

    Ok(())
}

/// Passive "you're out of date" message.
pub(crate) fn update_banner(notification: &UpdateNotification) -> String {
    let kind = if notification.is_prerelease {
        "pre-release"
    } else {
        "release"
    };
    format!(
        "{} tasklog {} is available (you have {}). {}\nRun `tasklog upgrade` to install it, \
         or `tasklog upgrade --dismiss` to hide this message.",
        format!("A new {kind}:").yellow(),
        notification.latest_version.bold(),
        notification.current_version,
        notification.release_url
    )
}
