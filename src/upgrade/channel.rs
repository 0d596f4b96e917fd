//! Release channel selection.

use super::Version;

/// Pre-release channels a running build can stay on by default.
pub const KNOWN_CHANNELS: [&str; 3] = ["alpha", "beta", "rc"];

/// The configuration value that explicitly selects the stable channel.
pub const STABLE: &str = "stable";

/// Decide which release channel to query.
///
/// - A configured channel other than `""` or `"stable"` always wins.
/// - Otherwise a build on a known pre-release channel keeps following it.
/// - Everything else checks stable releases, signalled by `""`.
///
/// Unrecognised pre-release labels such as `1.0.0-dev` are treated as stable.
///
/// # Examples
///
/// ```
/// use tasklog::upgrade::{Version, determine_channel};
///
/// let current = Version::parse("1.0.0-alpha.1").unwrap();
/// assert_eq!(determine_channel(&current, ""), "alpha");
/// assert_eq!(determine_channel(&current, "beta"), "beta");
/// ```
#[must_use]
pub fn determine_channel(current: &Version, configured: &str) -> String {
    if !configured.is_empty() && configured != STABLE {
        return configured.to_string();
    }

    match current.channel() {
        Some(channel) if KNOWN_CHANNELS.contains(&channel) => channel.to_string(),
        _ => String::new(),
    }
}
