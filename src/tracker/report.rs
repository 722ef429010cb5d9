use std::time::Duration;

use crate::common::types::UserId;

/// Renders an elapsed time as zero-padded `HH:MM:SS`. Hours widen past two
/// digits rather than wrapping.
pub fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// The message posted when a participant's session closes.
pub fn session_report(user: UserId, elapsed: Duration) -> String {
    format!(
        "{} spent {} in the voice channel",
        user.mention(),
        format_duration(elapsed)
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
