use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One frame on the main gateway socket.
#[derive(Serialize, Deserialize, Debug)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayPayload {
    pub fn new(op: u8, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }
}

/// Outcome of a single WS session — tells the outer loop what to do next.
pub enum SessionOutcome {
    /// Reconnectable disconnect — try an Op 6 resume.
    Reconnect,
    /// Session invalid — start over with a fresh Op 2 Identify.
    Identify,
    /// Fatal close or shutdown request — stop entirely.
    Shutdown,
}

/// Close codes that allow an Op 6 resume (per the Discord gateway docs).
///
/// Note: `1006` is a *local* abnormal-close marker set by the WebSocket
/// library, not a gateway close code. It is handled in the WS read-error arm
/// and must NOT be listed here.
pub fn is_resumable_close(code: u16) -> bool {
    matches!(code, 4000..=4003 | 4005 | 4008)
}

/// Close codes that require a fresh Identify (Op 2) instead of Resume (Op 6).
///
/// - `4007`: Invalid sequence on resume
/// - `4009`: Session timed out
pub fn is_reidentify_close(code: u16) -> bool {
    matches!(code, 4007 | 4009)
}

/// Close codes that mean the session is dead and must not be retried.
///
/// - `4004`: Authentication failed
/// - `4010`..`4014`: sharding or intents misconfiguration
pub fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010..=4014)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_classes_are_disjoint() {
        for code in 4000..=4014u16 {
            let classes = [
                is_resumable_close(code),
                is_reidentify_close(code),
                is_fatal_close(code),
            ];
            assert!(
                classes.iter().filter(|&&c| c).count() <= 1,
                "code {} falls into multiple classes",
                code
            );
        }
    }

    #[test]
    fn test_auth_failure_is_fatal() {
        assert!(is_fatal_close(4004));
        assert!(!is_resumable_close(4004));
    }

    #[test]
    fn test_session_timeout_forces_reidentify() {
        assert!(is_reidentify_close(4009));
        assert!(is_reidentify_close(4007));
    }

    #[test]
    fn test_unknown_error_is_resumable() {
        assert!(is_resumable_close(4000));
    }
}
