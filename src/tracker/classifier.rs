use crate::common::types::ChannelId;
use crate::protocol::events::VoiceEvent;

/// Which voice channels count toward a tracked session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchScope {
    /// Track one channel; movement anywhere else is invisible.
    Channel(ChannelId),
    /// Track presence in any voice channel; moves between two channels do
    /// not end the session.
    AnyChannel,
}

/// What one voice transition means relative to the watched scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Join,
    Leave,
    Irrelevant,
}

impl WatchScope {
    /// Classify a transition. Pure: no state, no side effects.
    ///
    /// Under [`WatchScope::Channel`], a join requires the previous channel to
    /// differ from the target: mute and deafen toggles arrive as voice-state
    /// updates with an unchanged channel and must not reset the clock.
    pub fn classify(&self, event: &VoiceEvent) -> Classification {
        match *self {
            WatchScope::Channel(target) => {
                let was_in = event.previous == Some(target);
                let is_in = event.current == Some(target);
                if is_in && !was_in {
                    Classification::Join
                } else if was_in && !is_in {
                    Classification::Leave
                } else {
                    Classification::Irrelevant
                }
            }
            WatchScope::AnyChannel => match (event.previous, event.current) {
                (None, Some(_)) => Classification::Join,
                (Some(_), None) => Classification::Leave,
                _ => Classification::Irrelevant,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::UserId;

    const TARGET: ChannelId = ChannelId(10);
    const OTHER: ChannelId = ChannelId(20);
    const ELSEWHERE: ChannelId = ChannelId(30);

    fn event(previous: Option<ChannelId>, current: Option<ChannelId>) -> VoiceEvent {
        VoiceEvent {
            user: UserId(1),
            previous,
            current,
        }
    }

    #[test]
    fn test_single_channel_entry_is_join() {
        let scope = WatchScope::Channel(TARGET);
        assert_eq!(
            scope.classify(&event(None, Some(TARGET))),
            Classification::Join
        );
        assert_eq!(
            scope.classify(&event(Some(OTHER), Some(TARGET))),
            Classification::Join
        );
    }

    #[test]
    fn test_single_channel_exit_is_leave() {
        let scope = WatchScope::Channel(TARGET);
        assert_eq!(
            scope.classify(&event(Some(TARGET), None)),
            Classification::Leave
        );
        assert_eq!(
            scope.classify(&event(Some(TARGET), Some(OTHER))),
            Classification::Leave
        );
    }

    #[test]
    fn test_same_channel_update_is_irrelevant() {
        // Mute/deafen toggles keep the channel unchanged.
        let scope = WatchScope::Channel(TARGET);
        assert_eq!(
            scope.classify(&event(Some(TARGET), Some(TARGET))),
            Classification::Irrelevant
        );
    }

    #[test]
    fn test_movement_outside_the_target_is_irrelevant() {
        let scope = WatchScope::Channel(TARGET);
        assert_eq!(
            scope.classify(&event(None, Some(OTHER))),
            Classification::Irrelevant
        );
        assert_eq!(
            scope.classify(&event(Some(OTHER), Some(ELSEWHERE))),
            Classification::Irrelevant
        );
        assert_eq!(
            scope.classify(&event(Some(OTHER), None)),
            Classification::Irrelevant
        );
    }

    #[test]
    fn test_any_channel_first_join_and_final_leave() {
        let scope = WatchScope::AnyChannel;
        assert_eq!(
            scope.classify(&event(None, Some(OTHER))),
            Classification::Join
        );
        assert_eq!(
            scope.classify(&event(Some(OTHER), None)),
            Classification::Leave
        );
    }

    #[test]
    fn test_any_channel_switch_is_irrelevant() {
        let scope = WatchScope::AnyChannel;
        assert_eq!(
            scope.classify(&event(Some(OTHER), Some(ELSEWHERE))),
            Classification::Irrelevant
        );
        assert_eq!(
            scope.classify(&event(Some(OTHER), Some(OTHER))),
            Classification::Irrelevant
        );
        assert_eq!(
            scope.classify(&event(None, None)),
            Classification::Irrelevant
        );
    }
}
