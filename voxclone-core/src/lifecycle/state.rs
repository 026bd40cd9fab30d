use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::poller::TerminalState;

/// Where one voice-clone instance is in its lifecycle.
///
/// `Idle -> Submitting -> Processing -> {Ready, Error, NotFound}`; any
/// state returns to `Idle` on reset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CloneState {
    #[default]
    Idle,
    Submitting,
    Processing,
    Ready,
    Error,
    NotFound,
}

impl CloneState {
    /// States from which a new submission may start.
    pub fn accepts_submit(self) -> bool {
        matches!(self, Self::Idle | Self::Error | Self::NotFound)
    }

    /// A clone in flight: submitted but not yet settled.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Submitting | Self::Processing)
    }
}

impl From<TerminalState> for CloneState {
    fn from(terminal: TerminalState) -> Self {
        match terminal {
            TerminalState::Ready => Self::Ready,
            TerminalState::Error => Self::Error,
            TerminalState::NotFound => Self::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn string_forms() {
        assert_eq!(CloneState::NotFound.to_string(), "not_found");
        assert_eq!(CloneState::from_str("processing").unwrap(), CloneState::Processing);
    }

    #[test]
    fn submit_is_only_accepted_when_settled_unsuccessfully_or_idle() {
        assert!(CloneState::Idle.accepts_submit());
        assert!(CloneState::Error.accepts_submit());
        assert!(CloneState::NotFound.accepts_submit());
        assert!(!CloneState::Submitting.accepts_submit());
        assert!(!CloneState::Processing.accepts_submit());
        assert!(!CloneState::Ready.accepts_submit());
    }
}
