//! Reveal run states.

use serde::Serialize;
use std::fmt;

/// Position of a run in the linear reveal sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealStage {
    Init,
    KeyResolved,
    Built,
    Completed,
    Digested,
    Signed,
    Broadcast,
    Done,
}

impl RevealStage {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::KeyResolved => "key_resolved",
            Self::Built => "built",
            Self::Completed => "completed",
            Self::Digested => "digested",
            Self::Signed => "signed",
            Self::Broadcast => "broadcast",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RevealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observable state of the most recent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Active(RevealStage),
    /// Terminal; `stage` is where the run stopped.
    Failed { stage: RevealStage, reason: String },
}

impl RunState {
    pub fn stage(&self) -> RevealStage {
        match self {
            Self::Active(stage) | Self::Failed { stage, .. } => *stage,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Active(RevealStage::Done) | Self::Failed { .. })
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::Active(RevealStage::Init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_are_ordered() {
        assert!(RevealStage::Init < RevealStage::KeyResolved);
        assert!(RevealStage::Digested < RevealStage::Signed);
        assert!(RevealStage::Broadcast < RevealStage::Done);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunState::default().is_terminal());
        assert!(RunState::Active(RevealStage::Done).is_terminal());
        let failed = RunState::Failed {
            stage: RevealStage::Digested,
            reason: "signer down".into(),
        };
        assert!(failed.is_terminal());
        assert_eq!(failed.stage(), RevealStage::Digested);
    }
}
