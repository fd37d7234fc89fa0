//! Run lifecycle and control transitions.
//!
//! ```text
//!            start                 (next tick)           final vector
//!   Idle ───────────▶ Loading ─────────────────▶ Running ─────────────▶ Done
//!    ▲                                                                    │
//!    │ reset low                        start                             │
//! Resetting ◀──── reset high (from any state)     Done ──────▶ Loading ◀──┘
//! ```
//!
//! [`transition`] covers every edge driven by control inputs and is a pure
//! function. The Running → Done edge depends on the datapath and is taken by
//! the controller after the final vector is collected.

use std::fmt;

use crate::signals::TickInputs;

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    /// Waiting for start; the stream is ignored
    #[default]
    Idle,
    /// Reset held; datapath cleared every tick
    Resetting,
    /// Configuration cloned, window primed; Running next tick
    Loading,
    /// Consuming the stream
    Running,
    /// Final vector emitted; waits for reset or start
    Done,
}

impl RunState {
    /// True if a start pulse would begin a run.
    pub const fn accepts_start(self) -> bool {
        matches!(self, Self::Idle | Self::Done)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Resetting => write!(f, "Resetting"),
            Self::Loading => write!(f, "Loading"),
            Self::Running => write!(f, "Running"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Next state from control inputs alone.
///
/// Reset dominates everything. A start pulse is ignored unless the run is
/// idle or finished, so a run in flight can never be re-armed.
pub fn transition(state: RunState, inputs: &TickInputs) -> RunState {
    if inputs.reset {
        return RunState::Resetting;
    }
    match state {
        RunState::Resetting => RunState::Idle,
        RunState::Loading => RunState::Running,
        RunState::Idle | RunState::Done if inputs.start => RunState::Loading,
        other => other,
    }
}
