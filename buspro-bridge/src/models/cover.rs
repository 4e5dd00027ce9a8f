use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    Opening,
    Closing,
    Stopped,
}

/// Raw curtain status codes, resolved once from the relay wiring polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurtainCodes {
    pub opening: u8,
    pub closing: u8,
    pub stop: u8,
}

impl CurtainCodes {
    pub fn new(normally_closed: bool) -> Self {
        if normally_closed {
            Self {
                opening: 1,
                closing: 2,
                stop: 0,
            }
        } else {
            Self {
                opening: 2,
                closing: 1,
                stop: 0,
            }
        }
    }

    pub fn code(&self, motion: MotionState) -> u8 {
        match motion {
            MotionState::Opening => self.opening,
            MotionState::Closing => self.closing,
            MotionState::Stopped => self.stop,
        }
    }

    pub fn motion(&self, raw: u8) -> Option<MotionState> {
        if raw == self.opening {
            Some(MotionState::Opening)
        } else if raw == self.closing {
            Some(MotionState::Closing)
        } else if raw == self.stop {
            Some(MotionState::Stopped)
        } else {
            None
        }
    }
}

/// Position estimate of a cover.
///
/// Positions are percentages where 0 is fully closed and 100 fully open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverState {
    pub current_position: u8,
    pub target_position: u8,
    pub motion: MotionState,
}

impl CoverState {
    pub fn new(current_position: u8, target_position: u8) -> Self {
        Self {
            current_position: current_position.min(100),
            target_position: target_position.min(100),
            motion: MotionState::Stopped,
        }
    }

    /// Direction a move towards `target` has to take from the current estimate
    pub fn direction_to(&self, target: u8) -> MotionState {
        match target {
            0 => MotionState::Closing,
            100 => MotionState::Opening,
            _ if target > self.current_position => MotionState::Opening,
            _ if target < self.current_position => MotionState::Closing,
            _ => MotionState::Stopped,
        }
    }

    /// Whether a traversal in `motion` runs to the end stop instead of halting
    /// at the target
    pub fn is_full_run(&self, motion: MotionState) -> bool {
        let (current, target) = (self.current_position, self.target_position);
        match motion {
            MotionState::Opening => {
                target < current || target == 100 || (target == 0 && current == 0) || target == current
            }
            MotionState::Closing => {
                target > current || target == 0 || (target == 100 && current == 100) || target == current
            }
            MotionState::Stopped => false,
        }
    }
}
