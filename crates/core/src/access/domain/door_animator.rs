use crate::access::domain::access_state_machine::AccessState;
use crate::recognition::domain::detection::IdentityId;
use crate::recognition::domain::identity_directory::IdentityDirectory;

/// What the rendering collaborator draws for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoorView {
    /// 0.0 = fully closed, 1.0 = fully open.
    pub open_ratio: f64,
    /// Identity the door is currently open for.
    pub identity: Option<IdentityId>,
}

impl DoorView {
    pub fn caption(&self, directory: &IdentityDirectory) -> String {
        match self.identity {
            Some(id) => format!("Door Unlocked - {}", directory.display_name(id)),
            None => "Door Locked".to_string(),
        }
    }
}

/// Fixed-step door animation, one step per tick.
///
/// The ratio moves toward open while the state is `Open` and toward closed
/// otherwise, so a decision flip never makes the door jump.
#[derive(Clone, Debug)]
pub struct DoorAnimator {
    steps: u32,
    step: u32,
}

impl DoorAnimator {
    pub fn new(steps: u32) -> Self {
        Self { steps, step: 0 }
    }

    pub fn advance(&mut self, state: &AccessState) -> DoorView {
        if state.is_open() {
            self.step = (self.step + 1).min(self.steps);
        } else {
            self.step = self.step.saturating_sub(1);
        }

        let open_ratio = if self.steps == 0 {
            if state.is_open() {
                1.0
            } else {
                0.0
            }
        } else {
            self.step as f64 / self.steps as f64
        };

        DoorView {
            open_ratio,
            identity: state.identity().filter(|_| state.is_open()),
        }
    }
}
