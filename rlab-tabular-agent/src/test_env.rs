//! Deterministic two-state environment for unit tests.
//!
//! State `0` with action `1` moves to state `1` for reward `1`; every other
//! transition pays nothing and lands in state `0`, so the ring can be walked
//! forever. `random_action` cycles through the action space, making "random"
//! exploration fully deterministic.
use rlab_core::{Env, TabularEnv};

pub struct RingEnv {
    state: usize,
    next_action: usize,
    states: Vec<usize>,
    actions: Vec<usize>,
}

impl RingEnv {
    pub fn new() -> Self {
        Self {
            state: 0,
            next_action: 0,
            states: vec![0, 1],
            actions: vec![0, 1],
        }
    }
}

impl Env for RingEnv {
    type Obs = usize;
    type Act = usize;

    fn current_state(&self) -> Self::Obs {
        self.state
    }

    fn execute_action(&mut self, act: &Self::Act) -> (Self::Obs, f32, bool) {
        let reward = if self.state == 0 && *act == 1 { 1.0 } else { 0.0 };
        self.state = if self.state == 0 && *act == 1 { 1 } else { 0 };
        (self.state, reward, false)
    }

    fn random_action(&mut self) -> Self::Act {
        let act = self.actions[self.next_action % self.actions.len()];
        self.next_action += 1;
        act
    }

    fn restart_environment(&mut self) {
        self.state = 0;
    }
}

impl TabularEnv for RingEnv {
    fn state_space(&self) -> &[Self::Obs] {
        &self.states
    }

    fn action_space(&self) -> &[Self::Act] {
        &self.actions
    }
}
