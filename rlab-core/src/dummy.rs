//! This module is used for tests.
//!
//! Small, fully deterministic environments used across the workspace to
//! exercise the agents without pulling in real simulation backends.
use crate::{ContinuousEnv, Env, FeatureEnv, TabularEnv, VectorEnv};
use ndarray::Array1;

/// Movement actions of [`DummyGridEnv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridAction {
    /// Move one column left.
    Left,
    /// Move one row up.
    Up,
    /// Move one column right.
    Right,
    /// Move one row down.
    Down,
}

impl GridAction {
    /// All actions, in tie-breaking order.
    pub const ALL: [GridAction; 4] = [
        GridAction::Left,
        GridAction::Up,
        GridAction::Right,
        GridAction::Down,
    ];
}

/// A 4x4 grid world with a start cell, hole cells, and a goal cell.
///
/// Every move costs -1; reaching the goal yields +200 and falling into a
/// hole yields -100, both ending the episode. Moves into a wall leave the
/// position unchanged. Transitions are deterministic; only
/// [`Env::random_action`] draws randomness (via `fastrand`, so tests can
/// seed it globally).
pub struct DummyGridEnv {
    grid: [&'static str; 4],
    start: (usize, usize),
    goal: (usize, usize),
    current: (usize, usize),
    states: Vec<(usize, usize)>,
}

impl DummyGridEnv {
    /// Constructs the grid world at its start state.
    pub fn new() -> Self {
        let grid = ["SFFF", "FHFH", "FFFH", "HFFG"];
        let mut start = (0, 0);
        let mut goal = (0, 0);
        let mut states = Vec::with_capacity(16);
        for (row, line) in grid.iter().enumerate() {
            for (col, cell) in line.chars().enumerate() {
                states.push((row, col));
                match cell {
                    'S' => start = (row, col),
                    'G' => goal = (row, col),
                    _ => {}
                }
            }
        }
        Self {
            grid,
            start,
            goal,
            current: start,
            states,
        }
    }

    /// The start cell.
    pub fn start_state(&self) -> (usize, usize) {
        self.start
    }

    /// The goal cell.
    pub fn goal_state(&self) -> (usize, usize) {
        self.goal
    }

    fn cell(&self, state: (usize, usize)) -> char {
        self.grid[state.0].as_bytes()[state.1] as char
    }

    fn neighbor(&self, state: (usize, usize), act: GridAction) -> (usize, usize) {
        let (row, col) = state;
        match act {
            GridAction::Left if col > 0 => (row, col - 1),
            GridAction::Up if row > 0 => (row - 1, col),
            GridAction::Right if col < 3 => (row, col + 1),
            GridAction::Down if row < 3 => (row + 1, col),
            _ => state,
        }
    }
}

impl Default for DummyGridEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Env for DummyGridEnv {
    type Obs = (usize, usize);
    type Act = GridAction;

    fn current_state(&self) -> Self::Obs {
        self.current
    }

    fn execute_action(&mut self, act: &Self::Act) -> (Self::Obs, f32, bool) {
        self.current = self.neighbor(self.current, *act);
        let (reward, done) = match self.cell(self.current) {
            'G' => (200.0, true),
            'H' => (-100.0, true),
            _ => (-1.0, false),
        };
        (self.current, reward, done)
    }

    fn random_action(&mut self) -> Self::Act {
        GridAction::ALL[fastrand::usize(..GridAction::ALL.len())]
    }

    fn restart_environment(&mut self) {
        self.current = self.start;
    }
}

impl TabularEnv for DummyGridEnv {
    fn state_space(&self) -> &[Self::Obs] {
        &self.states
    }

    fn action_space(&self) -> &[Self::Act] {
        &GridAction::ALL
    }

    fn is_terminal(&self, state: &Self::Obs) -> bool {
        matches!(self.cell(*state), 'G' | 'H')
    }
}

impl FeatureEnv for DummyGridEnv {
    fn num_features(&self) -> usize {
        2
    }

    /// Features: whether a wall or a hole lies in the direction of the action.
    fn feature_vector(&self, state: &Self::Obs, act: &Self::Act) -> Array1<f32> {
        let next = self.neighbor(*state, *act);
        let wall_ahead = if next == *state { 1.0 } else { 0.0 };
        let hole_ahead = if next != *state && self.cell(next) == 'H' {
            1.0
        } else {
            0.0
        };
        Array1::from(vec![wall_ahead, hole_ahead])
    }
}

/// A five-cell corridor observed as a one-element vector.
///
/// Action 0 moves left, action 1 moves right; reaching the rightmost cell
/// yields +1 and ends the episode, every other move yields 0.
pub struct DummyVecEnv {
    pos: usize,
}

impl DummyVecEnv {
    /// Constructs the corridor at its leftmost cell.
    pub fn new() -> Self {
        Self { pos: 0 }
    }
}

impl Default for DummyVecEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Env for DummyVecEnv {
    type Obs = Vec<f32>;
    type Act = usize;

    fn current_state(&self) -> Self::Obs {
        vec![self.pos as f32]
    }

    fn execute_action(&mut self, act: &Self::Act) -> (Self::Obs, f32, bool) {
        match act {
            0 if self.pos > 0 => self.pos -= 1,
            1 if self.pos < 4 => self.pos += 1,
            _ => {}
        }
        let done = self.pos == 4;
        let reward = if done { 1.0 } else { 0.0 };
        (self.current_state(), reward, done)
    }

    fn random_action(&mut self) -> Self::Act {
        fastrand::usize(..2)
    }

    fn restart_environment(&mut self) {
        self.pos = 0;
    }
}

impl VectorEnv for DummyVecEnv {
    fn obs_dim(&self) -> usize {
        1
    }

    fn n_actions(&self) -> usize {
        2
    }
}

/// A point on a line pushed around by a bounded one-dimensional force.
///
/// The reward is the negated distance from the origin; the episode ends when
/// the point drifts out of `[-1, 1]`.
pub struct DummyContinuousEnv {
    pos: f32,
}

impl DummyContinuousEnv {
    /// Constructs the environment at the origin.
    pub fn new() -> Self {
        Self { pos: 0.0 }
    }
}

impl Default for DummyContinuousEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl ContinuousEnv for DummyContinuousEnv {
    fn current_state(&self) -> Vec<f32> {
        vec![self.pos]
    }

    fn execute_action(&mut self, act: &[f32]) -> (Vec<f32>, f32, Vec<f32>, bool) {
        let origin = self.current_state();
        self.pos += 0.1 * act[0].clamp(-1.0, 1.0);
        let done = self.pos.abs() >= 1.0;
        (origin, -self.pos.abs(), self.current_state(), done)
    }

    fn random_action(&mut self) -> Vec<f32> {
        vec![2.0 * fastrand::f32() - 1.0]
    }

    fn restart_environment(&mut self) {
        self.pos = 0.0;
    }

    fn obs_dim(&self) -> usize {
        1
    }

    fn act_dim(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_rewards_and_termination() {
        let mut env = DummyGridEnv::new();
        let (state, reward, done) = env.execute_action(&GridAction::Right);
        assert_eq!(state, (0, 1));
        assert_eq!(reward, -1.0);
        assert!(!done);

        // (1, 1) is a hole.
        let (_, reward, done) = env.execute_action(&GridAction::Down);
        assert_eq!(reward, -100.0);
        assert!(done);

        env.restart_environment();
        assert_eq!(env.current_state(), env.start_state());
    }

    #[test]
    fn grid_walls_keep_position() {
        let mut env = DummyGridEnv::new();
        let (state, _, _) = env.execute_action(&GridAction::Up);
        assert_eq!(state, (0, 0));
    }

    #[test]
    fn grid_features_flag_walls_and_holes() {
        let env = DummyGridEnv::new();
        let fv = env.feature_vector(&(0, 0), &GridAction::Up);
        assert_eq!(fv, Array1::from(vec![1.0, 0.0]));
        let fv = env.feature_vector(&(0, 1), &GridAction::Down);
        assert_eq!(fv, Array1::from(vec![0.0, 1.0]));
    }
}
