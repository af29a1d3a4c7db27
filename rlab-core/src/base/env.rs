//! Environment contracts consumed by the agents.
use ndarray::Array1;
use std::hash::Hash;

/// Represents an environment, typically an MDP.
///
/// The agent drives the environment synchronously: one call to
/// [`Env::execute_action`] advances it by exactly one step. No method of this
/// trait suspends for I/O; pacing between steps is the caller's concern.
pub trait Env {
    /// Observation of the environment.
    type Obs: Clone;

    /// Action of the environment.
    type Act: Clone;

    /// Returns the current state.
    fn current_state(&self) -> Self::Obs;

    /// Executes an action, returning the new state, the reward, and whether
    /// the episode has terminated.
    fn execute_action(&mut self, act: &Self::Act) -> (Self::Obs, f32, bool);

    /// Samples an action uniformly from the action space.
    fn random_action(&mut self) -> Self::Act;

    /// Resets the environment to a (possibly randomized) start state.
    fn restart_environment(&mut self);
}

/// An environment with finite, enumerable state and action spaces.
///
/// Required by the tabular agents, whose tables are total over
/// [`TabularEnv::state_space`].
pub trait TabularEnv: Env {
    /// Enumerates the state space.
    fn state_space(&self) -> &[Self::Obs];

    /// Enumerates the action space.
    ///
    /// The order of this slice defines the tie-breaking order of greedy
    /// policy derivation: the first action with a strictly greater value
    /// wins.
    fn action_space(&self) -> &[Self::Act];

    /// Whether the given state is terminal or absorbing.
    ///
    /// Only used to pin Q-values of such states to zero when an agent
    /// resets its tables.
    fn is_terminal(&self, _state: &Self::Obs) -> bool {
        false
    }
}

/// A tabular environment that additionally represents state-action pairs as
/// feature vectors, for the linear policy-gradient agents.
pub trait FeatureEnv: TabularEnv
where
    Self::Obs: Eq + Hash,
    Self::Act: Eq + Hash,
{
    /// Dimensionality of the feature vectors.
    fn num_features(&self) -> usize;

    /// Returns the feature vector of a state-action pair.
    fn feature_vector(&self, state: &Self::Obs, act: &Self::Act) -> Array1<f32>;
}

/// A discrete-action environment observed as a fixed-size numeric vector,
/// for the deep value-based agents.
pub trait VectorEnv: Env<Obs = Vec<f32>, Act = usize> {
    /// Dimensionality of observations.
    fn obs_dim(&self) -> usize;

    /// Number of discrete actions.
    fn n_actions(&self) -> usize;
}

/// A continuous-control environment, for the deep deterministic agents.
///
/// `execute_action` returns `(origin_state, reward, new_state, done)`. The
/// tuple order differs from [`Env::execute_action`] and is kept as is; the
/// two families have always disagreed on it and unifying them would be a
/// behavior change for existing drivers, not a fix.
pub trait ContinuousEnv {
    /// Returns the current state.
    fn current_state(&self) -> Vec<f32>;

    /// Executes a bounded continuous action, returning the origin state, the
    /// reward, the new state, and whether the episode has terminated.
    fn execute_action(&mut self, act: &[f32]) -> (Vec<f32>, f32, Vec<f32>, bool);

    /// Samples an action uniformly within the action bounds.
    fn random_action(&mut self) -> Vec<f32>;

    /// Resets the environment to a (possibly randomized) start state.
    fn restart_environment(&mut self);

    /// Dimensionality of observations.
    fn obs_dim(&self) -> usize;

    /// Dimensionality of actions.
    fn act_dim(&self) -> usize;

    /// Lower and upper bound applied elementwise to actions.
    fn action_bounds(&self) -> (f32, f32) {
        (-1.0, 1.0)
    }
}
