//! Online actor-critic with linear function approximation.
use crate::softmax::{random_weights, SoftmaxPolicy};
use anyhow::Result;
use log::trace;
use ndarray::Array1;
use rand::{rngs::StdRng, SeedableRng};
use rlab_core::{Agent, AgentKind, FeatureEnv};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    hash::Hash,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ActorCritic`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ActorCriticConfig {
    /// Discount factor.
    pub gamma: f32,

    /// Learning rate of the actor (policy parameters).
    pub alpha: f32,

    /// Learning rate of the critic (value parameters).
    pub beta: f32,

    /// Seed of the agent's RNG.
    pub seed: u64,
}

impl Default for ActorCriticConfig {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            alpha: 0.1,
            beta: 0.1,
            seed: 42,
        }
    }
}

impl ActorCriticConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the actor learning rate.
    pub fn alpha(mut self, v: f32) -> Self {
        self.alpha = v;
        self
    }

    /// Sets the critic learning rate.
    pub fn beta(mut self, v: f32) -> Self {
        self.beta = v;
        self
    }

    /// Sets the seed of the agent's RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`ActorCriticConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ActorCriticConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Actor-critic agent with a linear softmax actor and a linear critic
/// `Q(s, a) = w . phi(s, a)`.
///
/// Updates happen online, every step, with single-step bootstrapping and no
/// eligibility traces.
pub struct ActorCritic<E: FeatureEnv>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    env: E,
    gamma: f32,
    alpha: f32,
    beta: f32,
    policy: SoftmaxPolicy,
    w: Array1<f32>,
    rng: StdRng,
}

impl<E: FeatureEnv> ActorCritic<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    /// Constructs the agent around an environment.
    pub fn new(env: E, config: ActorCriticConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let policy = SoftmaxPolicy::new(env.num_features(), &mut rng);
        let w = random_weights(env.num_features(), &mut rng);
        Self {
            env,
            gamma: config.gamma,
            alpha: config.alpha,
            beta: config.beta,
            policy,
            w,
            rng,
        }
    }

    /// Executes the given action.
    ///
    /// Returns the new state, the reward, and whether the episode ended.
    pub fn step(&mut self, act: &E::Act) -> (E::Obs, f32, bool) {
        self.env.execute_action(act)
    }

    /// Samples an action from the softmax distribution of the current
    /// state.
    pub fn select_action(&mut self) -> E::Act {
        let state = self.env.current_state();
        self.policy.sample_action(&self.env, &state, &mut self.rng)
    }

    /// Softmax probabilities of each action for the given state.
    pub fn action_probabilities(&self, state: &E::Obs) -> Array1<f32> {
        self.policy.action_probabilities(&self.env, state)
    }

    /// Score-function gradient of the log-policy for a state-action pair.
    pub fn compute_gradient(&self, state: &E::Obs, act: &E::Act) -> Array1<f32> {
        self.policy.compute_gradient(&self.env, state, act)
    }

    /// Critic estimate of the action value: `w . phi(state, act)`.
    pub fn q_value(&self, state: &E::Obs, act: &E::Act) -> f32 {
        self.env.feature_vector(state, act).dot(&self.w)
    }

    /// Applies one online actor-critic update from the current step of the
    /// episode:
    /// the actor moves along `gradient * Q(s, a)`, the critic along the
    /// single-step temporal-difference error.
    pub fn update_weights(
        &mut self,
        gradient: &Array1<f32>,
        state: &E::Obs,
        act: &E::Act,
        reward: f32,
        new_state: &E::Obs,
        new_act: &E::Act,
    ) {
        let q_sa = self.q_value(state, act);
        self.policy.apply_update(&(gradient * (self.alpha * q_sa)));

        let delta = reward + self.gamma * self.q_value(new_state, new_act) - q_sa;
        trace!("td error = {}", delta);
        self.w
            .scaled_add(self.beta * delta, &self.env.feature_vector(state, act));
    }

    /// Softmax probability vectors for every state of the state space, for
    /// display only.
    pub fn get_all_softmax_probabilities(&self) -> HashMap<E::Obs, Array1<f32>> {
        self.policy.all_action_probabilities(&self.env)
    }

    /// Read-only view of the actor parameters.
    pub fn theta(&self) -> &Array1<f32> {
        self.policy.theta()
    }

    /// Read-only view of the critic parameters.
    pub fn w(&self) -> &Array1<f32> {
        &self.w
    }

    /// The wrapped environment.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: FeatureEnv> Agent for ActorCritic<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    fn kind(&self) -> AgentKind {
        AgentKind::ActorCritic
    }

    fn reset(&mut self) {
        self.policy.reset(&mut self.rng);
        self.w = random_weights(self.w.len(), &mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlab_core::dummy::{DummyGridEnv, GridAction};

    #[test]
    fn update_follows_the_two_timescale_rule() {
        let config = ActorCriticConfig::default().gamma(0.5).alpha(0.1).beta(0.2);
        let mut agent = ActorCritic::new(DummyGridEnv::new(), config);

        let state = (0, 0);
        let new_state = (0, 1);
        let act = GridAction::Right;
        let new_act = GridAction::Down;

        let gradient = agent.compute_gradient(&state, &act);
        let q_sa = agent.q_value(&state, &act);
        let q_next = agent.q_value(&new_state, &new_act);
        let theta_before = agent.theta().clone();
        let w_before = agent.w().clone();

        agent.update_weights(&gradient, &state, &act, 1.0, &new_state, &new_act);

        let expected_theta = &theta_before + &(&gradient * (0.1 * q_sa));
        let diff = (agent.theta() - &expected_theta).mapv(f32::abs).sum();
        assert!(diff < 1e-6);

        let delta = 1.0 + 0.5 * q_next - q_sa;
        let fv = DummyGridEnv::new().feature_vector(&state, &act);
        let expected_w = &w_before + &(&fv * (0.2 * delta));
        let diff = (agent.w() - &expected_w).mapv(f32::abs).sum();
        assert!(diff < 1e-6);
    }

    #[test]
    fn critic_is_linear_in_the_features() {
        let agent = ActorCritic::new(DummyGridEnv::new(), ActorCriticConfig::default());
        let fv = DummyGridEnv::new().feature_vector(&(0, 0), &GridAction::Up);
        let expected = fv.dot(agent.w());
        assert!((agent.q_value(&(0, 0), &GridAction::Up) - expected).abs() < 1e-6);
    }

    #[test]
    fn gradient_has_feature_dimensionality() {
        let agent = ActorCritic::new(DummyGridEnv::new(), ActorCriticConfig::default());
        let grad = agent.compute_gradient(&(1, 0), &GridAction::Up);
        assert_eq!(grad.len(), 2);
    }

    #[test]
    fn reset_redraws_both_parameter_vectors() {
        let mut agent = ActorCritic::new(DummyGridEnv::new(), ActorCriticConfig::default());
        let theta_before = agent.theta().clone();
        let w_before = agent.w().clone();
        agent.reset();
        assert_ne!(agent.theta(), &theta_before);
        assert_ne!(agent.w(), &w_before);
    }
}
