//! Monte Carlo policy gradient (REINFORCE).
use crate::softmax::SoftmaxPolicy;
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

/// Configuration of [`Reinforce`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReinforceConfig {
    /// Discount factor.
    pub gamma: f32,

    /// Learning rate of the policy parameters.
    pub alpha: f32,

    /// Seed of the agent's RNG.
    pub seed: u64,
}

impl Default for ReinforceConfig {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            alpha: 0.1,
            seed: 42,
        }
    }
}

impl ReinforceConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the learning rate.
    pub fn alpha(mut self, v: f32) -> Self {
        self.alpha = v;
        self
    }

    /// Sets the seed of the agent's RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`ReinforceConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ReinforceConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// REINFORCE agent with a linear softmax policy.
///
/// The driving loop collects the gradients and rewards of a whole episode
/// and applies them in one batch through [`Reinforce::update_weights`].
pub struct Reinforce<E: FeatureEnv>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    env: E,
    gamma: f32,
    alpha: f32,
    policy: SoftmaxPolicy,
    rng: StdRng,
}

impl<E: FeatureEnv> Reinforce<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    /// Constructs the agent around an environment.
    pub fn new(env: E, config: ReinforceConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let policy = SoftmaxPolicy::new(env.num_features(), &mut rng);
        Self {
            env,
            gamma: config.gamma,
            alpha: config.alpha,
            policy,
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

    /// Applies the per-episode REINFORCE update: for each step `i`,
    /// `theta += alpha * gradient_i * sum_{t >= i} gamma^(t - i) * reward_t`.
    ///
    /// `gradients` and `rewards` are the per-step values collected over one
    /// episode and must have equal lengths.
    pub fn update_weights(&mut self, gradients: &[Array1<f32>], rewards: &[f32]) {
        trace!("episode update over {} steps", gradients.len());
        for (i, gradient) in gradients.iter().enumerate() {
            let mut g = 0f32;
            let mut discount = 1f32;
            for reward in rewards[i..].iter() {
                g += discount * reward;
                discount *= self.gamma;
            }
            self.policy.apply_update(&(gradient * (self.alpha * g)));
        }
    }

    /// Softmax probability vectors for every state of the state space, for
    /// display only.
    pub fn get_all_softmax_probabilities(&self) -> HashMap<E::Obs, Array1<f32>> {
        self.policy.all_action_probabilities(&self.env)
    }

    /// Read-only view of the policy parameters.
    pub fn theta(&self) -> &Array1<f32> {
        self.policy.theta()
    }

    /// The wrapped environment.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: FeatureEnv> Agent for Reinforce<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Reinforce
    }

    fn reset(&mut self) {
        self.policy.reset(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlab_core::dummy::{DummyGridEnv, GridAction};
    use rlab_core::TabularEnv;

    #[test]
    fn update_matches_the_discounted_return_rule() {
        let config = ReinforceConfig::default().gamma(0.5).alpha(0.1);
        let mut agent = Reinforce::new(DummyGridEnv::new(), config);

        let state = (0, 0);
        let gradient = agent.compute_gradient(&state, &GridAction::Right);
        let theta_before = agent.theta().clone();

        // Single-step episode: G = 2, so theta += 0.1 * 2 * gradient.
        agent.update_weights(&[gradient.clone()], &[2.0]);
        let expected = &theta_before + &(&gradient * 0.2);
        let diff = (agent.theta() - &expected).mapv(f32::abs).sum();
        assert!(diff < 1e-6);
    }

    #[test]
    fn later_rewards_are_discounted() {
        let config = ReinforceConfig::default().gamma(0.5).alpha(1.0);
        let mut agent = Reinforce::new(DummyGridEnv::new(), config);

        let gradient = agent.compute_gradient(&(0, 0), &GridAction::Right);
        let theta_before = agent.theta().clone();

        // G at step 0 is 1 + 0.5 * 2 = 2; step 1 contributes its own update
        // with G = 2.
        agent.update_weights(
            &[gradient.clone(), Array1::zeros(gradient.len())],
            &[1.0, 2.0],
        );
        let expected = &theta_before + &(&gradient * 2.0);
        let diff = (agent.theta() - &expected).mapv(f32::abs).sum();
        assert!(diff < 1e-6);
    }

    #[test]
    fn diagnostics_cover_the_state_space() {
        let agent = Reinforce::new(DummyGridEnv::new(), ReinforceConfig::default());
        let all = agent.get_all_softmax_probabilities();
        assert_eq!(all.len(), 16);
        for probs in all.values() {
            assert!((probs.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn reset_redraws_the_parameters() {
        let mut agent = Reinforce::new(DummyGridEnv::new(), ReinforceConfig::default());
        let theta_before = agent.theta().clone();
        agent.reset();
        assert_eq!(agent.theta().len(), theta_before.len());
        assert_ne!(agent.theta(), &theta_before);
    }

    #[test]
    fn sampled_actions_come_from_the_action_space() {
        let mut agent = Reinforce::new(DummyGridEnv::new(), ReinforceConfig::default());
        for _ in 0..16 {
            let act = agent.select_action();
            assert!(agent.env_mut().action_space().contains(&act));
        }
    }
}
