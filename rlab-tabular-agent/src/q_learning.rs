//! Tabular Q-Learning.
use crate::QTable;
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rlab_core::{Agent, AgentKind, TabularEnv};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    hash::Hash,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`QLearning`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QLearningConfig {
    /// Discount factor.
    pub gamma: f32,

    /// Learning rate.
    pub alpha: f32,

    /// Lower bound of the uniform Q-value initialization.
    pub min_init_q: f32,

    /// Upper bound of the uniform Q-value initialization.
    pub max_init_q: f32,

    /// Seed of the agent's RNG.
    pub seed: u64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            alpha: 0.1,
            min_init_q: 0.0,
            max_init_q: 0.0,
            seed: 42,
        }
    }
}

impl QLearningConfig {
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

    /// Sets the bounds of the uniform Q-value initialization.
    pub fn init_q(mut self, min: f32, max: f32) -> Self {
        self.min_init_q = min;
        self.max_init_q = max;
        self
    }

    /// Sets the seed of the agent's RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`QLearningConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`QLearningConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Off-policy tabular Q-Learning agent.
///
/// Learns on the fly without any knowledge of the environment dynamics,
/// backing each Q-value toward the reward plus the discounted best Q-value
/// of the successor state.
pub struct QLearning<E: TabularEnv>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    env: E,
    gamma: f32,
    alpha: f32,
    min_init_q: f32,
    max_init_q: f32,
    q: QTable<E::Obs, E::Act>,
    policy: HashMap<E::Obs, E::Act>,
    rng: StdRng,
}

impl<E: TabularEnv> QLearning<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    /// Constructs the agent around an environment.
    pub fn new(env: E, config: QLearningConfig) -> Self {
        let mut agent = Self {
            env,
            gamma: config.gamma,
            alpha: config.alpha,
            min_init_q: config.min_init_q,
            max_init_q: config.max_init_q,
            q: QTable::new(),
            policy: HashMap::new(),
            rng: StdRng::seed_from_u64(config.seed),
        };
        agent.restart_tables();
        agent
    }

    /// Executes the given action, applies the Q-Learning backup, and
    /// refreshes the greedy policy of the origin state.
    ///
    /// Returns the origin state, the new state, the reward, and whether the
    /// episode ended.
    pub fn step(&mut self, act: &E::Act) -> (E::Obs, E::Obs, f32, bool) {
        let origin = self.env.current_state();
        let (new_state, reward, done) = self.env.execute_action(act);
        self.update_q(&origin, act, &new_state, reward);
        (origin, new_state, reward, done)
    }

    /// Epsilon-greedy action for the current state: random with probability
    /// `epsilon`, the policy's action otherwise.
    pub fn select_action(&mut self, epsilon: f32) -> E::Act {
        if self.rng.gen::<f32>() < epsilon {
            self.env.random_action()
        } else {
            let state = self.env.current_state();
            match self.policy.get(&state) {
                Some(act) => act.clone(),
                None => self.env.random_action(),
            }
        }
    }

    fn update_q(&mut self, origin: &E::Obs, act: &E::Act, new_state: &E::Obs, reward: f32) {
        let actions = self.env.action_space().to_vec();
        if let Some(best_next) = self.q.best_action(new_state, &actions) {
            let old = self.q.get(origin, act);
            let target = reward + self.gamma * self.q.get(new_state, &best_next);
            self.q
                .set(origin.clone(), act.clone(), old + self.alpha * (target - old));
        }
        if let Some(best) = self.q.best_action(origin, &actions) {
            self.policy.insert(origin.clone(), best);
        }
    }

    fn restart_tables(&mut self) {
        let states = self.env.state_space().to_vec();
        let actions = self.env.action_space().to_vec();
        let env = &self.env;
        let q = &mut self.q;
        q.reset(
            &states,
            &actions,
            |s| env.is_terminal(s),
            self.min_init_q,
            self.max_init_q,
            &mut self.rng,
        );
        self.policy = states
            .iter()
            .filter_map(|s| self.q.best_action(s, &actions).map(|a| (s.clone(), a)))
            .collect();
    }

    /// Read-only view of the Q-table.
    pub fn q(&self) -> &QTable<E::Obs, E::Act> {
        &self.q
    }

    /// Read-only view of the policy.
    pub fn policy(&self) -> &HashMap<E::Obs, E::Act> {
        &self.policy
    }

    /// The wrapped environment.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: TabularEnv> Agent for QLearning<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    fn kind(&self) -> AgentKind {
        AgentKind::QLearning
    }

    fn reset(&mut self) {
        self.restart_tables();
    }
}
