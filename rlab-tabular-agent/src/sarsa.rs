//! Tabular SARSA.
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

/// Configuration of [`Sarsa`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SarsaConfig {
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

impl Default for SarsaConfig {
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

impl SarsaConfig {
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

    /// Constructs [`SarsaConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`SarsaConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// On-policy tabular SARSA agent, the on-policy alternative to
/// [`QLearning`](crate::QLearning).
///
/// Stepping and updating are separate: the driving loop chooses the action
/// actually taken in the new state (e.g. epsilon-greedily via
/// [`Sarsa::select_action`]) and then feeds it back through
/// [`Sarsa::update_q`].
pub struct Sarsa<E: TabularEnv>
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

impl<E: TabularEnv> Sarsa<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    /// Constructs the agent around an environment.
    pub fn new(env: E, config: SarsaConfig) -> Self {
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

    /// Executes the given action without updating any table.
    ///
    /// Returns the origin state, the new state, the reward, and whether the
    /// episode ended.
    pub fn step(&mut self, act: &E::Act) -> (E::Obs, E::Obs, f32, bool) {
        let origin = self.env.current_state();
        let (new_state, reward, done) = self.env.execute_action(act);
        (origin, new_state, reward, done)
    }

    /// Applies the SARSA backup toward the Q-value of the action actually
    /// chosen in the new state, then refreshes the greedy policy of the
    /// origin state.
    pub fn update_q(
        &mut self,
        origin: &E::Obs,
        act: &E::Act,
        new_state: &E::Obs,
        reward: f32,
        new_act: &E::Act,
    ) {
        let old = self.q.get(origin, act);
        let target = reward + self.gamma * self.q.get(new_state, new_act);
        self.q
            .set(origin.clone(), act.clone(), old + self.alpha * (target - old));

        let actions = self.env.action_space().to_vec();
        if let Some(best) = self.q.best_action(origin, &actions) {
            self.policy.insert(origin.clone(), best);
        }
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

impl<E: TabularEnv> Agent for Sarsa<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Sarsa
    }

    fn reset(&mut self) {
        self.restart_tables();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::RingEnv;

    #[test]
    fn step_leaves_tables_untouched() {
        let mut agent = Sarsa::new(RingEnv::new(), SarsaConfig::default());
        let (origin, new_state, reward, done) = agent.step(&1);
        assert_eq!((origin, new_state, reward, done), (0, 1, 1.0, false));
        assert_eq!(agent.q().get(&0, &1), 0.0);
    }

    #[test]
    fn single_update_matches_the_backup_rule() {
        let config = SarsaConfig::default().gamma(1.0).alpha(0.1);
        let mut agent = Sarsa::new(RingEnv::new(), config);

        // Pretend Q(1, 0) is already 2: the on-policy target uses the action
        // actually chosen next, not the best one.
        agent.q.set(1, 0, 2.0);
        agent.q.set(1, 1, 5.0);
        agent.update_q(&0, &1, &1, 1.0, &0);
        assert!((agent.q().get(&0, &1) - 0.1 * (1.0 + 2.0)).abs() < 1e-6);
    }

    #[test]
    fn update_refreshes_the_origin_policy() {
        let mut agent = Sarsa::new(RingEnv::new(), SarsaConfig::default());
        agent.update_q(&0, &1, &1, 1.0, &0);
        assert_eq!(agent.policy()[&0], 1);
    }
}
