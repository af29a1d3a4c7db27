//! First-visit Monte Carlo control.
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

/// One observed step of an episode, as accumulated by the driving loop.
#[derive(Debug, Clone)]
pub struct EpisodeStep<S, A> {
    /// State the action was taken from.
    pub state: S,

    /// Action taken.
    pub action: A,

    /// Reward received.
    pub reward: f32,
}

/// Configuration of [`FirstVisitMc`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FirstVisitMcConfig {
    /// Discount factor applied to episode returns.
    pub gamma: f32,

    /// Seed of the agent's RNG.
    pub seed: u64,
}

impl Default for FirstVisitMcConfig {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            seed: 42,
        }
    }
}

impl FirstVisitMcConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the seed of the agent's RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`FirstVisitMcConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`FirstVisitMcConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// First-visit Monte Carlo control agent.
///
/// Exploring starts are not used; the driving loop is expected to choose
/// actions epsilon-greedily (via [`FirstVisitMc::select_action`]), which
/// guarantees continued exploration. Learning happens once per episode from
/// the full recorded sequence.
pub struct FirstVisitMc<E: TabularEnv>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    env: E,
    gamma: f32,
    q: QTable<E::Obs, E::Act>,
    policy: HashMap<E::Obs, E::Act>,
    returns: HashMap<(E::Obs, E::Act), Vec<f32>>,
    rng: StdRng,
}

impl<E: TabularEnv> FirstVisitMc<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    /// Constructs the agent around an environment.
    pub fn new(env: E, config: FirstVisitMcConfig) -> Self {
        let mut agent = Self {
            env,
            gamma: config.gamma,
            q: QTable::new(),
            policy: HashMap::new(),
            returns: HashMap::new(),
            rng: StdRng::seed_from_u64(config.seed),
        };
        agent.restart_tables();
        agent
    }

    /// Executes the given action without updating any table; the origin
    /// state is returned so the driving loop can extend its episode
    /// sequence.
    pub fn step(&mut self, act: &E::Act) -> (E::Obs, E::Obs, f32, bool) {
        let origin = self.env.current_state();
        let (new_state, reward, done) = self.env.execute_action(act);
        (origin, new_state, reward, done)
    }

    /// Walks a completed episode backwards, accumulating the discounted
    /// return and crediting it to each state-action pair only at the pair's
    /// first occurrence in the episode.
    ///
    /// Each credited pair's Q-value becomes the mean of its return history,
    /// and the greedy policy of its state is re-derived.
    pub fn update_policy(&mut self, episode: &[EpisodeStep<E::Obs, E::Act>]) {
        let actions = self.env.action_space().to_vec();
        let mut g = 0f32;
        for t in (0..episode.len()).rev() {
            let step = &episode[t];
            g = self.gamma * g + step.reward;
            let seen_before = episode[..t]
                .iter()
                .any(|e| e.state == step.state && e.action == step.action);
            if seen_before {
                continue;
            }
            let history = self
                .returns
                .entry((step.state.clone(), step.action.clone()))
                .or_insert_with(Vec::new);
            history.push(g);
            let mean = history.iter().sum::<f32>() / history.len() as f32;
            self.q.set(step.state.clone(), step.action.clone(), mean);
            if let Some(best) = self.q.best_action(&step.state, &actions) {
                self.policy.insert(step.state.clone(), best);
            }
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
        self.q
            .reset(&states, &actions, |_| false, 0.0, 0.0, &mut self.rng);
        self.policy = states
            .iter()
            .filter_map(|s| self.q.best_action(s, &actions).map(|a| (s.clone(), a)))
            .collect();
        self.returns.clear();
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

impl<E: TabularEnv> Agent for FirstVisitMc<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    fn kind(&self) -> AgentKind {
        AgentKind::FirstVisitMc
    }

    fn reset(&mut self) {
        self.restart_tables();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::RingEnv;

    fn episode(steps: &[(usize, usize, f32)]) -> Vec<EpisodeStep<usize, usize>> {
        steps
            .iter()
            .map(|(state, action, reward)| EpisodeStep {
                state: *state,
                action: *action,
                reward: *reward,
            })
            .collect()
    }

    #[test]
    fn repeated_pair_is_credited_only_at_first_visit() {
        let mut agent = FirstVisitMc::new(RingEnv::new(), FirstVisitMcConfig::default());

        // (0, 1) occurs twice; only the first occurrence is credited, with
        // the full return from that point on: 1 + 0 + 1 = 2.
        let seq = episode(&[(0, 1, 1.0), (1, 0, 0.0), (0, 1, 1.0)]);
        agent.update_policy(&seq);
        assert!((agent.q().get(&0, &1) - 2.0).abs() < 1e-6);

        // A second identical episode leaves the mean unchanged.
        agent.update_policy(&seq);
        assert!((agent.q().get(&0, &1) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn q_is_the_mean_of_the_return_history() {
        let mut agent = FirstVisitMc::new(RingEnv::new(), FirstVisitMcConfig::default());
        agent.update_policy(&episode(&[(0, 1, 1.0)]));
        agent.update_policy(&episode(&[(0, 1, 3.0)]));
        assert!((agent.q().get(&0, &1) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn returns_are_discounted() {
        let config = FirstVisitMcConfig::default().gamma(0.5);
        let mut agent = FirstVisitMc::new(RingEnv::new(), config);

        // G at t=0 is 1 + 0.5 * (0 + 0.5 * 4) = 2.
        agent.update_policy(&episode(&[(0, 1, 1.0), (1, 0, 0.0), (0, 0, 4.0)]));
        assert!((agent.q().get(&0, &1) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn policy_follows_the_credited_returns() {
        let mut agent = FirstVisitMc::new(RingEnv::new(), FirstVisitMcConfig::default());
        agent.update_policy(&episode(&[(0, 1, 1.0)]));
        assert_eq!(agent.policy()[&0], 1);

        agent.update_policy(&episode(&[(0, 0, 10.0)]));
        assert_eq!(agent.policy()[&0], 0);
    }

    #[test]
    fn reset_clears_return_histories() {
        let mut agent = FirstVisitMc::new(RingEnv::new(), FirstVisitMcConfig::default());
        agent.update_policy(&episode(&[(0, 1, 5.0)]));
        agent.reset();
        assert_eq!(agent.q().get(&0, &1), 0.0);

        // After the reset the history restarts from scratch.
        agent.update_policy(&episode(&[(0, 1, 1.0)]));
        assert!((agent.q().get(&0, &1) - 1.0).abs() < 1e-6);
    }
}
