//! Value Iteration over an empirical transition model.
use crate::{EmpiricalModel, SWEEP_TOLERANCE};
use anyhow::Result;
use log::trace;
use rlab_core::{
    record::{Record, RecordValue},
    Agent, AgentKind, TabularEnv,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    hash::Hash,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ValueIter`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValueIterConfig {
    /// Discount factor.
    pub gamma: f32,
}

impl Default for ValueIterConfig {
    fn default() -> Self {
        Self { gamma: 1.0 }
    }
}

impl ValueIterConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Constructs [`ValueIterConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ValueIterConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Value Iteration agent.
///
/// The agent is not given the environment dynamics; it keeps its own history
/// of transitions and rewards gathered through exploration and solves for
/// state values by synchronous Bellman backups over that empirical model.
pub struct ValueIter<E: TabularEnv>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    env: E,
    gamma: f32,
    model: EmpiricalModel<E::Obs, E::Act>,
    values_of_state: HashMap<E::Obs, f32>,
    policy: HashMap<E::Obs, E::Act>,
}

impl<E: TabularEnv> ValueIter<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    /// Constructs the agent around an environment.
    pub fn new(mut env: E, config: ValueIterConfig) -> Self {
        let (values_of_state, policy) = init_tables(&mut env);
        Self {
            env,
            gamma: config.gamma,
            model: EmpiricalModel::new(),
            values_of_state,
            policy,
        }
    }

    /// Performs an exploration step with a uniformly random action,
    /// recording the observed transition into the empirical model.
    ///
    /// Returns the new state, the reward, and whether the episode ended.
    pub fn random_step(&mut self) -> (E::Obs, f32, bool) {
        let act = self.env.random_action();
        self.record_step(act)
    }

    /// Performs an exploitation step with the current policy's action,
    /// recording the observed transition identically.
    pub fn step(&mut self) -> (E::Obs, f32, bool) {
        let act = self.policy[&self.env.current_state()].clone();
        self.record_step(act)
    }

    fn record_step(&mut self, act: E::Act) -> (E::Obs, f32, bool) {
        let origin = self.env.current_state();
        let (new_state, reward, done) = self.env.execute_action(&act);
        self.model.record(&origin, &act, &new_state, reward);
        (new_state, reward, done)
    }

    /// Performs synchronous Bellman backup sweeps until the maximum absolute
    /// value change falls below the tolerance, then re-derives the greedy
    /// policy.
    ///
    /// States with no explored action keep a value of zero. Once the value
    /// table has reached its fixed point, further calls leave it unchanged.
    pub fn update_values(&mut self) -> Record {
        let states = self.env.state_space().to_vec();
        let actions = self.env.action_space().to_vec();
        let mut sweeps = 0;
        let delta = loop {
            let mut delta = 0f32;
            for state in states.iter() {
                let old_val = self.values_of_state.get(state).copied().unwrap_or(0.0);
                let mut best: Option<f32> = None;
                for act in actions.iter() {
                    if let Some(v) =
                        self.model
                            .action_value(state, act, self.gamma, &self.values_of_state)
                    {
                        best = Some(best.map_or(v, |b: f32| b.max(v)));
                    }
                }
                let new_val = best.unwrap_or(0.0);
                self.values_of_state.insert(state.clone(), new_val);
                delta = delta.max((old_val - new_val).abs());
            }
            sweeps += 1;
            trace!("value sweep {}: delta = {}", sweeps, delta);
            if delta <= SWEEP_TOLERANCE {
                break delta;
            }
        };
        self.update_policy();

        Record::from_slice(&[
            ("delta", RecordValue::Scalar(delta)),
            ("sweeps", RecordValue::Scalar(sweeps as f32)),
        ])
    }

    /// Greedily re-derives the policy from the value table.
    ///
    /// A state's action is left unchanged when nothing has been explored
    /// from it; an explored action must be strictly greater than the best
    /// found so far to be selected.
    pub fn update_policy(&mut self) {
        let states = self.env.state_space().to_vec();
        let actions = self.env.action_space().to_vec();
        for state in states.iter() {
            let mut best: Option<(E::Act, f32)> = None;
            for act in actions.iter() {
                if let Some(v) =
                    self.model
                        .action_value(state, act, self.gamma, &self.values_of_state)
                {
                    match &best {
                        Some((_, best_value)) if *best_value >= v => {}
                        _ => best = Some((act.clone(), v)),
                    }
                }
            }
            if let Some((act, _)) = best {
                self.policy.insert(state.clone(), act);
            }
        }
    }

    /// Read-only view of the value table.
    pub fn values_of_state(&self) -> &HashMap<E::Obs, f32> {
        &self.values_of_state
    }

    /// Read-only view of the policy.
    pub fn policy(&self) -> &HashMap<E::Obs, E::Act> {
        &self.policy
    }

    /// Read-only view of the empirical model.
    pub fn model(&self) -> &EmpiricalModel<E::Obs, E::Act> {
        &self.model
    }

    /// The wrapped environment.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: TabularEnv> Agent for ValueIter<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    fn kind(&self) -> AgentKind {
        AgentKind::ValueIteration
    }

    fn reset(&mut self) {
        self.model.clear();
        let (values_of_state, policy) = init_tables(&mut self.env);
        self.values_of_state = values_of_state;
        self.policy = policy;
    }
}

/// Zeroed value table and uniformly random initial policy, total over the
/// state space.
pub(crate) fn init_tables<E: TabularEnv>(
    env: &mut E,
) -> (HashMap<E::Obs, f32>, HashMap<E::Obs, E::Act>)
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    let states = env.state_space().to_vec();
    let mut values = HashMap::new();
    let mut policy = HashMap::new();
    for state in states.into_iter() {
        values.insert(state.clone(), 0.0);
        let act = env.random_action();
        policy.insert(state, act);
    }
    (values, policy)
}
