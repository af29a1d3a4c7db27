//! Policy Iteration over an empirical transition model.
use crate::{value_iter::init_tables, EmpiricalModel, SWEEP_TOLERANCE};
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

/// Configuration of [`PolicyIter`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PolicyIterConfig {
    /// Discount factor.
    pub gamma: f32,
}

impl Default for PolicyIterConfig {
    fn default() -> Self {
        Self { gamma: 1.0 }
    }
}

impl PolicyIterConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Constructs [`PolicyIterConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PolicyIterConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Policy Iteration agent.
///
/// Alternates policy evaluation (Bellman backups restricted to the action
/// fixed by the current policy) and greedy policy improvement over the same
/// empirical model as [`ValueIter`](crate::ValueIter), terminating once a
/// full improvement pass changes no state's action.
pub struct PolicyIter<E: TabularEnv>
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

impl<E: TabularEnv> PolicyIter<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    /// Constructs the agent around an environment.
    pub fn new(mut env: E, config: PolicyIterConfig) -> Self {
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

    /// Evaluates the current policy to the sweep tolerance, then improves
    /// it, re-entering evaluation as long as the improvement changes any
    /// state's action.
    ///
    /// Terminates at the policy-stability fixed point: one more improvement
    /// pass would yield no action changes.
    pub fn evaluate_policy(&mut self) -> Record {
        let mut cycles = 0;
        loop {
            cycles += 1;
            while self.evaluation_sweep() > SWEEP_TOLERANCE {}
            if !self.improvement_pass() {
                break;
            }
            trace!("policy changed after improvement cycle {}", cycles);
        }
        Record::from_slice(&[("cycles", RecordValue::Scalar(cycles as f32))])
    }

    /// Greedily improves the policy once, re-entering evaluation when any
    /// state's action changed.
    pub fn improve_policy(&mut self) {
        if self.improvement_pass() {
            self.evaluate_policy();
        }
    }

    /// One synchronous backup sweep with each state's action fixed by the
    /// current policy. States whose policy action is unexplored keep their
    /// value. Returns the maximum absolute value change.
    fn evaluation_sweep(&mut self) -> f32 {
        let states = self.env.state_space().to_vec();
        let mut delta = 0f32;
        for state in states.iter() {
            let old_val = self.values_of_state.get(state).copied().unwrap_or(0.0);
            let act = self.policy[state].clone();
            let new_val = self
                .model
                .action_value(state, &act, self.gamma, &self.values_of_state)
                .unwrap_or(old_val);
            self.values_of_state.insert(state.clone(), new_val);
            delta = delta.max((old_val - new_val).abs());
        }
        delta
    }

    /// One greedy improvement pass; returns whether any state's action
    /// changed.
    fn improvement_pass(&mut self) -> bool {
        let states = self.env.state_space().to_vec();
        let mut changed = false;
        for state in states.iter() {
            let old_act = self.policy[state].clone();
            let new_act = self.best_action(state);
            changed = changed || new_act != old_act;
            self.policy.insert(state.clone(), new_act);
        }
        changed
    }

    /// Best explored action for a state; the first explored action becomes
    /// the candidate and later ones must be strictly greater. Falls back to
    /// the current policy action when nothing has been explored.
    fn best_action(&self, state: &E::Obs) -> E::Act {
        let mut best_act = self.policy[state].clone();
        let mut best_value: Option<f32> = None;
        for act in self.env.action_space().iter() {
            if let Some(v) = self
                .model
                .action_value(state, act, self.gamma, &self.values_of_state)
            {
                match best_value {
                    Some(best) if best >= v => {}
                    _ => {
                        best_value = Some(v);
                        best_act = act.clone();
                    }
                }
            }
        }
        best_act
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

impl<E: TabularEnv> Agent for PolicyIter<E>
where
    E::Obs: Eq + Hash,
    E::Act: Eq + Hash,
{
    fn kind(&self) -> AgentKind {
        AgentKind::PolicyIteration
    }

    fn reset(&mut self) {
        self.model.clear();
        let (values_of_state, policy) = init_tables(&mut self.env);
        self.values_of_state = values_of_state;
        self.policy = policy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::RingEnv;

    fn explored_agent() -> PolicyIter<RingEnv> {
        let mut agent = PolicyIter::new(RingEnv::new(), PolicyIterConfig::default().gamma(0.9));
        for _ in 0..64 {
            agent.random_step();
        }
        agent
    }

    #[test]
    fn evaluation_terminates_with_a_stable_policy() {
        let mut agent = explored_agent();
        let record = agent.evaluate_policy();
        assert!(record.get_scalar("cycles").unwrap() >= 1.0);
        assert_eq!(agent.policy()[&0], 1);

        // Policy stability: another improvement pass changes nothing.
        let policy = agent.policy().clone();
        agent.improve_policy();
        assert_eq!(agent.policy(), &policy);
    }

    #[test]
    fn stable_policy_value_matches_the_bellman_fixed_point() {
        let mut agent = explored_agent();
        agent.evaluate_policy();
        let va = 1.0 / (1.0 - 0.81);
        assert!((agent.values_of_state()[&0] - va).abs() < 0.05);
    }

    #[test]
    fn unexplored_model_leaves_policy_untouched() {
        let mut agent = PolicyIter::new(RingEnv::new(), PolicyIterConfig::default());
        let policy = agent.policy().clone();
        agent.evaluate_policy();
        assert_eq!(agent.policy(), &policy);
        assert_eq!(agent.values_of_state()[&0], 0.0);
    }

    #[test]
    fn reset_clears_learned_state() {
        let mut agent = explored_agent();
        agent.evaluate_policy();
        agent.reset();
        assert_eq!(agent.values_of_state()[&0], 0.0);
        assert!(!agent.model().contains(&0, &1));
    }
}
