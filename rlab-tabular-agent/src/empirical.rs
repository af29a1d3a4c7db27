//! Empirical transition model estimated from exploration.
use std::collections::HashMap;
use std::hash::Hash;

/// Transition counts and observed rewards accumulated from exploration
/// steps, substituting for unknown environment dynamics.
///
/// Counts only ever grow; the reward of a `(state, action, new_state)`
/// triple is last-write-wins, which is safe for environments that are
/// deterministic in their rewards given the transition.
#[derive(Debug, Clone)]
pub struct EmpiricalModel<S, A> {
    transitions: HashMap<(S, A), HashMap<S, u32>>,
    rewards: HashMap<(S, A, S), f32>,
}

impl<S, A> EmpiricalModel<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    /// Constructs an empty model.
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
            rewards: HashMap::new(),
        }
    }

    /// Records one observed transition.
    pub fn record(&mut self, state: &S, act: &A, new_state: &S, reward: f32) {
        let counts = self
            .transitions
            .entry((state.clone(), act.clone()))
            .or_insert_with(HashMap::new);
        *counts.entry(new_state.clone()).or_insert(0) += 1;
        self.rewards
            .insert((state.clone(), act.clone(), new_state.clone()), reward);
    }

    /// Whether the pair has been explored at least once.
    pub fn contains(&self, state: &S, act: &A) -> bool {
        self.transitions
            .contains_key(&(state.clone(), act.clone()))
    }

    /// Bellman action value under the empirical transition probabilities:
    /// the count-weighted average of `reward + gamma * V(new_state)` over
    /// the recorded successors.
    ///
    /// Returns `None` when the pair has never been explored; unexplored
    /// pairs are a normal condition early in training, they simply
    /// contribute nothing.
    pub fn action_value(
        &self,
        state: &S,
        act: &A,
        gamma: f32,
        values: &HashMap<S, f32>,
    ) -> Option<f32> {
        let counts = self.transitions.get(&(state.clone(), act.clone()))?;
        let total: u32 = counts.values().sum();
        let mut value = 0.0;
        for (new_state, n) in counts.iter() {
            let reward = self
                .rewards
                .get(&(state.clone(), act.clone(), new_state.clone()))
                .copied()
                .unwrap_or(0.0);
            let v = values.get(new_state).copied().unwrap_or(0.0);
            value += (*n as f32 / total as f32) * (reward + gamma * v);
        }
        Some(value)
    }

    /// Drops all recorded transitions and rewards.
    pub fn clear(&mut self) {
        self.transitions.clear();
        self.rewards.clear();
    }
}

impl<S, A> Default for EmpiricalModel<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexplored_pair_has_no_value() {
        let model: EmpiricalModel<u8, u8> = EmpiricalModel::new();
        assert!(!model.contains(&0, &0));
        assert!(model.action_value(&0, &0, 1.0, &HashMap::new()).is_none());
    }

    #[test]
    fn action_value_weights_by_counts() {
        let mut model = EmpiricalModel::new();
        // From (0, a): three times to state 1 (reward 1), once to state 2
        // (reward 0).
        for _ in 0..3 {
            model.record(&0u8, &0u8, &1u8, 1.0);
        }
        model.record(&0, &0, &2, 0.0);

        let mut values = HashMap::new();
        values.insert(1u8, 4.0f32);
        values.insert(2, 8.0);

        // 0.75 * (1 + 0.5 * 4) + 0.25 * (0 + 0.5 * 8) = 2.25 + 1.0
        let v = model.action_value(&0, &0, 0.5, &values).unwrap();
        assert!((v - 3.25).abs() < 1e-6);
    }

    #[test]
    fn reward_is_last_write_wins() {
        let mut model = EmpiricalModel::new();
        model.record(&0u8, &0u8, &1u8, 1.0);
        model.record(&0, &0, &1, 5.0);
        let values = HashMap::new();
        let v = model.action_value(&0, &0, 0.0, &values).unwrap();
        assert!((v - 5.0).abs() < 1e-6);
    }
}
