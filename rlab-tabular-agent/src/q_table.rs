//! State-action value table shared by the tabular control agents.
use rand::{rngs::StdRng, Rng};
use std::collections::HashMap;
use std::hash::Hash;

/// Mapping from `(state, action)` to a real value, with greedy derivation.
///
/// Entries are created for the whole state-action space on [`QTable::reset`]
/// and mutated in place by the control updates; the table never shrinks.
#[derive(Debug, Clone)]
pub struct QTable<S, A> {
    values: HashMap<(S, A), f32>,
}

impl<S, A> QTable<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    /// Constructs an empty table.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Reinitializes every entry to a uniform draw from
    /// `[min_init, max_init]`, pinning entries of terminal states to zero.
    pub fn reset<F>(
        &mut self,
        states: &[S],
        actions: &[A],
        is_terminal: F,
        min_init: f32,
        max_init: f32,
        rng: &mut StdRng,
    ) where
        F: Fn(&S) -> bool,
    {
        self.values.clear();
        for state in states.iter() {
            let terminal = is_terminal(state);
            for act in actions.iter() {
                let q = if terminal {
                    0.0
                } else {
                    rng.gen_range(min_init..=max_init)
                };
                self.values.insert((state.clone(), act.clone()), q);
            }
        }
    }

    /// Value of a state-action pair; zero for entries never initialized.
    pub fn get(&self, state: &S, act: &A) -> f32 {
        self.values
            .get(&(state.clone(), act.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sets the value of a state-action pair.
    pub fn set(&mut self, state: S, act: A, value: f32) {
        self.values.insert((state, act), value);
    }

    /// Greedy action for a state, walking `actions` in order; a later action
    /// must be strictly greater to displace an earlier one.
    ///
    /// Returns `None` only when `actions` is empty.
    pub fn best_action(&self, state: &S, actions: &[A]) -> Option<A> {
        let mut best: Option<(A, f32)> = None;
        for act in actions.iter() {
            let value = self.get(state, act);
            match &best {
                Some((_, best_value)) if *best_value >= value => {}
                _ => best = Some((act.clone(), value)),
            }
        }
        best.map(|(act, _)| act)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read-only view of the underlying map, for display and testing.
    pub fn values(&self) -> &HashMap<(S, A), f32> {
        &self.values
    }
}

impl<S, A> Default for QTable<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
