//! Exploration schedule of DQN.
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Epsilon-greedy exploration with a linearly decaying epsilon.
///
/// Epsilon decays from `eps_start` to `eps_final` over `final_step` calls
/// and stays at the floor afterwards.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Number of decisions taken so far.
    pub n_steps: usize,

    /// Initial epsilon.
    pub eps_start: f64,

    /// Floor epsilon.
    pub eps_final: f64,

    /// Number of decisions over which epsilon decays to the floor.
    pub final_step: usize,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self {
            n_steps: 0,
            eps_start: 1.0,
            eps_final: 0.02,
            final_step: 100_000,
        }
    }
}

impl EpsilonGreedy {
    /// Constructs the schedule with the given decay horizon.
    pub fn with_final_step(final_step: usize) -> Self {
        Self {
            final_step,
            ..Self::default()
        }
    }

    /// Sets the floor epsilon.
    pub fn eps_final(mut self, v: f64) -> Self {
        self.eps_final = v;
        self
    }

    /// Sets the initial epsilon.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps_start = v;
        self
    }

    /// Current epsilon value.
    pub fn eps(&self) -> f64 {
        let d = (self.eps_start - self.eps_final) / (self.final_step as f64);
        (self.eps_start - d * self.n_steps as f64).max(self.eps_final)
    }

    /// Decides whether the next action should be random, advancing the
    /// decay schedule.
    pub fn is_random(&mut self, rng: &mut impl Rng) -> bool {
        let eps = self.eps();
        self.n_steps += 1;
        rng.gen::<f64>() < eps
    }

    /// Restarts the decay schedule.
    pub fn reset(&mut self) {
        self.n_steps = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn epsilon_decays_to_the_floor() {
        let mut explorer = EpsilonGreedy::with_final_step(10).eps_final(0.1);
        let mut rng = StdRng::seed_from_u64(0);
        assert!((explorer.eps() - 1.0).abs() < 1e-9);
        for _ in 0..20 {
            explorer.is_random(&mut rng);
        }
        assert!((explorer.eps() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn zero_epsilon_is_never_random() {
        let mut explorer = EpsilonGreedy::default().eps_start(0.0).eps_final(0.0);
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            assert!(!explorer.is_random(&mut rng));
        }
    }

    #[test]
    fn reset_restarts_the_schedule() {
        let mut explorer = EpsilonGreedy::with_final_step(10).eps_final(0.0);
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10 {
            explorer.is_random(&mut rng);
        }
        explorer.reset();
        assert!((explorer.eps() - 1.0).abs() < 1e-9);
    }
}
