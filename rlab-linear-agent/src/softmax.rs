//! Linear softmax policy over feature vectors.
use ndarray::Array1;
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    Rng,
};
use rlab_core::FeatureEnv;
use std::{collections::HashMap, hash::Hash};

/// Action-selection distribution proportional to exponentiated linear
/// scores over features: `pi(a|s) = exp(theta . phi(s,a)) / sum_a' exp(...)`.
///
/// The parameter vector is sized to the environment's feature
/// dimensionality and reinitialized to uniform draws from `[0, 1)` on
/// [`SoftmaxPolicy::reset`].
#[derive(Debug, Clone)]
pub struct SoftmaxPolicy {
    theta: Array1<f32>,
}

impl SoftmaxPolicy {
    /// Constructs a randomly initialized policy of the given feature
    /// dimensionality.
    pub fn new(num_features: usize, rng: &mut StdRng) -> Self {
        Self {
            theta: random_weights(num_features, rng),
        }
    }

    /// Reinitializes the parameter vector.
    pub fn reset(&mut self, rng: &mut StdRng) {
        self.theta = random_weights(self.theta.len(), rng);
    }

    /// Softmax probability of each action of the action space, in action
    /// space order.
    ///
    /// Logits are shifted by their maximum before exponentiation so large
    /// linear scores cannot overflow.
    pub fn action_probabilities<E>(&self, env: &E, state: &E::Obs) -> Array1<f32>
    where
        E: FeatureEnv,
        E::Obs: Eq + Hash,
        E::Act: Eq + Hash,
    {
        let logits: Vec<f32> = env
            .action_space()
            .iter()
            .map(|act| env.feature_vector(state, act).dot(&self.theta))
            .collect();
        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exp: Array1<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let total = exp.sum();
        exp / total
    }

    /// Score-function direction of the log-policy for a state-action pair:
    /// `phi(s,a) - sum_a' pi(a'|s) * phi(s,a')`.
    pub fn compute_gradient<E>(&self, env: &E, state: &E::Obs, act: &E::Act) -> Array1<f32>
    where
        E: FeatureEnv,
        E::Obs: Eq + Hash,
        E::Act: Eq + Hash,
    {
        let feature_vector = env.feature_vector(state, act);
        let probs = self.action_probabilities(env, state);
        let mut expected = Array1::<f32>::zeros(feature_vector.len());
        for (i, other) in env.action_space().iter().enumerate() {
            expected.scaled_add(probs[i], &env.feature_vector(state, other));
        }
        feature_vector - expected
    }

    /// Samples an action from the softmax distribution of the given state.
    pub fn sample_action<E>(&self, env: &E, state: &E::Obs, rng: &mut StdRng) -> E::Act
    where
        E: FeatureEnv,
        E::Obs: Eq + Hash,
        E::Act: Eq + Hash,
    {
        let probs = self.action_probabilities(env, state);
        let dist = WeightedIndex::new(probs.iter()).unwrap();
        env.action_space()[dist.sample(rng)].clone()
    }

    /// Softmax probability vectors for every state of the state space.
    ///
    /// A diagnostic for display only; not part of the learning loop.
    pub fn all_action_probabilities<E>(&self, env: &E) -> HashMap<E::Obs, Array1<f32>>
    where
        E: FeatureEnv,
        E::Obs: Eq + Hash,
        E::Act: Eq + Hash,
    {
        env.state_space()
            .iter()
            .map(|state| (state.clone(), self.action_probabilities(env, state)))
            .collect()
    }

    /// Adds an update to the parameter vector.
    pub fn apply_update(&mut self, delta: &Array1<f32>) {
        self.theta = &self.theta + delta;
    }

    /// Read-only view of the parameter vector.
    pub fn theta(&self) -> &Array1<f32> {
        &self.theta
    }
}

pub(crate) fn random_weights(len: usize, rng: &mut StdRng) -> Array1<f32> {
    Array1::from_shape_fn(len, |_| rng.gen::<f32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rlab_core::dummy::{DummyGridEnv, GridAction};
    use rlab_core::TabularEnv;

    #[test]
    fn probabilities_sum_to_one_for_every_state() {
        let env = DummyGridEnv::new();
        let mut rng = StdRng::seed_from_u64(0);
        let policy = SoftmaxPolicy::new(env.num_features(), &mut rng);

        let all = policy.all_action_probabilities(&env);
        assert_eq!(all.len(), env.state_space().len());
        for probs in all.values() {
            assert_eq!(probs.len(), env.action_space().len());
            assert!((probs.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn gradient_has_feature_dimensionality() {
        let env = DummyGridEnv::new();
        let mut rng = StdRng::seed_from_u64(0);
        let policy = SoftmaxPolicy::new(env.num_features(), &mut rng);

        let grad = policy.compute_gradient(&env, &(0, 0), &GridAction::Right);
        assert_eq!(grad.len(), env.num_features());
    }

    #[test]
    fn large_scores_do_not_overflow() {
        let env = DummyGridEnv::new();
        let mut rng = StdRng::seed_from_u64(0);
        let mut policy = SoftmaxPolicy::new(env.num_features(), &mut rng);
        policy.apply_update(&Array1::from(vec![1e4, -1e4]));

        let probs = policy.action_probabilities(&env, &(0, 0));
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs.sum() - 1.0).abs() < 1e-5);
    }
}
