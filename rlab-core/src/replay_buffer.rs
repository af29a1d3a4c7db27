//! Experience replay.
//!
//! A bounded store of past transitions sampled to decorrelate training
//! batches, shared structurally by the deep value-based and deep
//! actor-critic agents.
use crate::error::RlabError;
use anyhow::Result;
use log::trace;
use rand::{rngs::StdRng, seq::index::sample, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// A single environment transition.
#[derive(Debug, Clone)]
pub struct Transition<O, A> {
    /// State the action was taken from.
    pub obs: O,

    /// Action taken.
    pub act: A,

    /// Reward received.
    pub reward: f32,

    /// State resulting from the action.
    pub next_obs: O,

    /// Whether the episode terminated on this transition.
    pub is_done: bool,
}

/// A batch of transitions sampled from a [`ReplayBuffer`], stored columnwise.
#[derive(Debug, Clone)]
pub struct TransitionBatch<O, A> {
    /// States the actions were taken from.
    pub obs: Vec<O>,

    /// Actions taken.
    pub act: Vec<A>,

    /// Rewards received.
    pub reward: Vec<f32>,

    /// States resulting from the actions.
    pub next_obs: Vec<O>,

    /// Episode termination flags.
    pub is_done: Vec<bool>,
}

impl<O, A> TransitionBatch<O, A> {
    /// Number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }
}

/// Configuration of [`ReplayBuffer`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions stored.
    pub capacity: usize,

    /// Seed of the sampling RNG.
    pub seed: u64,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            seed: 42,
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the capacity.
    pub fn capacity(mut self, v: usize) -> Self {
        self.capacity = v;
        self
    }

    /// Sets the seed of the sampling RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`ReplayBufferConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ReplayBufferConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Fixed-capacity FIFO store of transitions.
///
/// Insertion is O(1) amortized; once full, the oldest transition is evicted.
/// Sampling draws a batch without replacement from the current contents.
/// Not safe for concurrent access; exactly one writer is assumed.
pub struct ReplayBuffer<O, A> {
    capacity: usize,

    // Next insertion index once the ring is full.
    i: usize,

    items: Vec<Transition<O, A>>,
    rng: StdRng,
}

impl<O, A> ReplayBuffer<O, A>
where
    O: Clone,
    A: Clone,
{
    /// Builds an empty buffer from the given configuration.
    pub fn build(config: &ReplayBufferConfig) -> Self {
        Self {
            capacity: config.capacity,
            i: 0,
            items: Vec::with_capacity(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Maximum number of transitions this buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of stored transitions. Never exceeds the capacity.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer holds no transitions.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pushes a transition, evicting the oldest one when full.
    pub fn push(&mut self, tr: Transition<O, A>) {
        if self.items.len() < self.capacity {
            self.items.push(tr);
        } else {
            self.items[self.i] = tr;
        }
        self.i = (self.i + 1) % self.capacity;
    }

    /// Samples `size` distinct transitions uniformly from the buffer.
    ///
    /// Fails with [`RlabError::InsufficientTransitions`] when fewer than
    /// `size` transitions are stored; callers guard with [`Self::len`].
    pub fn batch(&mut self, size: usize) -> Result<TransitionBatch<O, A>, RlabError> {
        if size > self.items.len() {
            return Err(RlabError::InsufficientTransitions {
                len: self.items.len(),
                batch_size: size,
            });
        }

        trace!("sample {} of {} transitions", size, self.items.len());
        let ixs = sample(&mut self.rng, self.items.len(), size);
        let mut batch = TransitionBatch {
            obs: Vec::with_capacity(size),
            act: Vec::with_capacity(size),
            reward: Vec::with_capacity(size),
            next_obs: Vec::with_capacity(size),
            is_done: Vec::with_capacity(size),
        };
        for ix in ixs.into_iter() {
            let tr = &self.items[ix];
            batch.obs.push(tr.obs.clone());
            batch.act.push(tr.act.clone());
            batch.reward.push(tr.reward);
            batch.next_obs.push(tr.next_obs.clone());
            batch.is_done.push(tr.is_done);
        }
        Ok(batch)
    }

    /// Drops all stored transitions, keeping capacity and RNG state.
    pub fn clear(&mut self) {
        self.items.clear();
        self.i = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(v: f32) -> Transition<Vec<f32>, usize> {
        Transition {
            obs: vec![v],
            act: 0,
            reward: v,
            next_obs: vec![v + 1.0],
            is_done: false,
        }
    }

    fn buffer(capacity: usize) -> ReplayBuffer<Vec<f32>, usize> {
        ReplayBuffer::build(&ReplayBufferConfig::default().capacity(capacity).seed(0))
    }

    #[test]
    fn eviction_is_strict_fifo() {
        let mut buffer = buffer(3);
        for v in 0..5 {
            buffer.push(transition(v as f32));
        }
        assert_eq!(buffer.len(), 3);

        // The survivors are exactly the three most recent inserts.
        let batch = buffer.batch(3).unwrap();
        let mut rewards = batch.reward.clone();
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(rewards, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn len_never_exceeds_capacity() {
        let mut buffer = buffer(8);
        for v in 0..100 {
            buffer.push(transition(v as f32));
            assert!(buffer.len() <= 8);
        }
    }

    #[test]
    fn batch_holds_distinct_transitions() {
        let mut buffer = buffer(16);
        for v in 0..16 {
            buffer.push(transition(v as f32));
        }
        let batch = buffer.batch(16).unwrap();
        assert_eq!(batch.len(), 16);
        let mut rewards = batch.reward.clone();
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        rewards.dedup();
        assert_eq!(rewards.len(), 16);
    }

    #[test]
    fn undersized_sampling_is_an_error() {
        let mut buffer = buffer(4);
        buffer.push(transition(0.0));
        assert!(buffer.batch(2).is_err());
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut buffer = buffer(4);
        for v in 0..4 {
            buffer.push(transition(v as f32));
        }
        buffer.clear();
        assert!(buffer.is_empty());
        buffer.push(transition(9.0));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn config_yaml_round_trip() {
        use tempdir::TempDir;

        let dir = TempDir::new("replay_buffer_config").unwrap();
        let path = dir.path().join("config.yaml");
        let config = ReplayBufferConfig::default().capacity(123).seed(7);
        config.save(&path).unwrap();
        assert_eq!(ReplayBufferConfig::load(&path).unwrap(), config);
    }
}
