#![warn(missing_docs)]
//! Tabular agents for finite, enumerable state and action spaces.
//!
//! Two dynamic-programming agents ([`ValueIter`], [`PolicyIter`]) plan over
//! an [`EmpiricalModel`] estimated from exploration, and three model-free
//! agents ([`QLearning`], [`Sarsa`], [`FirstVisitMc`]) update a [`QTable`]
//! online or per episode.
mod empirical;
mod first_visit_mc;
mod policy_iter;
mod q_learning;
mod q_table;
mod sarsa;
#[cfg(test)]
mod test_env;
mod value_iter;

pub use empirical::EmpiricalModel;
pub use first_visit_mc::{EpisodeStep, FirstVisitMc, FirstVisitMcConfig};
pub use policy_iter::{PolicyIter, PolicyIterConfig};
pub use q_learning::{QLearning, QLearningConfig};
pub use q_table::QTable;
pub use sarsa::{Sarsa, SarsaConfig};
pub use value_iter::{ValueIter, ValueIterConfig};

/// Threshold on the maximum absolute value change below which a Bellman
/// sweep is considered converged.
pub(crate) const SWEEP_TOLERANCE: f32 = 1e-3;
