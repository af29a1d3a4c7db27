#![warn(missing_docs)]
//! Linear policy-gradient agents.
//!
//! Both agents share a [`SoftmaxPolicy`] over feature vectors supplied by
//! the environment: [`Reinforce`] updates it once per episode from full
//! Monte Carlo returns, [`ActorCritic`] updates it online every step with a
//! linear critic as the action-value estimate.
mod actor_critic;
mod reinforce;
mod softmax;

pub use actor_critic::{ActorCritic, ActorCriticConfig};
pub use reinforce::{Reinforce, ReinforceConfig};
pub use softmax::SoftmaxPolicy;
