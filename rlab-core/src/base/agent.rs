//! Agent.
use super::AgentKind;

/// Capability set common to every learning agent.
///
/// Step methods are inherent on the concrete agents because their signatures
/// differ per algorithm family; see the individual agent crates.
pub trait Agent {
    /// The algorithm implemented by this agent.
    fn kind(&self) -> AgentKind;

    /// Reinitializes all owned tables, weights, and buffers to their
    /// construction-time defaults.
    ///
    /// Must be callable repeatedly, e.g. every time a run is restarted,
    /// without leaking state from previous runs.
    fn reset(&mut self);
}
