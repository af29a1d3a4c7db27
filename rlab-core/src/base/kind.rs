//! Registry of the available learning algorithms.
use crate::error::RlabError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Identifies one of the learning algorithms provided by this workspace.
///
/// An external driver maps a user-selected algorithm name onto a variant via
/// [`FromStr`] and constructs the matching agent from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AgentKind {
    /// Value Iteration over an empirical transition model.
    ValueIteration,

    /// Policy Iteration over an empirical transition model.
    PolicyIteration,

    /// Off-policy tabular Q-Learning.
    QLearning,

    /// On-policy tabular SARSA.
    Sarsa,

    /// First-visit Monte Carlo control.
    FirstVisitMc,

    /// Monte Carlo policy gradient with a linear softmax policy.
    Reinforce,

    /// Online actor-critic with a linear softmax policy and linear critic.
    ActorCritic,

    /// Deep Q-Network.
    Dqn,

    /// Deep Deterministic Policy Gradient.
    Ddpg,
}

impl AgentKind {
    /// Selector string of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValueIteration => "value-iteration",
            Self::PolicyIteration => "policy-iteration",
            Self::QLearning => "q-learning",
            Self::Sarsa => "sarsa",
            Self::FirstVisitMc => "first-visit-mc",
            Self::Reinforce => "reinforce",
            Self::ActorCritic => "actor-critic",
            Self::Dqn => "dqn",
            Self::Ddpg => "ddpg",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = RlabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value-iteration" => Ok(Self::ValueIteration),
            "policy-iteration" => Ok(Self::PolicyIteration),
            "q-learning" => Ok(Self::QLearning),
            "sarsa" => Ok(Self::Sarsa),
            "first-visit-mc" => Ok(Self::FirstVisitMc),
            "reinforce" => Ok(Self::Reinforce),
            "actor-critic" => Ok(Self::ActorCritic),
            "dqn" => Ok(Self::Dqn),
            "ddpg" => Ok(Self::Ddpg),
            _ => Err(RlabError::UnknownAgentKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_round_trip() {
        let kinds = [
            AgentKind::ValueIteration,
            AgentKind::PolicyIteration,
            AgentKind::QLearning,
            AgentKind::Sarsa,
            AgentKind::FirstVisitMc,
            AgentKind::Reinforce,
            AgentKind::ActorCritic,
            AgentKind::Dqn,
            AgentKind::Ddpg,
        ];
        for kind in kinds.iter() {
            assert_eq!(kind.as_str().parse::<AgentKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn unknown_selector_is_an_error() {
        assert!("tabular-dyna".parse::<AgentKind>().is_err());
    }
}
