use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::profile::BehaviorProfile;

/// Stable handle to an action of the full game. All indices are 0-based
/// and refer to the unrestricted game, independent of any support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub player: usize,
    pub infoset: usize,
    pub action: usize,
}

impl Action {
    pub fn new(player: usize, infoset: usize, action: usize) -> Self {
        Self {
            player,
            infoset,
            action,
        }
    }
}

/// Capability set the tracer requires from a game representation in agent
/// form, where every information set acts as an independent decision-maker.
///
/// Payoff evaluation reads probabilities through [`BehaviorProfile::prob`],
/// which reports zero for actions outside the profile's support, so
/// implementations never need to know which support is being traced.
pub trait AgentForm {
    fn num_players(&self) -> usize;

    fn num_infosets(&self, player: usize) -> usize;

    fn num_actions(&self, player: usize, infoset: usize) -> usize;

    /// Expected payoff to the owning player of choosing `action` at its
    /// information set, under `profile`.
    fn action_value(&self, profile: &BehaviorProfile, action: Action) -> Result<f64>;

    /// Partial derivative of `action_value(a)` with respect to the
    /// probability placed on `b`.
    fn diff_action_value(&self, profile: &BehaviorProfile, a: Action, b: Action) -> Result<f64>;

    /// Reach probability of `(player, infoset)` under `profile`.
    fn infoset_probability(
        &self,
        profile: &BehaviorProfile,
        player: usize,
        infoset: usize,
    ) -> Result<f64>;
}
