use serde::{Deserialize, Serialize};

use crate::game::{Action, AgentForm};

/// An immutable subset of the game's actions, with at least one action
/// retained per information set. The traversal order everywhere in the
/// crate is players outer, information sets next, actions innermost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Support {
    /// Retained full-game action indices per `[player][infoset]`, ascending.
    actions: Vec<Vec<Vec<usize>>>,
}

impl Support {
    /// The unrestricted support of `game`.
    pub fn full(game: &impl AgentForm) -> Self {
        let actions = (0..game.num_players())
            .map(|pl| {
                (0..game.num_infosets(pl))
                    .map(|iset| (0..game.num_actions(pl, iset)).collect())
                    .collect()
            })
            .collect();
        Self { actions }
    }

    /// A new support with `action` removed. `self` is unchanged.
    pub fn remove_action(&self, action: Action) -> Support {
        let mut actions = self.actions.clone();
        actions[action.player][action.infoset].retain(|&a| a != action.action);
        Support { actions }
    }

    pub fn num_players(&self) -> usize {
        self.actions.len()
    }

    pub fn num_infosets(&self, player: usize) -> usize {
        self.actions[player].len()
    }

    pub fn num_actions(&self, player: usize, infoset: usize) -> usize {
        self.actions[player][infoset].len()
    }

    /// Total number of action slots N across all information sets.
    pub fn num_slots(&self) -> usize {
        self.actions
            .iter()
            .map(|p| p.iter().map(|i| i.len()).sum::<usize>())
            .sum()
    }

    /// Full-game handle of the `index`-th retained action at an infoset.
    pub fn action(&self, player: usize, infoset: usize, index: usize) -> Action {
        Action::new(player, infoset, self.actions[player][infoset][index])
    }

    pub fn contains(&self, action: Action) -> bool {
        self.actions
            .get(action.player)
            .and_then(|p| p.get(action.infoset))
            .map(|acts| acts.contains(&action.action))
            .unwrap_or(false)
    }

    /// Flat slot position of `(player, infoset, index)` in traversal order.
    pub fn slot(&self, player: usize, infoset: usize, index: usize) -> usize {
        let mut offset = 0;
        for pl in 0..player {
            offset += self.actions[pl].iter().map(|i| i.len()).sum::<usize>();
        }
        for iset in 0..infoset {
            offset += self.actions[player][iset].len();
        }
        offset + index
    }

    /// Full-game handle of the action occupying flat slot `slot`.
    ///
    /// Panics if `slot >= num_slots()`.
    pub fn slot_action(&self, slot: usize) -> Action {
        let mut index = slot;
        for (pl, player) in self.actions.iter().enumerate() {
            for (iset, acts) in player.iter().enumerate() {
                if index < acts.len() {
                    return Action::new(pl, iset, acts[index]);
                }
                index -= acts.len();
            }
        }
        panic!("slot {} out of range for support", slot);
    }
}

/// A behavior strategy profile over a support: one probability per retained
/// action slot, stored flat in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    support: Support,
    probs: Vec<f64>,
}

impl BehaviorProfile {
    /// Profile with every slot set to `fill`.
    pub fn constant(support: Support, fill: f64) -> Self {
        let probs = vec![fill; support.num_slots()];
        Self { support, probs }
    }

    /// The uniform centroid: each information set spreads probability
    /// evenly over its retained actions.
    pub fn centroid(support: Support) -> Self {
        let mut probs = Vec::with_capacity(support.num_slots());
        for pl in 0..support.num_players() {
            for iset in 0..support.num_infosets(pl) {
                let count = support.num_actions(pl, iset);
                probs.extend(std::iter::repeat(1.0 / count as f64).take(count));
            }
        }
        Self { support, probs }
    }

    /// Profile with slot values copied from `values`.
    ///
    /// Panics if `values.len() != support.num_slots()`.
    pub fn from_slice(support: Support, values: &[f64]) -> Self {
        assert_eq!(values.len(), support.num_slots());
        Self {
            support,
            probs: values.to_vec(),
        }
    }

    pub fn support(&self) -> &Support {
        &self.support
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Flat slot values in traversal order.
    pub fn values(&self) -> &[f64] {
        &self.probs
    }

    /// Probability on the `index`-th retained action at an infoset.
    pub fn get(&self, player: usize, infoset: usize, index: usize) -> f64 {
        self.probs[self.support.slot(player, infoset, index)]
    }

    /// Probability on a full-game action; zero for actions outside the
    /// support. Game implementations evaluate payoffs through this.
    pub fn prob(&self, action: Action) -> f64 {
        let acts = &self.support.actions[action.player][action.infoset];
        match acts.iter().position(|&a| a == action.action) {
            Some(index) => self.probs[self.support.slot(action.player, action.infoset, index)],
            None => 0.0,
        }
    }
}
