//! Game and status-sink collaborators used by the test suites.

use std::cell::Cell;

use anyhow::{anyhow, bail, Result};

use crate::game::{Action, AgentForm};
use crate::profile::BehaviorProfile;
use crate::tracer::{Cancelled, StatusSink};

/// Normal-form game in agent form: one information set per player, payoffs
/// from a flat tensor with the last player's action varying fastest.
pub struct NormalFormGame {
    shape: Vec<usize>,
    payoffs: Vec<Vec<f64>>,
}

impl NormalFormGame {
    pub fn new(shape: Vec<usize>, payoffs: Vec<Vec<f64>>) -> Self {
        let cells: usize = shape.iter().product();
        assert_eq!(payoffs.len(), shape.len());
        for table in &payoffs {
            assert_eq!(table.len(), cells);
        }
        Self { shape, payoffs }
    }

    /// Symmetric 2x2 coordination game.
    pub fn coordination() -> Self {
        Self::new(
            vec![2, 2],
            vec![vec![1.0, 0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0, 1.0]],
        )
    }

    /// 2x2 zero-sum matching pennies.
    pub fn matching_pennies() -> Self {
        Self::new(
            vec![2, 2],
            vec![vec![1.0, -1.0, -1.0, 1.0], vec![-1.0, 1.0, 1.0, -1.0]],
        )
    }

    /// 2x2 game where the second action of each player is strictly
    /// dominated with a payoff gap of 10.
    pub fn dominance() -> Self {
        Self::new(
            vec![2, 2],
            vec![vec![10.0, 10.0, 0.0, 0.0], vec![10.0, 0.0, 10.0, 0.0]],
        )
    }

    fn decode(&self, mut cell: usize) -> Vec<usize> {
        let mut combo = vec![0; self.shape.len()];
        for pl in (0..self.shape.len()).rev() {
            combo[pl] = cell % self.shape[pl];
            cell /= self.shape[pl];
        }
        combo
    }

    /// Expected payoff to `player` of playing `action`, with the other
    /// players drawn from `profile`, optionally holding one of them at a
    /// fixed action (for differentials).
    fn value_given(
        &self,
        profile: &BehaviorProfile,
        player: usize,
        action: usize,
        fixed: Option<(usize, usize)>,
    ) -> f64 {
        let cells: usize = self.shape.iter().product();
        let mut total = 0.0;
        for cell in 0..cells {
            let combo = self.decode(cell);
            if combo[player] != action {
                continue;
            }
            if let Some((fixed_player, fixed_action)) = fixed {
                if combo[fixed_player] != fixed_action {
                    continue;
                }
            }
            let mut weight = 1.0;
            for (other, &other_action) in combo.iter().enumerate() {
                if other == player {
                    continue;
                }
                if let Some((fixed_player, _)) = fixed {
                    if other == fixed_player {
                        continue;
                    }
                }
                weight *= profile.prob(Action::new(other, 0, other_action));
            }
            total += weight * self.payoffs[player][cell];
        }
        total
    }
}

impl AgentForm for NormalFormGame {
    fn num_players(&self) -> usize {
        self.shape.len()
    }

    fn num_infosets(&self, _player: usize) -> usize {
        1
    }

    fn num_actions(&self, player: usize, _infoset: usize) -> usize {
        self.shape[player]
    }

    fn action_value(&self, profile: &BehaviorProfile, action: Action) -> Result<f64> {
        Ok(self.value_given(profile, action.player, action.action, None))
    }

    fn diff_action_value(&self, profile: &BehaviorProfile, a: Action, b: Action) -> Result<f64> {
        if a.player == b.player {
            // A player's action value does not depend on its own mix.
            return Ok(0.0);
        }
        Ok(self.value_given(profile, a.player, a.action, Some((b.player, b.action))))
    }

    fn infoset_probability(
        &self,
        _profile: &BehaviorProfile,
        _player: usize,
        _infoset: usize,
    ) -> Result<f64> {
        Ok(1.0)
    }
}

/// Three players in sequence. Player 0 chooses out/in; after in, player 1
/// chooses left/right; after right, player 2 chooses up/down. Later
/// infosets are reached only along one branch, so their reach probability
/// collapses as earlier actions decay. Values are conditional on reach
/// and written in closed form.
pub struct GatedGame {
    pub out_payoffs: [f64; 3],
    pub left_payoffs: [f64; 3],
    pub up_payoffs: [f64; 3],
    pub down_payoffs: [f64; 3],
}

impl GatedGame {
    /// Payoffs making out and left dominant while player 2 stays
    /// indifferent, so both gates close as lambda grows.
    pub fn default_payoffs() -> Self {
        Self {
            out_payoffs: [1.0, 0.0, 0.0],
            left_payoffs: [0.5, 1.0, 0.0],
            up_payoffs: [-0.5, 0.3, 0.0],
            down_payoffs: [0.25, -0.2, 0.0],
        }
    }

    fn sigma(profile: &BehaviorProfile, player: usize, action: usize) -> f64 {
        profile.prob(Action::new(player, 0, action))
    }
}

impl AgentForm for GatedGame {
    fn num_players(&self) -> usize {
        3
    }

    fn num_infosets(&self, _player: usize) -> usize {
        1
    }

    fn num_actions(&self, _player: usize, _infoset: usize) -> usize {
        2
    }

    fn action_value(&self, profile: &BehaviorProfile, action: Action) -> Result<f64> {
        let continuation_p0 = |profile: &BehaviorProfile| {
            Self::sigma(profile, 1, 0) * self.left_payoffs[0]
                + Self::sigma(profile, 1, 1)
                    * (Self::sigma(profile, 2, 0) * self.up_payoffs[0]
                        + Self::sigma(profile, 2, 1) * self.down_payoffs[0])
        };
        let value = match (action.player, action.action) {
            (0, 0) => self.out_payoffs[0],
            (0, 1) => continuation_p0(profile),
            (1, 0) => self.left_payoffs[1],
            (1, 1) => {
                Self::sigma(profile, 2, 0) * self.up_payoffs[1]
                    + Self::sigma(profile, 2, 1) * self.down_payoffs[1]
            }
            (2, 0) => self.up_payoffs[2],
            (2, 1) => self.down_payoffs[2],
            _ => bail!("unknown action {:?}", action),
        };
        Ok(value)
    }

    fn diff_action_value(&self, profile: &BehaviorProfile, a: Action, b: Action) -> Result<f64> {
        let value = match ((a.player, a.action), b.player, b.action) {
            ((0, 1), 1, 0) => self.left_payoffs[0],
            ((0, 1), 1, 1) => {
                Self::sigma(profile, 2, 0) * self.up_payoffs[0]
                    + Self::sigma(profile, 2, 1) * self.down_payoffs[0]
            }
            ((0, 1), 2, 0) => Self::sigma(profile, 1, 1) * self.up_payoffs[0],
            ((0, 1), 2, 1) => Self::sigma(profile, 1, 1) * self.down_payoffs[0],
            ((1, 1), 2, 0) => self.up_payoffs[1],
            ((1, 1), 2, 1) => self.down_payoffs[1],
            _ => 0.0,
        };
        Ok(value)
    }

    fn infoset_probability(
        &self,
        profile: &BehaviorProfile,
        player: usize,
        _infoset: usize,
    ) -> Result<f64> {
        let reach = match player {
            0 => 1.0,
            1 => Self::sigma(profile, 0, 1),
            2 => Self::sigma(profile, 0, 1) * Self::sigma(profile, 1, 1),
            _ => bail!("unknown player {}", player),
        };
        Ok(reach)
    }
}

/// Status sink that cancels on the nth poll.
pub struct CancelAfter {
    polls: usize,
    limit: usize,
}

impl CancelAfter {
    pub fn new(limit: usize) -> Self {
        Self { polls: 0, limit }
    }
}

impl StatusSink for CancelAfter {
    fn poll(&mut self) -> Result<()> {
        self.polls += 1;
        if self.polls >= self.limit {
            return Err(anyhow!(Cancelled));
        }
        Ok(())
    }
}

/// Wrapper that fails every payoff query after a call budget, for the
/// driver's partial-result behavior.
pub struct FailingGame<G> {
    inner: G,
    calls: Cell<usize>,
    budget: usize,
}

impl<G> FailingGame<G> {
    pub fn new(inner: G, budget: usize) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
            budget,
        }
    }

    fn charge(&self) -> Result<()> {
        let used = self.calls.get();
        if used >= self.budget {
            bail!("payoff evaluation failed");
        }
        self.calls.set(used + 1);
        Ok(())
    }
}

impl<G: AgentForm> AgentForm for FailingGame<G> {
    fn num_players(&self) -> usize {
        self.inner.num_players()
    }

    fn num_infosets(&self, player: usize) -> usize {
        self.inner.num_infosets(player)
    }

    fn num_actions(&self, player: usize, infoset: usize) -> usize {
        self.inner.num_actions(player, infoset)
    }

    fn action_value(&self, profile: &BehaviorProfile, action: Action) -> Result<f64> {
        self.charge()?;
        self.inner.action_value(profile, action)
    }

    fn diff_action_value(&self, profile: &BehaviorProfile, a: Action, b: Action) -> Result<f64> {
        self.charge()?;
        self.inner.diff_action_value(profile, a, b)
    }

    fn infoset_probability(
        &self,
        profile: &BehaviorProfile,
        player: usize,
        infoset: usize,
    ) -> Result<f64> {
        self.charge()?;
        self.inner.infoset_probability(profile, player, infoset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Support;

    #[test]
    fn test_normal_form_values_against_hand_computation() {
        let game = NormalFormGame::matching_pennies();
        let support = Support::full(&game);
        let profile =
            BehaviorProfile::from_slice(support, &[0.6, 0.4, 0.3, 0.7]);

        // Row action 0 against column 0.3/0.7 on payoffs [1, -1].
        let v = game
            .action_value(&profile, Action::new(0, 0, 0))
            .unwrap();
        assert!((v - (0.3 - 0.7)).abs() < 1e-14);

        // d V_row(a0) / d sigma_col(c0) = payoff at (a0, c0).
        let d = game
            .diff_action_value(&profile, Action::new(0, 0, 0), Action::new(1, 0, 0))
            .unwrap();
        assert!((d - 1.0).abs() < 1e-14);

        let own = game
            .diff_action_value(&profile, Action::new(0, 0, 0), Action::new(0, 0, 1))
            .unwrap();
        assert_eq!(own, 0.0);
    }

    #[test]
    fn test_gated_game_reach_probabilities() {
        let game = GatedGame::default_payoffs();
        let support = Support::full(&game);
        let profile =
            BehaviorProfile::from_slice(support, &[0.8, 0.2, 0.9, 0.1, 0.5, 0.5]);

        assert_eq!(
            game.infoset_probability(&profile, 0, 0).unwrap(),
            1.0
        );
        assert!((game.infoset_probability(&profile, 1, 0).unwrap() - 0.2).abs() < 1e-14);
        assert!((game.infoset_probability(&profile, 2, 0).unwrap() - 0.02).abs() < 1e-14);
    }
}
