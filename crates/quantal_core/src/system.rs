//! The equation system characterizing a point on the logit QRE
//! correspondence. For each information set there is one sum-to-one row
//! followed by one factored logit-indifference row per non-reference
//! action; rows, like variables, follow the fixed traversal order
//! (players outer, infosets next, actions innermost). The unknown vector
//! `x` has the N profile slots first and lambda last.

use anyhow::{bail, Result};
use nalgebra::{DMatrix, DVector};

use crate::game::AgentForm;
use crate::profile::{BehaviorProfile, Support};

/// Information sets reached with probability below this contribute no
/// cross-infoset Jacobian entries: the payoff differentials behind those
/// entries divide by the reach probability and are unreliable there.
pub const REACH_FLOOR: f64 = 1.0e-10;

/// Evaluate the residual F(x) into `out` (length N).
///
/// Defined for every x with nonnegative profile components. The factored
/// form of the indifference rows extends continuously by zero onto the
/// boundary of the simplex.
pub fn residual<G: AgentForm>(
    game: &G,
    support: &Support,
    point: &DVector<f64>,
    out: &mut DVector<f64>,
) -> Result<()> {
    let n = support.num_slots();
    if point.len() != n + 1 {
        bail!("point has incorrect dimension");
    }
    if out.len() != n {
        bail!("residual buffer has incorrect dimension");
    }

    let profile = BehaviorProfile::from_slice(support.clone(), &point.as_slice()[..n]);
    let lambda = point[n];

    let mut row = 0;
    for pl in 0..support.num_players() {
        for iset in 0..support.num_infosets(pl) {
            let mut sum = 0.0;
            for index in 0..support.num_actions(pl, iset) {
                sum += profile.get(pl, iset, index);
            }
            out[row] = sum - 1.0;
            row += 1;

            if support.num_actions(pl, iset) == 1 {
                continue;
            }
            let value_ref = game.action_value(&profile, support.action(pl, iset, 0))?;
            for index in 1..support.num_actions(pl, iset) {
                let p_ref = profile.get(pl, iset, 0);
                let p_act = profile.get(pl, iset, index);
                if p_ref == 0.0 || p_act == 0.0 {
                    out[row] = 0.0;
                } else {
                    let value = game.action_value(&profile, support.action(pl, iset, index))?;
                    out[row] = ((p_act / p_ref).ln() - lambda * (value - value_ref)) * p_ref * p_act;
                }
                row += 1;
            }
        }
    }

    Ok(())
}

/// Evaluate the Jacobian of F at `point` into `out`.
///
/// The matrix is stored rows-by-variable (N profile slots then lambda)
/// and columns-by-equation, the orientation [`crate::qr::qr_decompose`]
/// consumes.
pub fn jacobian<G: AgentForm>(
    game: &G,
    support: &Support,
    point: &DVector<f64>,
    out: &mut DMatrix<f64>,
) -> Result<()> {
    let n = support.num_slots();
    if point.len() != n + 1 {
        bail!("point has incorrect dimension");
    }
    if out.nrows() != n + 1 || out.ncols() != n {
        bail!("jacobian buffer has incorrect dimension");
    }

    let profile = BehaviorProfile::from_slice(support.clone(), &point.as_slice()[..n]);
    let lambda = point[n];

    let mut eq = 0;
    for pl1 in 0..support.num_players() {
        for iset1 in 0..support.num_infosets(pl1) {
            // Sum-to-one equation.
            let mut var = 0;
            for pl2 in 0..support.num_players() {
                for iset2 in 0..support.num_infosets(pl2) {
                    for _ in 0..support.num_actions(pl2, iset2) {
                        out[(var, eq)] = if pl1 == pl2 && iset1 == iset2 { 1.0 } else { 0.0 };
                        var += 1;
                    }
                }
            }
            out[(n, eq)] = 0.0;
            eq += 1;

            if support.num_actions(pl1, iset1) == 1 {
                continue;
            }
            let reach = game.infoset_probability(&profile, pl1, iset1)?;
            let p_ref = profile.get(pl1, iset1, 0);
            let action_ref = support.action(pl1, iset1, 0);
            let value_ref = game.action_value(&profile, action_ref)?;

            // Logit indifference equations.
            for index1 in 1..support.num_actions(pl1, iset1) {
                let p_act = profile.get(pl1, iset1, index1);
                let action1 = support.action(pl1, iset1, index1);

                let mut var = 0;
                for pl2 in 0..support.num_players() {
                    for iset2 in 0..support.num_infosets(pl2) {
                        for index2 in 0..support.num_actions(pl2, iset2) {
                            if pl1 == pl2 && iset1 == iset2 {
                                out[(var, eq)] = if index2 == 0 {
                                    -p_act
                                } else if index2 == index1 {
                                    p_ref
                                } else {
                                    0.0
                                };
                            } else if reach < REACH_FLOOR {
                                out[(var, eq)] = 0.0;
                            } else {
                                let action2 = support.action(pl2, iset2, index2);
                                let diff = game.diff_action_value(&profile, action1, action2)?
                                    - game.diff_action_value(&profile, action_ref, action2)?;
                                out[(var, eq)] = -lambda * p_ref * p_act * diff;
                            }
                            var += 1;
                        }
                    }
                }

                let value = game.action_value(&profile, action1)?;
                out[(n, eq)] = -p_ref * p_act * (value - value_ref);
                eq += 1;
            }
        }
    }

    Ok(())
}
