//! Predictor-corrector tracer for one branch of the logit QRE
//! correspondence. Each cycle takes an Euler step along the tangent,
//! re-factorizes the Jacobian at the predicted point, and runs Newton
//! corrections against the residual until convergence or rejection;
//! the step size adapts from the corrector's contraction behavior.

use std::fmt;

use anyhow::Result;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::game::AgentForm;
use crate::profile::BehaviorProfile;
use crate::qr::{newton_step, qr_decompose};
use crate::system;

fn default_max_iters() -> usize {
    5000
}

fn default_tolerance() -> f64 {
    1.0e-4
}

fn default_max_decel() -> f64 {
    1.1
}

fn default_max_dist() -> f64 {
    0.4
}

fn default_max_contr() -> f64 {
    0.6
}

fn default_eta() -> f64 {
    0.1
}

fn default_initial_step() -> f64 {
    0.03
}

fn default_min_step() -> f64 {
    1.0e-5
}

fn default_drop_tolerance() -> f64 {
    1.0e-10
}

/// Settings controlling the predictor-corrector loop. The defaults are
/// load-bearing: the step-size feedback is tuned around them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraceSettings {
    /// Hard ceiling on outer iterations before the branch is abandoned.
    #[serde(default = "default_max_iters")]
    pub max_iters: usize,
    /// Corrector convergence threshold on the Newton step length.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Largest single-step deceleration/acceleration factor.
    #[serde(default = "default_max_decel")]
    pub max_decel: f64,
    /// Reject a corrector iterate whose step length exceeds this.
    #[serde(default = "default_max_dist")]
    pub max_dist: f64,
    /// Reject when consecutive corrector steps contract slower than this.
    #[serde(default = "default_max_contr")]
    pub max_contr: f64,
    /// Floor applied to the contraction-ratio denominator.
    #[serde(default = "default_eta")]
    pub eta: f64,
    /// Step size at the start of each trace frame.
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,
    /// Step size below which the tracer gives up.
    #[serde(default = "default_min_step")]
    pub min_step: f64,
    /// Probability below which an action leaves the support.
    #[serde(default = "default_drop_tolerance")]
    pub drop_tolerance: f64,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            max_iters: default_max_iters(),
            tolerance: default_tolerance(),
            max_decel: default_max_decel(),
            max_dist: default_max_dist(),
            max_contr: default_max_contr(),
            eta: default_eta(),
            initial_step: default_initial_step(),
            min_step: default_min_step(),
            drop_tolerance: default_drop_tolerance(),
        }
    }
}

/// Signals that the status sink requested cancellation of the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace cancelled by status sink")
    }
}

impl std::error::Error for Cancelled {}

/// Receives progress reports and carries cancellation back into the loop.
pub trait StatusSink {
    /// Polled once per outer iteration. Return an error wrapping
    /// [`Cancelled`] to stop the trace.
    fn poll(&mut self) -> Result<()>;

    /// Advisory progress report; no ordering or rate guarantee.
    fn set_progress(&mut self, _fraction: f64, _label: &str) {}
}

/// Status sink that never cancels and discards progress reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatus;

impl StatusSink for NullStatus {
    fn poll(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One accepted point on the traced branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrePoint {
    pub lambda: f64,
    /// Step size in effect when the point was accepted.
    pub step: f64,
    pub profile: BehaviorProfile,
}

/// Trace the branch through `start` at `start_lambda` until lambda leaves
/// `[0, max_lambda)`, appending every accepted point to `solutions`.
///
/// `omega` selects the initial direction of travel along the curve and
/// flips when a turning point reverses the tangent. When a profile
/// component falls below the drop tolerance the action leaves the support
/// and the trace restarts on the reduced game at the current lambda; the
/// restart re-initializes the step size and iteration budget exactly as a
/// fresh call would, so the recursion of the textbook formulation is
/// replaced by a single loop.
///
/// Errors from the status sink or the game propagate to the caller;
/// `solutions` retains the prefix of the branch accepted before the
/// failure. Iteration exhaustion and step-size underflow end the trace
/// silently.
#[allow(clippy::too_many_arguments)]
pub fn trace_path<G: AgentForm, S: StatusSink>(
    game: &G,
    start: BehaviorProfile,
    start_lambda: f64,
    max_lambda: f64,
    mut omega: f64,
    settings: &TraceSettings,
    status: &mut S,
    solutions: &mut Vec<QrePoint>,
) -> Result<()> {
    let mut support = start.support().clone();
    let mut profile_values: Vec<f64> = start.values().to_vec();
    let mut lambda = start_lambda;

    'frame: loop {
        let n = support.num_slots();
        let mut x = DVector::zeros(n + 1);
        for (i, &v) in profile_values.iter().enumerate() {
            x[i] = v;
        }
        x[n] = lambda;

        // A strategy already outside the simplex interior leaves the
        // support before any stepping.
        for i in 0..n {
            if x[i] < settings.drop_tolerance {
                support = support.remove_action(support.slot_action(i));
                profile_values.remove(i);
                lambda = x[n];
                continue 'frame;
            }
        }

        let mut u = DVector::zeros(n + 1);
        let mut y = DVector::zeros(n);
        let mut b = DMatrix::zeros(n + 1, n);
        let mut q = DMatrix::zeros(n + 1, n + 1);

        system::jacobian(game, &support, &x, &mut b)?;
        qr_decompose(&mut b, &mut q);
        let mut t: DVector<f64> = q.row(n).transpose();
        // The kernel vector's sign is arbitrary; orient the first step
        // toward increasing lambda.
        if omega * t[n] < 0.0 {
            omega = -omega;
        }

        let mut h = settings.initial_step;
        let mut niters = 0usize;

        while x[n] >= 0.0 && x[n] < max_lambda {
            status.poll()?;
            if niters > settings.max_iters {
                return Ok(());
            }
            if niters % 25 == 0 {
                status.set_progress(x[n] / max_lambda, &format!("Lambda = {:.6}", x[n]));
            }
            niters += 1;

            if h.abs() <= settings.min_step {
                return Ok(());
            }

            // Predictor step.
            let mut accept = true;
            for k in 0..=n {
                u[k] = x[k] + h * omega * t[k];
                if k < n && u[k] < 0.0 {
                    accept = false;
                    break;
                }
            }
            if !accept {
                h *= 0.5;
                continue;
            }

            let mut decel = 1.0 / settings.max_decel;
            system::jacobian(game, &support, &u, &mut b)?;
            qr_decompose(&mut b, &mut q);

            // Corrector iteration.
            let mut dist_prev = 0.0;
            let mut iter = 1;
            loop {
                system::residual(game, &support, &u, &mut y)?;
                let dist = newton_step(&q, &b, &mut u, &mut y);
                if !dist.is_finite() || dist >= settings.max_dist {
                    accept = false;
                    break;
                }
                if (0..n).any(|i| u[i] < 0.0) {
                    accept = false;
                    break;
                }

                decel = decel.max((dist / settings.max_dist).sqrt() * settings.max_decel);
                if iter >= 2 {
                    let contr = dist / (dist_prev + settings.tolerance * settings.eta);
                    if contr > settings.max_contr {
                        accept = false;
                        break;
                    }
                    decel = decel.max((contr / settings.max_contr).sqrt() * settings.max_decel);
                }

                if dist <= settings.tolerance {
                    break;
                }
                dist_prev = dist;
                iter += 1;
            }

            if !accept {
                h /= settings.max_decel;
                if h.abs() <= settings.min_step {
                    return Ok(());
                }
                continue;
            }

            h = (h / decel.min(settings.max_decel)).abs();

            // Commit. An action pushed below the drop threshold leaves the
            // support and the trace restarts on the reduced game.
            for i in 0..n {
                if u[i] < settings.drop_tolerance {
                    support = support.remove_action(support.slot_action(i));
                    profile_values.clear();
                    profile_values.extend((0..n).filter(|&j| j != i).map(|j| u[j]));
                    lambda = u[n];
                    continue 'frame;
                }
                x[i] = u[i];
            }
            x[n] = u[n];

            // The final predictor step may overshoot the lambda window;
            // only in-range points belong to the branch.
            if x[n] >= 0.0 && x[n] < max_lambda {
                solutions.push(QrePoint {
                    lambda: x[n],
                    step: h,
                    profile: BehaviorProfile::from_slice(support.clone(), &x.as_slice()[..n]),
                });
            }

            let t_new: DVector<f64> = q.row(n).transpose();
            if t.dot(&t_new) < 0.0 {
                // Turning point crossed; keep moving forward in lambda.
                omega = -omega;
            }
            t = t_new;
        }

        return Ok(());
    }
}
