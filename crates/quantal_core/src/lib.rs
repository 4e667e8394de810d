//! The `quantal_core` crate traces one-dimensional branches of the
//! agent-logit quantal response equilibrium correspondence for
//! extensive-form games. The tracer is an Euler-Newton predictor-corrector
//! path follower with adaptive step size; as the rationality parameter
//! lambda rises from zero the traced branch moves from the uniform
//! centroid toward a Nash equilibrium.
//!
//! Key components:
//! - **Game interface**: [`game::AgentForm`], the capability set the tracer
//!   requires from a game representation.
//! - **Profiles**: [`profile::Support`] and [`profile::BehaviorProfile`],
//!   the action subsets and behavior strategies the branch lives on.
//! - **Equation system**: residual and Jacobian of the logit
//!   characterization in [`system`].
//! - **Factorization**: Givens-rotation QR and the minimum-norm Newton
//!   step in [`qr`].
//! - **Tracing**: the predictor-corrector loop in [`tracer`] and the
//!   [`solver::LogitSolver`] entry point.

pub mod game;
pub mod profile;
pub mod qr;
pub mod solver;
pub mod system;
pub mod tracer;

#[cfg(test)]
pub(crate) mod fixtures;
