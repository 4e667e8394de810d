use serde::{Deserialize, Serialize};

use crate::game::AgentForm;
use crate::profile::{BehaviorProfile, Support};
use crate::tracer::{trace_path, Cancelled, QrePoint, StatusSink, TraceSettings};

fn default_max_lambda() -> f64 {
    30.0
}

/// Entry point for tracing the principal branch of the agent-logit QRE
/// correspondence, starting from the uniform centroid at lambda = 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogitSolver {
    /// Trace until lambda reaches this value.
    #[serde(default = "default_max_lambda")]
    pub max_lambda: f64,
    /// Keep every accepted point instead of only the terminal one.
    #[serde(default)]
    pub full_graph: bool,
    #[serde(default)]
    pub settings: TraceSettings,
}

impl Default for LogitSolver {
    fn default() -> Self {
        Self {
            max_lambda: default_max_lambda(),
            full_graph: false,
            settings: TraceSettings::default(),
        }
    }
}

impl LogitSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_lambda(mut self, max_lambda: f64) -> Self {
        self.max_lambda = max_lambda;
        self
    }

    pub fn with_full_graph(mut self, full_graph: bool) -> Self {
        self.full_graph = full_graph;
        self
    }

    pub fn with_settings(mut self, settings: TraceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Trace the branch and return the accepted points in order.
    ///
    /// Tracing is best effort: no failure is reported in-band. Sink
    /// cancellation and game evaluation errors end the trace at this
    /// boundary, and the prefix of the branch accepted up to that point
    /// is returned. With `full_graph` unset, only the terminal point --
    /// the branch's nearest approach to a Nash equilibrium -- survives.
    pub fn solve<G: AgentForm, S: StatusSink>(
        &self,
        game: &G,
        support: &Support,
        status: &mut S,
    ) -> Vec<QrePoint> {
        let start = BehaviorProfile::centroid(support.clone());
        let mut solutions = Vec::new();

        match trace_path(
            game,
            start,
            0.0,
            self.max_lambda,
            1.0,
            &self.settings,
            status,
            &mut solutions,
        ) {
            Ok(()) => {}
            Err(err) if err.is::<Cancelled>() => {}
            Err(_) => {
                // Game evaluation failed mid-trace; the accepted prefix
                // still satisfies the branch invariants.
            }
        }

        if !self.full_graph && solutions.len() > 1 {
            solutions.drain(..solutions.len() - 1);
        }
        solutions
    }
}
