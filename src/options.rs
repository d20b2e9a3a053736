//! Typed mirror of the CLI/option-file surface (§4.8/§6). This crate parses
//! nothing from argv or disk; a `SolverOptions` value is simply the typed
//! target an embedding binary is expected to populate, with `clap::Parser`
//! derived so that binary can reuse this exact flag surface for free.

use clap::{Parser, ValueEnum};

use crate::common::{DEFAULT_ABS_TOL, DEFAULT_INT_TOL, DEFAULT_REL_TOL};

/// Brancher selection (§6 `brancher {rel|maxvio|lex}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrancherKind {
    #[value(name = "rel")]
    Reliability,
    #[value(name = "maxvio")]
    MaxViolation,
    #[value(name = "lex")]
    Lexicographic,
}

/// The options an embedding CLI driver is expected to populate and hand to
/// the B&B driver (§4.8). File I/O, `.nl` parsing, and argv handling stay
/// external to this crate; only the typed surface lives here.
#[derive(Debug, Clone, Parser)]
#[command(name = "disjunct", about = "Branch-and-bound engine for mixed-integer nonlinear programs")]
pub struct SolverOptions {
    /// Path to the problem file (external reader's concern; unused by the core).
    #[arg(value_name = "problem_file")]
    pub problem_file: Option<String>,

    #[arg(long, default_value_t = true)]
    pub presolve: bool,

    #[arg(long, default_value_t = true)]
    pub nl_presolve: bool,

    #[arg(long, default_value_t = true)]
    pub lin_presolve: bool,

    #[arg(long, default_value_t = false)]
    pub use_native_cgraph: bool,

    #[arg(long, value_enum, default_value_t = BrancherKind::Reliability)]
    pub brancher: BrancherKind,

    #[arg(long, default_value_t = DEFAULT_ABS_TOL)]
    pub sol_abs_tol: f64,

    #[arg(long, default_value_t = DEFAULT_REL_TOL)]
    pub sol_rel_tol: f64,

    #[arg(long, default_value_t = DEFAULT_INT_TOL)]
    pub int_tol: f64,

    #[arg(long)]
    pub obj_cut_off: Option<f64>,

    #[arg(long, default_value_t = 10)]
    pub pres_freq: u32,

    #[arg(long, default_value_t = true)]
    pub solve: bool,

    #[arg(long, default_value_t = false)]
    pub display_problem: bool,

    #[arg(long, default_value_t = false)]
    pub display_size: bool,

    /// Driver termination: absolute and relative gap (§4.7).
    #[arg(long, default_value_t = 1e-6)]
    pub abs_gap: f64,

    #[arg(long, default_value_t = 1e-4)]
    pub rel_gap: f64,

    #[arg(long)]
    pub time_limit: Option<f64>,

    #[arg(long)]
    pub node_limit: Option<u64>,

    /// Whether an engine error at a node is treated as `Continue` (with
    /// the parent's bound) rather than `Infeasible` (§4.5/§7).
    #[arg(long, default_value_t = true)]
    pub cont_on_err: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            problem_file: None,
            presolve: true,
            nl_presolve: true,
            lin_presolve: true,
            use_native_cgraph: false,
            brancher: BrancherKind::Reliability,
            sol_abs_tol: DEFAULT_ABS_TOL,
            sol_rel_tol: DEFAULT_REL_TOL,
            int_tol: DEFAULT_INT_TOL,
            obj_cut_off: None,
            pres_freq: 10,
            solve: true,
            display_problem: false,
            display_size: false,
            abs_gap: 1e-6,
            rel_gap: 1e-4,
            time_limit: None,
            node_limit: None,
            cont_on_err: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tolerance_constants() {
        let opts = SolverOptions::default();
        assert_eq!(opts.int_tol, DEFAULT_INT_TOL);
        assert_eq!(opts.brancher, BrancherKind::Reliability);
    }
}
