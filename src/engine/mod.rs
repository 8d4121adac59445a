//! The narrow interface to an external mixed-integer engine.
//!
//! An [Engine] is a black box: it receives a problem, is told the objective
//! direction, which columns are integer and an optional starting point, runs its
//! branch-and-bound search and reports termination flags, a primal solution and
//! an objective value. [CbcEngine] drives the COIN-OR CBC command-line program.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::matrix::RowMatrix;
use crate::status::EngineFlags;

pub use self::cbc::*;

pub mod cbc;

/// Objective direction as engines encode it: maximize
pub const MAXIMIZE: f64 = -1.0;
/// Objective direction as engines encode it: minimize
pub const MINIMIZE: f64 = 1.0;

/// A problem instance, borrowed from the model for the duration of the load
#[derive(Debug, Clone, Copy)]
pub struct Problem<'a> {
    /// Constraint rows and their bounds
    pub matrix: &'a RowMatrix,
    /// Lower bound of every column
    pub column_lower: &'a [f64],
    /// Upper bound of every column
    pub column_upper: &'a [f64],
    /// One objective coefficient per column
    pub objective: &'a [f64],
}

/// Failures of the engine itself, as opposed to outcomes of the search
#[derive(Debug, Error)]
pub enum EngineError {
    /// Temporary files could not be written or the engine could not be started
    #[error("engine i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The engine process exited unsuccessfully
    #[error("`{command}` exited with {status}")]
    Process {
        /// program that was run
        command: String,
        /// its exit status
        status: ExitStatus,
    },
    /// The solution written by the engine could not be understood
    #[error("incorrect solution format: {0}")]
    SolutionFormat(String),
    /// The engine did not write a solution file
    #[error("no solution file at {0}")]
    MissingSolution(PathBuf),
    /// The search was started before a problem was loaded
    #[error("no problem loaded")]
    NotLoaded,
}

/// A mixed-integer engine
pub trait Engine {
    /// Value standing for an unbounded side of a bound
    fn infinity(&self) -> f64;
    /// Verbosity of the engine's own output. 0 silences it.
    fn set_log_level(&mut self, level: u32);
    /// Take a copy of the problem
    fn load_problem(&mut self, problem: Problem<'_>);
    /// [MAXIMIZE] or [MINIMIZE]
    fn set_optimization_direction(&mut self, direction: f64);
    /// Restrict a column to integer values
    fn set_integer(&mut self, column: usize);
    /// A candidate solution to seed the search with. It need not be feasible.
    fn set_initial_solution(&mut self, values: &[f64]);
    /// Run the search to completion or to one of the engine's limits
    fn branch_and_bound(&mut self) -> Result<(), EngineError>;
    /// Termination flags of the last search
    fn flags(&self) -> EngineFlags;
    /// Primal column values of the last search
    fn col_solution(&self) -> &[f64];
    /// Objective value of [Engine::col_solution]
    fn objective_value(&self) -> f64;
}

/// Engines that accept a time limit
pub trait WithMaxSeconds<T> {
    /// the current time limit, if any
    fn max_seconds(&self) -> Option<u32>;
    /// a copy of this engine with the given time limit
    fn with_max_seconds(&self, seconds: u32) -> T;
}

/// Engines that can search with several threads
pub trait WithNbThreads<T> {
    /// the configured number of threads, if any
    fn nb_threads(&self) -> Option<u32>;
    /// a copy of this engine using the given number of threads
    fn with_nb_threads(&self, threads: u32) -> T;
}
