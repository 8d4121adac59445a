//! The model facade: columns, bounds, objective and rows, solved once by an engine.
use std::fmt;

use tracing::{debug, trace};

use crate::engine::{CbcEngine, Engine, EngineError, Problem, MAXIMIZE, MINIMIZE};
use crate::lp_format::{DisplayedLp, LpProblem};
use crate::matrix::RowMatrix;
use crate::status::SolveStatus;

/// Optimization sense
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Sense {
    /// max
    Maximize,
    /// min
    Minimize,
}

impl Default for Sense {
    fn default() -> Self {
        Sense::Maximize
    }
}

impl Sense {
    /// Engine encoding: -1 to maximize, +1 to minimize
    pub fn direction(self) -> f64 {
        match self {
            Sense::Maximize => MAXIMIZE,
            Sense::Minimize => MINIMIZE,
        }
    }

    /// Inverse of [Sense::direction]. Any negative direction maximizes.
    pub fn from_direction(direction: f64) -> Sense {
        if direction < 0.0 {
            Sense::Maximize
        } else {
            Sense::Minimize
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::Maximize => "maximize",
            Sense::Minimize => "minimize",
        })
    }
}

/// An integer program over a fixed number of columns.
///
/// A model is built with the setters and [LpModel::add_row] /
/// [LpModel::add_sparse_row], solved exactly once with [LpModel::solve], and
/// then only read. Every column is integer when solving.
///
/// Column-wide arrays must have exactly [LpModel::column_count] entries. Passing
/// anything else, or mutating a model that has been solved, is a caller bug and
/// panics.
///
/// Column bounds default to `[0, infinity)` and the objective to zero.
pub struct LpModel<E: Engine = CbcEngine> {
    matrix: RowMatrix,
    sense: Sense,
    objective: Vec<f64>,
    column_lower: Vec<f64>,
    column_upper: Vec<f64>,
    column_start: Option<Vec<f64>>,
    dense_indices: Option<Vec<usize>>,
    status: Option<SolveStatus>,
    engine: E,
}

impl LpModel<CbcEngine> {
    /// A maximization model solved by [CbcEngine::from_env]
    ///
    /// # Panics
    /// If `column_count` is zero
    pub fn new(column_count: usize) -> Self {
        LpModel::with_sense(column_count, Sense::Maximize)
    }

    /// A model with the given sense, solved by [CbcEngine::from_env]
    pub fn with_sense(column_count: usize, sense: Sense) -> Self {
        LpModel::with_engine(column_count, sense, CbcEngine::from_env())
    }
}

impl<E: Engine> LpModel<E> {
    /// A model solved by `engine`. The engine's own logging is switched off.
    ///
    /// # Panics
    /// If `column_count` is zero
    pub fn with_engine(column_count: usize, sense: Sense, mut engine: E) -> Self {
        assert!(column_count > 0, "a model needs at least one column");
        engine.set_log_level(0);
        let infinity = engine.infinity();
        debug!(
            component = "model",
            operation = "init",
            status = "success",
            columns = column_count as u64,
            sense = %sense,
            "Creating model"
        );
        LpModel {
            matrix: RowMatrix::new(column_count),
            sense,
            objective: vec![0.0; column_count],
            column_lower: vec![0.0; column_count],
            column_upper: vec![infinity; column_count],
            column_start: None,
            dense_indices: None,
            status: None,
            engine,
        }
    }

    /// Number of columns, fixed at construction
    pub fn column_count(&self) -> usize {
        self.matrix.column_count()
    }

    /// Number of rows appended so far
    pub fn row_count(&self) -> usize {
        self.matrix.row_count()
    }

    /// Optimization sense, fixed at construction
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// The engine's value for an unbounded side of a bound.
    /// Use this, not an arbitrary large number, for one-sided bounds.
    pub fn infinity(&self) -> f64 {
        self.engine.infinity()
    }

    /// `None` until [LpModel::solve] has run
    pub fn status(&self) -> Option<SolveStatus> {
        self.status
    }

    /// The rows appended so far
    pub fn matrix(&self) -> &RowMatrix {
        &self.matrix
    }

    /// Objective coefficients
    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    /// The starting point, if one was set
    pub fn column_start(&self) -> Option<&[f64]> {
        self.column_start.as_deref()
    }

    /// The engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, for configuring limits before solving
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn assert_building(&self) {
        assert!(self.status.is_none(), "model has already been solved");
    }

    fn assert_column_wide(&self, what: &str, len: usize) {
        assert_eq!(
            len,
            self.column_count(),
            "{} has {} entries but the model has {} columns",
            what,
            len,
            self.column_count()
        );
    }

    /// Set the objective, one coefficient per column
    pub fn set_objective(&mut self, coefficients: &[f64]) {
        self.assert_building();
        self.assert_column_wide("objective", coefficients.len());
        self.objective.copy_from_slice(coefficients);
    }

    /// Set column bounds. `lower[i] <= upper[i]` is not checked: an inverted
    /// bound reaches the engine, which reports the problem infeasible.
    pub fn set_column_bounds(&mut self, lower: &[f64], upper: &[f64]) {
        self.assert_building();
        self.assert_column_wide("lower bounds", lower.len());
        self.assert_column_wide("upper bounds", upper.len());
        self.column_lower.copy_from_slice(lower);
        self.column_upper.copy_from_slice(upper);
    }

    /// Give the engine a starting point. It is a hint and need not be feasible.
    pub fn set_column_start(&mut self, values: &[f64]) {
        self.assert_building();
        self.assert_column_wide("column start", values.len());
        self.column_start = Some(values.to_vec());
    }

    /// Append a row with a coefficient for every column.
    ///
    /// Either bound may be [LpModel::infinity] (negated for the lower bound) to
    /// leave that side open.
    pub fn add_row(&mut self, coefficients: &[f64], lower: f64, upper: f64) {
        self.assert_building();
        self.assert_column_wide("row", coefficients.len());
        let column_count = self.column_count();
        let indices = self
            .dense_indices
            .get_or_insert_with(|| (0..column_count).collect());
        self.matrix.push_row(coefficients, indices, lower, upper);
        trace!(
            component = "model",
            operation = "add_row",
            row = self.matrix.row_count() as u64 - 1,
            nnz = column_count as u64,
            "Appended dense row"
        );
    }

    /// Append a row touching only the columns in `indices`.
    ///
    /// # Panics
    /// If `values` and `indices` differ in length or an index is not a column
    pub fn add_sparse_row(&mut self, values: &[f64], indices: &[usize], lower: f64, upper: f64) {
        self.assert_building();
        self.matrix.push_row(values, indices, lower, upper);
        trace!(
            component = "model",
            operation = "add_sparse_row",
            row = self.matrix.row_count() as u64 - 1,
            nnz = values.len() as u64,
            "Appended sparse row"
        );
    }

    /// Hand the problem to the engine, with every column integer, and run its
    /// branch-and-bound search. Blocks until the engine finishes.
    ///
    /// The engine's flags are reduced to a single [SolveStatus]; see
    /// [EngineFlags::status](crate::status::EngineFlags::status). If the engine
    /// itself fails, the status is recorded as [SolveStatus::Unknown] and the
    /// error returned.
    ///
    /// # Panics
    /// If the model has already been solved
    pub fn solve(&mut self) -> Result<SolveStatus, EngineError> {
        self.assert_building();
        debug!(
            component = "model",
            operation = "solve",
            status = "start",
            columns = self.column_count() as u64,
            rows = self.row_count() as u64,
            nnz = self.matrix.nnz() as u64,
            has_start = self.column_start.is_some(),
            "Solving model"
        );
        self.engine.load_problem(Problem {
            matrix: &self.matrix,
            column_lower: &self.column_lower,
            column_upper: &self.column_upper,
            objective: &self.objective,
        });
        self.engine.set_optimization_direction(self.sense.direction());
        for column in 0..self.column_count() {
            self.engine.set_integer(column);
        }
        if let Some(start) = &self.column_start {
            self.engine.set_initial_solution(start);
        }
        if let Err(e) = self.engine.branch_and_bound() {
            self.status = Some(SolveStatus::Unknown);
            return Err(e);
        }

        let flags = self.engine.flags();
        let status = SolveStatus::from(flags);
        self.status = Some(status);
        debug!(
            component = "model",
            operation = "solve",
            status = status.as_str(),
            flags = ?flags,
            score = self.engine.objective_value(),
            "Model solved"
        );
        Ok(status)
    }

    /// Primal column values reported by the engine. Only meaningful when
    /// [LpModel::solve] returned [SolveStatus::Optimal].
    pub fn column_solution(&self) -> &[f64] {
        self.engine.col_solution()
    }

    /// Objective value reported by the engine. Only meaningful when
    /// [LpModel::solve] returned [SolveStatus::Optimal].
    pub fn score(&self) -> f64 {
        self.engine.objective_value()
    }

    /// The model in the .lp format, as it would be handed to a command-line engine
    pub fn display_lp(&self) -> DisplayedLp<'_, Self> {
        LpProblem::display_lp(self)
    }
}

impl<E: Engine> LpProblem for LpModel<E> {
    fn sense(&self) -> Sense {
        self.sense
    }

    fn infinity(&self) -> f64 {
        self.engine.infinity()
    }

    fn objective(&self) -> &[f64] {
        &self.objective
    }

    fn column_lower(&self) -> &[f64] {
        &self.column_lower
    }

    fn column_upper(&self) -> &[f64] {
        &self.column_upper
    }

    fn is_integer(&self, _column: usize) -> bool {
        true
    }

    fn matrix(&self) -> &RowMatrix {
        &self.matrix
    }
}

impl<E: Engine> fmt::Debug for LpModel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LpModel")
            .field("columns", &self.column_count())
            .field("rows", &self.row_count())
            .field("sense", &self.sense)
            .field("status", &self.status)
            .finish()
    }
}
