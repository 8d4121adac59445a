#![deny(missing_docs)]
//! Build an integer program in memory, hand it to an external mixed-integer
//! engine and read back a status, a score and a column solution.
//!
//! ```no_run
//! use lp_model::{LpModel, SolveStatus};
//!
//! let mut model = LpModel::new(2);
//! let inf = model.infinity();
//! model.set_objective(&[6., 7.]);
//! model.set_column_bounds(&[0., 0.], &[inf, inf]);
//! model.add_row(&[4., 5.], -inf, 20.);
//! model.add_row(&[10., 7.], -inf, 35.);
//! model.add_sparse_row(&[3., 4.], &[0, 1], 6., inf);
//!
//! assert_eq!(model.solve().unwrap(), SolveStatus::Optimal);
//! assert_eq!(model.score(), 28.);
//! assert_eq!(model.column_solution(), &[0., 4.]);
//! ```
//!
//! The [ffi] module exposes the same operations to C callers.

pub mod engine;
pub mod ffi;
pub mod lp_format;
pub mod matrix;
pub mod model;
pub mod status;

pub use engine::{CbcEngine, Engine, EngineError};
pub use matrix::RowMatrix;
pub use model::{LpModel, Sense};
pub use status::{EngineFlags, SolveStatus};
