//! C ABI over [LpModel].
//!
//! Models live in a process-wide arena and are addressed by integer handles;
//! `0` is never a valid handle. Every model is solved by [CbcEngine::from_env].
//!
//! Caller bugs (unknown handle, wrong array length, column index out of range,
//! non-positive column count) abort the process. No panic unwinds across the
//! boundary.
//!
//! The arena lock is only held to look a handle up; each model has a lock of
//! its own, so models on different handles can be solved concurrently.

use std::any::Any;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::os::raw::{c_double, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::ptr;
use std::slice;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::error;

use crate::engine::{CbcEngine, WithMaxSeconds, WithNbThreads};
use crate::model::{LpModel, Sense};
use crate::status::SolveStatus;

/// Handle to a model in the arena
pub type LpModelHandle = u64;

type SharedModel = Arc<Mutex<LpModel<CbcEngine>>>;

struct Arena {
    next: LpModelHandle,
    models: HashMap<LpModelHandle, SharedModel>,
}

static ARENA: OnceLock<Mutex<Arena>> = OnceLock::new();

fn arena() -> MutexGuard<'static, Arena> {
    ARENA
        .get_or_init(|| {
            Mutex::new(Arena {
                next: 1,
                models: HashMap::new(),
            })
        })
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f`, aborting the process if it panics
fn guarded<T>(operation: &'static str, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            error!(
                component = "ffi",
                operation,
                status = "abort",
                reason = %panic_message(payload.as_ref()),
                "Precondition violated"
            );
            process::abort()
        }
    }
}

fn with_model<T>(handle: LpModelHandle, f: impl FnOnce(&mut LpModel<CbcEngine>) -> T) -> T {
    let model = match arena().models.get(&handle) {
        Some(model) => Arc::clone(model),
        None => panic!("unknown model handle {}", handle),
    };
    let mut model = model.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut model)
}

fn to_len(len: c_int, what: &str) -> usize {
    match usize::try_from(len) {
        Ok(len) => len,
        Err(_) => panic!("{} length {} is negative", what, len),
    }
}

fn non_negative(value: c_int, what: &str) -> u32 {
    match u32::try_from(value) {
        Ok(value) => value,
        Err(_) => panic!("{} must not be negative, got {}", what, value),
    }
}

fn to_c_int(count: usize, what: &str) -> c_int {
    match c_int::try_from(count) {
        Ok(count) => count,
        Err(_) => panic!("{} {} does not fit in a C int", what, count),
    }
}

/// # Safety
/// `data` must point to `len` readable values, or `len` must be zero
unsafe fn borrowed<'a, T>(data: *const T, len: usize) -> &'a [T] {
    if len == 0 {
        return &[];
    }
    assert!(!data.is_null(), "null array of length {}", len);
    slice::from_raw_parts(data, len)
}

/// Create a model with `columns` integer columns.
///
/// `sense` is `-1` to maximize and `+1` to minimize. Returns the new handle.
#[no_mangle]
pub extern "C" fn lp_model_create(columns: c_int, sense: c_int) -> LpModelHandle {
    guarded("create", || {
        assert!(columns > 0, "column count must be positive, got {}", columns);
        let sense = match sense {
            -1 => Sense::Maximize,
            1 => Sense::Minimize,
            other => panic!("sense must be -1 or 1, got {}", other),
        };
        let model = LpModel::with_sense(to_len(columns, "columns"), sense);
        let mut arena = arena();
        let handle = arena.next;
        arena.next += 1;
        arena.models.insert(handle, Arc::new(Mutex::new(model)));
        handle
    })
}

/// Release a model and everything it owns. Destroying handle `0` does nothing.
#[no_mangle]
pub extern "C" fn lp_model_destroy(handle: LpModelHandle) {
    guarded("destroy", || {
        if handle == 0 {
            return;
        }
        if arena().models.remove(&handle).is_none() {
            panic!("unknown model handle {}", handle);
        }
    })
}

/// The engine's value for an unbounded side of a bound
#[no_mangle]
pub extern "C" fn lp_model_get_infinity(handle: LpModelHandle) -> c_double {
    guarded("get_infinity", || with_model(handle, |model| model.infinity()))
}

/// Set the objective.
///
/// # Safety
/// `values` must point to `len` doubles
#[no_mangle]
pub unsafe extern "C" fn lp_model_set_objective(handle: LpModelHandle, values: *const c_double, len: c_int) {
    guarded("set_objective", || {
        with_model(handle, |model| {
            let len = to_len(len, "objective");
            assert_eq!(len, model.column_count(), "objective length");
            model.set_objective(borrowed(values, len));
        })
    })
}

/// Set column bounds.
///
/// # Safety
/// `lower` and `upper` must point to `lower_len` and `upper_len` doubles
#[no_mangle]
pub unsafe extern "C" fn lp_model_set_col_bounds(
    handle: LpModelHandle,
    lower: *const c_double,
    lower_len: c_int,
    upper: *const c_double,
    upper_len: c_int,
) {
    guarded("set_col_bounds", || {
        with_model(handle, |model| {
            let lower_len = to_len(lower_len, "lower bounds");
            let upper_len = to_len(upper_len, "upper bounds");
            assert_eq!(lower_len, model.column_count(), "lower bounds length");
            assert_eq!(upper_len, model.column_count(), "upper bounds length");
            model.set_column_bounds(borrowed(lower, lower_len), borrowed(upper, upper_len));
        })
    })
}

/// Set the starting point of the search.
///
/// # Safety
/// `values` must point to `len` doubles
#[no_mangle]
pub unsafe extern "C" fn lp_model_set_col_start(handle: LpModelHandle, values: *const c_double, len: c_int) {
    guarded("set_col_start", || {
        with_model(handle, |model| {
            let len = to_len(len, "column start");
            assert_eq!(len, model.column_count(), "column start length");
            model.set_column_start(borrowed(values, len));
        })
    })
}

/// Append a row with one coefficient per column.
///
/// # Safety
/// `values` must point to `len` doubles
#[no_mangle]
pub unsafe extern "C" fn lp_model_add_dense_row(
    handle: LpModelHandle,
    values: *const c_double,
    len: c_int,
    lower: c_double,
    upper: c_double,
) {
    guarded("add_dense_row", || {
        with_model(handle, |model| {
            let len = to_len(len, "row");
            assert_eq!(len, model.column_count(), "row length");
            model.add_row(borrowed(values, len), lower, upper);
        })
    })
}

/// Append a row with `nnz` coefficients at the given column indices.
///
/// # Safety
/// `values` and `indices` must each point to `nnz` elements
#[no_mangle]
pub unsafe extern "C" fn lp_model_add_sparse_row(
    handle: LpModelHandle,
    values: *const c_double,
    indices: *const c_int,
    nnz: c_int,
    lower: c_double,
    upper: c_double,
) {
    guarded("add_sparse_row", || {
        with_model(handle, |model| {
            let nnz = to_len(nnz, "row");
            let indices: Vec<usize> = borrowed(indices, nnz)
                .iter()
                .map(|&i| to_len(i, "column index"))
                .collect();
            model.add_sparse_row(borrowed(values, nnz), &indices, lower, upper);
        })
    })
}

/// Limit the search to `seconds` of wall time. Must precede [lp_model_solve].
#[no_mangle]
pub extern "C" fn lp_model_set_time_limit(handle: LpModelHandle, seconds: c_int) {
    guarded("set_time_limit", || {
        with_model(handle, |model| {
            let seconds = non_negative(seconds, "time limit");
            let engine = model.engine_mut();
            *engine = engine.with_max_seconds(seconds);
        })
    })
}

/// Let the engine search with `threads` threads. Must precede [lp_model_solve].
#[no_mangle]
pub extern "C" fn lp_model_set_threads(handle: LpModelHandle, threads: c_int) {
    guarded("set_threads", || {
        with_model(handle, |model| {
            let threads = non_negative(threads, "thread count");
            let engine = model.engine_mut();
            *engine = engine.with_nb_threads(threads);
        })
    })
}

/// Solve the model. Returns `0` optimal, `1` infeasible, `2` abandoned,
/// `3` limit reached or `4` unknown. An engine failure is logged and
/// reported as unknown.
#[no_mangle]
pub extern "C" fn lp_model_solve(handle: LpModelHandle) -> c_int {
    guarded("solve", || {
        with_model(handle, |model| match model.solve() {
            Ok(status) => status.code(),
            Err(e) => {
                error!(
                    component = "ffi",
                    operation = "solve",
                    status = "error",
                    handle,
                    error = %e,
                    "Engine failed"
                );
                SolveStatus::Unknown.code()
            }
        })
    })
}

/// The column solution. Its length is written to `len` when `len` is not null.
///
/// The returned storage belongs to the model and stays valid until the model
/// is mutated or destroyed.
///
/// # Safety
/// `len` must be null or point to writable memory
#[no_mangle]
pub unsafe extern "C" fn lp_model_get_col_solution(handle: LpModelHandle, len: *mut c_int) -> *const c_double {
    guarded("get_col_solution", || {
        with_model(handle, |model| {
            let solution = model.column_solution();
            if !len.is_null() {
                ptr::write(len, to_c_int(solution.len(), "solution length"));
            }
            solution.as_ptr()
        })
    })
}

/// Objective value of the column solution
#[no_mangle]
pub extern "C" fn lp_model_get_score(handle: LpModelHandle) -> c_double {
    guarded("get_score", || with_model(handle, |model| model.score()))
}

/// Number of rows appended to the model
#[no_mangle]
pub extern "C" fn lp_model_get_row_count(handle: LpModelHandle) -> c_int {
    guarded("get_row_count", || {
        with_model(handle, |model| to_c_int(model.row_count(), "row count"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_convert_to_c_int() {
        assert_eq!(to_c_int(0, "row count"), 0);
        assert_eq!(to_c_int(c_int::MAX as usize, "row count"), c_int::MAX);
        assert_eq!(non_negative(0, "time limit"), 0);
        assert_eq!(non_negative(60, "time limit"), 60);
    }

    #[test]
    #[should_panic(expected = "row count 2147483648 does not fit in a C int")]
    fn row_count_past_c_int() {
        to_c_int(c_int::MAX as usize + 1, "row count");
    }

    #[test]
    #[should_panic(expected = "time limit must not be negative, got -1")]
    fn negative_time_limit() {
        non_negative(-1, "time limit");
    }
}
