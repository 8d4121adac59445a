//! Rendering of an assembled problem in the CPLEX .lp file format,
//! which is how problems are handed over to command-line engines.
//!
//! Columns are named `x0`, `x1`, ... and rows `r0`, `r1`, ...
//! A row bounded on both sides with distinct bounds is written as two
//! constraints, `r{i}_lo` and `r{i}_up`.
use std::fmt;
use std::fmt::Formatter;
use std::io::prelude::*;
use std::io::Result;

use tempfile::NamedTempFile;

use crate::matrix::RowMatrix;
use crate::model::Sense;

/// Implemented by types that can be written as an .lp problem
pub trait LpProblem: Sized {
    /// problem name, written as a comment on the first line
    fn name(&self) -> &str {
        "lp_model"
    }
    /// Whether to maximize or minimize the objective
    fn sense(&self) -> Sense;
    /// Bounds at or beyond this magnitude are treated as absent
    fn infinity(&self) -> f64;
    /// One coefficient per column
    fn objective(&self) -> &[f64];
    /// Lower bound of every column
    fn column_lower(&self) -> &[f64];
    /// Upper bound of every column
    fn column_upper(&self) -> &[f64];
    /// Whether column `column` is restricted to integer values
    fn is_integer(&self, column: usize) -> bool;
    /// The constraint rows
    fn matrix(&self) -> &RowMatrix;

    /// Write the problem in the lp file format to the given formatter
    fn to_lp_file_format(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "\\ {}\n\n", self.name())?;
        objective_lp_file_block(self, f)?;
        write_constraints_lp_file_block(self, f)?;
        write_bounds_lp_file_block(self, f)?;
        write!(f, "\nEnd\n")?;
        Ok(())
    }

    /// Return an object whose [fmt::Display] implementation is the problem in the .lp format
    fn display_lp(&self) -> DisplayedLp<'_, Self> {
        DisplayedLp(self)
    }

    /// Write the problem to a temporary file, removed when the handle is dropped
    fn to_tmp_file(&self) -> Result<NamedTempFile> {
        let mut f = tempfile::Builder::new()
            .prefix(self.name())
            .suffix(".lp")
            .tempfile()?;
        write!(f, "{}", self.display_lp())?;
        f.flush()?;
        Ok(f)
    }
}

/// A problem whose `Display` implementation outputs valid .lp syntax
pub struct DisplayedLp<'a, P>(&'a P);

impl<'a, P: LpProblem> fmt::Display for DisplayedLp<'a, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.to_lp_file_format(f)
    }
}

/// Name of column `column` in the written file
pub fn column_name(column: usize) -> String {
    format!("x{}", column)
}

/// Inverse of [column_name]
pub fn parse_column_name(name: &str) -> Option<usize> {
    let digits = name.strip_prefix('x')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// -0.0 would print as "-0"
fn normalized(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

fn write_term(f: &mut Formatter, first: bool, column: usize, coefficient: f64) -> fmt::Result {
    let coefficient = normalized(coefficient);
    let sign = if coefficient < 0.0 { "-" } else { "+" };
    match (first, coefficient < 0.0) {
        (true, false) => write!(f, "{} x{}", coefficient, column),
        _ => {
            let sep = if first { "" } else { " " };
            write!(f, "{}{} {} x{}", sep, sign, coefficient.abs(), column)
        }
    }
}

fn objective_lp_file_block(prob: &impl LpProblem, f: &mut Formatter) -> fmt::Result {
    let obj_type = match prob.sense() {
        Sense::Maximize => "Maximize\n  ",
        Sense::Minimize => "Minimize\n  ",
    };
    write!(f, "{}obj: ", obj_type)?;
    // every column is listed, so that each one is declared even if no row uses it
    for (column, &coefficient) in prob.objective().iter().enumerate() {
        write_term(f, column == 0, column, coefficient)?;
    }
    Ok(())
}

fn write_row_expression(f: &mut Formatter, entries: impl Iterator<Item = (usize, f64)>) -> fmt::Result {
    let mut first = true;
    for (column, coefficient) in entries {
        if coefficient == 0.0 {
            continue;
        }
        write_term(f, first, column, coefficient)?;
        first = false;
    }
    if first {
        write!(f, "0 x0")?;
    }
    Ok(())
}

fn write_constraints_lp_file_block(prob: &impl LpProblem, f: &mut Formatter) -> fmt::Result {
    let infinity = prob.infinity();
    let mut wrote_header = false;
    for (idx, row) in prob.matrix().rows().enumerate() {
        let has_lower = row.lower > -infinity;
        let has_upper = row.upper < infinity;
        let constraints: Vec<(String, &str, f64)> = match (has_lower, has_upper) {
            (false, false) => continue,
            (true, true) if row.lower == row.upper => vec![(format!("r{}", idx), "=", row.lower)],
            (true, true) => vec![
                (format!("r{}_lo", idx), ">=", row.lower),
                (format!("r{}_up", idx), "<=", row.upper),
            ],
            (true, false) => vec![(format!("r{}", idx), ">=", row.lower)],
            (false, true) => vec![(format!("r{}", idx), "<=", row.upper)],
        };
        if !wrote_header {
            write!(f, "\n\nSubject To\n")?;
            wrote_header = true;
        }
        for (name, operator, rhs) in constraints {
            write!(f, "  {}: ", name)?;
            write_row_expression(f, row.entries())?;
            writeln!(f, " {} {}", operator, normalized(rhs))?;
        }
    }
    Ok(())
}

fn write_bounds_lp_file_block(prob: &impl LpProblem, f: &mut Formatter) -> fmt::Result {
    let infinity = prob.infinity();
    let mut integers = vec![];
    write!(f, "\nBounds\n")?;
    let bounds = prob.column_lower().iter().zip(prob.column_upper().iter());
    for (column, (&low, &up)) in bounds.enumerate() {
        let has_lower = low > -infinity;
        let has_upper = up < infinity;
        let name = column_name(column);
        write!(f, "  ")?;
        match (has_lower, has_upper) {
            (true, true) if low == up => write!(f, "{} = {}", name, normalized(low))?,
            (true, true) => write!(f, "{} <= {} <= {}", normalized(low), name, normalized(up))?,
            (true, false) => write!(f, "{} <= {}", normalized(low), name)?,
            // the format's default lower bound is 0, so an absent one is spelled out
            (false, true) => write!(f, "-inf <= {} <= {}", name, normalized(up))?,
            (false, false) => write!(f, "{} free", name)?,
        }
        writeln!(f)?;
        if prob.is_integer(column) {
            integers.push(name);
        }
    }
    if !integers.is_empty() {
        writeln!(f, "\nGenerals")?;
        for name in integers.iter() {
            writeln!(f, "  {}", name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names() {
        assert_eq!(column_name(12), "x12");
        assert_eq!(parse_column_name("x12"), Some(12));
        assert_eq!(parse_column_name("x"), None);
        assert_eq!(parse_column_name("y3"), None);
        assert_eq!(parse_column_name("x-1"), None);
    }
}
