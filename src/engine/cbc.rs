//! The COIN-OR CBC engine, run as a command-line program.
//!
//! Each search writes the problem to a temporary .lp file, runs `cbc` on it and
//! reads back the solution file it writes.
use std::env;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::prelude::*;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use crate::engine::{Engine, EngineError, Problem, WithMaxSeconds, WithNbThreads, MINIMIZE};
use crate::lp_format::{column_name, parse_column_name, LpProblem};
use crate::matrix::RowMatrix;
use crate::model::Sense;
use crate::status::EngineFlags;

/// CBC's infinity (`COIN_DBL_MAX`)
pub const COIN_DBL_MAX: f64 = f64::MAX;

/// Environment variable naming the CBC executable used by [CbcEngine::from_env]
pub const CBC_BINARY_ENV: &str = "CBC_BINARY";

/// The CBC mixed-integer engine
#[derive(Debug, Clone)]
pub struct CbcEngine {
    name: String,
    command_name: String,
    temp_solution_file: Option<PathBuf>,
    threads: Option<u32>,
    seconds: Option<u32>,
    log_level: u32,
    problem: Option<LoadedProblem>,
    flags: EngineFlags,
    solution: Vec<f64>,
    objective_value: f64,
}

/// What CBC reported in a solution file
#[derive(Debug, Clone, PartialEq)]
pub struct CbcSolution {
    /// Termination flags read from the status line
    pub flags: EngineFlags,
    /// One value per column. CBC omits zeros, which are filled in.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
struct LoadedProblem {
    matrix: RowMatrix,
    column_lower: Vec<f64>,
    column_upper: Vec<f64>,
    objective: Vec<f64>,
    direction: f64,
    integers: Vec<bool>,
    start: Option<Vec<f64>>,
}

impl LpProblem for LoadedProblem {
    fn sense(&self) -> Sense {
        Sense::from_direction(self.direction)
    }

    fn infinity(&self) -> f64 {
        COIN_DBL_MAX
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

    fn is_integer(&self, column: usize) -> bool {
        self.integers[column]
    }

    fn matrix(&self) -> &RowMatrix {
        &self.matrix
    }
}

impl Default for CbcEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CbcEngine {
    /// An engine running the `cbc` found on the `PATH`
    pub fn new() -> CbcEngine {
        CbcEngine {
            name: "Cbc".to_string(),
            command_name: "cbc".to_string(),
            temp_solution_file: None,
            threads: None,
            seconds: None,
            log_level: 0,
            problem: None,
            flags: EngineFlags::default(),
            solution: Vec::new(),
            objective_value: 0.0,
        }
    }

    /// Like [CbcEngine::new], but runs the program named by `CBC_BINARY` when set
    pub fn from_env() -> CbcEngine {
        match env::var(CBC_BINARY_ENV) {
            Ok(command) if !command.is_empty() => CbcEngine::new().command_name(command),
            _ => CbcEngine::new(),
        }
    }

    /// set the name of the cbc executable to use
    pub fn command_name(&self, command_name: String) -> CbcEngine {
        CbcEngine {
            command_name,
            ..self.clone()
        }
    }

    /// The executable that will be run
    pub fn command(&self) -> &str {
        &self.command_name
    }

    /// Have cbc write its solution to this path instead of a fresh temporary file
    pub fn with_temp_solution_file(&self, temp_solution_file: String) -> CbcEngine {
        CbcEngine {
            temp_solution_file: Some(temp_solution_file.into()),
            ..self.clone()
        }
    }

    /// Parse a solution file written by cbc for a problem with `column_count` columns
    pub fn read_solution(&self, path: &Path, column_count: usize) -> Result<CbcSolution, EngineError> {
        let f = File::open(path).map_err(|_| EngineError::MissingSolution(path.to_path_buf()))?;
        let mut file = BufReader::new(f);
        let mut buffer = String::new();
        file.read_line(&mut buffer)?;
        if buffer.trim().is_empty() {
            return Err(EngineError::SolutionFormat("missing status line".to_string()));
        }
        let flags = parse_status_line(&buffer);

        // cbc only lists non-zero columns
        let mut values = vec![0.0; column_count];
        for line in file.lines() {
            let l = line?;
            let mut result_line: Vec<_> = l.split_whitespace().collect();
            if result_line.is_empty() {
                continue;
            }
            // "**" marks values violating a bound or a row
            if result_line[0] == "**" {
                result_line.remove(0);
            }
            if result_line.len() != 4 {
                return Err(EngineError::SolutionFormat(format!("unexpected line {:?}", l)));
            }
            let name = result_line[1];
            let column = parse_column_name(name)
                .filter(|&c| c < column_count)
                .ok_or_else(|| EngineError::SolutionFormat(format!("unknown column {}", name)))?;
            values[column] = result_line[2].parse::<f64>().map_err(|e| {
                EngineError::SolutionFormat(format!("invalid value for {}: {}", name, e))
            })?;
        }
        Ok(CbcSolution { flags, values })
    }

    fn arguments(&self, lp_file: &Path, start_file: Option<&Path>, solution_file: &Path) -> Vec<OsString> {
        let mut args = vec![lp_file.as_os_str().to_owned()];
        args.push("log".into());
        args.push(self.log_level.to_string().into());
        for (name, value) in [
            ("seconds", self.max_seconds()),
            ("threads", self.nb_threads()),
        ]
        .iter()
        {
            if let Some(val) = value {
                args.push(name.into());
                args.push(val.to_string().into());
            }
        }
        if let Some(start) = start_file {
            args.push("mips".into());
            args.push(start.into());
        }
        args.extend_from_slice(&["solve".into(), "solution".into(), solution_file.into()]);
        args
    }

    fn loaded_mut(&mut self) -> &mut LoadedProblem {
        match self.problem.as_mut() {
            Some(problem) => problem,
            None => panic!("no problem loaded into {}", self.name),
        }
    }
}

/// Write values in the `index name value` layout cbc reads mip starts from
fn write_mip_start(values: &[f64]) -> std::io::Result<NamedTempFile> {
    let mut f = tempfile::Builder::new()
        .prefix("lp_model_start")
        .suffix(".sol")
        .tempfile()?;
    for (column, value) in values.iter().enumerate() {
        writeln!(f, "{} {} {}", column, column_name(column), value)?;
    }
    f.flush()?;
    Ok(f)
}

/// Drop parenthesized qualifiers, which may themselves contain " - ", as in
/// `Stopped on time (no integer solution - continuous used) - objective value 0`
fn strip_qualifiers(line: &str) -> String {
    let mut depth = 0usize;
    let mut stripped = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(c),
            _ => {}
        }
    }
    stripped
}

/// Translate the first line of a cbc solution file, such as
/// `Stopped on time - objective value 12.0`, into engine flags
fn parse_status_line(line: &str) -> EngineFlags {
    let mut flags = EngineFlags::default();
    let line = strip_qualifiers(line);
    let status = line.split(" - ").next().unwrap_or("").trim();
    match status {
        "Optimal" => flags.proven_optimal = true,
        "Infeasible" | "Integer infeasible" => flags.proven_infeasible = true,
        "Unbounded" | "Integer unbounded" => flags.proven_dual_infeasible = true,
        _ => match status.strip_prefix("Stopped on ") {
            Some(reasons) => {
                for reason in reasons.split(" or ") {
                    match reason.trim() {
                        "time" => flags.seconds_limit_reached = true,
                        "iterations" => flags.iteration_limit_reached = true,
                        "nodes" => flags.node_limit_reached = true,
                        "solutions" => flags.solution_limit_reached = true,
                        "gap" => flags.primal_objective_limit_reached = true,
                        "difficulties" => flags.abandoned = true,
                        // interrupted from outside: no flag applies
                        "ctrl-c" | "event" => {}
                        other => warn!(
                            component = "engine",
                            operation = "parse_status",
                            status = "unrecognized",
                            reason = other,
                            "Unrecognized cbc stop reason"
                        ),
                    }
                }
            }
            None => warn!(
                component = "engine",
                operation = "parse_status",
                status = "unrecognized",
                line = status,
                "Unrecognized cbc status line"
            ),
        },
    }
    flags
}

impl Engine for CbcEngine {
    fn infinity(&self) -> f64 {
        COIN_DBL_MAX
    }

    fn set_log_level(&mut self, level: u32) {
        self.log_level = level;
    }

    fn load_problem(&mut self, problem: Problem<'_>) {
        let columns = problem.objective.len();
        self.problem = Some(LoadedProblem {
            matrix: problem.matrix.clone(),
            column_lower: problem.column_lower.to_vec(),
            column_upper: problem.column_upper.to_vec(),
            objective: problem.objective.to_vec(),
            direction: MINIMIZE,
            integers: vec![false; columns],
            start: None,
        });
        self.flags = EngineFlags::default();
        self.solution.clear();
        self.objective_value = 0.0;
    }

    fn set_optimization_direction(&mut self, direction: f64) {
        self.loaded_mut().direction = direction;
    }

    fn set_integer(&mut self, column: usize) {
        self.loaded_mut().integers[column] = true;
    }

    fn set_initial_solution(&mut self, values: &[f64]) {
        self.loaded_mut().start = Some(values.to_vec());
    }

    fn branch_and_bound(&mut self) -> Result<(), EngineError> {
        let problem = self.problem.as_ref().ok_or(EngineError::NotLoaded)?;
        let lp_file = problem.to_tmp_file()?;
        let start_file = match &problem.start {
            Some(values) => Some(write_mip_start(values)?),
            None => None,
        };
        let (_solution_guard, solution_path) = match &self.temp_solution_file {
            Some(path) => {
                let _ = fs::remove_file(path);
                (None, path.clone())
            }
            None => {
                let file = tempfile::Builder::new()
                    .prefix("lp_model")
                    .suffix(".sol")
                    .tempfile()?;
                let path = file.path().to_path_buf();
                (Some(file), path)
            }
        };

        let args = self.arguments(
            lp_file.path(),
            start_file.as_ref().map(|f| f.path()),
            &solution_path,
        );
        trace!(
            component = "engine",
            operation = "spawn",
            command = %self.command_name,
            args = ?args,
            "Running cbc"
        );
        let output = Command::new(&self.command_name).args(&args).output()?;
        if !output.status.success() {
            return Err(EngineError::Process {
                command: self.command_name.clone(),
                status: output.status,
            });
        }

        let solution = self.read_solution(&solution_path, problem.objective.len());
        if self.temp_solution_file.is_some() {
            let _ = fs::remove_file(&solution_path);
        }
        let solution = solution?;
        let objective_value: f64 = problem
            .objective
            .iter()
            .zip(solution.values.iter())
            .map(|(c, x)| c * x)
            .sum();

        debug!(
            component = "engine",
            operation = "branch_and_bound",
            status = "success",
            flags = ?solution.flags,
            objective_value,
            "cbc finished"
        );
        self.flags = solution.flags;
        self.solution = solution.values;
        self.objective_value = objective_value;
        Ok(())
    }

    fn flags(&self) -> EngineFlags {
        self.flags
    }

    fn col_solution(&self) -> &[f64] {
        &self.solution
    }

    fn objective_value(&self) -> f64 {
        self.objective_value
    }
}

impl WithMaxSeconds<CbcEngine> for CbcEngine {
    fn max_seconds(&self) -> Option<u32> {
        self.seconds
    }
    fn with_max_seconds(&self, seconds: u32) -> CbcEngine {
        CbcEngine {
            seconds: Some(seconds),
            ..(*self).clone()
        }
    }
}

impl WithNbThreads<CbcEngine> for CbcEngine {
    fn nb_threads(&self) -> Option<u32> {
        self.threads
    }
    fn with_nb_threads(&self, threads: u32) -> CbcEngine {
        CbcEngine {
            threads: Some(threads),
            ..(*self).clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines() {
        let optimal = parse_status_line("Optimal - objective value 28.00000000\n");
        assert!(optimal.proven_optimal);

        let integer_infeasible = parse_status_line("Integer infeasible - objective value 0.0");
        assert!(integer_infeasible.proven_infeasible);

        let unbounded = parse_status_line("Unbounded - objective value 0.0");
        assert!(unbounded.proven_dual_infeasible);

        let both = parse_status_line("Stopped on iterations or time - objective value 3.0");
        assert!(both.iteration_limit_reached && both.seconds_limit_reached);

        let difficulties = parse_status_line("Stopped on difficulties - objective value 0.0");
        assert!(difficulties.abandoned);

        assert_eq!(
            parse_status_line("Stopped on ctrl-c - objective value 1.0"),
            EngineFlags::default()
        );
        assert_eq!(parse_status_line("Status unknown"), EngineFlags::default());
    }

    #[test]
    fn stopped_without_integer_solution() {
        let time = parse_status_line(
            "Stopped on time (no integer solution - continuous used) - objective value 3.5\n",
        );
        assert_eq!(
            time,
            EngineFlags {
                seconds_limit_reached: true,
                ..EngineFlags::default()
            }
        );

        let nodes = parse_status_line("Stopped on nodes (no integer solution - continuous used) - objective value 0");
        assert!(nodes.node_limit_reached);
        assert_eq!(nodes.status(), crate::status::SolveStatus::LimitReached);

        assert_eq!(
            strip_qualifiers("Stopped on iterations (no integer solution - continuous used) - objective value 1"),
            "Stopped on iterations  - objective value 1"
        );
    }

    #[test]
    fn arguments_follow_configuration() {
        let engine = CbcEngine::new().with_max_seconds(30).with_nb_threads(4);
        let args = engine.arguments(Path::new("p.lp"), Some(Path::new("s.sol")), Path::new("o.sol"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "p.lp", "log", "0", "seconds", "30", "threads", "4", "mips", "s.sol", "solve",
                "solution", "o.sol"
            ]
        );
    }

    #[test]
    fn mip_start_layout() {
        let f = write_mip_start(&[88.0, 200.5]).unwrap();
        let written = fs::read_to_string(f.path()).unwrap();
        assert_eq!(written, "0 x0 88\n1 x1 200.5\n");
    }

    #[test]
    fn search_needs_a_problem() {
        let mut engine = CbcEngine::new();
        assert!(matches!(engine.branch_and_bound(), Err(EngineError::NotLoaded)));
    }
}
