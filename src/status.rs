//! Termination status of a solve, and how engine flags collapse into it.
use std::fmt;

/// Outcome of [`LpModel::solve`](crate::model::LpModel::solve).
///
/// The discriminants are the status codes reported across the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SolveStatus {
    /// The engine proved the integer solution optimal
    Optimal = 0,
    /// No feasible integer solution exists (primal or dual infeasibility)
    Infeasible = 1,
    /// The engine gave up, typically on numerical difficulties
    Abandoned = 2,
    /// A time, iteration, node, solution or objective limit stopped the search
    LimitReached = 3,
    /// None of the above was reported
    Unknown = 4,
}

impl SolveStatus {
    /// Every status, in code order
    pub const ALL: [SolveStatus; 5] = [
        SolveStatus::Optimal,
        SolveStatus::Infeasible,
        SolveStatus::Abandoned,
        SolveStatus::LimitReached,
        SolveStatus::Unknown,
    ];

    /// Integer code of this status
    ///
    /// ```
    /// use lp_model::SolveStatus;
    ///
    /// assert_eq!(SolveStatus::Optimal.code(), 0);
    /// assert_eq!(SolveStatus::Unknown.code(), 4);
    /// ```
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Inverse of [SolveStatus::code]
    pub fn from_code(code: i32) -> Option<SolveStatus> {
        SolveStatus::ALL.iter().copied().find(|s| s.code() == code)
    }

    /// Whether the column solution and score can be trusted
    pub fn is_optimal(self) -> bool {
        self == SolveStatus::Optimal
    }

    /// Short lowercase name, used in log events
    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Abandoned => "abandoned",
            SolveStatus::LimitReached => "limit_reached",
            SolveStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Termination flags reported by an engine after its search.
///
/// Engines may raise several flags at once (an optimum proven right as a limit
/// hits, for instance), so these are independent booleans rather than an enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineFlags {
    /// An optimal integer solution was proven
    pub proven_optimal: bool,
    /// The problem was proven primal infeasible
    pub proven_infeasible: bool,
    /// The problem was proven dual infeasible (unbounded)
    pub proven_dual_infeasible: bool,
    /// The search was abandoned
    pub abandoned: bool,
    /// The primal objective limit was reached
    pub primal_objective_limit_reached: bool,
    /// The dual objective limit was reached
    pub dual_objective_limit_reached: bool,
    /// The iteration limit was reached
    pub iteration_limit_reached: bool,
    /// The node limit was reached
    pub node_limit_reached: bool,
    /// The solution count limit was reached
    pub solution_limit_reached: bool,
    /// The time limit was reached
    pub seconds_limit_reached: bool,
}

impl EngineFlags {
    /// Whether any resource or objective limit stopped the search
    pub fn limit_reached(&self) -> bool {
        self.primal_objective_limit_reached
            || self.dual_objective_limit_reached
            || self.iteration_limit_reached
            || self.node_limit_reached
            || self.solution_limit_reached
            || self.seconds_limit_reached
    }

    /// Collapse the flags into one status. The first matching rule wins:
    /// optimal, infeasible, abandoned, limit reached, unknown.
    ///
    /// ```
    /// use lp_model::{EngineFlags, SolveStatus};
    ///
    /// let flags = EngineFlags {
    ///     proven_optimal: true,
    ///     seconds_limit_reached: true,
    ///     ..EngineFlags::default()
    /// };
    /// assert_eq!(flags.status(), SolveStatus::Optimal);
    /// ```
    pub fn status(&self) -> SolveStatus {
        if self.proven_optimal {
            SolveStatus::Optimal
        } else if self.proven_infeasible || self.proven_dual_infeasible {
            SolveStatus::Infeasible
        } else if self.abandoned {
            SolveStatus::Abandoned
        } else if self.limit_reached() {
            SolveStatus::LimitReached
        } else {
            SolveStatus::Unknown
        }
    }
}

impl From<EngineFlags> for SolveStatus {
    fn from(flags: EngineFlags) -> Self {
        flags.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAG_COUNT: u32 = 10;

    fn flags_from_bits(bits: u32) -> EngineFlags {
        let bit = |i: u32| bits & (1 << i) != 0;
        EngineFlags {
            proven_optimal: bit(0),
            proven_infeasible: bit(1),
            proven_dual_infeasible: bit(2),
            abandoned: bit(3),
            primal_objective_limit_reached: bit(4),
            dual_objective_limit_reached: bit(5),
            iteration_limit_reached: bit(6),
            node_limit_reached: bit(7),
            solution_limit_reached: bit(8),
            seconds_limit_reached: bit(9),
        }
    }

    #[test]
    fn every_flag_combination_maps_by_precedence() {
        for bits in 0..(1u32 << FLAG_COUNT) {
            let flags = flags_from_bits(bits);
            let expected = if bits & 0b1 != 0 {
                SolveStatus::Optimal
            } else if bits & 0b110 != 0 {
                SolveStatus::Infeasible
            } else if bits & 0b1000 != 0 {
                SolveStatus::Abandoned
            } else if bits >> 4 != 0 {
                SolveStatus::LimitReached
            } else {
                SolveStatus::Unknown
            };
            assert_eq!(flags.status(), expected, "flags {:?}", flags);
        }
    }

    #[test]
    fn optimal_wins_over_every_limit() {
        for limit in 4..FLAG_COUNT {
            let flags = flags_from_bits(1 | (1 << limit));
            assert_eq!(SolveStatus::from(flags), SolveStatus::Optimal);
        }
    }

    #[test]
    fn no_flags_is_unknown() {
        assert_eq!(EngineFlags::default().status(), SolveStatus::Unknown);
    }

    #[test]
    fn codes_round_trip() {
        for status in SolveStatus::ALL.iter() {
            assert_eq!(SolveStatus::from_code(status.code()), Some(*status));
        }
        assert_eq!(SolveStatus::from_code(5), None);
        assert_eq!(SolveStatus::from_code(-1), None);
    }

    #[test]
    fn status_names() {
        assert_eq!(SolveStatus::LimitReached.to_string(), "limit_reached");
        assert!(SolveStatus::Optimal.is_optimal());
        assert!(!SolveStatus::LimitReached.is_optimal());
    }
}
