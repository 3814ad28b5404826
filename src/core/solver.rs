use serde::Serialize;
use tracing::warn;

use super::drawdown::{self, Outcome};
use super::error::{PlanError, PlanResult};
use super::types::{Assumptions, Balances, RetirementFrame};
use super::validate;

pub const DEFAULT_SPEND_CEILING: f64 = 1.0e9;
pub const DEFAULT_BISECTION_ITERATIONS: u32 = 50;

const TERMINAL_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverSettings {
    /// Largest base spend the bracket search may try.
    pub spend_ceiling: f64,
    pub bisection_iterations: u32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            spend_ceiling: DEFAULT_SPEND_CEILING,
            bisection_iterations: DEFAULT_BISECTION_ITERATIONS,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpendStatus {
    Converged,
    /// Even zero spend leaves less than the bequest target.
    BequestUnreachable,
    /// Terminal wealth still exceeds the target at the spend ceiling. The
    /// reported spend is the ceiling, not a solution.
    SafetyLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendSolution {
    pub base_spend: f64,
    pub terminal_wealth: f64,
    pub status: SpendStatus,
    pub iterations: u32,
    pub bracket_expansions: u32,
}

impl SpendSolution {
    pub fn is_converged(&self) -> bool {
        self.status == SpendStatus::Converged
    }
}

/// Finds the largest base spend that funds every bridge year and still leaves
/// the bequest target. Without a binding bridge this is the spend whose
/// drawdown ends at the bequest.
pub fn solve(
    start: Balances,
    frame: &RetirementFrame,
    assumptions: &Assumptions,
) -> PlanResult<SpendSolution> {
    validate::assumptions(assumptions)?;
    if !start.accessible.is_finite() || !start.locked.is_finite() {
        return Err(PlanError::invalid("start balances", "must be finite"));
    }
    if frame.retirement_age >= frame.life_expectancy {
        return Err(PlanError::invalid("retirement_age", "must be < life_expectancy"));
    }
    Ok(solve_validated(start, frame, assumptions))
}

pub(crate) fn solve_validated(
    start: Balances,
    frame: &RetirementFrame,
    assumptions: &Assumptions,
) -> SpendSolution {
    let target = assumptions.bequest_target;
    let settings = assumptions.solver;
    let run = |spend: f64| drawdown::outcome(start, frame, spend, assumptions);
    // A spend is too high once it leaves no more than the bequest or leaves a
    // bridge year unfunded.
    let too_high = |outcome: Outcome| outcome.terminal_wealth <= target || !outcome.bridge_funded;

    let floor_wealth = run(0.0).terminal_wealth;
    if floor_wealth + TERMINAL_EPS < target {
        return SpendSolution {
            base_spend: 0.0,
            terminal_wealth: floor_wealth,
            status: SpendStatus::BequestUnreachable,
            iterations: 0,
            bracket_expansions: 0,
        };
    }

    let years = frame.drawdown_years().max(1) as f64;
    let mut upper = (start.total() / years)
        .max(1.0)
        .min(settings.spend_ceiling);
    let mut bracket_expansions = 0;
    loop {
        let outcome = run(upper);
        if too_high(outcome) {
            break;
        }
        if upper >= settings.spend_ceiling {
            warn!(
                retirement_age = frame.retirement_age,
                spend_ceiling = settings.spend_ceiling,
                terminal_wealth = outcome.terminal_wealth,
                "spend ceiling reached before terminal wealth fell to target"
            );
            return SpendSolution {
                base_spend: settings.spend_ceiling,
                terminal_wealth: outcome.terminal_wealth,
                status: SpendStatus::SafetyLimit,
                iterations: 0,
                bracket_expansions,
            };
        }
        upper = (upper * 2.0).min(settings.spend_ceiling);
        bracket_expansions += 1;
    }

    // Invariant: `lo` funds every bridge year and keeps the bequest; `hi` does not.
    let mut lo = 0.0;
    let mut hi = upper;
    for _ in 0..settings.bisection_iterations {
        let mid = (lo + hi) * 0.5;
        if too_high(run(mid)) {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    SpendSolution {
        base_spend: lo,
        terminal_wealth: run(lo).terminal_wealth,
        status: SpendStatus::Converged,
        iterations: settings.bisection_iterations,
        bracket_expansions,
    }
}
