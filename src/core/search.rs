use serde::Serialize;
use tracing::debug;

use super::bridge;
use super::error::PlanResult;
use super::projector;
use super::solver::{self, SpendSolution, SpendStatus};
use super::types::{Assumptions, Balances, BridgeAssessment, Household, RetirementFrame};
use super::validate;

const SPEND_TOLERANCE: f64 = 1e-6;

/// Inclusive range of candidate retirement ages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBounds {
    pub min_age: u32,
    pub max_age: u32,
}

impl AgeBounds {
    pub fn new(min_age: u32, max_age: u32) -> Self {
        Self { min_age, max_age }
    }

    /// From today up to the last year before life expectancy.
    pub fn for_household(household: &Household) -> Self {
        Self {
            min_age: household.current_age(),
            max_age: household.life_expectancy.saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeEvaluation {
    pub retirement_age: u32,
    pub viable: bool,
    pub balances_at_retirement: Balances,
    pub spend: SpendSolution,
    pub bridge: BridgeAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeSearchReport {
    pub earliest_age: Option<u32>,
    /// The evaluation at `earliest_age`, when one exists.
    pub evaluation: Option<AgeEvaluation>,
    pub evaluations: u32,
    pub hit_safety_limit: bool,
}

/// A safety-limited solve never counts: its spend is the ceiling, not a solution.
fn is_viable(household: &Household, spend: &SpendSolution, bridge: &BridgeAssessment) -> bool {
    spend.is_converged()
        && spend.base_spend + SPEND_TOLERANCE >= household.target_spend
        && bridge.is_covered()
}

pub(crate) fn evaluate_validated(
    household: &Household,
    assumptions: &Assumptions,
    retirement_age: u32,
) -> AgeEvaluation {
    let projection = projector::project_household(household, assumptions, retirement_age);
    let frame = RetirementFrame::for_household(household, retirement_age);
    let spend = solver::solve_validated(projection.balances, &frame, assumptions);
    let bridge = bridge::assess(
        projection.balances,
        retirement_age,
        frame.preservation_age,
        household.target_spend,
        assumptions,
    );
    let viable = is_viable(household, &spend, &bridge);

    debug!(
        retirement_age,
        viable,
        base_spend = spend.base_spend,
        status = ?spend.status,
        bridge = ?bridge.status,
        "evaluated retirement age"
    );

    AgeEvaluation {
        retirement_age,
        viable,
        balances_at_retirement: projection.balances,
        spend,
        bridge,
    }
}

/// Projects to `retirement_age`, solves the sustainable spend and checks the bridge.
pub fn evaluate_age(
    household: &Household,
    assumptions: &Assumptions,
    retirement_age: u32,
) -> PlanResult<AgeEvaluation> {
    validate::household(household)?;
    validate::assumptions(assumptions)?;
    validate::retirement_age(household, retirement_age)?;
    Ok(evaluate_validated(household, assumptions, retirement_age))
}

pub(crate) fn search_validated(
    household: &Household,
    assumptions: &Assumptions,
    bounds: AgeBounds,
) -> AgeSearchReport {
    let mut evaluations = 0;
    let mut hit_safety_limit = false;
    let mut evaluate = |age: u32| {
        let evaluation = evaluate_validated(household, assumptions, age);
        evaluations += 1;
        hit_safety_limit |= evaluation.spend.status == SpendStatus::SafetyLimit;
        evaluation
    };

    let oldest = evaluate(bounds.max_age);
    if !oldest.viable {
        return AgeSearchReport {
            earliest_age: None,
            evaluation: None,
            evaluations,
            hit_safety_limit,
        };
    }

    // Invariant: `hi` is viable; every age below `lo` is not.
    let mut lo = bounds.min_age;
    let mut hi = bounds.max_age;
    let mut best = oldest;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let evaluation = evaluate(mid);
        if evaluation.viable {
            hi = mid;
            best = evaluation;
        } else {
            lo = mid + 1;
        }
    }

    AgeSearchReport {
        earliest_age: Some(hi),
        evaluation: Some(best),
        evaluations,
        hit_safety_limit,
    }
}

/// Binary search for the earliest viable retirement age. Viability is taken to
/// be monotone in age; `None` means even `bounds.max_age` is not viable.
pub fn find_earliest_viable_age(
    household: &Household,
    assumptions: &Assumptions,
    bounds: AgeBounds,
) -> PlanResult<AgeSearchReport> {
    validate::household(household)?;
    validate::assumptions(assumptions)?;
    validate::bounds(household, bounds)?;
    Ok(search_validated(household, assumptions, bounds))
}

/// Every age in `bounds`, for audit tables and charts.
pub fn sweep_ages(
    household: &Household,
    assumptions: &Assumptions,
    bounds: AgeBounds,
) -> PlanResult<Vec<AgeEvaluation>> {
    validate::household(household)?;
    validate::assumptions(assumptions)?;
    validate::bounds(household, bounds)?;
    Ok((bounds.min_age..=bounds.max_age)
        .map(|age| evaluate_validated(household, assumptions, age))
        .collect())
}
