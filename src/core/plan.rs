use serde::Serialize;
use tracing::debug;

use super::drawdown;
use super::error::PlanResult;
use super::projector;
use super::search::{self, AgeBounds, AgeEvaluation};
use super::solver::SpendStatus;
use super::types::{Assumptions, Household, RetirementFrame, SolverResult};
use super::validate;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PlanTarget {
    /// Search for the earliest viable age within the bounds.
    #[default]
    EarliestAge,
    /// Report the plan for a chosen retirement age, viable or not.
    FixedAge(u32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanOptions {
    pub target: PlanTarget,
    pub bounds: Option<AgeBounds>,
    /// Also evaluate every age in the bounds.
    pub include_sweep: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub current_age: u32,
    pub preservation_age: u32,
    pub life_expectancy: u32,
    pub target_spend: f64,
    pub bounds: AgeBounds,
    pub earliest_viable_age: Option<u32>,
    pub result: Option<SolverResult>,
    pub evaluations: u32,
    pub hit_safety_limit: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sweep: Vec<AgeEvaluation>,
}

/// Full year-by-year result for an evaluated age: accumulation up to
/// retirement followed by drawdown at the solved spend.
pub fn solver_result(
    household: &Household,
    assumptions: &Assumptions,
    evaluation: &AgeEvaluation,
) -> SolverResult {
    let age = evaluation.retirement_age;
    let projection = projector::project_household(household, assumptions, age);
    let frame = RetirementFrame::for_household(household, age);
    let run = drawdown::simulate(
        projection.balances,
        &frame,
        evaluation.spend.base_spend,
        assumptions,
    );

    let mut path = projection.path;
    path.extend(run.path);

    SolverResult {
        retirement_age: age,
        viable: evaluation.viable,
        base_spend: evaluation.spend.base_spend,
        spend_status: evaluation.spend.status,
        terminal_wealth: run.terminal_wealth,
        bridge: evaluation.bridge,
        path,
        shortfalls: run.shortfalls,
    }
}

pub fn build_plan(
    household: &Household,
    assumptions: &Assumptions,
    options: PlanOptions,
) -> PlanResult<PlanReport> {
    validate::household(household)?;
    validate::assumptions(assumptions)?;
    let bounds = options
        .bounds
        .unwrap_or_else(|| AgeBounds::for_household(household));
    validate::bounds(household, bounds)?;

    let (earliest_viable_age, evaluation, evaluations, hit_safety_limit) = match options.target {
        PlanTarget::EarliestAge => {
            let report = search::search_validated(household, assumptions, bounds);
            (
                report.earliest_age,
                report.evaluation,
                report.evaluations,
                report.hit_safety_limit,
            )
        }
        PlanTarget::FixedAge(age) => {
            validate::retirement_age(household, age)?;
            let evaluation = search::evaluate_validated(household, assumptions, age);
            let hit = evaluation.spend.status == SpendStatus::SafetyLimit;
            let earliest = evaluation.viable.then_some(age);
            (earliest, Some(evaluation), 1, hit)
        }
    };

    let result = evaluation
        .as_ref()
        .map(|e| solver_result(household, assumptions, e));

    let sweep = if options.include_sweep {
        (bounds.min_age..=bounds.max_age)
            .map(|age| search::evaluate_validated(household, assumptions, age))
            .collect()
    } else {
        Vec::new()
    };

    debug!(
        earliest_viable_age = ?earliest_viable_age,
        evaluations,
        hit_safety_limit,
        "plan built"
    );

    Ok(PlanReport {
        current_age: household.current_age(),
        preservation_age: household.preservation_age(),
        life_expectancy: household.life_expectancy,
        target_spend: household.target_spend,
        bounds,
        earliest_viable_age,
        result,
        evaluations,
        hit_safety_limit,
        sweep,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Members, Person, Phase, SolverSettings, SpendSchedule, WithdrawalOrder};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn household() -> Household {
        Household {
            members: Members::Single(Person {
                age: 50,
                income: 100_000.0,
                accessible_balance: 50_000.0,
                locked_balance: 2_000_000.0,
                preservation_age: 60,
                locked_fee: 0.0,
            }),
            savings_budget: 0.0,
            savings_growth_rate: 0.0,
            target_spend: 40_000.0,
            life_expectancy: 90,
            split: None,
        }
    }

    fn assumptions() -> Assumptions {
        Assumptions {
            real_return: 0.0,
            fee_drag: 0.0,
            bequest_target: 0.0,
            spend_schedule: SpendSchedule::Flat,
            withdrawal_order: WithdrawalOrder::AccessibleFirst,
            solver: SolverSettings::default(),
        }
    }

    #[test]
    fn earliest_age_plan_carries_full_path() {
        let options = PlanOptions {
            bounds: Some(AgeBounds::new(50, 70)),
            ..PlanOptions::default()
        };
        let report = build_plan(&household(), &assumptions(), options).expect("must plan");
        assert_eq!(report.earliest_viable_age, Some(59));
        assert_eq!(report.preservation_age, 60);

        let result = report.result.expect("result expected");
        assert!(result.viable);
        assert_eq!(result.path.len(), 40);
        assert_eq!(result.path[0].age, 51);
        assert_eq!(result.path[0].phase, Phase::Accumulation);
        assert_eq!(result.path[8].age, 59);
        assert_eq!(result.path[8].phase, Phase::Accumulation);
        assert_eq!(result.path[9].age, 60);
        assert_eq!(result.path[9].phase, Phase::Bridge);
        assert_eq!(result.path[10].phase, Phase::Retirement);
        assert_eq!(result.path[39].age, 90);

        // The single bridge year holds spend to the 50k accessible pool, so
        // the locked pool is not fully spent.
        assert_close(result.base_spend, 50_000.0, 1e-6);
        assert!(result.shortfalls.is_empty());
        assert_close(result.terminal_wealth, 2_050_000.0 - 31.0 * 50_000.0, 1e-3);
        assert!(report.sweep.is_empty());
    }

    #[test]
    fn fixed_age_reports_non_viable_plan() {
        let options = PlanOptions {
            target: PlanTarget::FixedAge(55),
            ..PlanOptions::default()
        };
        let report = build_plan(&household(), &assumptions(), options).expect("must plan");
        assert_eq!(report.earliest_viable_age, None);
        assert_eq!(report.evaluations, 1);
        let result = report.result.expect("result expected");
        assert_eq!(result.retirement_age, 55);
        assert!(!result.viable);
        assert!(!result.bridge.is_covered());
    }

    #[test]
    fn sweep_is_included_on_request() {
        let options = PlanOptions {
            bounds: Some(AgeBounds::new(58, 62)),
            include_sweep: true,
            ..PlanOptions::default()
        };
        let report = build_plan(&household(), &assumptions(), options).expect("must plan");
        let ages: Vec<u32> = report.sweep.iter().map(|e| e.retirement_age).collect();
        assert_eq!(ages, vec![58, 59, 60, 61, 62]);
        assert!(!report.sweep[0].viable);
        assert!(report.sweep[1].viable);
    }

    #[test]
    fn report_serializes_camel_case() {
        let options = PlanOptions {
            target: PlanTarget::FixedAge(60),
            ..PlanOptions::default()
        };
        let report = build_plan(&household(), &assumptions(), options).expect("must plan");
        let json = serde_json::to_value(&report).expect("must serialize");
        assert_eq!(json["earliestViableAge"], 60);
        assert_eq!(json["result"]["spendStatus"], "converged");
        assert_eq!(json["result"]["bridge"]["status"], "covered");
        assert_eq!(json["result"]["path"][0]["phase"], "accumulation");
        assert_eq!(json["result"]["shortfalls"], serde_json::json!([]));
        assert!(json.get("sweep").is_none());
    }
}
