use serde::Serialize;

use super::error::{PlanError, PlanResult};
use super::search::{self, AgeEvaluation};
use super::types::{Assumptions, Household};
use super::validate;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalConfig {
    pub target_retirement_age: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl SavingsGoalConfig {
    pub fn for_age(target_retirement_age: u32) -> Self {
        Self {
            target_retirement_age,
            search_min: 0.0,
            search_max: 500_000.0,
            tolerance: 1.0,
            max_iterations: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub viable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalResult {
    pub target_retirement_age: u32,
    /// Smallest annual savings budget found to make the target age viable.
    pub solved_budget: Option<f64>,
    pub evaluation: Option<AgeEvaluation>,
    pub iterations: Vec<SavingsGoalIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

fn with_budget(household: &Household, savings_budget: f64) -> Household {
    Household {
        savings_budget: savings_budget.max(0.0),
        ..household.clone()
    }
}

/// Bisects on the savings budget for the least saving that makes
/// `config.target_retirement_age` viable. Viability rises with savings.
pub fn solve_required_savings(
    household: &Household,
    assumptions: &Assumptions,
    config: SavingsGoalConfig,
) -> PlanResult<SavingsGoalResult> {
    validate::household(household)?;
    validate::assumptions(assumptions)?;
    validate_config(household, config)?;

    let age = config.target_retirement_age;
    let evaluate =
        |budget: f64| search::evaluate_validated(&with_budget(household, budget), assumptions, age);

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let mut solved_budget = None;
    let mut converged = false;
    let feasible;
    let message;

    let low_eval = evaluate(config.search_min);
    if low_eval.viable {
        solved_budget = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already viable at the lower savings bound.".to_string();
    } else if !evaluate(config.search_max).viable {
        feasible = false;
        message = "No viable savings budget found within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let viable = evaluate(mid).viable;
            iterations.push(SavingsGoalIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                viable,
            });

            if viable {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_budget = Some(hi);
        feasible = true;
        message = if converged {
            "Solved required savings budget.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate."
                .to_string()
        };
    }

    Ok(SavingsGoalResult {
        target_retirement_age: age,
        solved_budget,
        evaluation: solved_budget.map(evaluate),
        iterations,
        converged,
        feasible,
        message,
    })
}

fn validate_config(household: &Household, config: SavingsGoalConfig) -> PlanResult<()> {
    validate::retirement_age(household, config.target_retirement_age)?;
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(PlanError::invalid("search bounds", "must be finite"));
    }
    if config.search_min < 0.0 {
        return Err(PlanError::invalid("search_min", "must be >= 0"));
    }
    if config.search_max <= config.search_min {
        return Err(PlanError::invalid("search_max", "must be greater than search_min"));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(PlanError::invalid("tolerance", "must be > 0"));
    }
    if config.max_iterations == 0 {
        return Err(PlanError::invalid("max_iterations", "must be > 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Members, Person, SolverSettings, SpendSchedule, WithdrawalOrder};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn deterministic_household() -> Household {
        Household {
            members: Members::Single(Person {
                age: 30,
                income: 0.0,
                accessible_balance: 0.0,
                locked_balance: 0.0,
                preservation_age: 30,
                locked_fee: 0.0,
            }),
            savings_budget: 0.0,
            savings_growth_rate: 0.0,
            target_spend: 100.0,
            life_expectancy: 32,
            split: None,
        }
    }

    fn zero_return() -> Assumptions {
        Assumptions {
            real_return: 0.0,
            fee_drag: 0.0,
            bequest_target: 0.0,
            spend_schedule: SpendSchedule::Flat,
            withdrawal_order: WithdrawalOrder::AccessibleFirst,
            solver: SolverSettings::default(),
        }
    }

    fn config(search_max: f64) -> SavingsGoalConfig {
        SavingsGoalConfig {
            target_retirement_age: 31,
            search_min: 0.0,
            search_max,
            tolerance: 0.5,
            max_iterations: 24,
        }
    }

    #[test]
    fn required_savings_solver_finds_deterministic_solution() {
        // One working year then one retired year: saving 100 funds 100 of spend.
        let result = solve_required_savings(&deterministic_household(), &zero_return(), config(200.0))
            .expect("must solve");
        assert!(result.feasible);
        assert!(result.converged);
        assert_close(result.solved_budget.expect("budget expected"), 100.0, 1.0);
        assert!(result.evaluation.expect("evaluation expected").viable);
        assert!(!result.iterations.is_empty());
    }

    #[test]
    fn reports_infeasible_when_bounds_too_low() {
        let result = solve_required_savings(&deterministic_household(), &zero_return(), config(50.0))
            .expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_budget.is_none());
        assert!(result.evaluation.is_none());
    }

    #[test]
    fn already_viable_at_lower_bound() {
        let mut h = deterministic_household();
        h.members = Members::Single(Person {
            accessible_balance: 500.0,
            ..h.members.primary().clone()
        });
        let result = solve_required_savings(&h, &zero_return(), config(200.0)).expect("must solve");
        assert_eq!(result.solved_budget, Some(0.0));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn rejects_bad_config() {
        let h = deterministic_household();
        let mut bad = config(200.0);
        bad.search_max = 0.0;
        assert!(solve_required_savings(&h, &zero_return(), bad).is_err());
        let mut bad = config(200.0);
        bad.target_retirement_age = 32;
        assert!(solve_required_savings(&h, &zero_return(), bad).is_err());
    }
}
