mod bridge;
mod drawdown;
mod error;
mod goal;
mod optimizer;
mod plan;
mod projector;
mod rules;
mod schedule;
mod search;
mod solver;
mod types;
mod validate;

pub use bridge::{BRIDGE_TOLERANCE, assess as assess_bridge, bridge_present_value};
pub use drawdown::{Drawdown, Shortfall, simulate as simulate_drawdown};
pub use error::{PlanError, PlanResult};
pub use goal::{
    SavingsGoalConfig, SavingsGoalIteration, SavingsGoalResult, solve_required_savings,
};
pub use optimizer::{
    ConstraintReport, OptimizerOptions, SensitivityPoint, SplitBias, SplitRecommendation, optimize,
};
pub use plan::{PlanOptions, PlanReport, PlanTarget, build_plan, solver_result};
pub use projector::{Projection, project as project_wealth, project_household};
pub use rules::{ContributionRules, StaticRules, split_policy};
pub use schedule::{AgeBand, SpendSchedule};
pub use search::{
    AgeBounds, AgeEvaluation, AgeSearchReport, evaluate_age, find_earliest_viable_age, sweep_ages,
};
pub use solver::{
    DEFAULT_BISECTION_ITERATIONS, DEFAULT_SPEND_CEILING, SolverSettings, SpendSolution,
    SpendStatus, solve as solve_spend,
};
pub use types::{
    Assumptions, BalanceSource, Balances, BridgeAssessment, BridgeStatus, ContributionFlow,
    Household, Members, PathPoint, Person, Phase, RetirementFrame, SavingsMode, SolverResult,
    SplitPolicy, WithdrawalOrder,
};
pub use validate::{
    assumptions as validate_assumptions, bounds as validate_bounds,
    household as validate_household,
};
