use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::error::{PlanError, PlanResult};
use super::search::{self, AgeBounds};
use super::types::{Assumptions, Household, SplitPolicy};
use super::validate;

const CONTRIBUTION_EPS: f64 = 1e-6;
const FRACTION_EPS: f64 = 1e-12;
const MAX_GRID_POINTS: u32 = 1_001;
const MAX_REFINE_POINTS: u32 = 101;
const MAX_REFINE_PASSES: u32 = 20;

/// Tie-break among fractions whose earliest ages are equally good.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitBias {
    /// Prefer the largest locked contribution, then the smaller fraction.
    #[default]
    MaxCapUsage,
    MinLockedFraction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerOptions {
    pub grid_points: u32,
    pub max_fraction: f64,
    pub refine_passes: u32,
    pub refine_points: u32,
    /// Fractions within this many years of the best earliest age count as tied.
    pub age_tolerance: u32,
    pub bias: SplitBias,
    pub bounds: Option<AgeBounds>,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            grid_points: 21,
            max_fraction: 1.0,
            refine_passes: 3,
            refine_points: 5,
            age_tolerance: 0,
            bias: SplitBias::MaxCapUsage,
            bounds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityPoint {
    pub fraction: f64,
    pub earliest_age: Option<u32>,
    pub locked_contribution: f64,
    pub accessible_contribution: f64,
    pub cap_binding: bool,
    pub hit_safety_limit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintReport {
    pub aggregate_cap: f64,
    pub savings_budget: f64,
    pub locked_gross: f64,
    pub accessible_gross: f64,
    pub locked_net: f64,
    pub accessible_net: f64,
    pub contribution_tax: f64,
    pub income_tax: f64,
    pub cap_binding: bool,
    pub cap_headroom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRecommendation {
    /// Locked share actually contributed after the cap (locked / budget).
    pub recommended_fraction: f64,
    /// Grid fraction that produced the recommendation, before capping.
    pub requested_fraction: f64,
    pub earliest_age: Option<u32>,
    pub sensitivity_curve: Vec<SensitivityPoint>,
    pub constraint_report: ConstraintReport,
    pub evaluation_count: u32,
}

fn validate_options(options: &OptimizerOptions) -> PlanResult<()> {
    if options.grid_points == 0 || options.grid_points > MAX_GRID_POINTS {
        return Err(PlanError::invalid(
            "grid_points",
            format!("must be between 1 and {MAX_GRID_POINTS}"),
        ));
    }
    if options.refine_points > MAX_REFINE_POINTS {
        return Err(PlanError::invalid(
            "refine_points",
            format!("must be <= {MAX_REFINE_POINTS}"),
        ));
    }
    if options.refine_passes > MAX_REFINE_PASSES {
        return Err(PlanError::invalid(
            "refine_passes",
            format!("must be <= {MAX_REFINE_PASSES}"),
        ));
    }
    if !(0.0..=1.0).contains(&options.max_fraction) {
        return Err(PlanError::invalid("max_fraction", "must be between 0 and 1"));
    }
    Ok(())
}

fn evaluate_fraction(
    household: &Household,
    assumptions: &Assumptions,
    policy: SplitPolicy,
    fraction: f64,
    bounds: AgeBounds,
) -> SensitivityPoint {
    let policy = policy.with_fraction(fraction);
    let report = search::search_validated(&household.with_split(policy), assumptions, bounds);
    let flow = policy.allocate(household.savings_budget);
    SensitivityPoint {
        fraction,
        earliest_age: report.earliest_age,
        locked_contribution: flow.locked_gross,
        accessible_contribution: flow.accessible_gross,
        cap_binding: flow.cap_binding,
        hit_safety_limit: report.hit_safety_limit,
    }
}

fn prefers(candidate: &SensitivityPoint, incumbent: &SensitivityPoint, bias: SplitBias) -> bool {
    match bias {
        SplitBias::MaxCapUsage => {
            let diff = candidate.locked_contribution - incumbent.locked_contribution;
            if diff.abs() > CONTRIBUTION_EPS {
                diff > 0.0
            } else {
                candidate.fraction < incumbent.fraction
            }
        }
        SplitBias::MinLockedFraction => candidate.fraction < incumbent.fraction,
    }
}

/// Best point on the curve: earliest age first (within `age_tolerance`), then the bias.
fn select(curve: &[SensitivityPoint], age_tolerance: u32, bias: SplitBias) -> SensitivityPoint {
    let best_age = curve.iter().filter_map(|p| p.earliest_age).min();
    let tied = |p: &&SensitivityPoint| match (best_age, p.earliest_age) {
        (Some(best), Some(age)) => age <= best.saturating_add(age_tolerance),
        (Some(_), None) => false,
        (None, _) => true,
    };

    let mut candidates = curve.iter().filter(tied);
    let first = *candidates.next().unwrap_or(&curve[0]);
    candidates.fold(first, |best, p| if prefers(p, &best, bias) { *p } else { best })
}

fn grid(points: u32, max_fraction: f64) -> Vec<f64> {
    if points == 1 {
        return vec![max_fraction];
    }
    (0..points)
        .map(|i| max_fraction * i as f64 / (points - 1) as f64)
        .collect()
}

/// Searches the locked-pool share of savings that retires the household earliest.
pub fn optimize(
    household: &Household,
    assumptions: &Assumptions,
    policy: SplitPolicy,
    options: OptimizerOptions,
) -> PlanResult<SplitRecommendation> {
    validate::household(household)?;
    validate::assumptions(assumptions)?;
    validate::split_policy(&policy)?;
    validate_options(&options)?;
    let bounds = options
        .bounds
        .unwrap_or_else(|| AgeBounds::for_household(household));
    validate::bounds(household, bounds)?;

    let mut curve: Vec<SensitivityPoint> = grid(options.grid_points, options.max_fraction)
        .par_iter()
        .map(|&fraction| evaluate_fraction(household, assumptions, policy, fraction, bounds))
        .collect();
    let mut incumbent = select(&curve, options.age_tolerance, options.bias);

    let mut half_width = if options.grid_points > 1 {
        options.max_fraction / (options.grid_points - 1) as f64
    } else {
        options.max_fraction
    };
    for pass in 0..options.refine_passes {
        let lo = (incumbent.fraction - half_width).max(0.0);
        let hi = (incumbent.fraction + half_width).min(options.max_fraction);
        if hi - lo <= FRACTION_EPS || options.refine_points == 0 {
            break;
        }
        let fresh: Vec<f64> = (1..=options.refine_points)
            .map(|j| lo + (hi - lo) * j as f64 / (options.refine_points + 1) as f64)
            .filter(|f| curve.iter().all(|p| (p.fraction - f).abs() > FRACTION_EPS))
            .collect();
        let refined: Vec<SensitivityPoint> = fresh
            .par_iter()
            .map(|&fraction| evaluate_fraction(household, assumptions, policy, fraction, bounds))
            .collect();
        curve.extend(refined);
        incumbent = select(&curve, options.age_tolerance, options.bias);
        debug!(
            pass,
            fraction = incumbent.fraction,
            earliest_age = ?incumbent.earliest_age,
            "split refinement pass"
        );
        half_width *= 0.5;
    }

    curve.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));

    let flow = policy
        .with_fraction(incumbent.fraction)
        .allocate(household.savings_budget);
    let recommended_fraction = if household.savings_budget > 0.0 {
        flow.locked_gross / household.savings_budget
    } else {
        incumbent.fraction
    };

    Ok(SplitRecommendation {
        recommended_fraction,
        requested_fraction: incumbent.fraction,
        earliest_age: incumbent.earliest_age,
        evaluation_count: curve.len() as u32,
        sensitivity_curve: curve,
        constraint_report: ConstraintReport {
            aggregate_cap: policy.aggregate_cap,
            savings_budget: household.savings_budget,
            locked_gross: flow.locked_gross,
            accessible_gross: flow.accessible_gross,
            locked_net: flow.locked_net,
            accessible_net: flow.accessible_net,
            contribution_tax: flow.contribution_tax,
            income_tax: flow.income_tax,
            cap_binding: flow.cap_binding,
            cap_headroom: (policy.aggregate_cap - flow.locked_gross).max(0.0),
        },
    })
}
