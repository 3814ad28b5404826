use super::error::{PlanError, PlanResult};
use super::search::AgeBounds;
use super::types::{Assumptions, Household, Person, SplitPolicy};

const MAX_AGE: u32 = 130;
const MAX_BISECTION_ITERATIONS: u32 = 200;

fn finite_non_negative(field: &str, value: f64) -> PlanResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(PlanError::invalid(field, "must be finite and >= 0"));
    }
    Ok(())
}

fn rate_above_minus_one(field: &str, value: f64) -> PlanResult<()> {
    if !value.is_finite() || value <= -1.0 {
        return Err(PlanError::invalid(field, "must be finite and > -100%"));
    }
    Ok(())
}

fn unit_interval(field: &str, value: f64) -> PlanResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(PlanError::invalid(field, "must be between 0 and 1"));
    }
    Ok(())
}

pub fn person(person: &Person, label: &str) -> PlanResult<()> {
    if person.age > MAX_AGE {
        return Err(PlanError::invalid(
            format!("{label}.age"),
            format!("must be <= {MAX_AGE}"),
        ));
    }
    if person.preservation_age > MAX_AGE {
        return Err(PlanError::invalid(
            format!("{label}.preservation_age"),
            format!("must be <= {MAX_AGE}"),
        ));
    }
    finite_non_negative(&format!("{label}.income"), person.income)?;
    finite_non_negative(&format!("{label}.accessible_balance"), person.accessible_balance)?;
    finite_non_negative(&format!("{label}.locked_balance"), person.locked_balance)?;
    finite_non_negative(&format!("{label}.locked_fee"), person.locked_fee)?;
    Ok(())
}

pub fn split_policy(policy: &SplitPolicy) -> PlanResult<()> {
    unit_interval("split.locked_fraction", policy.locked_fraction)?;
    finite_non_negative("split.aggregate_cap", policy.aggregate_cap)?;
    unit_interval("split.contribution_tax_rate", policy.contribution_tax_rate)?;
    unit_interval("split.marginal_tax_rate", policy.marginal_tax_rate)?;
    Ok(())
}

pub fn household(household: &Household) -> PlanResult<()> {
    for (index, member) in household.members.iter().enumerate() {
        let label = if index == 0 { "primary" } else { "partner" };
        person(member, label)?;
    }
    finite_non_negative("savings_budget", household.savings_budget)?;
    rate_above_minus_one("savings_growth_rate", household.savings_growth_rate)?;
    finite_non_negative("target_spend", household.target_spend)?;
    if household.life_expectancy <= household.current_age() {
        return Err(PlanError::invalid("life_expectancy", "must be > current_age"));
    }
    if household.life_expectancy <= household.preservation_age() {
        return Err(PlanError::invalid("life_expectancy", "must be > preservation_age"));
    }
    if household.life_expectancy > MAX_AGE {
        return Err(PlanError::invalid(
            "life_expectancy",
            format!("must be <= {MAX_AGE}"),
        ));
    }
    if let Some(policy) = &household.split {
        split_policy(policy)?;
    }
    Ok(())
}

pub fn assumptions(assumptions: &Assumptions) -> PlanResult<()> {
    rate_above_minus_one("real_return", assumptions.real_return)?;
    finite_non_negative("fee_drag", assumptions.fee_drag)?;
    rate_above_minus_one("net growth rate", assumptions.net_growth_rate())?;
    finite_non_negative("bequest_target", assumptions.bequest_target)?;
    assumptions.spend_schedule.validate()?;

    let solver = assumptions.solver;
    if !solver.spend_ceiling.is_finite() || solver.spend_ceiling <= 0.0 {
        return Err(PlanError::invalid("spend_ceiling", "must be finite and > 0"));
    }
    if solver.bisection_iterations == 0 || solver.bisection_iterations > MAX_BISECTION_ITERATIONS {
        return Err(PlanError::invalid(
            "bisection_iterations",
            format!("must be between 1 and {MAX_BISECTION_ITERATIONS}"),
        ));
    }
    Ok(())
}

pub fn bounds(household: &Household, bounds: AgeBounds) -> PlanResult<()> {
    if bounds.min_age > bounds.max_age {
        return Err(PlanError::invalid("min_age", "must be <= max_age"));
    }
    if bounds.min_age < household.current_age() {
        return Err(PlanError::invalid("min_age", "must be >= current_age"));
    }
    if bounds.max_age >= household.life_expectancy {
        return Err(PlanError::invalid("max_age", "must be < life_expectancy"));
    }
    Ok(())
}

pub fn retirement_age(household: &Household, retirement_age: u32) -> PlanResult<()> {
    if retirement_age < household.current_age() {
        return Err(PlanError::invalid("retirement_age", "must be >= current_age"));
    }
    if retirement_age >= household.life_expectancy {
        return Err(PlanError::invalid("retirement_age", "must be < life_expectancy"));
    }
    Ok(())
}
