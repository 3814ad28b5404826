use super::schedule::SpendSchedule;
use super::types::{Assumptions, Balances, BridgeAssessment, BridgeStatus};

/// Slack allowed when comparing the accessible pool against the bridge cost.
pub const BRIDGE_TOLERANCE: f64 = 1.0;

/// Cost at retirement of bridge years k = 1..=N, each drawn at the end of the
/// year at age `retirement_age + k` and discounted k years.
pub fn bridge_present_value(
    retirement_age: u32,
    bridge_years: u32,
    base_spend: f64,
    schedule: &SpendSchedule,
    growth: f64,
) -> f64 {
    (1..=bridge_years)
        .map(|k| {
            let spend = base_spend * schedule.multiplier_at(retirement_age + k);
            spend / (1.0 + growth).powi(k as i32)
        })
        .sum()
}

fn funded_bridge_years(
    accessible: f64,
    retirement_age: u32,
    bridge_years: u32,
    base_spend: f64,
    schedule: &SpendSchedule,
    growth: f64,
) -> u32 {
    let mut balance = accessible;
    let mut funded = 0;
    for k in 1..=bridge_years {
        balance = (balance * (1.0 + growth)).max(0.0);
        let spend = base_spend * schedule.multiplier_at(retirement_age + k);
        if spend > balance + 1e-9 {
            break;
        }
        balance -= spend;
        funded += 1;
    }
    funded
}

/// Whether the accessible pool alone can carry spending until the locked pool opens.
pub fn assess(
    start: Balances,
    retirement_age: u32,
    preservation_age: u32,
    base_spend: f64,
    assumptions: &Assumptions,
) -> BridgeAssessment {
    let bridge_years = preservation_age.saturating_sub(retirement_age);
    let growth = assumptions.net_growth_rate();
    let schedule = &assumptions.spend_schedule;
    let accessible = start.accessible.max(0.0);

    let present_value_needed =
        bridge_present_value(retirement_age, bridge_years, base_spend, schedule, growth);
    let status = if accessible + BRIDGE_TOLERANCE >= present_value_needed {
        BridgeStatus::Covered
    } else {
        BridgeStatus::Short
    };

    BridgeAssessment {
        status,
        bridge_years,
        present_value_needed,
        accessible_available: accessible,
        shortfall: (present_value_needed - accessible).max(0.0),
        years_funded: funded_bridge_years(
            accessible,
            retirement_age,
            bridge_years,
            base_spend,
            schedule,
            growth,
        ),
    }
}
