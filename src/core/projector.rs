use super::types::{
    Assumptions, Balances, BalanceSource, ContributionFlow, Household, PathPoint, Phase,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub balances: Balances,
    pub path: Vec<PathPoint>,
    /// Contributions summed over the projected years.
    pub contributions: ContributionFlow,
}

fn annual_savings(household: &Household, age: u32) -> f64 {
    let years_elapsed = age.saturating_sub(household.current_age());
    household.savings_budget * (1.0 + household.savings_growth_rate).powi(years_elapsed as i32)
}

fn apply_contributions(balances: Balances, flow: ContributionFlow) -> Balances {
    Balances {
        accessible: balances.accessible + flow.accessible_net.max(0.0),
        locked: balances.locked + flow.locked_net.max(0.0),
    }
}

/// Accumulates from `from_age` up to `to_age`. Each year the savings are split
/// and credited, locked fees come out, then both pools grow. The path point
/// for a year is labelled with the age reached at its end.
pub fn project(
    start: Balances,
    household: &Household,
    assumptions: &Assumptions,
    from_age: u32,
    to_age: u32,
) -> Projection {
    if to_age <= from_age {
        return Projection {
            balances: start,
            path: Vec::new(),
            contributions: ContributionFlow::default(),
        };
    }

    let growth = assumptions.net_growth_rate();
    let locked_fee = household.members.locked_fee();
    let mut balances = start;
    let mut path = Vec::with_capacity((to_age - from_age) as usize);
    let mut contributions = ContributionFlow::default();

    for age in from_age..to_age {
        let flow = household.contribution_flow(annual_savings(household, age));
        contributions = contributions.accumulate(flow);
        balances = apply_contributions(balances, flow)
            .less_locked_fee(locked_fee)
            .grown(growth);
        path.push(PathPoint::new(age + 1, balances, Phase::Accumulation));
    }

    Projection {
        balances,
        path,
        contributions,
    }
}

/// Balances at `retirement_age` starting from the household's current holdings.
pub fn project_household(
    household: &Household,
    assumptions: &Assumptions,
    retirement_age: u32,
) -> Projection {
    project(
        household.members.balances(),
        household,
        assumptions,
        household.current_age(),
        retirement_age,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Members, Person, SavingsMode, SolverSettings, SpendSchedule, SplitPolicy, WithdrawalOrder,
    };
    use proptest::prelude::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn person(accessible: f64, locked: f64) -> Person {
        Person {
            age: 40,
            income: 100_000.0,
            accessible_balance: accessible,
            locked_balance: locked,
            preservation_age: 60,
            locked_fee: 0.0,
        }
    }

    fn household(savings: f64, split: Option<SplitPolicy>) -> Household {
        Household {
            members: Members::Single(person(10_000.0, 20_000.0)),
            savings_budget: savings,
            savings_growth_rate: 0.0,
            target_spend: 50_000.0,
            life_expectancy: 90,
            split,
        }
    }

    fn assumptions(real_return: f64) -> Assumptions {
        Assumptions {
            real_return,
            fee_drag: 0.0,
            bequest_target: 0.0,
            spend_schedule: SpendSchedule::Flat,
            withdrawal_order: WithdrawalOrder::AccessibleFirst,
            solver: SolverSettings::default(),
        }
    }

    fn policy(fraction: f64, mode: SavingsMode, cap: f64) -> SplitPolicy {
        SplitPolicy {
            locked_fraction: fraction,
            mode,
            aggregate_cap: cap,
            contribution_tax_rate: 0.15,
            marginal_tax_rate: 0.30,
        }
    }

    #[test]
    fn empty_window_is_a_no_op() {
        let h = household(10_000.0, None);
        let start = Balances::new(1.0, 2.0);
        let projection = project(start, &h, &assumptions(0.05), 50, 50);
        assert_eq!(projection.balances, start);
        assert!(projection.path.is_empty());

        let backwards = project(start, &h, &assumptions(0.05), 55, 50);
        assert_eq!(backwards.balances, start);
    }

    #[test]
    fn no_policy_sends_everything_to_accessible() {
        let h = household(10_000.0, None);
        let projection = project(Balances::new(0.0, 0.0), &h, &assumptions(0.0), 40, 43);
        assert_approx(projection.balances.accessible, 30_000.0);
        assert_approx(projection.balances.locked, 0.0);
        assert_eq!(projection.path.len(), 3);
        assert_eq!(projection.path[0].age, 41);
        assert_eq!(projection.path[2].age, 43);
        assert_eq!(projection.path[2].phase, Phase::Accumulation);
    }

    #[test]
    fn contributions_are_credited_before_growth() {
        // Hand calculation: (0 + 1000) * 1.1 = 1100; (1100 + 1000) * 1.1 = 2310.
        let h = household(1_000.0, None);
        let projection = project(Balances::new(0.0, 0.0), &h, &assumptions(0.10), 40, 42);
        assert_approx(projection.balances.accessible, 2_310.0);
        assert_approx(projection.path[0].accessible, 1_100.0);
    }

    #[test]
    fn locked_share_is_taxed_and_capped_with_overflow() {
        // 40k requested locked, cap 25k: 25k gross locked -> 21,250 net,
        // 10k accessible share + 15k overflow = 25k accessible (already net).
        let h = household(50_000.0, Some(policy(0.8, SavingsMode::AlreadyNet, 25_000.0)));
        let projection = project(Balances::default(), &h, &assumptions(0.0), 40, 41);
        assert_approx(projection.balances.locked, 21_250.0);
        assert_approx(projection.balances.accessible, 25_000.0);
        assert!(projection.contributions.cap_binding);
        assert_approx(projection.contributions.gross_total(), 50_000.0);
    }

    #[test]
    fn gross_mode_taxes_the_accessible_share() {
        let h = household(10_000.0, Some(policy(0.5, SavingsMode::GrossPreTax, 30_000.0)));
        let projection = project(Balances::default(), &h, &assumptions(0.0), 40, 41);
        assert_approx(projection.balances.locked, 4_250.0);
        assert_approx(projection.balances.accessible, 3_500.0);
        assert_approx(projection.contributions.income_tax, 1_500.0);
        assert!(!projection.contributions.cap_binding);
    }

    #[test]
    fn locked_fees_come_out_before_growth_and_clamp_at_zero() {
        let mut h = household(0.0, None);
        h.members = Members::Single(Person {
            locked_fee: 500.0,
            ..person(0.0, 800.0)
        });
        let projection = project(h.members.balances(), &h, &assumptions(0.0), 40, 43);
        assert_approx(projection.path[0].locked, 300.0);
        assert_approx(projection.balances.locked, 0.0);
    }

    #[test]
    fn savings_grow_with_pay_rises() {
        let mut h = household(1_000.0, None);
        h.savings_growth_rate = 0.5;
        let projection = project(Balances::default(), &h, &assumptions(0.0), 40, 43);
        // 1000 + 1500 + 2250
        assert_approx(projection.balances.accessible, 4_750.0);
    }

    #[test]
    fn project_household_starts_from_member_balances() {
        let h = household(0.0, None);
        let projection = project_household(&h, &assumptions(0.0), 45);
        assert_approx(projection.balances.accessible, 10_000.0);
        assert_approx(projection.balances.locked, 20_000.0);
        assert_eq!(projection.path.len(), 5);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]
        #[test]
        fn prop_more_years_never_reduce_wealth(
            years in 0u32..30,
            savings in 0u32..80_000,
            fraction_pct in 0u32..=100,
            ret_bp in 0u32..800,
        ) {
            let h = household(
                savings as f64,
                Some(policy(fraction_pct as f64 / 100.0, SavingsMode::GrossPreTax, 30_000.0)),
            );
            let a = assumptions(ret_bp as f64 / 10_000.0);
            let shorter = project_household(&h, &a, 40 + years);
            let longer = project_household(&h, &a, 41 + years);
            prop_assert!(longer.balances.total() + 1e-9 >= shorter.balances.total());
            prop_assert!(longer.balances.accessible >= 0.0 && longer.balances.locked >= 0.0);
        }
    }
}
