use dwz::core::{
    AgeBand, AgeBounds, Assumptions, Balances, BalanceSource, BridgeStatus, Household, Members,
    OptimizerOptions, Person, Phase, PlanError, PlanOptions, PlanTarget, RetirementFrame,
    SavingsGoalConfig, SavingsMode, SolverSettings, SpendSchedule, SpendStatus, StaticRules,
    WithdrawalOrder, assess_bridge, build_plan, evaluate_age, find_earliest_viable_age, optimize,
    project_household, simulate_drawdown, solve_required_savings, solve_spend, split_policy,
    sweep_ages,
};

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual}, tolerance {tol}"
    );
}

fn person(age: u32, accessible: f64, locked: f64) -> Person {
    Person {
        age,
        income: 90_000.0,
        accessible_balance: accessible,
        locked_balance: locked,
        preservation_age: 60,
        locked_fee: 0.0,
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

#[test]
fn fifty_k_savings_retiring_after_preservation_ends_near_zero() {
    let household = Household {
        members: Members::Single(person(35, 20_000.0, 80_000.0)),
        savings_budget: 50_000.0,
        savings_growth_rate: 0.0,
        target_spend: 40_000.0,
        life_expectancy: 92,
        split: None,
    };
    let a = Assumptions {
        fee_drag: 0.005,
        ..assumptions(0.05)
    };

    let evaluation = evaluate_age(&household, &a, 62).expect("must evaluate");
    assert_eq!(evaluation.spend.status, SpendStatus::Converged);
    assert_eq!(evaluation.bridge.bridge_years, 0);

    let frame = RetirementFrame::for_household(&household, 62);
    let run = simulate_drawdown(
        evaluation.balances_at_retirement,
        &frame,
        evaluation.spend.base_spend,
        &a,
    );
    assert_close(run.terminal_wealth, 0.0, 1.0);
    assert_eq!(run.path.len(), 30);
}

#[test]
fn retiring_five_years_early_with_thin_pool_is_short_and_skipped() {
    let household = Household {
        members: Members::Single(person(50, 50_000.0, 2_000_000.0)),
        savings_budget: 0.0,
        savings_growth_rate: 0.0,
        target_spend: 40_000.0,
        life_expectancy: 90,
        split: None,
    };
    let a = assumptions(0.0);

    let early = evaluate_age(&household, &a, 55).expect("must evaluate");
    assert_eq!(early.bridge.status, BridgeStatus::Short);
    assert!(!early.viable);

    let report = find_earliest_viable_age(&household, &a, AgeBounds::new(50, 70))
        .expect("must search");
    let earliest = report.earliest_age.expect("some age must be viable");
    assert!(earliest > 55);
    assert_eq!(earliest, 59);
}

#[test]
fn zero_return_spend_is_wealth_over_remaining_years() {
    let start = Balances::new(250_000.0, 750_000.0);
    let frame = RetirementFrame {
        retirement_age: 60,
        preservation_age: 60,
        life_expectancy: 85,
        locked_fee: 0.0,
    };
    let solution = solve_spend(start, &frame, &assumptions(0.0)).expect("must solve");
    assert_close(solution.base_spend, 1_000_000.0 / 25.0, 1e-6);
}

#[test]
fn budget_below_aggregate_cap_recommends_full_locked_fraction() {
    let members = Members::Couple([
        person(40, 50_000.0, 100_000.0),
        person(40, 50_000.0, 100_000.0),
    ]);
    let contribution_rules = StaticRules {
        concessional_cap: 30_000.0,
        contribution_tax_rate: 0.15,
        marginal_tax_rate: 0.30,
    };
    let policy = split_policy(&members, &contribution_rules, 0.0, SavingsMode::GrossPreTax);
    let household = Household {
        members,
        savings_budget: 50_000.0,
        savings_growth_rate: 0.0,
        target_spend: 60_000.0,
        life_expectancy: 90,
        split: None,
    };
    let options = OptimizerOptions {
        bounds: Some(AgeBounds::new(60, 70)),
        ..OptimizerOptions::default()
    };

    let recommendation =
        optimize(&household, &assumptions(0.03), policy, options).expect("must optimize");
    assert_close(recommendation.recommended_fraction, 1.0, 1e-9);
    assert!(!recommendation.constraint_report.cap_binding);
    assert_eq!(recommendation.earliest_age, Some(60));
    let report = recommendation.constraint_report;
    assert_close(report.locked_gross + report.accessible_gross, 50_000.0, 1e-6);
}

#[test]
fn viability_never_regresses_across_a_sweep() {
    let household = Household {
        members: Members::Couple([
            person(45, 120_000.0, 300_000.0),
            person(42, 60_000.0, 150_000.0),
        ]),
        savings_budget: 45_000.0,
        savings_growth_rate: 0.01,
        target_spend: 70_000.0,
        life_expectancy: 92,
        split: None,
    };
    let a = assumptions(0.035);
    let sweep = sweep_ages(&household, &a, AgeBounds::new(45, 75)).expect("must sweep");
    let first = sweep.iter().position(|e| e.viable).expect("some age must be viable");
    assert!(sweep[first..].iter().all(|e| e.viable));

    let report = find_earliest_viable_age(&household, &a, AgeBounds::new(45, 75))
        .expect("must search");
    assert_eq!(report.earliest_age, Some(sweep[first].retirement_age));
}

#[test]
fn bridge_present_value_matches_manual_discounting() {
    let a = Assumptions {
        spend_schedule: SpendSchedule::Banded(vec![
            AgeBand::new(50, 55, 1.2),
            AgeBand::new(55, 90, 1.0),
        ]),
        ..assumptions(0.04)
    };
    let assessment = assess_bridge(Balances::new(500_000.0, 0.0), 52, 58, 50_000.0, &a);
    // Bridge years are ages 53..=58, discounted one to six years.
    let mut expected = 0.0;
    for k in 1..=6 {
        let age = 52 + k;
        let multiplier = if age < 55 { 1.2 } else { 1.0 };
        expected += 50_000.0 * multiplier / 1.04_f64.powi(k as i32);
    }
    assert_close(assessment.present_value_needed, expected, 1e-6);
    assert_eq!(assessment.bridge_years, 6);
    assert!(assessment.is_covered());
}

#[test]
fn pro_rata_and_accessible_first_agree_on_total_when_funded() {
    let start = Balances::new(300_000.0, 700_000.0);
    let frame = RetirementFrame {
        retirement_age: 62,
        preservation_age: 60,
        life_expectancy: 90,
        locked_fee: 0.0,
    };
    let accessible_first = simulate_drawdown(start, &frame, 30_000.0, &assumptions(0.03));
    let pro_rata = simulate_drawdown(
        start,
        &frame,
        30_000.0,
        &Assumptions {
            withdrawal_order: WithdrawalOrder::ProRata,
            ..assumptions(0.03)
        },
    );
    assert_close(accessible_first.terminal_wealth, pro_rata.terminal_wealth, 1e-4);
    assert!(accessible_first.balances.accessible < pro_rata.balances.accessible);
}

#[test]
fn locked_fees_lower_sustainable_spend() {
    let mut with_fee = Household {
        members: Members::Single(person(60, 200_000.0, 800_000.0)),
        savings_budget: 0.0,
        savings_growth_rate: 0.0,
        target_spend: 10_000.0,
        life_expectancy: 90,
        split: None,
    };
    let a = assumptions(0.03);
    let baseline = evaluate_age(&with_fee, &a, 60).expect("must evaluate");
    with_fee.members = Members::Single(Person {
        locked_fee: 1_500.0,
        ..person(60, 200_000.0, 800_000.0)
    });
    let charged = evaluate_age(&with_fee, &a, 60).expect("must evaluate");
    assert!(charged.spend.base_spend < baseline.spend.base_spend);
    assert_close(with_fee.members.locked_fee(), 1_500.0, 1e-12);
}

#[test]
fn projection_feeds_plan_path() {
    let household = Household {
        members: Members::Single(person(40, 100_000.0, 200_000.0)),
        savings_budget: 30_000.0,
        savings_growth_rate: 0.0,
        target_spend: 50_000.0,
        life_expectancy: 90,
        split: None,
    };
    let a = assumptions(0.04);
    let options = PlanOptions {
        target: PlanTarget::FixedAge(55),
        ..PlanOptions::default()
    };
    let report = build_plan(&household, &a, options).expect("must plan");
    let result = report.result.expect("result expected");
    let projection = project_household(&household, &a, 55);
    assert_eq!(result.path[14].age, 55);
    assert_close(result.path[14].total, projection.balances.total(), 1e-6);
    assert_eq!(result.path[15].age, 56);
    assert_eq!(result.path.len(), 50);
}

#[test]
fn required_savings_makes_target_age_viable() {
    let household = Household {
        members: Members::Single(person(40, 50_000.0, 100_000.0)),
        savings_budget: 0.0,
        savings_growth_rate: 0.0,
        target_spend: 50_000.0,
        life_expectancy: 90,
        split: None,
    };
    let a = assumptions(0.03);
    let result = solve_required_savings(&household, &a, SavingsGoalConfig::for_age(60))
        .expect("must solve");
    assert!(result.feasible);
    let budget = result.solved_budget.expect("budget expected");
    assert!(budget > 0.0);

    let funded = Household {
        savings_budget: budget,
        ..household.clone()
    };
    assert!(evaluate_age(&funded, &a, 60).expect("must evaluate").viable);
    let underfunded = Household {
        savings_budget: (budget - 50.0).max(0.0),
        ..household
    };
    assert!(!evaluate_age(&underfunded, &a, 60).expect("must evaluate").viable);
}

#[test]
fn fixed_age_plan_never_spends_past_the_bridge_pool() {
    let household = Household {
        members: Members::Single(person(50, 50_000.0, 2_000_000.0)),
        savings_budget: 0.0,
        savings_growth_rate: 0.0,
        target_spend: 40_000.0,
        life_expectancy: 90,
        split: None,
    };
    let options = PlanOptions {
        target: PlanTarget::FixedAge(59),
        ..PlanOptions::default()
    };
    let report = build_plan(&household, &assumptions(0.0), options).expect("must plan");
    let result = report.result.expect("result expected");
    assert!(result.viable);
    assert_eq!(result.spend_status, SpendStatus::Converged);
    assert!(result.base_spend <= 50_000.0 + 1e-6);
    assert!(result.shortfalls.is_empty(), "shortfalls: {:?}", result.shortfalls);
    let bridge_year = result
        .path
        .iter()
        .find(|p| p.phase == Phase::Bridge)
        .expect("one bridge year");
    assert_eq!(bridge_year.age, 60);
    assert!(bridge_year.accessible >= 0.0);
}

#[test]
fn life_expectancy_inside_the_bridge_is_rejected() {
    let household = Household {
        members: Members::Single(Person {
            preservation_age: 67,
            ..person(50, 500_000.0, 500_000.0)
        }),
        savings_budget: 0.0,
        savings_growth_rate: 0.0,
        target_spend: 40_000.0,
        life_expectancy: 65,
        split: None,
    };
    let err = build_plan(&household, &assumptions(0.0), PlanOptions::default())
        .expect_err("must reject");
    assert_eq!(
        err,
        PlanError::InvalidInput {
            field: "life_expectancy".to_string(),
            reason: "must be > preservation_age".to_string(),
        }
    );
}
