use serde::Serialize;

use super::types::{Assumptions, Balances, PathPoint, Phase, RetirementFrame, WithdrawalOrder};

const UNFUNDED_EPS: f64 = 1e-9;

/// A year whose scheduled spend could not be met in full.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortfall {
    pub age: u32,
    pub phase: Phase,
    pub unfunded: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drawdown {
    pub terminal_wealth: f64,
    pub balances: Balances,
    pub path: Vec<PathPoint>,
    pub shortfalls: Vec<Shortfall>,
}

impl Drawdown {
    pub fn is_fully_funded(&self) -> bool {
        self.shortfalls.is_empty()
    }

    pub fn bridge_shortfall(&self) -> bool {
        self.shortfalls.iter().any(|s| s.phase == Phase::Bridge)
    }
}

#[derive(Copy, Clone)]
enum Pool {
    Accessible,
    Locked,
}

fn withdraw_from_single_pool(pool: Pool, target: f64, balances: &mut Balances) -> f64 {
    let balance = match pool {
        Pool::Accessible => &mut balances.accessible,
        Pool::Locked => &mut balances.locked,
    };
    let x = balance.max(0.0).min(target.max(0.0));
    *balance = (*balance - x).max(0.0);
    x
}

fn withdraw_pro_rata(target: f64, balances: &mut Balances) -> f64 {
    let total = balances.total();
    if total <= 1e-12 {
        return 0.0;
    }
    let from_accessible = (target * balances.accessible / total).min(balances.accessible);
    let from_locked = (target * balances.locked / total).min(balances.locked);
    let mut realized = withdraw_from_single_pool(Pool::Accessible, from_accessible, balances)
        + withdraw_from_single_pool(Pool::Locked, from_locked, balances);

    // Rounding can leave a sliver unfunded; take it from whichever pool still has funds.
    let remaining = target - realized;
    if remaining > UNFUNDED_EPS {
        for pool in [Pool::Accessible, Pool::Locked] {
            realized += withdraw_from_single_pool(pool, target - realized, balances);
        }
    }
    realized
}

/// Withdraws up to `target` and returns the amount realised. Before
/// preservation only the accessible pool can be touched.
fn withdraw_from_pools(
    target: f64,
    locked_access: bool,
    order: WithdrawalOrder,
    balances: &mut Balances,
) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    if !locked_access {
        return withdraw_from_single_pool(Pool::Accessible, target, balances);
    }

    match order {
        WithdrawalOrder::ProRata => withdraw_pro_rata(target, balances),
        WithdrawalOrder::AccessibleFirst => {
            let mut realized = 0.0;
            for pool in [Pool::Accessible, Pool::Locked] {
                if target - realized <= 0.0 {
                    break;
                }
                realized += withdraw_from_single_pool(pool, target - realized, balances);
            }
            realized
        }
    }
}

/// Terminal wealth of a run and whether every bridge year was met in full.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Outcome {
    pub terminal_wealth: f64,
    pub bridge_funded: bool,
}

fn run_drawdown(
    start: Balances,
    frame: &RetirementFrame,
    base_spend: f64,
    assumptions: &Assumptions,
    mut trace: Option<&mut Vec<PathPoint>>,
    mut shortfalls: Option<&mut Vec<Shortfall>>,
) -> (Balances, bool) {
    let growth = assumptions.net_growth_rate();
    let mut balances = Balances::new(start.accessible.max(0.0), start.locked.max(0.0));
    let mut bridge_funded = true;

    for age in frame.retirement_age + 1..=frame.life_expectancy {
        let locked_access = age > frame.preservation_age;
        let phase = if locked_access {
            Phase::Retirement
        } else {
            Phase::Bridge
        };

        balances = balances.less_locked_fee(frame.locked_fee).grown(growth);

        let spend = base_spend * assumptions.spend_schedule.multiplier_at(age);
        let realized = withdraw_from_pools(
            spend,
            locked_access,
            assumptions.withdrawal_order,
            &mut balances,
        );

        let unfunded = spend - realized;
        if unfunded > UNFUNDED_EPS {
            if !locked_access {
                bridge_funded = false;
            }
            if let Some(rows) = shortfalls.as_deref_mut() {
                rows.push(Shortfall {
                    age,
                    phase,
                    unfunded,
                });
            }
        }

        if let Some(rows) = trace.as_deref_mut() {
            rows.push(PathPoint::new(age, balances, phase));
        }
    }

    (balances, bridge_funded)
}

/// Year-by-year drawdown over ages `retirement_age + 1..=life_expectancy`.
/// Each year the locked fee comes out and both pools grow, then that age's
/// spend is withdrawn. Up to and including the preservation age only the
/// accessible pool pays.
pub fn simulate(
    start: Balances,
    frame: &RetirementFrame,
    base_spend: f64,
    assumptions: &Assumptions,
) -> Drawdown {
    let mut path = Vec::with_capacity(frame.drawdown_years() as usize);
    let mut shortfalls = Vec::new();
    let (balances, _) = run_drawdown(
        start,
        frame,
        base_spend,
        assumptions,
        Some(&mut path),
        Some(&mut shortfalls),
    );
    Drawdown {
        terminal_wealth: balances.total(),
        balances,
        path,
        shortfalls,
    }
}

/// The solver's inner loop: no path, no shortfall rows.
pub(crate) fn outcome(
    start: Balances,
    frame: &RetirementFrame,
    base_spend: f64,
    assumptions: &Assumptions,
) -> Outcome {
    let (balances, bridge_funded) = run_drawdown(start, frame, base_spend, assumptions, None, None);
    Outcome {
        terminal_wealth: balances.total(),
        bridge_funded,
    }
}
