use serde::Serialize;

use super::schedule::SpendSchedule;
use super::solver::SolverSettings;

/// How a post-preservation withdrawal is split between the two pools.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithdrawalOrder {
    /// Drain the accessible pool first, then the locked pool.
    #[default]
    AccessibleFirst,
    /// Withdraw from both pools in proportion to their balances.
    ProRata,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SavingsMode {
    /// The savings budget is already after income tax.
    #[default]
    AlreadyNet,
    /// The savings budget is pre-tax capacity; the accessible share pays marginal tax.
    GrossPreTax,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Accumulation,
    Bridge,
    Retirement,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub accessible: f64,
    pub locked: f64,
}

impl Balances {
    pub fn new(accessible: f64, locked: f64) -> Self {
        Self { accessible, locked }
    }

    pub fn total(self) -> f64 {
        self.accessible + self.locked
    }

    pub(crate) fn grown(self, rate: f64) -> Self {
        Self {
            accessible: (self.accessible * (1.0 + rate)).max(0.0),
            locked: (self.locked * (1.0 + rate)).max(0.0),
        }
    }

    pub(crate) fn less_locked_fee(self, fee: f64) -> Self {
        Self {
            accessible: self.accessible,
            locked: (self.locked - fee.max(0.0)).max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub age: u32,
    pub income: f64,
    pub accessible_balance: f64,
    pub locked_balance: f64,
    pub preservation_age: u32,
    /// Annual fee or insurance premium charged against the locked pool.
    pub locked_fee: f64,
}

/// Anything that can report pool balances, income and locked-pool costs.
pub trait BalanceSource {
    fn accessible(&self) -> f64;
    fn locked(&self) -> f64;
    fn income(&self) -> f64;
    fn locked_fee(&self) -> f64;

    fn balances(&self) -> Balances {
        Balances::new(self.accessible(), self.locked())
    }
}

impl BalanceSource for Person {
    fn accessible(&self) -> f64 {
        self.accessible_balance
    }

    fn locked(&self) -> f64 {
        self.locked_balance
    }

    fn income(&self) -> f64 {
        self.income
    }

    fn locked_fee(&self) -> f64 {
        self.locked_fee
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Members {
    Single(Person),
    /// The first person is the primary member whose age drives the timeline.
    Couple([Person; 2]),
}

impl Members {
    pub fn primary(&self) -> &Person {
        match self {
            Members::Single(person) => person,
            Members::Couple([primary, _]) => primary,
        }
    }

    pub fn as_slice(&self) -> &[Person] {
        match self {
            Members::Single(person) => std::slice::from_ref(person),
            Members::Couple(pair) => pair,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Person> {
        self.as_slice().iter()
    }

}

impl BalanceSource for Members {
    fn accessible(&self) -> f64 {
        self.iter().map(BalanceSource::accessible).sum()
    }

    fn locked(&self) -> f64 {
        self.iter().map(BalanceSource::locked).sum()
    }

    fn income(&self) -> f64 {
        self.iter().map(BalanceSource::income).sum()
    }

    fn locked_fee(&self) -> f64 {
        self.iter().map(BalanceSource::locked_fee).sum()
    }
}

/// Contribution split between the pools for the accumulation phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPolicy {
    /// Share of the savings budget directed to the locked pool, in [0, 1].
    pub locked_fraction: f64,
    pub mode: SavingsMode,
    /// Sum of the members' annual caps on locked-pool contributions.
    pub aggregate_cap: f64,
    pub contribution_tax_rate: f64,
    pub marginal_tax_rate: f64,
}

impl SplitPolicy {
    pub fn with_fraction(self, locked_fraction: f64) -> Self {
        Self {
            locked_fraction,
            ..self
        }
    }

    /// Splits one year's savings. Locked contributions above the cap overflow
    /// to the accessible pool, so gross amounts always sum to `savings`.
    pub fn allocate(&self, savings: f64) -> ContributionFlow {
        let savings = savings.max(0.0);
        let requested_locked = savings * self.locked_fraction.clamp(0.0, 1.0);
        let cap = self.aggregate_cap.max(0.0);
        let locked_gross = requested_locked.min(cap);
        let accessible_gross = savings - locked_gross;

        let contribution_tax = locked_gross * self.contribution_tax_rate;
        let income_tax = match self.mode {
            SavingsMode::AlreadyNet => 0.0,
            SavingsMode::GrossPreTax => accessible_gross * self.marginal_tax_rate,
        };

        ContributionFlow {
            locked_gross,
            accessible_gross,
            locked_net: locked_gross - contribution_tax,
            accessible_net: accessible_gross - income_tax,
            contribution_tax,
            income_tax,
            cap_binding: requested_locked > 0.0 && requested_locked + 1e-9 >= cap,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionFlow {
    pub locked_gross: f64,
    pub accessible_gross: f64,
    pub locked_net: f64,
    pub accessible_net: f64,
    pub contribution_tax: f64,
    pub income_tax: f64,
    pub cap_binding: bool,
}

impl ContributionFlow {
    pub fn accessible_only(savings: f64) -> Self {
        let savings = savings.max(0.0);
        Self {
            accessible_gross: savings,
            accessible_net: savings,
            ..Self::default()
        }
    }

    pub fn gross_total(&self) -> f64 {
        self.locked_gross + self.accessible_gross
    }

    pub fn net_total(&self) -> f64 {
        self.locked_net + self.accessible_net
    }

    pub(crate) fn accumulate(self, other: ContributionFlow) -> Self {
        Self {
            locked_gross: self.locked_gross + other.locked_gross,
            accessible_gross: self.accessible_gross + other.accessible_gross,
            locked_net: self.locked_net + other.locked_net,
            accessible_net: self.accessible_net + other.accessible_net,
            contribution_tax: self.contribution_tax + other.contribution_tax,
            income_tax: self.income_tax + other.income_tax,
            cap_binding: self.cap_binding || other.cap_binding,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Household {
    pub members: Members,
    /// Combined annual savings budget while working.
    pub savings_budget: f64,
    /// Real annual growth of the savings budget (pay rises).
    pub savings_growth_rate: f64,
    /// Base annual spend the household wants to fund in retirement.
    pub target_spend: f64,
    /// Primary member's age at which wealth should reach the bequest target.
    pub life_expectancy: u32,
    pub split: Option<SplitPolicy>,
}

impl Household {
    pub fn current_age(&self) -> u32 {
        self.members.primary().age
    }

    /// Earliest member preservation age, expressed on the primary member's timeline.
    pub fn preservation_age(&self) -> u32 {
        let primary_age = i64::from(self.current_age());
        self.members
            .iter()
            .map(|p| i64::from(p.preservation_age) - i64::from(p.age) + primary_age)
            .min()
            .unwrap_or(primary_age)
            .max(0) as u32
    }

    pub fn with_split(&self, split: SplitPolicy) -> Self {
        Self {
            split: Some(split),
            ..self.clone()
        }
    }

    pub(crate) fn contribution_flow(&self, savings: f64) -> ContributionFlow {
        match &self.split {
            Some(policy) => policy.allocate(savings),
            None => ContributionFlow::accessible_only(savings),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assumptions {
    /// Real (inflation-adjusted) annual return.
    pub real_return: f64,
    /// Annual fee drag subtracted from the real return.
    pub fee_drag: f64,
    pub bequest_target: f64,
    pub spend_schedule: SpendSchedule,
    pub withdrawal_order: WithdrawalOrder,
    pub solver: SolverSettings,
}

impl Assumptions {
    pub fn net_growth_rate(&self) -> f64 {
        self.real_return - self.fee_drag
    }
}

/// Ages and costs that frame one drawdown run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetirementFrame {
    pub retirement_age: u32,
    pub preservation_age: u32,
    pub life_expectancy: u32,
    pub locked_fee: f64,
}

impl RetirementFrame {
    pub fn for_household(household: &Household, retirement_age: u32) -> Self {
        Self {
            retirement_age,
            preservation_age: household.preservation_age(),
            life_expectancy: household.life_expectancy,
            locked_fee: household.members.locked_fee(),
        }
    }

    pub fn drawdown_years(&self) -> u32 {
        self.life_expectancy.saturating_sub(self.retirement_age)
    }

    pub fn bridge_years(&self) -> u32 {
        self.preservation_age.saturating_sub(self.retirement_age)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPoint {
    pub age: u32,
    pub accessible: f64,
    pub locked: f64,
    pub total: f64,
    pub phase: Phase,
}

impl PathPoint {
    pub(crate) fn new(age: u32, balances: Balances, phase: Phase) -> Self {
        Self {
            age,
            accessible: balances.accessible,
            locked: balances.locked,
            total: balances.total(),
            phase,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStatus {
    Covered,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeAssessment {
    pub status: BridgeStatus,
    pub bridge_years: u32,
    pub present_value_needed: f64,
    pub accessible_available: f64,
    pub shortfall: f64,
    /// Bridge years the accessible pool funds when drawn down with growth.
    pub years_funded: u32,
}

impl BridgeAssessment {
    pub fn is_covered(&self) -> bool {
        self.status == BridgeStatus::Covered
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverResult {
    pub retirement_age: u32,
    pub viable: bool,
    pub base_spend: f64,
    pub spend_status: super::solver::SpendStatus,
    pub terminal_wealth: f64,
    pub bridge: BridgeAssessment,
    pub path: Vec<PathPoint>,
    /// Years of the drawdown whose spend could not be met in full.
    pub shortfalls: Vec<super::drawdown::Shortfall>,
}
