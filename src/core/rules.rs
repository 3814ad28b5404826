use super::types::{BalanceSource, Members, Person, SavingsMode, SplitPolicy};

/// Jurisdiction rules the planner consumes without interpreting.
pub trait ContributionRules {
    /// Annual cap on locked-pool contributions for one person.
    fn concessional_cap(&self, person: &Person) -> f64;
    /// Tax levied on contributions entering the locked pool.
    fn contribution_tax_rate(&self, person: &Person) -> f64;
    /// Income tax rate on the person's marginal dollar.
    fn marginal_tax_rate(&self, person: &Person) -> f64;
    fn preservation_age(&self, birth_year: i32) -> u32;
}

/// Flat per-person figures with the Australian preservation-age table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticRules {
    pub concessional_cap: f64,
    pub contribution_tax_rate: f64,
    pub marginal_tax_rate: f64,
}

impl Default for StaticRules {
    fn default() -> Self {
        Self {
            concessional_cap: 30_000.0,
            contribution_tax_rate: 0.15,
            marginal_tax_rate: 0.325,
        }
    }
}

impl ContributionRules for StaticRules {
    fn concessional_cap(&self, _person: &Person) -> f64 {
        self.concessional_cap
    }

    fn contribution_tax_rate(&self, _person: &Person) -> f64 {
        self.contribution_tax_rate
    }

    fn marginal_tax_rate(&self, _person: &Person) -> f64 {
        self.marginal_tax_rate
    }

    fn preservation_age(&self, birth_year: i32) -> u32 {
        match birth_year {
            ..=1959 => 55,
            1960 => 56,
            1961 => 57,
            1962 => 58,
            1963 => 59,
            _ => 60,
        }
    }
}

/// Builds a split policy for the household from per-person rules. Caps add up
/// across members; rates are income-weighted (a plain mean when nobody earns).
pub fn split_policy(
    members: &Members,
    rules: &dyn ContributionRules,
    locked_fraction: f64,
    mode: SavingsMode,
) -> SplitPolicy {
    let aggregate_cap = members.iter().map(|p| rules.concessional_cap(p)).sum();
    let total_income = members.income();
    let weight = |p: &Person| {
        if total_income > 1e-12 {
            p.income / total_income
        } else {
            1.0 / members.as_slice().len() as f64
        }
    };
    let contribution_tax_rate = members
        .iter()
        .map(|p| weight(p) * rules.contribution_tax_rate(p))
        .sum();
    let marginal_tax_rate = members
        .iter()
        .map(|p| weight(p) * rules.marginal_tax_rate(p))
        .sum();

    SplitPolicy {
        locked_fraction,
        mode,
        aggregate_cap,
        contribution_tax_rate,
        marginal_tax_rate,
    }
}
