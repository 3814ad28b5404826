use serde::{Deserialize, Serialize};

use super::error::{PlanError, PlanResult};

/// Spend multiplier applied for ages in `[from_age, to_age)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBand {
    pub from_age: u32,
    pub to_age: u32,
    pub multiplier: f64,
}

impl AgeBand {
    pub fn new(from_age: u32, to_age: u32, multiplier: f64) -> Self {
        Self {
            from_age,
            to_age,
            multiplier,
        }
    }
}

/// Age-dependent scaling of the base spend. Shared by the drawdown simulation
/// and the bridge assessment so both see the same spend at every age.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SpendSchedule {
    #[default]
    Flat,
    /// `before` applies below `step_age`, `after` from `step_age` on.
    Stepped {
        step_age: u32,
        before: f64,
        after: f64,
    },
    Banded(Vec<AgeBand>),
}

impl SpendSchedule {
    pub fn multiplier_at(&self, age: u32) -> f64 {
        match self {
            SpendSchedule::Flat => 1.0,
            SpendSchedule::Stepped {
                step_age,
                before,
                after,
            } => {
                if age < *step_age {
                    *before
                } else {
                    *after
                }
            }
            SpendSchedule::Banded(bands) => banded_multiplier(bands, age),
        }
    }

    /// The schedule as explicit bands, for reporting.
    pub fn bands(&self) -> Vec<AgeBand> {
        match self {
            SpendSchedule::Flat => Vec::new(),
            SpendSchedule::Stepped {
                step_age,
                before,
                after,
            } => vec![
                AgeBand::new(0, *step_age, *before),
                AgeBand::new(*step_age, u32::MAX, *after),
            ],
            SpendSchedule::Banded(bands) => bands.clone(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SpendSchedule::Flat => "flat",
            SpendSchedule::Stepped { .. } => "stepped",
            SpendSchedule::Banded(_) => "banded",
        }
    }

    pub fn validate(&self) -> PlanResult<()> {
        match self {
            SpendSchedule::Flat => Ok(()),
            SpendSchedule::Stepped { before, after, .. } => {
                check_multiplier(0, *before)?;
                check_multiplier(1, *after)
            }
            SpendSchedule::Banded(bands) => {
                for (index, band) in bands.iter().enumerate() {
                    if band.from_age >= band.to_age {
                        return Err(PlanError::schedule(index, "from_age must be < to_age"));
                    }
                    check_multiplier(index, band.multiplier)?;
                    if index > 0 && bands[index - 1].to_age > band.from_age {
                        return Err(PlanError::schedule(
                            index,
                            "bands must be ordered and non-overlapping",
                        ));
                    }
                }
                Ok(())
            }
        }
    }
}

fn check_multiplier(index: usize, multiplier: f64) -> PlanResult<()> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(PlanError::schedule(index, "multiplier must be finite and >= 0"));
    }
    Ok(())
}

fn banded_multiplier(bands: &[AgeBand], age: u32) -> f64 {
    let Some(last) = bands.last() else {
        return 1.0;
    };
    bands
        .iter()
        .find(|band| age < band.to_age)
        .map_or(last.multiplier, |band| band.multiplier)
}
