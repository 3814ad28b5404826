use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AgeBand, AgeBounds, Assumptions, ContributionRules, Household, Members, OptimizerOptions,
    Person, PlanOptions, PlanReport, PlanTarget, SavingsGoalConfig, SavingsGoalResult,
    SavingsMode, SolverSettings, SplitBias, SplitPolicy, SplitRecommendation, SpendSchedule,
    StaticRules, WithdrawalOrder, build_plan, optimize, solve_required_savings, split_policy,
    validate_assumptions, validate_bounds, validate_household,
};
use crate::logger;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum CliWithdrawalOrder {
    AccessibleFirst,
    ProRata,
}

impl From<CliWithdrawalOrder> for WithdrawalOrder {
    fn from(value: CliWithdrawalOrder) -> Self {
        match value {
            CliWithdrawalOrder::AccessibleFirst => WithdrawalOrder::AccessibleFirst,
            CliWithdrawalOrder::ProRata => WithdrawalOrder::ProRata,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum CliSavingsMode {
    AlreadyNet,
    GrossPreTax,
}

impl From<CliSavingsMode> for SavingsMode {
    fn from(value: CliSavingsMode) -> Self {
        match value {
            CliSavingsMode::AlreadyNet => SavingsMode::AlreadyNet,
            CliSavingsMode::GrossPreTax => SavingsMode::GrossPreTax,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum CliSplitBias {
    MaxCapUsage,
    MinLockedFraction,
}

impl From<CliSplitBias> for SplitBias {
    fn from(value: CliSplitBias) -> Self {
        match value {
            CliSplitBias::MaxCapUsage => SplitBias::MaxCapUsage,
            CliSplitBias::MinLockedFraction => SplitBias::MinLockedFraction,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum AnalysisMode {
    Plan,
    Optimize,
    RequiredSavings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    current_age: Option<u32>,
    life_expectancy: Option<u32>,
    income: Option<f64>,
    accessible_balance: Option<f64>,
    locked_balance: Option<f64>,
    preservation_age: Option<u32>,
    birth_year: Option<i32>,
    locked_fee: Option<f64>,

    partner_age: Option<u32>,
    partner_income: Option<f64>,
    partner_accessible_balance: Option<f64>,
    partner_locked_balance: Option<f64>,
    partner_preservation_age: Option<u32>,
    partner_birth_year: Option<i32>,
    partner_locked_fee: Option<f64>,

    savings_budget: Option<f64>,
    savings_growth: Option<f64>,
    target_spend: Option<f64>,

    real_return: Option<f64>,
    fee_drag: Option<f64>,
    bequest: Option<f64>,
    spend_step_age: Option<u32>,
    spend_after_step: Option<f64>,
    age_bands: Option<Vec<AgeBand>>,
    withdrawal_order: Option<CliWithdrawalOrder>,

    locked_fraction: Option<f64>,
    savings_mode: Option<CliSavingsMode>,
    concessional_cap: Option<f64>,
    contribution_tax_rate: Option<f64>,
    marginal_tax_rate: Option<f64>,

    spend_ceiling: Option<f64>,
    bisection_iterations: Option<u32>,

    min_age: Option<u32>,
    max_age: Option<u32>,
    target_age: Option<u32>,
    sweep: Option<bool>,

    grid_points: Option<u32>,
    max_fraction: Option<f64>,
    refine_passes: Option<u32>,
    refine_points: Option<u32>,
    age_tolerance: Option<u32>,
    split_bias: Option<CliSplitBias>,
}

fn parse_age_band(raw: &str) -> Result<AgeBand, String> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [from, to, multiplier] = parts.as_slice() else {
        return Err(format!("age band '{raw}' must look like FROM:TO:MULTIPLIER"));
    };
    let from_age = from
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("age band '{raw}': bad from age: {e}"))?;
    let to_age = to
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("age band '{raw}': bad to age: {e}"))?;
    let multiplier = multiplier
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("age band '{raw}': bad multiplier: {e}"))?;
    Ok(AgeBand::new(from_age, to_age, multiplier))
}

#[derive(Parser, Debug)]
#[command(
    name = "dwz",
    about = "Die-With-Zero retirement planner (accessible + locked pools, bridge check, split optimizer)"
)]
struct Cli {
    #[arg(long)]
    current_age: u32,
    #[arg(long, default_value_t = 90, help = "Age at which wealth should reach the bequest")]
    life_expectancy: u32,
    #[arg(long, default_value_t = 0.0)]
    income: f64,
    #[arg(long)]
    accessible_balance: f64,
    #[arg(long)]
    locked_balance: f64,
    #[arg(long, default_value_t = 60)]
    preservation_age: u32,
    #[arg(long, help = "Derive the preservation age from the birth year")]
    birth_year: Option<i32>,
    #[arg(long, default_value_t = 0.0, help = "Annual fees and premiums on the locked pool")]
    locked_fee: f64,

    #[arg(long, help = "Partner's current age; adds a second household member")]
    partner_age: Option<u32>,
    #[arg(long, default_value_t = 0.0)]
    partner_income: f64,
    #[arg(long, default_value_t = 0.0)]
    partner_accessible_balance: f64,
    #[arg(long, default_value_t = 0.0)]
    partner_locked_balance: f64,
    #[arg(long, help = "Defaults to --preservation-age")]
    partner_preservation_age: Option<u32>,
    #[arg(long)]
    partner_birth_year: Option<i32>,
    #[arg(long, default_value_t = 0.0)]
    partner_locked_fee: f64,

    #[arg(long, default_value_t = 0.0, help = "Combined annual savings while working")]
    savings_budget: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Annual real growth of the savings budget in percent (e.g. pay rises)"
    )]
    savings_growth_rate: f64,
    #[arg(long, help = "Base annual spend in retirement")]
    target_spend: f64,

    #[arg(long, default_value_t = 4.0, help = "Real annual return in percent")]
    real_return: f64,
    #[arg(long, default_value_t = 0.5, help = "Annual fee drag in percent")]
    fee_drag: f64,
    #[arg(long, default_value_t = 0.0, help = "Wealth to leave at life expectancy")]
    bequest: f64,
    #[arg(long, help = "Age at which spending steps down")]
    spend_step_age: Option<u32>,
    #[arg(
        long,
        default_value_t = 80.0,
        help = "Spend after --spend-step-age as a percent of the base spend"
    )]
    spend_after_step: f64,
    #[arg(
        long = "age-band",
        value_parser = parse_age_band,
        help = "Spend band FROM:TO:MULTIPLIER, repeatable; overrides the step"
    )]
    age_bands: Vec<AgeBand>,
    #[arg(long, value_enum, default_value_t = CliWithdrawalOrder::AccessibleFirst)]
    withdrawal_order: CliWithdrawalOrder,

    #[arg(long, help = "Percent of savings sent to the locked pool; omit to save accessible only")]
    locked_fraction: Option<f64>,
    #[arg(long, value_enum, default_value_t = CliSavingsMode::AlreadyNet)]
    savings_mode: CliSavingsMode,
    #[arg(long, default_value_t = 30_000.0, help = "Per-person annual locked contribution cap")]
    concessional_cap: f64,
    #[arg(long, default_value_t = 15.0, help = "Tax on locked contributions in percent")]
    contribution_tax_rate: f64,
    #[arg(long, default_value_t = 32.5, help = "Marginal income tax rate in percent")]
    marginal_tax_rate: f64,

    #[arg(long, default_value_t = 1.0e9)]
    spend_ceiling: f64,
    #[arg(long, default_value_t = 50)]
    bisection_iterations: u32,

    #[arg(long)]
    min_age: Option<u32>,
    #[arg(long)]
    max_age: Option<u32>,
    #[arg(long, help = "Report a fixed retirement age instead of searching")]
    target_age: Option<u32>,
    #[arg(long, help = "Include every age in the bounds in the report")]
    sweep: bool,

    #[arg(long, help = "Optimize the locked/accessible split of savings")]
    optimize: bool,
    #[arg(
        long,
        conflicts_with = "optimize",
        requires = "target_age",
        help = "Solve the least savings budget that makes --target-age viable"
    )]
    required_savings: bool,
    #[arg(long, default_value_t = 21)]
    grid_points: u32,
    #[arg(long, default_value_t = 100.0, help = "Largest locked fraction to try, in percent")]
    max_fraction: f64,
    #[arg(long, default_value_t = 3)]
    refine_passes: u32,
    #[arg(long, default_value_t = 5)]
    refine_points: u32,
    #[arg(long, default_value_t = 0)]
    age_tolerance: u32,
    #[arg(long, value_enum, default_value_t = CliSplitBias::MaxCapUsage)]
    split_bias: CliSplitBias,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct PlannerInputs {
    household: Household,
    assumptions: Assumptions,
    plan: PlanOptions,
    optimizer: OptimizerOptions,
    /// Split policy with the household's rates and caps, used by the optimizer.
    split_template: SplitPolicy,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: PlannerInputs,
    mode: AnalysisMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeResponse {
    recommendation: SplitRecommendation,
    plan: PlanReport,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnalysisResponse {
    Plan(PlanReport),
    Optimize(Box<OptimizeResponse>),
    RequiredSavings(SavingsGoalResult),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

fn percent(flag: &str, value: f64, min: f64, max: f64) -> Result<f64, String> {
    if !value.is_finite() || value < min || value > max {
        return Err(format!("{flag} must be between {min} and {max}"));
    }
    Ok(value / 100.0)
}

fn build_inputs(cli: Cli) -> Result<PlannerInputs, String> {
    if cli.life_expectancy <= cli.current_age {
        return Err("--life-expectancy must be > --current-age".to_string());
    }
    if !cli.target_spend.is_finite() || cli.target_spend < 0.0 {
        return Err("--target-spend must be >= 0".to_string());
    }
    if cli.real_return <= -100.0 {
        return Err("--real-return must be > -100".to_string());
    }
    if cli.savings_growth_rate <= -100.0 {
        return Err("--savings-growth-rate must be > -100".to_string());
    }
    if let (Some(min), Some(max)) = (cli.min_age, cli.max_age) {
        if max < min {
            return Err("--max-age must be >= --min-age".to_string());
        }
    }
    if let Some(age) = cli.target_age {
        if age < cli.current_age || age >= cli.life_expectancy {
            return Err("--target-age must be >= --current-age and < --life-expectancy".to_string());
        }
    }
    if cli.grid_points == 0 {
        return Err("--grid-points must be > 0".to_string());
    }

    let contribution_rules = StaticRules {
        concessional_cap: cli.concessional_cap,
        contribution_tax_rate: percent(
            "--contribution-tax-rate",
            cli.contribution_tax_rate,
            0.0,
            100.0,
        )?,
        marginal_tax_rate: percent("--marginal-tax-rate", cli.marginal_tax_rate, 0.0, 100.0)?,
    };

    let primary = Person {
        age: cli.current_age,
        income: cli.income,
        accessible_balance: cli.accessible_balance,
        locked_balance: cli.locked_balance,
        preservation_age: cli
            .birth_year
            .map_or(cli.preservation_age, |year| {
                contribution_rules.preservation_age(year)
            }),
        locked_fee: cli.locked_fee,
    };
    let members = match cli.partner_age {
        None => Members::Single(primary),
        Some(partner_age) => {
            let partner_preservation = match (cli.partner_birth_year, cli.partner_preservation_age) {
                (Some(year), _) => contribution_rules.preservation_age(year),
                (None, Some(age)) => age,
                (None, None) => cli.preservation_age,
            };
            let partner = Person {
                age: partner_age,
                income: cli.partner_income,
                accessible_balance: cli.partner_accessible_balance,
                locked_balance: cli.partner_locked_balance,
                preservation_age: partner_preservation,
                locked_fee: cli.partner_locked_fee,
            };
            Members::Couple([primary, partner])
        }
    };

    let split_template =
        split_policy(&members, &contribution_rules, 0.0, cli.savings_mode.into());
    let split = match cli.locked_fraction {
        Some(f) => Some(split_template.with_fraction(percent("--locked-fraction", f, 0.0, 100.0)?)),
        None => None,
    };

    let spend_schedule = if !cli.age_bands.is_empty() {
        SpendSchedule::Banded(cli.age_bands)
    } else if let Some(step_age) = cli.spend_step_age {
        SpendSchedule::Stepped {
            step_age,
            before: 1.0,
            after: percent("--spend-after-step", cli.spend_after_step, 0.0, 1_000.0)?,
        }
    } else {
        SpendSchedule::Flat
    };

    let household = Household {
        members,
        savings_budget: cli.savings_budget,
        savings_growth_rate: cli.savings_growth_rate / 100.0,
        target_spend: cli.target_spend,
        life_expectancy: cli.life_expectancy,
        split,
    };
    let assumptions = Assumptions {
        real_return: cli.real_return / 100.0,
        fee_drag: cli.fee_drag / 100.0,
        bequest_target: cli.bequest,
        spend_schedule,
        withdrawal_order: cli.withdrawal_order.into(),
        solver: SolverSettings {
            spend_ceiling: cli.spend_ceiling,
            bisection_iterations: cli.bisection_iterations,
        },
    };

    validate_household(&household).map_err(|e| e.to_string())?;
    validate_assumptions(&assumptions).map_err(|e| e.to_string())?;

    let bounds = if cli.min_age.is_some() || cli.max_age.is_some() {
        let bounds = AgeBounds::new(
            cli.min_age.unwrap_or(cli.current_age),
            cli.max_age.unwrap_or(cli.life_expectancy - 1),
        );
        validate_bounds(&household, bounds).map_err(|e| e.to_string())?;
        Some(bounds)
    } else {
        None
    };

    let plan = PlanOptions {
        target: cli.target_age.map_or(PlanTarget::EarliestAge, PlanTarget::FixedAge),
        bounds,
        include_sweep: cli.sweep,
    };
    let optimizer = OptimizerOptions {
        grid_points: cli.grid_points,
        max_fraction: percent("--max-fraction", cli.max_fraction, 0.0, 100.0)?,
        refine_passes: cli.refine_passes,
        refine_points: cli.refine_points,
        age_tolerance: cli.age_tolerance,
        bias: cli.split_bias.into(),
        bounds,
    };

    Ok(PlannerInputs {
        household,
        assumptions,
        plan,
        optimizer,
        split_template,
    })
}

fn run_analysis(request: &ApiRequest) -> Result<AnalysisResponse, String> {
    let inputs = &request.inputs;
    match request.mode {
        AnalysisMode::Plan => build_plan(&inputs.household, &inputs.assumptions, inputs.plan)
            .map(AnalysisResponse::Plan)
            .map_err(|e| e.to_string()),
        AnalysisMode::Optimize => {
            let recommendation = optimize(
                &inputs.household,
                &inputs.assumptions,
                inputs.split_template,
                inputs.optimizer,
            )
            .map_err(|e| e.to_string())?;
            let household = inputs.household.with_split(
                inputs
                    .split_template
                    .with_fraction(recommendation.requested_fraction),
            );
            let plan = build_plan(&household, &inputs.assumptions, inputs.plan)
                .map_err(|e| e.to_string())?;
            Ok(AnalysisResponse::Optimize(Box::new(OptimizeResponse {
                recommendation,
                plan,
            })))
        }
        AnalysisMode::RequiredSavings => {
            let PlanTarget::FixedAge(age) = inputs.plan.target else {
                return Err("a target age is required to solve for savings".to_string());
            };
            solve_required_savings(
                &inputs.household,
                &inputs.assumptions,
                SavingsGoalConfig::for_age(age),
            )
            .map(AnalysisResponse::RequiredSavings)
            .map_err(|e| e.to_string())
        }
    }
}

/// Parses the process arguments, runs the requested analysis and returns the JSON report.
pub fn run_cli() -> Result<String, String> {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);
    let mode = if cli.required_savings {
        AnalysisMode::RequiredSavings
    } else if cli.optimize {
        AnalysisMode::Optimize
    } else {
        AnalysisMode::Plan
    };
    let inputs = build_inputs(cli)?;
    let response = run_analysis(&ApiRequest { inputs, mode })?;
    serde_json::to_string_pretty(&response).map_err(|e| format!("failed to encode report: {e}"))
}

fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/plan", get(plan_get_handler).post(plan_post_handler))
        .route(
            "/api/optimize",
            get(optimize_get_handler).post(optimize_post_handler),
        )
        .route("/api/goal", get(goal_get_handler).post(goal_post_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "DWZ HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_get_handler(Query(payload): Query<PlanPayload>) -> Response {
    analysis_handler_impl(payload, AnalysisMode::Plan).await
}

async fn plan_post_handler(Json(payload): Json<PlanPayload>) -> Response {
    analysis_handler_impl(payload, AnalysisMode::Plan).await
}

async fn optimize_get_handler(Query(payload): Query<PlanPayload>) -> Response {
    analysis_handler_impl(payload, AnalysisMode::Optimize).await
}

async fn optimize_post_handler(Json(payload): Json<PlanPayload>) -> Response {
    analysis_handler_impl(payload, AnalysisMode::Optimize).await
}

async fn goal_get_handler(Query(payload): Query<PlanPayload>) -> Response {
    analysis_handler_impl(payload, AnalysisMode::RequiredSavings).await
}

async fn goal_post_handler(Json(payload): Json<PlanPayload>) -> Response {
    analysis_handler_impl(payload, AnalysisMode::RequiredSavings).await
}

async fn analysis_handler_impl(payload: PlanPayload, mode: AnalysisMode) -> Response {
    let request = match api_request_from_payload(payload, mode) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let started = Instant::now();
    match tokio::task::spawn_blocking(move || run_analysis(&request)).await {
        Ok(Ok(response)) => {
            info!(
                mode = ?mode,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "analysis complete"
            );
            json_response(StatusCode::OK, response)
        }
        Ok(Err(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(e) => {
            warn!(error = %e, "analysis task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "analysis task failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str, mode: AnalysisMode) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload, mode)
}

fn api_request_from_payload(payload: PlanPayload, mode: AnalysisMode) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.life_expectancy {
        cli.life_expectancy = v;
    }
    if let Some(v) = payload.income {
        cli.income = v;
    }
    if let Some(v) = payload.accessible_balance {
        cli.accessible_balance = v;
    }
    if let Some(v) = payload.locked_balance {
        cli.locked_balance = v;
    }
    if let Some(v) = payload.preservation_age {
        cli.preservation_age = v;
    }
    if let Some(v) = payload.birth_year {
        cli.birth_year = Some(v);
    }
    if let Some(v) = payload.locked_fee {
        cli.locked_fee = v;
    }

    if let Some(v) = payload.partner_age {
        cli.partner_age = Some(v);
    }
    if let Some(v) = payload.partner_income {
        cli.partner_income = v;
    }
    if let Some(v) = payload.partner_accessible_balance {
        cli.partner_accessible_balance = v;
    }
    if let Some(v) = payload.partner_locked_balance {
        cli.partner_locked_balance = v;
    }
    if let Some(v) = payload.partner_preservation_age {
        cli.partner_preservation_age = Some(v);
    }
    if let Some(v) = payload.partner_birth_year {
        cli.partner_birth_year = Some(v);
    }
    if let Some(v) = payload.partner_locked_fee {
        cli.partner_locked_fee = v;
    }

    if let Some(v) = payload.savings_budget {
        cli.savings_budget = v;
    }
    if let Some(v) = payload.savings_growth {
        cli.savings_growth_rate = v;
    }
    if let Some(v) = payload.target_spend {
        cli.target_spend = v;
    }

    if let Some(v) = payload.real_return {
        cli.real_return = v;
    }
    if let Some(v) = payload.fee_drag {
        cli.fee_drag = v;
    }
    if let Some(v) = payload.bequest {
        cli.bequest = v;
    }
    if let Some(v) = payload.spend_step_age {
        cli.spend_step_age = Some(v);
    }
    if let Some(v) = payload.spend_after_step {
        cli.spend_after_step = v;
    }
    if let Some(v) = payload.age_bands {
        cli.age_bands = v;
    }
    if let Some(v) = payload.withdrawal_order {
        cli.withdrawal_order = v;
    }

    if let Some(v) = payload.locked_fraction {
        cli.locked_fraction = Some(v);
    }
    if let Some(v) = payload.savings_mode {
        cli.savings_mode = v;
    }
    if let Some(v) = payload.concessional_cap {
        cli.concessional_cap = v;
    }
    if let Some(v) = payload.contribution_tax_rate {
        cli.contribution_tax_rate = v;
    }
    if let Some(v) = payload.marginal_tax_rate {
        cli.marginal_tax_rate = v;
    }

    if let Some(v) = payload.spend_ceiling {
        cli.spend_ceiling = v;
    }
    if let Some(v) = payload.bisection_iterations {
        cli.bisection_iterations = v;
    }

    if let Some(v) = payload.min_age {
        cli.min_age = Some(v);
    }
    if let Some(v) = payload.max_age {
        cli.max_age = Some(v);
    }
    if let Some(v) = payload.target_age {
        cli.target_age = Some(v);
    }
    if let Some(v) = payload.sweep {
        cli.sweep = v;
    }

    if let Some(v) = payload.grid_points {
        cli.grid_points = v;
    }
    if let Some(v) = payload.max_fraction {
        cli.max_fraction = v;
    }
    if let Some(v) = payload.refine_passes {
        cli.refine_passes = v;
    }
    if let Some(v) = payload.refine_points {
        cli.refine_points = v;
    }
    if let Some(v) = payload.age_tolerance {
        cli.age_tolerance = v;
    }
    if let Some(v) = payload.split_bias {
        cli.split_bias = v;
    }

    let inputs = build_inputs(cli)?;
    Ok(ApiRequest { inputs, mode })
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_age: 40,
        life_expectancy: 90,
        income: 120_000.0,
        accessible_balance: 100_000.0,
        locked_balance: 200_000.0,
        preservation_age: 60,
        birth_year: None,
        locked_fee: 0.0,
        partner_age: None,
        partner_income: 0.0,
        partner_accessible_balance: 0.0,
        partner_locked_balance: 0.0,
        partner_preservation_age: None,
        partner_birth_year: None,
        partner_locked_fee: 0.0,
        savings_budget: 40_000.0,
        savings_growth_rate: 0.0,
        target_spend: 60_000.0,
        real_return: 4.0,
        fee_drag: 0.5,
        bequest: 0.0,
        spend_step_age: None,
        spend_after_step: 80.0,
        age_bands: Vec::new(),
        withdrawal_order: CliWithdrawalOrder::AccessibleFirst,
        locked_fraction: None,
        savings_mode: CliSavingsMode::AlreadyNet,
        concessional_cap: 30_000.0,
        contribution_tax_rate: 15.0,
        marginal_tax_rate: 32.5,
        spend_ceiling: 1.0e9,
        bisection_iterations: 50,
        min_age: None,
        max_age: None,
        target_age: None,
        sweep: false,
        optimize: false,
        required_savings: false,
        grid_points: 21,
        max_fraction: 100.0,
        refine_passes: 3,
        refine_points: 5,
        age_tolerance: 0,
        split_bias: CliSplitBias::MaxCapUsage,
        verbose: false,
    }
}
