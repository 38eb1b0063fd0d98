use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    InputError, PlanReport, SimulationInput, SimulationResult, YearlyData, calculate_forward,
    calculate_plan,
};

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "roadmap",
    about = "Portfolio growth projection with required return, contribution and horizon solvers"
)]
pub struct Cli {
    #[arg(long, default_value_t = 1_000_000.0, help = "Starting principal")]
    pub initial_asset: f64,
    #[arg(
        long,
        default_value_t = 50_000.0,
        help = "Contribution added at the end of each month"
    )]
    pub monthly_investment: f64,
    #[arg(long, default_value_t = 20, help = "Projection horizon in whole years")]
    pub years: u32,
    #[arg(
        long,
        default_value_t = 5.0,
        allow_negative_numbers = true,
        help = "Expected annual return in percent, e.g. 5"
    )]
    pub annual_return: f64,
    #[arg(long, default_value_t = 100_000_000.0, help = "Goal amount")]
    pub target_asset: f64,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            initial_asset: 1_000_000.0,
            monthly_investment: 50_000.0,
            years: 20,
            annual_return: 5.0,
            target_asset: 100_000_000.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

/// Query-string and JSON body accepted by the HTTP API. Every field is optional
/// and overlays the CLI defaults; unparsable numbers fall back to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    #[serde(alias = "asset", deserialize_with = "lenient_f64")]
    initial_asset: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    monthly_investment: Option<f64>,
    #[serde(deserialize_with = "lenient_years")]
    years: Option<u32>,
    #[serde(deserialize_with = "lenient_f64")]
    annual_return: Option<f64>,
    #[serde(alias = "target", deserialize_with = "lenient_f64")]
    target_asset: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(v)) => Some(v),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        None => None,
    })
}

fn lenient_years<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_f64(deserializer)?;
    match value {
        Some(v) if v.fract() != 0.0 || v < 0.0 || v > u32::MAX as f64 => Err(
            serde::de::Error::custom(format!("years must be a whole number >= 0, got {v}")),
        ),
        Some(v) => Ok(Some(v as u32)),
        None => Ok(None),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    input: SimulationInput,
    result: SimulationResult,
    is_target_reached: bool,
    decade_milestones: Vec<YearlyData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    input: SimulationInput,
    #[serde(flatten)]
    plan: PlanReport,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn build_inputs(cli: Cli) -> Result<SimulationInput, InputError> {
    SimulationInput::new(
        cli.initial_asset,
        cli.monthly_investment,
        cli.years,
        cli.annual_return,
        cli.target_asset,
    )
}

/// Runs the full plan for CLI flags and renders it as pretty JSON.
pub fn render_cli_report(cli: Cli) -> Result<String, CliError> {
    let input = build_inputs(cli)?;
    let report = PlanResponse {
        input,
        plan: calculate_plan(&input),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/plan", get(plan_get_handler).post(plan_post_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "roadmap HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(payload).await,
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

async fn simulate_post_handler(
    payload: Result<Json<SimulatePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_handler_impl(payload).await,
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

async fn plan_get_handler(payload: Result<Query<SimulatePayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => plan_handler_impl(payload).await,
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

async fn plan_post_handler(payload: Result<Json<SimulatePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => plan_handler_impl(payload).await,
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

fn rejected_payload(msg: String) -> Response {
    warn!(%msg, "rejected request payload");
    error_response(StatusCode::BAD_REQUEST, &msg)
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let input = match inputs_from_payload(payload) {
        Ok(input) => input,
        Err(err) => {
            warn!(%err, "rejected simulate request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };
    debug!(?input, "running forward projection");

    let result = calculate_forward(&input);
    let response = SimulateResponse {
        input,
        is_target_reached: result.is_target_reached(input.target_asset),
        decade_milestones: result.decade_milestones(),
        result,
    };
    json_response(StatusCode::OK, response)
}

async fn plan_handler_impl(payload: SimulatePayload) -> Response {
    let input = match inputs_from_payload(payload) {
        Ok(input) => input,
        Err(err) => {
            warn!(%err, "rejected plan request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };
    debug!(?input, "running plan");

    json_response(
        StatusCode::OK,
        PlanResponse {
            input,
            plan: calculate_plan(&input),
        },
    )
}

fn with_cache_control(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)).into_response())
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
fn inputs_from_json(json: &str) -> Result<SimulationInput, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload).map_err(|e| e.to_string())
}

fn inputs_from_payload(payload: SimulatePayload) -> Result<SimulationInput, InputError> {
    let mut cli = Cli::default();

    if let Some(v) = payload.initial_asset {
        cli.initial_asset = v;
    }
    if let Some(v) = payload.monthly_investment {
        cli.monthly_investment = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.target_asset {
        cli.target_asset = v;
    }

    build_inputs(cli)
}
