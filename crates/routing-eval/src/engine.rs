use std::sync::Arc;

use assistant_core::dispatch::Dispatch;
use assistant_core::models::IntentMatch;
use assistant_core::personal::PersonalAssistant;
use assistant_core::router::CommandRouter;
use assistant_core::telemetry::LogContext;
use assistant_core::weather::{WeatherFuture, WeatherLookup, WeatherReport};
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::case::RoutingCaseFixture;
use crate::cli::CliOptions;
use crate::fixture_io::{FixtureIoError, load_cases, load_commands};

const FIXTURE_CITY: &str = "Москва";
const FIXTURE_TIME_ZONE: &str = "Europe/Moscow";

#[derive(Debug)]
pub struct EvalSummary {
    results: Vec<CaseResult>,
}

impl EvalSummary {
    pub fn has_failures(&self) -> bool {
        self.results
            .iter()
            .any(|result| !result.failures.is_empty())
    }

    pub fn print(&self) {
        println!("Routing Eval Harness");

        let mut passed = 0usize;
        for result in &self.results {
            if result.failures.is_empty() {
                passed += 1;
                println!("[PASS] {}: {}", result.case_id, result.description);
            } else {
                println!("[FAIL] {}: {}", result.case_id, result.description);
                for failure in &result.failures {
                    println!("  - {failure}");
                }
            }
        }

        let total = self.results.len();
        let failed = total.saturating_sub(passed);
        println!(
            "Summary: {} total, {} passed, {} failed",
            total, passed, failed
        );
    }
}

#[derive(Debug)]
struct CaseResult {
    case_id: String,
    description: String,
    failures: Vec<String>,
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Fixtures(#[from] FixtureIoError),
    #[error("no routing cases found")]
    NoCases,
}

/// Answers every weather lookup with the same report.
struct FixtureWeather;

impl WeatherLookup for FixtureWeather {
    fn current_weather<'a>(&'a self, _city: &'a str) -> WeatherFuture<'a> {
        Box::pin(async {
            Ok(WeatherReport {
                description: "облачно".to_string(),
                temp_celsius: 12.0,
                feels_like_celsius: 10.5,
                humidity_pct: 70,
            })
        })
    }
}

pub async fn run_eval(options: &CliOptions) -> Result<EvalSummary, EvalError> {
    let table = load_commands(options.commands.as_deref())?;
    let mut cases = load_cases(options.cases_dir.as_deref())?;
    if cases.is_empty() {
        return Err(EvalError::NoCases);
    }
    cases.sort_by(|left, right| left.case_id.cmp(&right.case_id));

    let personal = PersonalAssistant::new(
        Some(Arc::new(FixtureWeather) as Arc<dyn WeatherLookup>),
        FIXTURE_CITY,
        FIXTURE_TIME_ZONE,
        LogContext::disabled(),
    );
    let router = CommandRouter::new(table, personal, LogContext::disabled());

    let mut results = Vec::with_capacity(cases.len());
    for case in &cases {
        let now = case.now.unwrap_or_else(fixed_clock);
        let intent = router.resolve_at(&case.input, now).await;
        results.push(check_case(case, &intent));
    }

    Ok(EvalSummary { results })
}

fn check_case(case: &RoutingCaseFixture, intent: &IntentMatch) -> CaseResult {
    let expectations = &case.expectations;
    let mut failures = Vec::new();

    compare(
        &mut failures,
        "category",
        &expectations.category,
        intent.category.as_str(),
    );
    compare(
        &mut failures,
        "action",
        &expectations.action,
        intent.action.as_str(),
    );
    if let Some(parameters) = expectations.parameters.as_deref() {
        compare(&mut failures, "parameters", parameters, &intent.parameters);
    }
    if let Some(handler) = expectations.handler.as_deref() {
        compare(
            &mut failures,
            "handler",
            handler,
            Dispatch::from_intent(intent).label(),
        );
    }

    CaseResult {
        case_id: case.case_id.clone(),
        description: case.description.clone(),
        failures,
    }
}

fn compare(failures: &mut Vec<String>, field: &str, expected: &str, actual: &str) {
    if expected != actual {
        failures.push(format!("{field}: expected '{expected}', got '{actual}'"));
    }
}

/// 2026-01-04 19:02 UTC, a Sunday evening in Moscow.
fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 4, 19, 2, 0)
        .single()
        .unwrap_or_default()
}
