use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingCaseFixture {
    pub case_id: String,
    pub description: String,
    pub input: String,
    /// Clock used for date and time answers; the engine's fixed clock when absent.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    pub expectations: RoutingExpectations,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingExpectations {
    pub category: String,
    pub action: String,
    #[serde(default)]
    pub parameters: Option<String>,
    /// Dispatch handler label, e.g. `open_application` or `generative`.
    #[serde(default)]
    pub handler: Option<String>,
}
