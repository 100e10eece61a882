// Client for the external signal-timing optimizer.
//
// Sends the current per-approach queue densities and turns the returned phase plan
// into a `TimingPlan`. One request, one response: no retry and no backoff. Callers
// log failures and carry on with the timing they already have.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::OptimizerConfig;
use crate::error::OptimizerError;
use crate::simulation::{Densities, TimingPlan, MAX_PHASE_SECONDS};

#[derive(Debug, Serialize)]
pub struct OptimizeRequest {
    pub densities: Densities,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeResponse {
    #[serde(default)]
    pub phase_plan: Option<PhasePlan>,
}

/// Wire form of a phase plan. Each field may be absent, null, a number or a numeric
/// string; anything unusable is treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct PhasePlan {
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub ns_green: Option<u32>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub ns_yellow: Option<u32>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub ew_green: Option<u32>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub ew_yellow: Option<u32>,
}

impl From<PhasePlan> for TimingPlan {
    fn from(plan: PhasePlan) -> Self {
        TimingPlan {
            ns_green: plan.ns_green,
            ns_yellow: plan.ns_yellow,
            ew_green: plan.ew_green,
            ew_yellow: plan.ew_yellow,
        }
    }
}

/// Whole seconds from a JSON value. Fractions truncate, negatives floor at zero and huge
/// values cap at `MAX_PHASE_SECONDS` (the phase clock then clamps to its minimums), and
/// zero counts as absent.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    Ok(match number {
        Some(n) if n.is_finite() && n != 0.0 => Some(n.trunc().clamp(0.0, MAX_PHASE_SECONDS as f64) as u32),
        _ => None,
    })
}

/// Parses a response body. A missing `phase_plan` yields `None`.
pub fn parse_response(body: &str) -> Result<Option<TimingPlan>, OptimizerError> {
    let response: OptimizeResponse = serde_json::from_str(body)?;
    Ok(response.phase_plan.map(TimingPlan::from))
}

pub struct OptimizerClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl OptimizerClient {
    pub fn new(config: &OptimizerConfig) -> Result<Self, OptimizerError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/optimize", self.base_url)
    }

    pub async fn request_plan(&self, densities: &Densities) -> Result<Option<TimingPlan>, OptimizerError> {
        let url = self.endpoint();
        let request = OptimizeRequest { densities: *densities };

        log::info!(
            "Requesting optimization: N {:.3} S {:.3} E {:.3} W {:.3}",
            densities.north,
            densities.south,
            densities.east,
            densities.west
        );

        let resp = self.http_client.post(&url).json(&request).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            log::warn!("Optimizer error {}: {}", status, body);
            return Err(OptimizerError::Status { status, body });
        }

        let plan = parse_response(&body)?;
        log::debug!("Optimizer plan: {:?}", plan);
        Ok(plan)
    }
}
