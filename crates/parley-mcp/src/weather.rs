//! Current-temperature tool backed by the Open-Meteo forecast API.

use crate::ServerError;
use crate::server::required_f64;
use parley_agent::{AgentError, ToolDescriptor, ToolKind};
use parley_llm::ToolDefinition;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const UNKNOWN_TEMPERATURE: &str = "알 수 없음";

#[derive(Debug, Deserialize)]
struct ForecastBody {
    #[serde(default)]
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    #[serde(default)]
    temperature_2m: Option<f64>,
}

/// Display text for a forecast body: `"{t}°C"`, or the unknown marker
/// when the temperature field is absent or the body does not parse.
fn temperature_text(body: &str) -> String {
    serde_json::from_str::<ForecastBody>(body)
        .ok()
        .and_then(|forecast| forecast.current)
        .and_then(|current| current.temperature_2m)
        .map(|temperature| format!("{temperature}°C"))
        .unwrap_or_else(|| UNKNOWN_TEMPERATURE.to_string())
}

/// Fetch the current temperature at the given coordinates.
pub async fn current_temperature(latitude: f64, longitude: f64) -> Result<String, ServerError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let response = client
        .get(FORECAST_URL)
        .query(&[
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("current", "temperature_2m".to_string()),
        ])
        .send()
        .await?
        .error_for_status()?;
    let body = response.text().await?;
    Ok(temperature_text(&body))
}

/// The `get_weather` tool, ready for registration.
pub fn weather_tool() -> ToolDescriptor {
    ToolDescriptor {
        definition: ToolDefinition {
            name: "get_weather".to_string(),
            description: "주어진 위도/경도 좌표의 현재 기온(°C)을 문자열로 반환".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "latitude": {"type": "number"},
                    "longitude": {"type": "number"}
                },
                "required": ["latitude", "longitude"]
            }),
        },
        kind: ToolKind::Local {
            executor: Arc::new(|arguments| {
                Box::pin(async move {
                    let latitude = required_f64(&arguments, "latitude")
                        .map_err(|error| AgentError::ToolExecution(error.to_string()))?;
                    let longitude = required_f64(&arguments, "longitude")
                        .map_err(|error| AgentError::ToolExecution(error.to_string()))?;
                    current_temperature(latitude, longitude)
                        .await
                        .map_err(|error| AgentError::ToolExecution(error.to_string()))
                })
            }),
        },
    }
}
