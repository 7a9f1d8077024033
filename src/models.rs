// HTTP request and response bodies

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineHealth;
use crate::progress::types::{OperationId, OperationStatus};

// Submission Response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitGenerationResponse {
    pub operation_id: OperationId,
    pub status: OperationStatus,
    pub total_units: usize,
}

// Error Body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

// Health Response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider_configured: bool,
    #[serde(flatten)]
    pub pipeline: PipelineHealth,
}

impl HealthResponse {
    pub fn from_pipeline(pipeline: PipelineHealth) -> Self {
        let provider_configured = pipeline.provider != "unconfigured";
        let status = if pipeline.shutting_down {
            "shutting_down"
        } else if provider_configured {
            "ok"
        } else {
            "degraded"
        };
        Self {
            status,
            provider_configured,
            pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline(provider: &str, shutting_down: bool) -> PipelineHealth {
        PipelineHealth {
            provider: provider.to_string(),
            gate_capacity: 4,
            in_flight: 1,
            peak_in_flight: 2,
            active_operations: 1,
            tracked_operations: 3,
            durable_store: false,
            shutting_down,
        }
    }

    #[test]
    fn test_error_response_serialization() {
        let body = ErrorResponse::new("not_found", "operation not found");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"error": "not_found", "message": "operation not found"})
        );
    }

    #[test]
    fn test_submit_response_serialization() {
        let id: OperationId = "0f8fad5b-d9cb-469f-a165-70867728950e".parse().unwrap();
        let body = SubmitGenerationResponse {
            operation_id: id,
            status: OperationStatus::Queued,
            total_units: 3,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["operation_id"], "0f8fad5b-d9cb-469f-a165-70867728950e");
        assert_eq!(value["status"], "queued");
    }

    #[test]
    fn test_health_status() {
        let health = HealthResponse::from_pipeline(pipeline("openai", false));
        let value = serde_json::to_value(&health).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["gate_capacity"], 4);

        assert_eq!(HealthResponse::from_pipeline(pipeline("unconfigured", false)).status, "degraded");
        assert_eq!(HealthResponse::from_pipeline(pipeline("openai", true)).status, "shutting_down");
    }
}
