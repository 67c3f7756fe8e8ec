use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;

use crate::models::Anamnesis;

/// AnalysisOutcome
///
/// What the external model returns for one intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub risk_level: String,
    pub summary: String,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("request to analysis service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("analysis service answered with status {0}")]
    Status(u16),
    #[error("analysis service unavailable: {0}")]
    Unavailable(String),
}

// 1. AnalysisService Contract
/// AnalysisService
///
/// Forwards an anamnesis to the risk model. Handlers only see this trait, so the real
/// HTTP client and the test double are interchangeable.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, anamnesis: &Anamnesis) -> Result<AnalysisOutcome, AnalysisError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisPayload<'a> {
    patient_id: &'a str,
    answers: &'a serde_json::Value,
}

// 2. The Real Implementation
/// HttpAnalysisClient
///
/// POSTs `{ patientId, answers }` to the configured endpoint and expects
/// `{ riskLevel, summary }` back.
#[derive(Clone)]
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAnalysisClient {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn analyze(&self, anamnesis: &Anamnesis) -> Result<AnalysisOutcome, AnalysisError> {
        let payload = AnalysisPayload {
            patient_id: &anamnesis.patient_id,
            answers: &anamnesis.answers,
        };

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AnalysisError::Status(response.status().as_u16()));
        }

        Ok(response.json::<AnalysisOutcome>().await?)
    }
}

// 3. The Mock Implementation (For Tests)
/// MockAnalysisService
///
/// Returns a fixed outcome, or fails on demand.
#[derive(Clone)]
pub struct MockAnalysisService {
    pub should_fail: bool,
    pub risk_level: String,
}

impl MockAnalysisService {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            risk_level: "low".to_string(),
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }
}

impl Default for MockAnalysisService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisService for MockAnalysisService {
    async fn analyze(&self, anamnesis: &Anamnesis) -> Result<AnalysisOutcome, AnalysisError> {
        if self.should_fail {
            return Err(AnalysisError::Unavailable(
                "mock analysis failure requested".to_string(),
            ));
        }
        Ok(AnalysisOutcome {
            risk_level: self.risk_level.clone(),
            summary: format!("mock analysis for patient {}", anamnesis.patient_id),
        })
    }
}

pub type AnalysisState = Arc<dyn AnalysisService>;
