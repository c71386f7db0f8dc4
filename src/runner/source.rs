use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::{ApiClient, ClientError};
use crate::models::*;

/// Extra inputs for a generate call. Only legal documents use them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    pub jurisdiction: Option<String>,
    pub company_name: Option<String>,
    pub founder_count: Option<u32>,
}

/// Read and generate calls for stored agent results.
///
/// `fetch` never mutates server state. `Ok(None)` means nothing is stored
/// for the key yet; any other failure is an error.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch(
        &self,
        key: &ResultKey,
        cancel: &CancellationToken,
    ) -> Result<Option<AgentResult>, ClientError>;

    async fn generate(
        &self,
        key: &ResultKey,
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<AgentResult, ClientError>;
}

fn require_document_type(key: &ResultKey) -> Result<LegalDocumentType, ClientError> {
    key.document_type
        .ok_or_else(|| ClientError::validation("A legal document type is required."))
}

#[async_trait]
impl ReportSource for ApiClient {
    async fn fetch(
        &self,
        key: &ResultKey,
        cancel: &CancellationToken,
    ) -> Result<Option<AgentResult>, ClientError> {
        let api = self.cancellable(cancel.clone());
        let id = key.idea_id.as_str();

        let body = match key.kind {
            AgentKind::Validation => api.evaluation(id).await,
            AgentKind::MarketResearch => api.market_research(id).await,
            AgentKind::PitchDeck => api.pitch_deck(id).await,
            AgentKind::Mvp => api.mvp(id).await,
            AgentKind::Legal => {
                // One list per idea; only a generated record of this type counts.
                let document_type = require_document_type(key)?;
                let list = api.legal_documents(id).await?;
                return match list.generated(document_type) {
                    Some(record) => serde_json::to_value(record)
                        .map(|v| Some(AgentResult::from_payload(key, v)))
                        .map_err(|e| ClientError::Decode(e.to_string())),
                    None => Ok(None),
                };
            }
            AgentKind::Chat => api.chat_status(id).await.and_then(|status| {
                serde_json::to_value(status).map_err(|e| ClientError::Decode(e.to_string()))
            }),
        };

        match body {
            Ok(body) => Ok(Some(AgentResult::from_payload(key, body))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn generate(
        &self,
        key: &ResultKey,
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<AgentResult, ClientError> {
        let api = self.cancellable(cancel.clone());
        let id = key.idea_id.as_str();

        let body = match key.kind {
            AgentKind::Validation => api.evaluate(id).await?,
            AgentKind::MarketResearch => api.generate_market_research(id).await?,
            AgentKind::PitchDeck => api.generate_pitch_deck(id).await?,
            AgentKind::Mvp => api.generate_mvp(id).await?,
            AgentKind::Legal => {
                let input = GenerateLegalInput {
                    jurisdiction: options.jurisdiction.clone(),
                    company_name: options.company_name.clone(),
                    founder_count: options.founder_count,
                    ..GenerateLegalInput::new(require_document_type(key)?)
                };
                api.generate_legal(id, &input).await?
            }
            AgentKind::Chat => {
                return Err(ClientError::validation(
                    "Chat has nothing to generate. Ask a question instead.",
                ))
            }
        };
        Ok(AgentResult::from_payload(key, body))
    }
}
