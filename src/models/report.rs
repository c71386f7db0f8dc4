//! Typed views over agent report bodies.
//!
//! Only the fields the client reads are modelled; everything else in a
//! report stays in [`AgentResult::payload`](super::AgentResult).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::agent::LegalDocumentType;

/// Stored evaluation of an idea (`GET /ideas/{id}/evaluation`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(default)]
    pub idea_id: Option<String>,
    pub module_scores: ModuleScores,
    #[serde(default)]
    pub competitor_names: Vec<String>,
    #[serde(default)]
    pub summary: HashMap<String, String>,
}

/// Module scores, each in 0..=100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleScores {
    pub final_viability_score: f64,
    #[serde(default)]
    pub problem_intensity: Option<f64>,
    #[serde(default)]
    pub market_timing: Option<f64>,
    #[serde(default)]
    pub competition_pressure: Option<f64>,
    #[serde(default)]
    pub market_potential: Option<f64>,
    #[serde(default)]
    pub execution_feasibility: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketResearchRecord {
    pub id: String,
    pub idea_id: String,
    pub status: String,
    #[serde(default)]
    pub tam_min: Option<f64>,
    #[serde(default)]
    pub tam_max: Option<f64>,
    #[serde(default)]
    pub sam_max: Option<f64>,
    #[serde(default)]
    pub som_max: Option<f64>,
    /// 0-100.
    #[serde(default)]
    pub demand_strength: Option<f64>,
    #[serde(default)]
    pub competitor_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchDeckRecord {
    pub id: String,
    pub idea_id: String,
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub view_url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MvpReportRecord {
    pub id: String,
    pub idea_id: String,
    pub status: String,
    #[serde(default)]
    pub blueprint: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalDocumentRecord {
    pub id: String,
    pub idea_id: String,
    pub document_type: String,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    pub status: String,
    #[serde(default)]
    pub document: Option<serde_json::Value>,
}

/// `GET /legal/idea/{id}` lists every document type for the idea.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegalDocumentList {
    #[serde(default)]
    pub records: Vec<LegalDocumentRecord>,
}

impl LegalDocumentList {
    /// The generated record for one document type, if any.
    pub fn generated(&self, document_type: LegalDocumentType) -> Option<&LegalDocumentRecord> {
        self.records.iter().find(|r| {
            r.status == "generated" && LegalDocumentType::parse(&r.document_type) == Some(document_type)
        })
    }
}

/// Body of `POST /legal/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateLegalInput {
    pub document_type: LegalDocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder_count: Option<u32>,
}

impl GenerateLegalInput {
    pub fn new(document_type: LegalDocumentType) -> Self {
        Self {
            document_type,
            jurisdiction: None,
            company_name: None,
            founder_count: None,
        }
    }
}

/// `GET /chat/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStatus {
    pub idea_id: String,
    #[serde(default)]
    pub indexed_agents: Vec<String>,
    pub ready: bool,
}

/// Body of `POST /chat/{id}/ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskInput {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub indexed_agents: Vec<String>,
}
