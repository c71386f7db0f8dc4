use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::agent::{AgentKind, LegalDocumentType, Outcome};

/// Public profile of the signed-in user, as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default = "default_auth_provider")]
    pub auth_provider: String,
    #[serde(default)]
    pub is_email_verified: bool,
}

fn default_auth_provider() -> String {
    "local".to_string()
}

/// Input for creating a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupInput {
    pub email: String,
    /// 3-20 letters, digits or underscores.
    pub username: String,
    pub password: String,
}

/// Input for logging in with email and password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Response to a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Plain acknowledgement body, e.g. after signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /auth/google/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleAuthStatus {
    pub google_auth_enabled: bool,
}

/// Everything `GET /auth/dashboard` returns for the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub user: User,
    #[serde(default)]
    pub ideas: Vec<DashboardIdea>,
    #[serde(default)]
    pub pitch_decks: Vec<DashboardRecord>,
    #[serde(default)]
    pub market_research: Vec<DashboardRecord>,
    #[serde(default)]
    pub mvp_reports: Vec<DashboardRecord>,
    #[serde(default)]
    pub legal_documents: Vec<DashboardLegalRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardIdea {
    pub id: String,
    pub startup_name: String,
    pub industry: String,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Present once the idea has been evaluated.
    #[serde(default)]
    pub final_viability_score: Option<f64>,
}

/// Summary row shared by pitch decks, market research and MVP reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub id: String,
    pub idea_id: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardLegalRecord {
    pub id: String,
    pub idea_id: String,
    pub document_type: String,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Dashboard {
    /// Per-kind outcomes for one idea, suitable as gate input.
    ///
    /// Legal documents count as completed once any document type is. Chat
    /// has no stored record and is never reported here.
    pub fn statuses_for(&self, idea_id: &str) -> HashMap<AgentKind, Outcome> {
        let mut statuses = HashMap::new();

        if let Some(idea) = self.ideas.iter().find(|i| i.id == idea_id) {
            let validation = if idea.final_viability_score.is_some() {
                Outcome::Completed
            } else {
                Outcome::NotStarted
            };
            statuses.insert(AgentKind::Validation, validation);
        }

        let tables = [
            (AgentKind::PitchDeck, &self.pitch_decks),
            (AgentKind::MarketResearch, &self.market_research),
            (AgentKind::Mvp, &self.mvp_reports),
        ];
        for (kind, records) in tables {
            if let Some(record) = records.iter().find(|r| r.idea_id == idea_id) {
                statuses.insert(kind, Outcome::from_record_status(Some(&record.status)));
            }
        }

        let legal = self
            .legal_documents
            .iter()
            .filter(|r| r.idea_id == idea_id)
            .map(|r| Outcome::from_record_status(Some(&r.status)))
            .max_by_key(Outcome::rank);
        if let Some(outcome) = legal {
            statuses.insert(AgentKind::Legal, outcome);
        }

        statuses
    }

    /// Legal document types already generated for an idea.
    pub fn legal_documents_for(&self, idea_id: &str) -> Vec<LegalDocumentType> {
        self.legal_documents
            .iter()
            .filter(|r| r.idea_id == idea_id && r.status == "generated")
            .filter_map(|r| LegalDocumentType::parse(&r.document_type))
            .collect()
    }
}
