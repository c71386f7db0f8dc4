use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A backend capability that produces one structured report for an idea.
///
/// Declaration order is the order kinds are listed in gate projections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Validation,
    MarketResearch,
    PitchDeck,
    Mvp,
    Legal,
    Chat,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        Self::Validation,
        Self::MarketResearch,
        Self::PitchDeck,
        Self::Mvp,
        Self::Legal,
        Self::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::MarketResearch => "market_research",
            Self::PitchDeck => "pitch_deck",
            Self::Mvp => "mvp",
            Self::Legal => "legal",
            Self::Chat => "chat",
        }
    }

    /// Accepts the snake_case name, or the kebab-case form used in URLs.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "validation" => Some(Self::Validation),
            "market_research" => Some(Self::MarketResearch),
            "pitch_deck" => Some(Self::PitchDeck),
            "mvp" => Some(Self::Mvp),
            "legal" => Some(Self::Legal),
            "chat" => Some(Self::Chat),
            _ => None,
        }
    }

    /// Human-readable name for prompts and lock reasons.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation => "Idea Validation",
            Self::MarketResearch => "Market Research",
            Self::PitchDeck => "Pitch Deck",
            Self::Mvp => "MVP Blueprint",
            Self::Legal => "Legal Documents",
            Self::Chat => "AI Co-Founder Chat",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one stored agent result.
///
/// - `NotStarted`: Nothing stored yet
/// - `Pending`: The backend is still producing it
/// - `Completed`: A usable report exists
/// - `Failed`: The last generation attempt failed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    NotStarted,
    Pending,
    Completed,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Decode the `status` field of a stored record.
    ///
    /// Market research and pitch decks finish as `completed`, MVP reports and
    /// legal documents as `generated`. Evaluation reports carry no status at
    /// all; their presence means the evaluation completed.
    pub fn from_record_status(status: Option<&str>) -> Self {
        match status {
            None | Some("completed") | Some("generated") => Self::Completed,
            Some("pending") => Self::Pending,
            Some("failed") => Self::Failed,
            Some(_) => Self::NotStarted,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Preference when several records collapse onto one kind.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Failed => 1,
            Self::Pending => 2,
            Self::Completed => 3,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Legal document types the backend can draft.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LegalDocumentType {
    Nda,
    FounderAgreement,
    PrivacyPolicy,
    TermsOfService,
}

impl LegalDocumentType {
    pub const ALL: [LegalDocumentType; 4] = [
        Self::Nda,
        Self::FounderAgreement,
        Self::PrivacyPolicy,
        Self::TermsOfService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nda => "nda",
            Self::FounderAgreement => "founder_agreement",
            Self::PrivacyPolicy => "privacy_policy",
            Self::TermsOfService => "terms_of_service",
        }
    }

    /// Parse after the backend's normalisation: lower-case, spaces and
    /// dashes become underscores.
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|t| t.as_str() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Nda => "Non-Disclosure Agreement (NDA)",
            Self::FounderAgreement => "Founder Agreement",
            Self::PrivacyPolicy => "Privacy Policy",
            Self::TermsOfService => "Terms of Service",
        }
    }
}

impl fmt::Display for LegalDocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one stored agent result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub idea_id: String,
    pub kind: AgentKind,
    /// Only set for [`AgentKind::Legal`].
    pub document_type: Option<LegalDocumentType>,
}

impl ResultKey {
    pub fn new(idea_id: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            idea_id: idea_id.into(),
            kind,
            document_type: None,
        }
    }

    pub fn legal(idea_id: impl Into<String>, document_type: LegalDocumentType) -> Self {
        Self {
            idea_id: idea_id.into(),
            kind: AgentKind::Legal,
            document_type: Some(document_type),
        }
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.document_type {
            Some(doc) => write!(f, "{}/{}/{}", self.idea_id, self.kind, doc),
            None => write!(f, "{}/{}", self.idea_id, self.kind),
        }
    }
}

/// A stored agent result as seen by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub kind: AgentKind,
    pub idea_id: String,
    pub status: Outcome,
    #[serde(default)]
    pub document_type: Option<LegalDocumentType>,
    /// Raw report body as returned by the backend.
    #[serde(default)]
    pub payload: Option<Value>,
}

impl AgentResult {
    /// Wrap a backend body, decoding its status.
    pub fn from_payload(key: &ResultKey, payload: Value) -> Self {
        let status = match key.kind {
            AgentKind::Chat => match payload.get("ready").and_then(Value::as_bool) {
                Some(true) => Outcome::Completed,
                _ => Outcome::NotStarted,
            },
            _ => Outcome::from_record_status(payload.get("status").and_then(Value::as_str)),
        };
        Self {
            kind: key.kind,
            idea_id: key.idea_id.clone(),
            status,
            document_type: key.document_type,
            payload: Some(payload),
        }
    }

    pub fn key(&self) -> ResultKey {
        ResultKey {
            idea_id: self.idea_id.clone(),
            kind: self.kind,
            document_type: self.document_type,
        }
    }

    /// Decode the payload into one of the typed report views.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.payload
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
    }

    /// Final viability score of a validation report.
    pub fn final_score(&self) -> Option<f64> {
        self.payload
            .as_ref()?
            .pointer("/module_scores/final_viability_score")?
            .as_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_status_maps_to_outcome() {
        assert_eq!(Outcome::from_record_status(None), Outcome::Completed);
        assert_eq!(Outcome::from_record_status(Some("generated")), Outcome::Completed);
        assert_eq!(Outcome::from_record_status(Some("completed")), Outcome::Completed);
        assert_eq!(Outcome::from_record_status(Some("pending")), Outcome::Pending);
        assert_eq!(Outcome::from_record_status(Some("failed")), Outcome::Failed);
    }

    #[test]
    fn evaluation_report_exposes_final_score() {
        let key = ResultKey::new("abc123", AgentKind::Validation);
        let result = AgentResult::from_payload(
            &key,
            json!({ "module_scores": { "final_viability_score": 72.5 } }),
        );

        assert_eq!(result.status, Outcome::Completed);
        assert_eq!(result.final_score(), Some(72.5));
    }

    #[test]
    fn chat_status_is_completed_only_when_ready() {
        let key = ResultKey::new("abc123", AgentKind::Chat);
        let idle = AgentResult::from_payload(&key, json!({ "ready": false }));
        let ready = AgentResult::from_payload(&key, json!({ "ready": true }));

        assert_eq!(idle.status, Outcome::NotStarted);
        assert_eq!(ready.status, Outcome::Completed);
    }

    #[test]
    fn legal_document_type_normalises_input() {
        assert_eq!(
            LegalDocumentType::parse("Founder Agreement"),
            Some(LegalDocumentType::FounderAgreement)
        );
        assert_eq!(
            LegalDocumentType::parse("terms-of-service"),
            Some(LegalDocumentType::TermsOfService)
        );
        assert_eq!(LegalDocumentType::parse("lease"), None);
    }

    #[test]
    fn agent_kind_accepts_kebab_case() {
        assert_eq!(AgentKind::from_str("market-research"), Some(AgentKind::MarketResearch));
        assert_eq!(AgentKind::from_str("MVP"), Some(AgentKind::Mvp));
        assert_eq!(AgentKind::from_str("unknown"), None);
    }
}
