use serde::{Deserialize, Serialize};

/// Who the startup sells to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CustomerType {
    B2B,
    B2C,
    B2B2C,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::B2B => "B2B",
            Self::B2C => "B2C",
            Self::B2B2C => "B2B2C",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "B2B" => Some(Self::B2B),
            "B2C" => Some(Self::B2C),
            "B2B2C" => Some(Self::B2B2C),
            _ => None,
        }
    }
}

/// Input for submitting a new idea (`POST /ideas/`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIdeaInput {
    pub startup_name: String,
    /// Detailed business description: problem, solution, target users.
    pub one_line_description: String,
    /// Comma-separated industry tags.
    pub industry: String,
    pub target_customer_type: CustomerType,
    /// Comma-separated target countries or regions.
    pub geography: String,
}

/// Response to a submitted idea.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaCreated {
    pub idea_id: String,
    pub message: String,
}
