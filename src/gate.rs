//! Which agent actions are currently available for an idea.
//!
//! The gate is a projection: it is recomputed from the latest outcomes every
//! time and never stores status of its own.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::models::{AgentKind, Outcome};

/// `dependent` may only run once `prerequisite` has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge {
    pub prerequisite: AgentKind,
    pub dependent: AgentKind,
}

impl DependencyEdge {
    pub const fn new(prerequisite: AgentKind, dependent: AgentKind) -> Self {
        Self {
            prerequisite,
            dependent,
        }
    }
}

/// Validation unlocks every report; the MVP blueprint also needs market research.
pub const STANDARD_EDGES: [DependencyEdge; 5] = [
    DependencyEdge::new(AgentKind::Validation, AgentKind::MarketResearch),
    DependencyEdge::new(AgentKind::Validation, AgentKind::PitchDeck),
    DependencyEdge::new(AgentKind::Validation, AgentKind::Legal),
    DependencyEdge::new(AgentKind::Validation, AgentKind::Chat),
    DependencyEdge::new(AgentKind::MarketResearch, AgentKind::Mvp),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Enabled,
    /// `reason` is the first unmet prerequisite.
    Locked { reason: AgentKind },
}

impl Gate {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Name of the unmet prerequisite, if locked.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Enabled => None,
            Self::Locked { reason } => Some(reason.as_str()),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Locked { reason } => write!(f, "locked: complete {} first", reason.label()),
        }
    }
}

/// Decide every kind's gate from the current outcomes.
///
/// A kind is enabled iff every prerequisite reachable through incoming
/// edges is `Completed`. Kinds missing from `statuses` count as
/// `NotStarted`. The reported reason is the first unmet prerequisite in
/// edge declaration order among the edges leading into the kind's
/// prerequisite closure.
pub fn gate(
    statuses: &HashMap<AgentKind, Outcome>,
    edges: &[DependencyEdge],
) -> BTreeMap<AgentKind, Gate> {
    AgentKind::ALL
        .into_iter()
        .map(|kind| {
            let mut scope = prerequisites(kind, edges);
            scope.insert(kind);

            let unmet = edges
                .iter()
                .filter(|e| scope.contains(&e.dependent))
                .map(|e| e.prerequisite)
                .find(|p| !statuses.get(p).copied().unwrap_or_default().is_completed());

            let decision = match unmet {
                Some(reason) => Gate::Locked { reason },
                None => Gate::Enabled,
            };
            (kind, decision)
        })
        .collect()
}

/// Every kind `kind` transitively depends on.
fn prerequisites(kind: AgentKind, edges: &[DependencyEdge]) -> HashSet<AgentKind> {
    let mut seen = HashSet::new();
    let mut stack = vec![kind];
    while let Some(current) = stack.pop() {
        for edge in edges.iter().filter(|e| e.dependent == current) {
            if seen.insert(edge.prerequisite) {
                stack.push(edge.prerequisite);
            }
        }
    }
    seen
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("dependency cycle through {0}")]
    Cycle(AgentKind),

    #[error("validation cannot depend on {0}")]
    RootHasPrerequisite(AgentKind),

    #[error("{0} does not depend on validation")]
    Unrooted(AgentKind),
}

/// A validated edge set: acyclic, with validation as the single root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    pub fn new(edges: Vec<DependencyEdge>) -> Result<Self, GraphError> {
        if let Some(edge) = edges.iter().find(|e| e.dependent == AgentKind::Validation) {
            return Err(GraphError::RootHasPrerequisite(edge.prerequisite));
        }
        for kind in AgentKind::ALL {
            let closure = prerequisites(kind, &edges);
            if closure.contains(&kind) {
                return Err(GraphError::Cycle(kind));
            }
            if kind != AgentKind::Validation && !closure.contains(&AgentKind::Validation) {
                return Err(GraphError::Unrooted(kind));
            }
        }
        Ok(Self { edges })
    }

    pub fn standard() -> Self {
        Self {
            edges: STANDARD_EDGES.to_vec(),
        }
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn gate(&self, statuses: &HashMap<AgentKind, Outcome>) -> BTreeMap<AgentKind, Gate> {
        gate(statuses, &self.edges)
    }

    /// Direct prerequisites of `kind`, in declaration order.
    pub fn prerequisites_of(&self, kind: AgentKind) -> Vec<AgentKind> {
        self.edges
            .iter()
            .filter(|e| e.dependent == kind)
            .map(|e| e.prerequisite)
            .collect()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::standard()
    }
}
