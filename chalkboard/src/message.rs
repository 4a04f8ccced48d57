//! Board messages and the vocabulary they are tagged with.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The four kinds of artifact that can appear on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// The initiating request typed by the operator.
    Request,
    DesignSpec,
    FrontendPlan,
    BackendPlan,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Request,
        Category::DesignSpec,
        Category::FrontendPlan,
        Category::BackendPlan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Request => "request",
            Category::DesignSpec => "design-spec",
            Category::FrontendPlan => "frontend-plan",
            Category::BackendPlan => "backend-plan",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Agent roles. The set is closed; coordination order is [`Role::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Design,
    Frontend,
    Backend,
}

impl Role {
    /// Fixed evaluation order within a cycle.
    pub const ORDER: [Role; 3] = [Role::Design, Role::Frontend, Role::Backend];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Design => "design",
            Role::Frontend => "frontend",
            Role::Backend => "backend",
        }
    }

    /// Category this role must see on the board before it can act.
    pub fn upstream(&self) -> Category {
        match self {
            Role::Design => Category::Request,
            Role::Frontend | Role::Backend => Category::DesignSpec,
        }
    }

    /// Category of every message this role appends.
    pub fn output(&self) -> Category {
        match self {
            Role::Design => Category::DesignSpec,
            Role::Frontend => Category::FrontendPlan,
            Role::Backend => Category::BackendPlan,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "role")]
pub enum Author {
    Initiator,
    Agent(Role),
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::Initiator => f.pad("initiator"),
            Author::Agent(role) => role.fmt(f),
        }
    }
}

/// One immutable record on the board.
///
/// Only [`crate::board::RecordLog`] constructs these; everything else holds
/// an `Arc<Message>` pointing at the logged value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: u64,
    pub author: Author,
    pub category: Category,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_depend_on_request_or_design() {
        assert_eq!(Role::Design.upstream(), Category::Request);
        assert_eq!(Role::Frontend.upstream(), Category::DesignSpec);
        assert_eq!(Role::Backend.upstream(), Category::DesignSpec);
    }

    #[test]
    fn outputs_are_distinct() {
        let outputs: std::collections::HashSet<_> =
            Role::ORDER.iter().map(|r| r.output()).collect();
        assert_eq!(outputs.len(), Role::ORDER.len());
        assert!(!outputs.contains(&Category::Request));
    }

    #[test]
    fn names_are_kebab_case() {
        assert_eq!(Category::DesignSpec.to_string(), "design-spec");
        assert_eq!(Author::Agent(Role::Backend).to_string(), "backend");
        assert_eq!(Author::Initiator.to_string(), "initiator");
        let json = serde_json::to_string(&Category::FrontendPlan).unwrap();
        assert_eq!(json, "\"frontend-plan\"");
    }
}
