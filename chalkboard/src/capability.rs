//! Static descriptions of what each role reads, writes and is for.
//!
//! Descriptors carry no behaviour. They are rendered into the context of
//! every generation request so the model knows where it sits in the pipeline.

use crate::message::{Category, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    pub role: Role,
    pub name: &'static str,
    pub inputs: &'static [Category],
    pub outputs: &'static [Category],
    pub trigger: &'static str,
    pub policy: &'static str,
}

static DESIGN: CapabilityDescriptor = CapabilityDescriptor {
    role: Role::Design,
    name: "Product designer",
    inputs: &[Category::Request],
    outputs: &[Category::DesignSpec],
    trigger: "A request is on the board, or its own design spec can be refined.",
    policy: "Describe what the product does and how users move through it. \
             Stay implementation-neutral; leave stack choices to the plans.",
};

static FRONTEND: CapabilityDescriptor = CapabilityDescriptor {
    role: Role::Frontend,
    name: "Frontend engineer",
    inputs: &[Category::Request, Category::DesignSpec],
    outputs: &[Category::FrontendPlan],
    trigger: "A design spec is on the board, or its own plan can be refined.",
    policy: "Plan screens, components, client state and API calls. \
             Do not specify server internals.",
};

static BACKEND: CapabilityDescriptor = CapabilityDescriptor {
    role: Role::Backend,
    name: "Backend engineer",
    inputs: &[Category::Request, Category::DesignSpec],
    outputs: &[Category::BackendPlan],
    trigger: "A design spec is on the board, or its own plan can be refined.",
    policy: "Plan the data model, endpoints, persistence and operations. \
             Do not specify UI layout.",
};

impl CapabilityDescriptor {
    pub fn for_role(role: Role) -> &'static CapabilityDescriptor {
        match role {
            Role::Design => &DESIGN,
            Role::Frontend => &FRONTEND,
            Role::Backend => &BACKEND,
        }
    }

    /// Markdown block describing this capability.
    pub fn render(&self) -> String {
        let list = |cats: &[Category]| {
            cats.iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "## Role: {} ({})\n- Reads: {}\n- Writes: {}\n- Acts when: {}\n- Policy: {}",
            self.name,
            self.role,
            list(self.inputs),
            list(self.outputs),
            self.trigger,
            self.policy,
        )
    }
}
