//! Prompt construction for each role.

use crate::board::Board;
use crate::capability::CapabilityDescriptor;
use crate::generate::GenerationRequest;
use crate::message::{Author, Category, Message, Role};

const DESIGN_SYSTEM: &str = r#"You are the product designer on a small product team. Turn the operator's request into a design spec.

Cover:
- Purpose and target users
- Core features (bulleted)
- Key user flows
- Constraints and open questions

Be specific but brief. Output ONLY the spec, no preamble."#;

const FRONTEND_SYSTEM: &str = r#"You are the frontend engineer on a small product team. Turn the design spec into a frontend implementation plan.

Cover:
- Screens and navigation
- Component breakdown
- Client-side state
- API calls the UI needs

Be terse. Output ONLY the plan, no preamble."#;

const BACKEND_SYSTEM: &str = r#"You are the backend engineer on a small product team. Turn the design spec into a backend implementation plan.

Cover:
- Data model
- Endpoints (method, path, purpose)
- Persistence and integrations
- Deployment and operations

Be terse. Output ONLY the plan, no preamble."#;

fn system_prompt(role: Role) -> &'static str {
    match role {
        Role::Design => DESIGN_SYSTEM,
        Role::Frontend => FRONTEND_SYSTEM,
        Role::Backend => BACKEND_SYSTEM,
    }
}

/// Build the generation request for `role` reacting to `trigger`.
pub fn build(role: Role, trigger: &Message, board: &Board) -> GenerationRequest {
    let capability = CapabilityDescriptor::for_role(role);
    let refining = trigger.author == Author::Agent(role);

    let mut parts = vec![capability.render()];

    // The request is always relevant; everything else only if the role reads it.
    if let Some(request) = board.request()
        && request.id != trigger.id
    {
        parts.push(format!("## Request\n{}", request.content));
    }
    for category in capability.inputs {
        if *category == trigger.category || *category == Category::Request {
            continue;
        }
        if let Some(msg) = board.latest(*category) {
            parts.push(format!("## Latest {category} (#{})\n{}", msg.id, msg.content));
        }
    }

    if refining {
        parts.push(format!(
            "## Your previous {} (#{})\n{}",
            trigger.category, trigger.id, trigger.content
        ));
        parts.push(
            "Revise your previous output: fix gaps and inconsistencies with the material above. \
             Reply with the complete revised artifact."
                .to_string(),
        );
    } else {
        parts.push(format!(
            "## Trigger: {} from {} (#{})\n{}",
            trigger.category, trigger.author, trigger.id, trigger.content
        ));
        parts.push(format!("Write the {}.", role.output()));
    }

    GenerationRequest {
        role,
        instruction: system_prompt(role).to_string(),
        context: parts.join("\n\n"),
    }
}
