//! Console formatting for run progress and summaries.
//!
//! Progress goes to stdout as short one-line notices; tracing logs go to
//! stderr, so the two can be separated.

use chalkboard::coordinator::{AgentReport, RunReport};
use chalkboard::RunEvent;

/// One-line notice for a progress event.
pub fn event_line(event: &RunEvent) -> String {
    match event {
        RunEvent::RunStarted { request } => format!(
            "▶ Run started for request #{} ({} chars)",
            request.id,
            request.content.chars().count()
        ),
        RunEvent::CycleStarted { cycle } => format!("── cycle {cycle} ──"),
        RunEvent::AgentActed {
            role,
            trigger_id,
            message,
            iteration,
            summary,
            ..
        } => format!(
            "  [{role}] #{} {} (iteration {iteration}, re #{trigger_id}): {summary}",
            message.id, message.category
        ),
        RunEvent::AgentFailed {
            role,
            iteration,
            error,
            ..
        } => format!("  [{role}] ❌ iteration {iteration} failed: {error}"),
        RunEvent::CycleIdle { idle_cycles, .. } => {
            format!("  (idle, {idle_cycles} in a row)")
        }
        RunEvent::RunFinished {
            termination,
            cycles_run,
        } => format!("■ Run {termination} after {cycles_run} cycles"),
    }
}

fn agent_line(agent: &AgentReport) -> String {
    match (&agent.last_category, &agent.summary) {
        (Some(category), Some(summary)) => format!(
            "  {:<9} {}/{} iterations, last {category}: {summary}",
            agent.role, agent.iteration_count, agent.iteration_budget
        ),
        _ => format!(
            "  {:<9} {}/{} iterations, no output",
            agent.role, agent.iteration_count, agent.iteration_budget
        ),
    }
}

/// Multi-line per-role summary printed after a run.
pub fn summary(report: &RunReport) -> String {
    let mut lines = vec![format!(
        "Summary: {} messages, {} cycles, {}",
        report.board.len(),
        report.cycles_run,
        report.termination
    )];
    lines.extend(report.agents.iter().map(agent_line));
    lines.join("\n")
}

/// Full text of the newest artifact of each category, for `--show-artifacts`.
pub fn artifacts(report: &RunReport) -> String {
    let mut sections = Vec::new();
    for category in chalkboard::Category::ALL {
        if let Some(msg) = report.board.iter().rev().find(|m| m.category == category) {
            sections.push(format!(
                "=== {category} #{} by {} ===\n{}",
                msg.id, msg.author, msg.content
            ));
        }
    }
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chalkboard::{Category, Role, Termination};

    fn report() -> RunReport {
        RunReport {
            termination: Termination::IdleStopped,
            cycles_run: 6,
            agents: vec![
                AgentReport {
                    role: Role::Design,
                    iteration_count: 3,
                    iteration_budget: 3,
                    last_category: Some(Category::DesignSpec),
                    summary: Some("Recipe site".into()),
                },
                AgentReport {
                    role: Role::Frontend,
                    iteration_count: 0,
                    iteration_budget: 3,
                    last_category: None,
                    summary: None,
                },
            ],
            board: Vec::new(),
        }
    }

    #[test]
    fn summary_marks_agents_without_output() {
        let text = summary(&report());
        assert!(text.starts_with("Summary: 0 messages, 6 cycles, idle-stopped"));
        assert!(text.contains("design    3/3 iterations, last design-spec: Recipe site"));
        assert!(text.contains("frontend  0/3 iterations, no output"));
    }

    #[test]
    fn idle_and_finish_lines() {
        let idle = event_line(&RunEvent::CycleIdle { cycle: 4, idle_cycles: 1 });
        assert_eq!(idle, "  (idle, 1 in a row)");
        let done = event_line(&RunEvent::RunFinished {
            termination: Termination::BudgetExhausted,
            cycles_run: 20,
        });
        assert_eq!(done, "■ Run budget-exhausted after 20 cycles");
    }
}
