use std::fmt;

use deskhive_schema::{FrustrationLevel, SessionState, SolutionResult};
use serde::Serialize;

/// Attempt threshold used when the config does not override it.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Why a conversation should be handed to a human. The variants are checked
/// in this order; any one of them is sufficient on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationTrigger {
    RepeatedFailures(u32),
    AlreadyRequested,
    UserAngry,
}

impl fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationTrigger::RepeatedFailures(count) => {
                write!(f, "{count} solution attempts were not helpful")
            }
            EscalationTrigger::AlreadyRequested => write!(f, "escalation was already requested"),
            EscalationTrigger::UserAngry => write!(f, "user frustration level is angry"),
        }
    }
}

/// First trigger that fires, or None when the conversation can stay
/// automated. Re-evaluating an already escalated conversation re-confirms
/// rather than re-triggering ticket creation.
pub fn evaluate(state: &SessionState, max_attempts: u32) -> Option<EscalationTrigger> {
    let failed = state.failed_attempts();
    if failed >= max_attempts {
        return Some(EscalationTrigger::RepeatedFailures(failed));
    }
    if state.escalation_requested {
        return Some(EscalationTrigger::AlreadyRequested);
    }
    if state.user_frustration_level == FrustrationLevel::Angry {
        return Some(EscalationTrigger::UserAngry);
    }
    None
}

pub fn should_escalate(state: &SessionState, max_attempts: u32) -> bool {
    evaluate(state, max_attempts).is_some()
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummary {
    pub solution: String,
    pub result: SolutionResult,
    pub agent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EscalationUserInfo {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_plan: Option<String>,
}

/// Context handed to the human reviewer alongside a ticket.
///
/// Built purely from the session snapshot so that the ticket content is
/// reproducible from state alone.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationContext {
    pub issue_summary: String,
    pub category: String,
    pub priority: String,
    pub error_type: Option<String>,
    pub attempted_solutions: Vec<AttemptSummary>,
    pub turn_count: u32,
    pub user_info: EscalationUserInfo,
    pub frustration_level: FrustrationLevel,
}

/// Project the session into the reviewer payload. Unclassified
/// conversations fall back to placeholder issue fields.
pub fn escalation_context(state: &SessionState) -> EscalationContext {
    let (issue_summary, category, priority, error_type) = match &state.issue {
        Some(issue) => (
            issue.description_summary.clone(),
            issue.category.clone(),
            issue.priority.clone(),
            issue.error_type.clone(),
        ),
        None => (
            "No summary available".to_string(),
            "unknown".to_string(),
            "medium".to_string(),
            None,
        ),
    };

    EscalationContext {
        issue_summary,
        category,
        priority,
        error_type,
        attempted_solutions: state
            .attempted_solutions
            .iter()
            .map(|attempt| AttemptSummary {
                solution: attempt.solution.clone(),
                result: attempt.result,
                agent: attempt.agent.clone(),
            })
            .collect(),
        turn_count: state.turn_count,
        user_info: EscalationUserInfo {
            user_id: state.user_id.clone(),
            user_name: state.user_name.clone(),
            user_plan: state.user_plan.clone(),
        },
        frustration_level: state.user_frustration_level,
    }
}
