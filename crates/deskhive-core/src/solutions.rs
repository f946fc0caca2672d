use serde::Serialize;

/// Generic checklist handed out while a specialist narrows the issue down.
pub const TROUBLESHOOTING_STEPS: [&str; 5] = [
    "Review the full error message and recent changes.",
    "Check relevant logs or dashboards for more details.",
    "Verify configuration and credentials, if applicable.",
    "Try the simplest safe workaround or rollback.",
    "If the issue persists, collect details for escalation.",
];

#[derive(Debug, Clone, Serialize)]
pub struct SolutionPlan {
    pub error_type: String,
    pub context: Option<String>,
    pub steps: Vec<String>,
    pub summary: String,
}

pub fn generate_solution_steps(error_type: &str, context: Option<&str>) -> SolutionPlan {
    SolutionPlan {
        error_type: error_type.to_string(),
        context: context.map(str::to_string),
        steps: TROUBLESHOOTING_STEPS
            .iter()
            .map(|s| s.to_string())
            .collect(),
        summary: "Basic troubleshooting checklist generated for this error type.".to_string(),
    }
}
