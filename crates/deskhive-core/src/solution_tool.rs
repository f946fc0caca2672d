//! Agent tool for generating troubleshooting checklists

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::solutions;
use crate::tool::{tool_ok, ToolContext, ToolDef, ToolExecutor, ToolOutput};

pub const GENERATE_SOLUTION_STEPS_TOOL_NAME: &str = "generate_solution_steps";

pub struct SolutionStepsTool;

#[derive(Debug, Deserialize)]
struct SolutionStepsInput {
    error_type: String,
    #[serde(default)]
    context: Option<String>,
}

#[async_trait]
impl ToolExecutor for SolutionStepsTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            name: GENERATE_SOLUTION_STEPS_TOOL_NAME.to_string(),
            description: "Generate high-level troubleshooting steps for a given error type.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "error_type": {
                        "type": "string",
                        "description": "Kind of error being investigated (e.g. 'timeout', '500')"
                    },
                    "context": {
                        "type": "string",
                        "description": "Optional extra context about where the error occurs"
                    }
                },
                "required": ["error_type"]
            }),
        }
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let parsed: SolutionStepsInput = serde_json::from_value(input)
            .map_err(|e| anyhow!("invalid generate_solution_steps input: {e}"))?;

        let plan =
            solutions::generate_solution_steps(&parsed.error_type, parsed.context.as_deref());
        let body = json!({
            "status": "success",
            "error_type": plan.error_type,
            "context": plan.context,
            "steps": plan.steps,
            "summary": plan.summary,
        });
        Ok(tool_ok(serde_json::to_string_pretty(&body)?))
    }
}
