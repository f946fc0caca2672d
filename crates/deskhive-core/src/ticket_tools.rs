//! Agent tools for the ticket system: similarity search, status lookup,
//! creation, and team assignment.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::routing;
use crate::tickets::{TicketDesk, TicketHistorySearch, TicketRepository, TicketRequest};
use crate::tool::{tool_error, tool_ok, ToolContext, ToolDef, ToolExecutor, ToolOutput};
use deskhive_schema::TicketStatus;

pub const SEARCH_SIMILAR_TICKETS_TOOL_NAME: &str = "search_similar_tickets";
pub const GET_TICKET_STATUS_TOOL_NAME: &str = "get_ticket_status";
pub const CREATE_TICKET_TOOL_NAME: &str = "create_ticket";
pub const ASSIGN_TO_TEAM_TOOL_NAME: &str = "assign_to_team";

fn default_limit() -> usize {
    3
}

pub struct SearchSimilarTicketsTool {
    search: TicketHistorySearch,
}

impl SearchSimilarTicketsTool {
    pub fn new(search: TicketHistorySearch) -> Self {
        Self { search }
    }
}

#[derive(Debug, Deserialize)]
struct SearchSimilarTicketsInput {
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

#[async_trait]
impl ToolExecutor for SearchSimilarTicketsTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            name: SEARCH_SIMILAR_TICKETS_TOOL_NAME.to_string(),
            description: "Search previously resolved tickets for issues similar to the current one, returning their resolutions.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "description": {
                        "type": "string",
                        "description": "Description of the current issue"
                    },
                    "category": {
                        "type": "string",
                        "description": "Optional category filter (e.g. 'integration', 'billing')"
                    },
                    "limit": {
                        "type": "number",
                        "description": "Maximum number of results (default 3)"
                    }
                },
                "required": ["description"]
            }),
        }
    }

    async fn execute(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let parsed: SearchSimilarTicketsInput = serde_json::from_value(input)
            .map_err(|e| anyhow!("invalid search_similar_tickets input: {e}"))?;

        let results = self
            .search
            .search(&parsed.description, parsed.category.as_deref(), parsed.limit)
            .await?;

        let similar_tickets = results
            .iter()
            .map(|r| {
                json!({
                    "ticket_id": r.ticket.id,
                    "title": r.ticket.title,
                    "category": r.ticket.category,
                    "description": r.ticket.description,
                    "resolution": r
                        .ticket
                        .resolution
                        .as_deref()
                        .unwrap_or("No resolution recorded"),
                    "relevance_score": r.relevance_score,
                })
            })
            .collect::<Vec<_>>();

        let total_found = similar_tickets.len();
        let message = if total_found > 0 {
            let ticket_ids = results.iter().map(|r| r.ticket.id.clone()).collect();
            ctx.session().record_similar_tickets(ticket_ids).await?;
            format!("Found {total_found} similar resolved ticket(s) that may help")
        } else {
            "No similar resolved tickets found. This may be a new issue type.".to_string()
        };

        let body = json!({
            "status": "success",
            "similar_tickets": similar_tickets,
            "total_found": total_found,
            "message": message,
        });
        Ok(tool_ok(serde_json::to_string_pretty(&body)?))
    }
}

pub struct TicketStatusTool {
    tickets: Arc<dyn TicketRepository>,
}

impl TicketStatusTool {
    pub fn new(tickets: Arc<dyn TicketRepository>) -> Self {
        Self { tickets }
    }
}

#[derive(Debug, Deserialize)]
struct TicketStatusInput {
    ticket_id: String,
}

#[async_trait]
impl ToolExecutor for TicketStatusTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            name: GET_TICKET_STATUS_TOOL_NAME.to_string(),
            description: "Get the current status of a support ticket by its id.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ticket_id": {
                        "type": "string",
                        "description": "The ticket ID to look up (e.g. 'TICKET-789')"
                    }
                },
                "required": ["ticket_id"]
            }),
        }
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let parsed: TicketStatusInput = serde_json::from_value(input)
            .map_err(|e| anyhow!("invalid get_ticket_status input: {e}"))?;

        let Some(ticket) = self.tickets.find(&parsed.ticket_id).await? else {
            let body = json!({
                "status": "error",
                "error_message": format!("Ticket '{}' not found", parsed.ticket_id),
            });
            return Ok(tool_error(serde_json::to_string_pretty(&body)?));
        };

        let mut details = json!({
            "id": ticket.id,
            "title": ticket.title,
            "status": ticket.status,
            "priority": ticket.priority,
            "assigned_team": ticket.assigned_team,
            "created_at": ticket.created_at.to_rfc3339(),
        });
        if ticket.status == TicketStatus::Resolved {
            details["resolved_at"] = json!(ticket.resolved_at.map(|t| t.to_rfc3339()));
            details["resolution"] = json!(ticket.resolution);
        }

        let body = json!({
            "status": "success",
            "ticket": details,
        });
        Ok(tool_ok(serde_json::to_string_pretty(&body)?))
    }
}

pub struct CreateTicketTool {
    desk: TicketDesk,
}

impl CreateTicketTool {
    pub fn new(desk: TicketDesk) -> Self {
        Self { desk }
    }
}

#[derive(Debug, Deserialize)]
struct CreateTicketInput {
    summary: String,
    category: String,
    priority: String,
    description: String,
    #[serde(default)]
    attempted_solutions: Option<Vec<String>>,
    #[serde(default)]
    user_id: Option<String>,
}

#[async_trait]
impl ToolExecutor for CreateTicketTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            name: CREATE_TICKET_TOOL_NAME.to_string(),
            description: "Create a support ticket for human review, assign it to the owning team, and record the escalation on the conversation.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "Brief summary of the issue"
                    },
                    "category": {
                        "type": "string",
                        "description": "Issue category (e.g. 'integration', 'billing', 'bug_report')"
                    },
                    "priority": {
                        "type": "string",
                        "description": "Priority level: 'low', 'medium', 'high' or 'critical'"
                    },
                    "description": {
                        "type": "string",
                        "description": "Detailed description including context and error messages"
                    },
                    "attempted_solutions": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Solutions already tried; defaults to the session's recorded attempts"
                    },
                    "user_id": {
                        "type": "string",
                        "description": "User identifier; defaults to the session's user"
                    }
                },
                "required": ["summary", "category", "priority", "description"]
            }),
        }
    }

    async fn execute(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let parsed: CreateTicketInput = serde_json::from_value(input)
            .map_err(|e| anyhow!("invalid create_ticket input: {e}"))?;

        let created = self
            .desk
            .create(
                TicketRequest {
                    summary: parsed.summary,
                    category: parsed.category,
                    priority: parsed.priority,
                    description: parsed.description,
                    attempted_solutions: parsed.attempted_solutions,
                    user_id: parsed.user_id,
                },
                ctx.session(),
            )
            .await?;

        let body = json!({
            "status": "success",
            "ticket_id": created.ticket_id,
            "assigned_team": created.assigned_team,
            "estimated_response": format!("{} hour(s)", created.response_hours),
            "priority": created.priority,
            "message": format!(
                "Ticket {} created successfully and assigned to {}. Expected response within {} hour(s).",
                created.ticket_id, created.assigned_team, created.response_hours
            ),
        });
        Ok(tool_ok(serde_json::to_string_pretty(&body)?))
    }
}

pub struct AssignTeamTool;

#[derive(Debug, Deserialize)]
struct AssignTeamInput {
    category: String,
    priority: String,
}

#[async_trait]
impl ToolExecutor for AssignTeamTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            name: ASSIGN_TO_TEAM_TOOL_NAME.to_string(),
            description: "Determine which team should handle an issue based on category and priority, with SLA and escalation path.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": "Issue category (e.g. 'integration', 'billing')"
                    },
                    "priority": {
                        "type": "string",
                        "description": "Priority level (e.g. 'high', 'critical')"
                    }
                },
                "required": ["category", "priority"]
            }),
        }
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let parsed: AssignTeamInput = serde_json::from_value(input)
            .map_err(|e| anyhow!("invalid assign_to_team input: {e}"))?;

        let decision = routing::route(&parsed.category, &parsed.priority);
        let mut body = json!({
            "status": "success",
            "team": decision.team,
            "team_description": decision.team_description,
            "response_sla": format!("{} hours", decision.sla_hours),
            "escalation_path": decision.escalation_path,
        });
        if let Some(note) = decision.urgency_note {
            body["urgency_note"] = json!(note);
        }
        Ok(tool_ok(serde_json::to_string_pretty(&body)?))
    }
}
