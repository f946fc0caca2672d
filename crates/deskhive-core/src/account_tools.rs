//! Agent tools for account context and order lookups

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::directory::{OrderBook, UserDirectory, DEFAULT_USER_ID};
use crate::tool::{tool_error, tool_ok, ToolContext, ToolDef, ToolExecutor, ToolOutput};

pub const GET_USER_CONTEXT_TOOL_NAME: &str = "get_user_context";
pub const GET_ORDER_STATUS_TOOL_NAME: &str = "get_order_status";

pub struct UserContextTool {
    users: Arc<dyn UserDirectory>,
}

impl UserContextTool {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

#[derive(Debug, Deserialize)]
struct UserContextInput {
    #[serde(default)]
    user_id: Option<String>,
}

#[async_trait]
impl ToolExecutor for UserContextTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            name: GET_USER_CONTEXT_TOOL_NAME.to_string(),
            description: "Look up the user's account details, plan, and recent support history, and cache them on the conversation.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "User identifier; falls back to the demo account when omitted"
                    }
                }
            }),
        }
    }

    async fn execute(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let parsed: UserContextInput = serde_json::from_value(input)
            .map_err(|e| anyhow!("invalid get_user_context input: {e}"))?;

        let lookup_id = parsed
            .user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

        let Some(user) = self.users.find_user(&lookup_id).await? else {
            let body = json!({
                "status": "error",
                "error_message": format!("User '{lookup_id}' not found in the system"),
                "suggestion": "Please verify the user ID or proceed without user context",
            });
            return Ok(tool_error(serde_json::to_string_pretty(&body)?));
        };

        ctx.session()
            .set_user_info(&lookup_id, &user.name, &user.plan, &user.recent_tickets)
            .await?;

        let body = json!({
            "status": "success",
            "user": {
                "name": user.name,
                "email": user.email,
                "plan": user.plan,
                "account_status": user.account_status,
            },
            "support_context": {
                "recent_tickets": user.recent_tickets,
                "ticket_count": user.recent_tickets.len(),
            },
        });
        Ok(tool_ok(serde_json::to_string_pretty(&body)?))
    }
}

pub struct OrderStatusTool {
    orders: Arc<dyn OrderBook>,
}

impl OrderStatusTool {
    pub fn new(orders: Arc<dyn OrderBook>) -> Self {
        Self { orders }
    }
}

#[derive(Debug, Deserialize)]
struct OrderStatusInput {
    order_id: String,
}

#[async_trait]
impl ToolExecutor for OrderStatusTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            name: GET_ORDER_STATUS_TOOL_NAME.to_string(),
            description: "Retrieve the status of an order given its ID.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "order_id": {
                        "type": "string",
                        "description": "The order number (e.g. '101')"
                    }
                },
                "required": ["order_id"]
            }),
        }
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let parsed: OrderStatusInput = serde_json::from_value(input)
            .map_err(|e| anyhow!("invalid get_order_status input: {e}"))?;

        let Some(order) = self.orders.find_order(&parsed.order_id).await? else {
            let body = json!({
                "status": "error",
                "error_message": format!("Order ID {} not found.", parsed.order_id),
            });
            return Ok(tool_error(serde_json::to_string_pretty(&body)?));
        };

        let body = json!({
            "status": "found",
            "order_id": order.order_id,
            "item": order.item,
            "order_status": order.status,
            "message": format!(
                "Order {} ({}): Status - {}.",
                order.order_id, order.item, order.status
            ),
        });
        Ok(tool_ok(serde_json::to_string_pretty(&body)?))
    }
}
