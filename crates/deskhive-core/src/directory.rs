use anyhow::Result;
use async_trait::async_trait;
use deskhive_schema::{OrderRecord, UserProfile};

/// Looked up when no user id is supplied.
pub const DEFAULT_USER_ID: &str = "demo_user";

/// Account lookup for support context.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>>;
}

/// Order lookup for fulfillment questions.
#[async_trait]
pub trait OrderBook: Send + Sync {
    async fn find_order(&self, order_id: &str) -> Result<Option<OrderRecord>>;
}

/// Fixed demo accounts until a real CRM is plugged in.
pub struct StaticUserDirectory {
    users: Vec<UserProfile>,
}

fn user(
    user_id: &str,
    name: &str,
    email: &str,
    plan: &str,
    recent_tickets: &[&str],
) -> UserProfile {
    UserProfile {
        user_id: user_id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        plan: plan.to_string(),
        account_status: "active".to_string(),
        recent_tickets: recent_tickets.iter().map(|t| t.to_string()).collect(),
    }
}

impl StaticUserDirectory {
    pub fn seeded() -> Self {
        Self {
            users: vec![
                user(
                    "user_123",
                    "John Smith",
                    "john.smith@example.com",
                    "Pro",
                    &["TICKET-456", "TICKET-234"],
                ),
                user(
                    "user_456",
                    "Jane Doe",
                    "jane.doe@company.com",
                    "Enterprise",
                    &[],
                ),
                user(
                    "demo_user",
                    "Jack Sparrow",
                    "demo@example.com",
                    "Standard",
                    &["TICKET-789"],
                ),
            ],
        }
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.iter().find(|u| u.user_id == user_id).cloned())
    }
}

/// Fixed demo orders until a real fulfillment backend is plugged in.
pub struct StaticOrderBook {
    orders: Vec<OrderRecord>,
}

impl StaticOrderBook {
    pub fn seeded() -> Self {
        let order = |order_id: &str, status: &str, item: &str| OrderRecord {
            order_id: order_id.to_string(),
            status: status.to_string(),
            item: item.to_string(),
        };
        Self {
            orders: vec![
                order("101", "Delivered", "Smart Speaker"),
                order("102", "In Transit", "Pixel Buds Pro"),
                order("103", "Processing", "Phone Case"),
            ],
        }
    }
}

#[async_trait]
impl OrderBook for StaticOrderBook {
    async fn find_order(&self, order_id: &str) -> Result<Option<OrderRecord>> {
        Ok(self.orders.iter().find(|o| o.order_id == order_id).cloned())
    }
}
