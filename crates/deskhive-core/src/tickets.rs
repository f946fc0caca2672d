use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use deskhive_schema::{TicketRecord, TicketStatus};
use rand::Rng;
use tracing::{debug, info};

use crate::routing;
use crate::session::StateStore;

/// Backing store for support tickets, historic and newly created.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Resolved tickets in corpus order, for similarity search.
    async fn resolved_tickets(&self) -> Result<Vec<TicketRecord>>;

    async fn find(&self, ticket_id: &str) -> Result<Option<TicketRecord>>;

    /// Insert if the id is free; returns false on collision. The check and
    /// the insert happen under one lock so concurrent creates cannot end up
    /// sharing an id.
    async fn try_insert(&self, ticket: TicketRecord) -> Result<bool>;
}

/// In-process ticket corpus. Seeds stand in for a real ticketing backend;
/// created tickets are appended and survive for the process lifetime.
pub struct InMemoryTicketSystem {
    tickets: RwLock<Vec<TicketRecord>>,
}

fn seed_time(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn resolved_seed(
    id: &str,
    title: &str,
    category: &str,
    priority: &str,
    team: &str,
    created_at: DateTime<Utc>,
    resolved_at: DateTime<Utc>,
    description: &str,
    resolution: &str,
) -> TicketRecord {
    TicketRecord {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        priority: priority.to_string(),
        status: TicketStatus::Resolved,
        assigned_team: team.to_string(),
        created_at,
        resolved_at: Some(resolved_at),
        description: description.to_string(),
        resolution: Some(resolution.to_string()),
        attempted_solutions: Vec::new(),
        user_id: None,
        frustration_level: None,
        turn_count: None,
    }
}

impl InMemoryTicketSystem {
    pub fn new() -> Self {
        Self {
            tickets: RwLock::new(Vec::new()),
        }
    }

    pub fn seeded() -> Self {
        let tickets = vec![
            resolved_seed(
                "TICKET-789",
                "Cannot connect to API",
                "integration",
                "high",
                "integration_team",
                seed_time(2024, 12, 20, 10, 0),
                seed_time(2024, 12, 20, 14, 30),
                "User unable to authenticate with API using provided key",
                "API key was for test environment, provided production key",
            ),
            resolved_seed(
                "TICKET-456",
                "Webhook events not received",
                "integration",
                "high",
                "integration_team",
                seed_time(2024, 11, 15, 8, 0),
                seed_time(2024, 11, 15, 12, 0),
                "Customer's webhook endpoint stopped receiving events after API v2 update",
                "Webhook secret was regenerated during API update. Customer needed to update their verification code with new secret.",
            ),
            resolved_seed(
                "TICKET-234",
                "Billing discrepancy",
                "billing",
                "medium",
                "finance_team",
                seed_time(2024, 10, 5, 14, 0),
                seed_time(2024, 10, 6, 9, 0),
                "Customer charged twice for the same month",
                "Duplicate charge refunded, billing system bug fixed",
            ),
            resolved_seed(
                "TICKET-567",
                "Performance degradation on dashboard",
                "performance",
                "medium",
                "infrastructure_team",
                seed_time(2024, 11, 20, 16, 0),
                seed_time(2024, 11, 21, 10, 0),
                "Dashboard loading very slowly, 10+ seconds per page",
                "Database index added, caching layer implemented",
            ),
        ];
        Self {
            tickets: RwLock::new(tickets),
        }
    }
}

impl Default for InMemoryTicketSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketSystem {
    async fn resolved_tickets(&self) -> Result<Vec<TicketRecord>> {
        let tickets = self
            .tickets
            .read()
            .map_err(|_| anyhow!("ticket corpus lock poisoned"))?;
        Ok(tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Resolved)
            .cloned()
            .collect())
    }

    async fn find(&self, ticket_id: &str) -> Result<Option<TicketRecord>> {
        let tickets = self
            .tickets
            .read()
            .map_err(|_| anyhow!("ticket corpus lock poisoned"))?;
        Ok(tickets.iter().find(|t| t.id == ticket_id).cloned())
    }

    async fn try_insert(&self, ticket: TicketRecord) -> Result<bool> {
        let mut tickets = self
            .tickets
            .write()
            .map_err(|_| anyhow!("ticket corpus lock poisoned"))?;
        if tickets.iter().any(|t| t.id == ticket.id) {
            return Ok(false);
        }
        tickets.push(ticket);
        Ok(true)
    }
}

/// A historic ticket together with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredTicket {
    pub ticket: TicketRecord,
    pub relevance_score: u32,
}

/// Score one resolved ticket against the issue description's word set.
///
/// Per word longer than three characters: +3 for a title hit, +1 for a
/// description hit, both plain substring checks. When a category filter is
/// active, matching tickets get +2 on top.
pub fn score_ticket(
    ticket: &TicketRecord,
    description_words: &HashSet<&str>,
    category: Option<&str>,
) -> u32 {
    let title_lower = ticket.title.to_lowercase();
    let desc_lower = ticket.description.to_lowercase();
    let mut score = 0;

    for word in description_words {
        if word.chars().count() > 3 && title_lower.contains(word) {
            score += 3;
        }
    }
    for word in description_words {
        if word.chars().count() > 3 && desc_lower.contains(word) {
            score += 1;
        }
    }
    if let Some(category) = category {
        if ticket.category == category {
            score += 2;
        }
    }

    score
}

/// Ranked similarity search over resolved tickets.
#[derive(Clone)]
pub struct TicketHistorySearch {
    repo: Arc<dyn TicketRepository>,
}

impl TicketHistorySearch {
    pub fn new(repo: Arc<dyn TicketRepository>) -> Self {
        Self { repo }
    }

    /// Top `limit` resolved tickets with a positive score, best first. A
    /// category filter drops non-matching tickets before scoring. Ties keep
    /// corpus order.
    pub async fn search(
        &self,
        description: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredTicket>> {
        let description_lower = description.to_lowercase();
        let words: HashSet<&str> = description_lower.split_whitespace().collect();

        let mut scored = Vec::new();
        for ticket in self.repo.resolved_tickets().await? {
            if let Some(category) = category {
                if ticket.category != category {
                    continue;
                }
            }
            let score = score_ticket(&ticket, &words, category);
            if score > 0 {
                scored.push(ScoredTicket {
                    ticket,
                    relevance_score: score,
                });
            }
        }

        scored.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
        scored.truncate(limit);
        debug!(found = scored.len(), "ticket history searched");
        Ok(scored)
    }
}

/// Everything needed to open a ticket for human review.
#[derive(Debug, Clone)]
pub struct TicketRequest {
    pub summary: String,
    pub category: String,
    pub priority: String,
    pub description: String,
    pub attempted_solutions: Option<Vec<String>>,
    pub user_id: Option<String>,
}

/// Outcome of ticket creation, ready for envelope formatting.
#[derive(Debug, Clone)]
pub struct CreatedTicket {
    pub ticket_id: String,
    pub assigned_team: String,
    pub response_hours: u32,
    pub priority: String,
}

fn generate_ticket_id() -> String {
    let number = rand::thread_rng().gen_range(1000..=9999);
    format!("TICKET-{number}")
}

/// Creates tickets: fills in whatever the request left out from session
/// state, picks the owning team, and records the escalation back on the
/// conversation.
#[derive(Clone)]
pub struct TicketDesk {
    repo: Arc<dyn TicketRepository>,
}

impl TicketDesk {
    pub fn new(repo: Arc<dyn TicketRepository>) -> Self {
        Self { repo }
    }

    /// Open a new ticket. Candidate ids are re-rolled until one is free;
    /// the small keyspace makes collisions a real possibility, so the loop
    /// is load-bearing, not paranoia. Creation itself cannot fail for valid
    /// inputs.
    pub async fn create(
        &self,
        request: TicketRequest,
        session: &StateStore,
    ) -> Result<CreatedTicket> {
        let state = session.read().await?;

        let attempted_solutions = match request.attempted_solutions {
            Some(list) if !list.is_empty() => list,
            _ => state
                .attempted_solutions
                .iter()
                .map(|a| a.solution.clone())
                .collect(),
        };
        let user_id = request
            .user_id
            .filter(|id| !id.is_empty())
            .or_else(|| state.user_id.clone());

        let assigned_team = routing::team_for_category(&request.category).to_string();
        let response_hours = routing::sla_hours(&request.priority);

        let mut ticket = TicketRecord {
            id: String::new(),
            title: request.summary,
            category: request.category,
            priority: request.priority.clone(),
            status: TicketStatus::Open,
            assigned_team: assigned_team.clone(),
            created_at: Utc::now(),
            resolved_at: None,
            description: request.description,
            resolution: None,
            attempted_solutions,
            user_id,
            frustration_level: Some(state.user_frustration_level),
            turn_count: Some(state.turn_count),
        };

        loop {
            ticket.id = generate_ticket_id();
            if self.repo.try_insert(ticket.clone()).await? {
                break;
            }
            debug!(candidate = %ticket.id, "ticket id collision, re-rolling");
        }

        session.set_escalation_requested(Some(&ticket.id)).await?;
        info!(
            ticket_id = %ticket.id,
            team = %assigned_team,
            priority = %request.priority,
            "ticket created"
        );

        Ok(CreatedTicket {
            ticket_id: ticket.id,
            assigned_team,
            response_hours,
            priority: request.priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionManager;
    use deskhive_memory::MemorySessionStore;
    use deskhive_schema::{ConversationKey, SolutionResult};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn history() -> TicketHistorySearch {
        TicketHistorySearch::new(Arc::new(InMemoryTicketSystem::seeded()))
    }

    async fn test_session() -> StateStore {
        let manager = SessionManager::new(Arc::new(MemorySessionStore::new()));
        manager
            .get_or_create(&ConversationKey::generate(), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn webhook_search_finds_historic_incident() {
        let results = history()
            .search("webhook endpoint not receiving events", None, 3)
            .await
            .unwrap();
        assert!(results.iter().any(|r| r.ticket.id == "TICKET-456"));
    }

    #[tokio::test]
    async fn category_filter_drops_other_tickets() {
        let results = history()
            .search("billing charged twice", Some("billing"), 3)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ticket.id, "TICKET-234");
        for result in &results {
            assert_eq!(result.ticket.category, "billing");
        }
    }

    #[tokio::test]
    async fn category_match_boosts_score() {
        let seeds = InMemoryTicketSystem::seeded();
        let ticket = seeds.find("TICKET-234").await.unwrap().unwrap();
        let words: HashSet<&str> = "billing charged twice".split_whitespace().collect();

        let unfiltered = score_ticket(&ticket, &words, None);
        let filtered = score_ticket(&ticket, &words, Some("billing"));
        assert_eq!(filtered, unfiltered + 2);
    }

    #[tokio::test]
    async fn open_tickets_are_not_searchable() {
        let repo = Arc::new(InMemoryTicketSystem::seeded());
        let desk = TicketDesk::new(Arc::clone(&repo) as Arc<dyn TicketRepository>);
        let session = test_session().await;
        let created = desk
            .create(
                TicketRequest {
                    summary: "Webhook events not received".to_string(),
                    category: "integration".to_string(),
                    priority: "high".to_string(),
                    description: "webhook endpoint stopped receiving events".to_string(),
                    attempted_solutions: None,
                    user_id: None,
                },
                &session,
            )
            .await
            .unwrap();

        let search = TicketHistorySearch::new(repo);
        let results = search
            .search("webhook endpoint not receiving events", None, 10)
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.ticket.id != created.ticket_id));
    }

    #[tokio::test]
    async fn created_ids_are_unique_and_fresh() {
        let repo = Arc::new(InMemoryTicketSystem::seeded());
        let desk = TicketDesk::new(Arc::clone(&repo) as Arc<dyn TicketRepository>);
        let session = test_session().await;

        let request = TicketRequest {
            summary: "API keeps timing out".to_string(),
            category: "bug_report".to_string(),
            priority: "high".to_string(),
            description: "Requests time out after 30s".to_string(),
            attempted_solutions: None,
            user_id: None,
        };
        let first = desk.create(request.clone(), &session).await.unwrap();
        let second = desk.create(request, &session).await.unwrap();

        assert_ne!(first.ticket_id, second.ticket_id);
        for id in [&first.ticket_id, &second.ticket_id] {
            assert!(id.starts_with("TICKET-"));
            let number: u32 = id.trim_start_matches("TICKET-").parse().unwrap();
            assert!((1000..=9999).contains(&number));
            assert!(!matches!(
                id.as_str(),
                "TICKET-789" | "TICKET-456" | "TICKET-234" | "TICKET-567"
            ));
        }
    }

    #[tokio::test]
    async fn create_fills_gaps_from_session_state() {
        let repo = Arc::new(InMemoryTicketSystem::new());
        let desk = TicketDesk::new(Arc::clone(&repo) as Arc<dyn TicketRepository>);
        let session = test_session().await;

        session
            .set_user_info("user_123", "John Smith", "Pro", &[])
            .await
            .unwrap();
        session
            .add_attempted_solution("regenerate secret", "specialist", SolutionResult::NotHelpful, None)
            .await
            .unwrap();
        session.increment_turn().await.unwrap();

        let created = desk
            .create(
                TicketRequest {
                    summary: "Webhook still failing".to_string(),
                    category: "integration".to_string(),
                    priority: "medium".to_string(),
                    description: "Signature mismatch persists".to_string(),
                    attempted_solutions: None,
                    user_id: None,
                },
                &session,
            )
            .await
            .unwrap();

        let stored = repo.find(&created.ticket_id).await.unwrap().unwrap();
        assert_eq!(stored.user_id.as_deref(), Some("user_123"));
        assert_eq!(stored.attempted_solutions, vec!["regenerate secret"]);
        assert_eq!(stored.turn_count, Some(1));
        assert_eq!(stored.status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn create_records_escalation_on_session() {
        let desk = TicketDesk::new(Arc::new(InMemoryTicketSystem::new()));
        let session = test_session().await;

        let created = desk
            .create(
                TicketRequest {
                    summary: "Cannot log in".to_string(),
                    category: "password_reset".to_string(),
                    priority: "low".to_string(),
                    description: "Reset email never arrives".to_string(),
                    attempted_solutions: Some(vec!["checked spam".to_string()]),
                    user_id: Some("user_456".to_string()),
                },
                &session,
            )
            .await
            .unwrap();

        assert_eq!(created.assigned_team, "account_team");
        assert_eq!(created.response_hours, 24);

        let state = session.read().await.unwrap();
        assert!(state.escalation_requested);
        assert_eq!(state.escalation_count, 1);
        assert_eq!(state.ticket_id.as_deref(), Some(created.ticket_id.as_str()));
        assert_eq!(
            state.status,
            deskhive_schema::ConversationStatus::Escalated
        );
    }

    struct CollidingRepo {
        rejections_left: AtomicU32,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl TicketRepository for CollidingRepo {
        async fn resolved_tickets(&self) -> Result<Vec<TicketRecord>> {
            Ok(Vec::new())
        }

        async fn find(&self, _ticket_id: &str) -> Result<Option<TicketRecord>> {
            Ok(None)
        }

        async fn try_insert(&self, _ticket: TicketRecord) -> Result<bool> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let rejected = self
                .rejections_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            Ok(!rejected)
        }
    }

    #[tokio::test]
    async fn id_collisions_are_rerolled() {
        let repo = Arc::new(CollidingRepo {
            rejections_left: AtomicU32::new(2),
            attempts: AtomicU32::new(0),
        });
        let desk = TicketDesk::new(Arc::clone(&repo) as Arc<dyn TicketRepository>);
        let session = test_session().await;

        let created = desk
            .create(
                TicketRequest {
                    summary: "collision test".to_string(),
                    category: "bug_report".to_string(),
                    priority: "low".to_string(),
                    description: "".to_string(),
                    attempted_solutions: None,
                    user_id: None,
                },
                &session,
            )
            .await
            .unwrap();

        assert_eq!(repo.attempts.load(Ordering::SeqCst), 3);
        assert!(created.ticket_id.starts_with("TICKET-"));
    }
}
