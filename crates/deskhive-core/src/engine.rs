//! Engine façade: owns the session manager, the tool registry, and the
//! evidence gatherer, and exposes the operations the LLM layer calls.

use std::sync::Arc;

use anyhow::Result;
use deskhive_memory::SessionStore;
use deskhive_schema::{ConversationKey, ConversationStatus, SessionState};
use serde_json::json;
use tracing::{info, warn};

use crate::account_tools::{OrderStatusTool, UserContextTool};
use crate::config::DeskhiveConfig;
use crate::directory::{OrderBook, StaticOrderBook, StaticUserDirectory, UserDirectory};
use crate::escalation::{self, EscalationContext, EscalationTrigger};
use crate::evidence::{EvidenceGatherer, EvidenceReport, ExternalProbe, NoExternalProbe};
use crate::frustration;
use crate::knowledge::{KnowledgeRepository, KnowledgeSearch, StaticKnowledgeBase};
use crate::knowledge_tools::{FaqAnswerTool, SearchKnowledgeBaseTool};
use crate::session::{SessionManager, StateStore};
use crate::solution_tool::SolutionStepsTool;
use crate::ticket_tools::{
    AssignTeamTool, CreateTicketTool, SearchSimilarTicketsTool, TicketStatusTool,
};
use crate::tickets::{InMemoryTicketSystem, TicketDesk, TicketHistorySearch, TicketRepository};
use crate::tool::{tool_error, ToolContext, ToolDef, ToolOutput, ToolRegistry};

pub struct SupportEngine {
    config: DeskhiveConfig,
    sessions: SessionManager,
    registry: ToolRegistry,
    evidence: EvidenceGatherer,
}

impl SupportEngine {
    /// Engine over the built-in corpora. Conversations persist through the
    /// given store.
    pub fn new(config: DeskhiveConfig, store: Arc<dyn SessionStore>) -> Self {
        Self::with_sources(
            config,
            store,
            Arc::new(StaticKnowledgeBase::seeded()),
            Arc::new(InMemoryTicketSystem::seeded()),
            Arc::new(StaticUserDirectory::seeded()),
            Arc::new(StaticOrderBook::seeded()),
            Arc::new(NoExternalProbe),
        )
    }

    /// Engine over injected data sources. This is the seam real backends
    /// plug into; scoring and policy code never notices the difference.
    pub fn with_sources(
        config: DeskhiveConfig,
        store: Arc<dyn SessionStore>,
        knowledge: Arc<dyn KnowledgeRepository>,
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserDirectory>,
        orders: Arc<dyn OrderBook>,
        probe: Arc<dyn ExternalProbe>,
    ) -> Self {
        let sessions = SessionManager::new(store);
        let kb_search = KnowledgeSearch::new(Arc::clone(&knowledge));
        let history = TicketHistorySearch::new(Arc::clone(&tickets));
        let desk = TicketDesk::new(Arc::clone(&tickets));

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UserContextTool::new(users)));
        registry.register(Box::new(SearchKnowledgeBaseTool::new(kb_search.clone())));
        registry.register(Box::new(FaqAnswerTool::new(kb_search.clone())));
        registry.register(Box::new(SearchSimilarTicketsTool::new(history.clone())));
        registry.register(Box::new(TicketStatusTool::new(Arc::clone(&tickets))));
        registry.register(Box::new(CreateTicketTool::new(desk)));
        registry.register(Box::new(AssignTeamTool));
        registry.register(Box::new(OrderStatusTool::new(orders)));
        registry.register(Box::new(SolutionStepsTool));

        let evidence = EvidenceGatherer::new(kb_search, history, probe, config.search.clone());

        Self {
            config,
            sessions,
            registry,
            evidence,
        }
    }

    pub fn config(&self) -> &DeskhiveConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Definitions for every registered tool, for the LLM layer to
    /// advertise.
    pub fn tool_definitions(&self) -> Vec<ToolDef> {
        self.registry.tool_defs()
    }

    pub async fn start_conversation(
        &self,
        key: &ConversationKey,
        user_id: Option<&str>,
    ) -> Result<StateStore> {
        self.sessions.get_or_create(key, user_id).await
    }

    /// Intake for one inbound user message: bumps the turn counter, runs
    /// frustration detection, and moves a dormant conversation back in
    /// progress, all in one state update.
    pub async fn record_user_message(
        &self,
        key: &ConversationKey,
        text: &str,
    ) -> Result<SessionState> {
        let session = self.sessions.get_or_create(key, None).await?;
        let level = frustration::classify(text);
        let state = session
            .apply(move |state| {
                state.turn_count += 1;
                state.user_frustration_level = level;
                if matches!(
                    state.status,
                    ConversationStatus::New | ConversationStatus::AwaitingUser
                ) {
                    state.status = ConversationStatus::InProgress;
                }
            })
            .await?;
        if state.is_frustrated() {
            info!(
                conversation_id = %key,
                turn = state.turn_count,
                level = %state.user_frustration_level,
                "user frustration detected"
            );
        }
        Ok(state)
    }

    /// Consult the escalation policy for this conversation.
    pub async fn check_escalation(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<EscalationTrigger>> {
        let state = self.sessions.state_store(key).read().await?;
        let trigger = escalation::evaluate(&state, self.config.escalation.max_attempts);
        if let Some(trigger) = &trigger {
            info!(conversation_id = %key, reason = %trigger, "escalation recommended");
        }
        Ok(trigger)
    }

    /// Reviewer payload for handing this conversation to a human.
    pub async fn escalation_context(&self, key: &ConversationKey) -> Result<EscalationContext> {
        let state = self.sessions.state_store(key).read().await?;
        Ok(escalation::escalation_context(&state))
    }

    /// Run the concurrent evidence lookups for this conversation.
    pub async fn gather_evidence(
        &self,
        key: &ConversationKey,
        query: &str,
        category: Option<&str>,
    ) -> Result<EvidenceReport> {
        let session = self.sessions.get_or_create(key, None).await?;
        self.evidence.gather(&session, query, category).await
    }

    /// Execute a registered tool on behalf of a conversation. Failures are
    /// folded into an error envelope; this cannot abort the turn.
    pub async fn execute_tool(
        &self,
        key: &ConversationKey,
        name: &str,
        input: serde_json::Value,
    ) -> Result<ToolOutput> {
        let session = self.sessions.get_or_create(key, None).await?;
        let ctx = ToolContext::new(session);
        match self.registry.execute(name, input, &ctx).await {
            Ok(output) => Ok(output),
            Err(error) => {
                warn!(tool = name, %error, "tool execution failed");
                let body = json!({
                    "status": "error",
                    "error_message": error.to_string(),
                });
                Ok(tool_error(serde_json::to_string_pretty(&body)?))
            }
        }
    }
}
