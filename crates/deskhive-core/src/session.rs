use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use deskhive_memory::SessionStore;
use deskhive_schema::{
    AgentRole, AttemptedSolution, ConversationKey, ConversationStatus, FrustrationLevel, Issue,
    SessionState, SolutionResult,
};
use tracing::{debug, info, warn};

/// Hands out per-conversation state handles backed by a shared store.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Handle for one conversation. Does not touch the backend; the first
    /// `read`/`apply` on a conversation nobody created sees fresh defaults.
    pub fn state_store(&self, key: &ConversationKey) -> StateStore {
        StateStore {
            store: Arc::clone(&self.store),
            key: key.clone(),
        }
    }

    /// Load the conversation, persisting a fresh state when none exists yet.
    pub async fn get_or_create(
        &self,
        key: &ConversationKey,
        user_id: Option<&str>,
    ) -> Result<StateStore> {
        if self.store.load(key.as_str()).await?.is_none() {
            let state = SessionState::new(key.as_str().to_string(), user_id.map(str::to_string));
            self.store.save(&state).await?;
            info!(conversation_id = %key, "conversation started");
        }
        Ok(self.state_store(key))
    }

    pub async fn reset(&self, key: &ConversationKey) -> Result<bool> {
        let removed = self.store.delete(key.as_str()).await?;
        if removed {
            info!(conversation_id = %key, "conversation reset");
        }
        Ok(removed)
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        Ok(self.store.list_conversations().await?)
    }
}

/// Typed accessor for one conversation's state.
///
/// `read` and `apply` are the only primitives that touch the store; every
/// named mutator below is a closure over `apply`, so each mutation refreshes
/// `last_activity` and lands in the backend before the call returns. Handles
/// are cheap to clone and all clones for the same key see the same state.
#[derive(Clone)]
pub struct StateStore {
    store: Arc<dyn SessionStore>,
    key: ConversationKey,
}

impl StateStore {
    pub fn conversation_id(&self) -> &str {
        self.key.as_str()
    }

    /// Current state, or defaults when the conversation was never persisted.
    pub async fn read(&self) -> Result<SessionState> {
        let state = self.store.load(self.key.as_str()).await?;
        Ok(state.unwrap_or_else(|| SessionState::new(self.key.as_str().to_string(), None)))
    }

    /// Read-modify-write under one logical step. The closure sees the latest
    /// snapshot; `last_activity` is stamped after it runs.
    pub async fn apply<F>(&self, mutate: F) -> Result<SessionState>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.read().await?;
        mutate(&mut state);
        state.touch();
        self.store.save(&state).await?;
        Ok(state)
    }

    /// Classification outcome for this conversation's issue. Stamps
    /// `classified_at` here so callers only describe the issue.
    pub async fn set_issue(&self, mut issue: Issue) -> Result<()> {
        issue.classified_at = Utc::now();
        debug!(
            conversation_id = %self.key,
            category = %issue.category,
            priority = %issue.priority,
            "issue context set"
        );
        self.apply(move |state| state.issue = Some(issue)).await?;
        Ok(())
    }

    /// Append a tried solution and return the new attempt count.
    pub async fn add_attempted_solution(
        &self,
        solution: &str,
        agent: &str,
        result: SolutionResult,
        user_feedback: Option<&str>,
    ) -> Result<u32> {
        let attempt = AttemptedSolution {
            solution: solution.to_string(),
            agent: agent.to_string(),
            result,
            user_feedback: user_feedback.map(str::to_string),
            timestamp: Utc::now(),
        };
        let state = self
            .apply(move |state| {
                state.attempted_solutions.push(attempt);
                state.solution_attempts_count = state.attempted_solutions.len() as u32;
            })
            .await?;
        debug!(
            conversation_id = %self.key,
            attempts = state.solution_attempts_count,
            "solution attempt recorded"
        );
        Ok(state.solution_attempts_count)
    }

    /// Amend the outcome of the most recent attempt. No-op when nothing has
    /// been attempted yet.
    pub async fn update_solution_result(
        &self,
        result: SolutionResult,
        user_feedback: Option<&str>,
    ) -> Result<()> {
        let state = self.read().await?;
        if state.attempted_solutions.is_empty() {
            return Ok(());
        }
        self.apply(move |state| {
            if let Some(last) = state.attempted_solutions.last_mut() {
                last.result = result;
                if let Some(feedback) = user_feedback {
                    last.user_feedback = Some(feedback.to_string());
                }
            }
        })
        .await?;
        Ok(())
    }

    /// Record an escalation: flips the request flag, bumps the count, and
    /// moves the conversation to its terminal status. The ticket id binds on
    /// first escalation only.
    pub async fn set_escalation_requested(&self, ticket_id: Option<&str>) -> Result<()> {
        let state = self
            .apply(move |state| {
                state.escalation_requested = true;
                state.escalation_count += 1;
                state.status = ConversationStatus::Escalated;
                if state.ticket_id.is_none() {
                    state.ticket_id = ticket_id.map(str::to_string);
                }
            })
            .await?;
        info!(
            conversation_id = %self.key,
            escalation_count = state.escalation_count,
            ticket_id = ?state.ticket_id,
            "escalation recorded"
        );
        Ok(())
    }

    /// Cache the looked-up user profile on the session. `user_id` binds on
    /// first load and is never rewritten.
    pub async fn set_user_info(
        &self,
        user_id: &str,
        name: &str,
        plan: &str,
        recent_tickets: &[String],
    ) -> Result<()> {
        let user_id = user_id.to_string();
        let name = name.to_string();
        let plan = plan.to_string();
        let recent = recent_tickets.to_vec();
        self.apply(move |state| {
            if state.user_id.is_none() {
                state.user_id = Some(user_id);
            }
            state.user_name = Some(name);
            state.user_plan = Some(plan);
            state.recent_tickets = recent;
            state.user_context_loaded = true;
        })
        .await?;
        Ok(())
    }

    pub async fn record_frustration(&self, level: FrustrationLevel) -> Result<()> {
        self.apply(move |state| state.user_frustration_level = level)
            .await?;
        Ok(())
    }

    pub async fn record_kb_search(&self, query: &str) -> Result<()> {
        let query = query.to_string();
        self.apply(move |state| state.last_kb_search = Some(query))
            .await?;
        Ok(())
    }

    pub async fn record_similar_tickets(&self, ticket_ids: Vec<String>) -> Result<()> {
        self.apply(move |state| state.last_similar_tickets = ticket_ids)
            .await?;
        Ok(())
    }

    pub async fn increment_turn(&self) -> Result<u32> {
        let state = self.apply(|state| state.turn_count += 1).await?;
        Ok(state.turn_count)
    }

    pub async fn increment_clarifying_questions(&self) -> Result<u32> {
        let state = self
            .apply(|state| state.clarifying_questions_asked += 1)
            .await?;
        Ok(state.clarifying_questions_asked)
    }

    /// Move the conversation to a new status. `Escalated` is terminal for
    /// automated handling; attempts to leave it are ignored.
    pub async fn set_status(&self, status: ConversationStatus) -> Result<()> {
        let current = self.read().await?;
        if current.status == ConversationStatus::Escalated && status != ConversationStatus::Escalated
        {
            warn!(
                conversation_id = %self.key,
                requested = %status,
                "ignoring status change on escalated conversation"
            );
            return Ok(());
        }
        self.apply(move |state| state.status = status).await?;
        Ok(())
    }

    pub async fn set_current_agent(&self, agent: AgentRole) -> Result<()> {
        self.apply(move |state| state.current_agent = agent).await?;
        Ok(())
    }

    pub async fn mark_triage_complete(&self) -> Result<()> {
        self.apply(|state| state.triage_complete = true).await?;
        Ok(())
    }

    pub async fn mark_specialist_engaged(&self) -> Result<()> {
        self.apply(|state| state.specialist_engaged = true).await?;
        Ok(())
    }

    pub async fn mark_system_status_checked(&self) -> Result<()> {
        self.apply(|state| state.system_status_checked = true).await?;
        Ok(())
    }
}
