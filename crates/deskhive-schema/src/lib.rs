use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version of the persisted session snapshot shape. Bump when a field
/// changes meaning; added fields only need a serde default.
pub const STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConversationKey(pub String);

impl ConversationKey {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConversationKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConversationKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    New,
    InProgress,
    AwaitingUser,
    Resolved,
    Escalated,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::New => "new",
            ConversationStatus::InProgress => "in_progress",
            ConversationStatus::AwaitingUser => "awaiting_user",
            ConversationStatus::Resolved => "resolved",
            ConversationStatus::Escalated => "escalated",
        }
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which collaborator currently owns the turn. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    #[default]
    Orchestrator,
    Triage,
    Specialist,
    Escalation,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Orchestrator => "orchestrator",
            AgentRole::Triage => "triage",
            AgentRole::Specialist => "specialist",
            AgentRole::Escalation => "escalation",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrustrationLevel {
    #[default]
    Normal,
    Frustrated,
    Angry,
}

impl FrustrationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrustrationLevel::Normal => "normal",
            FrustrationLevel::Frustrated => "frustrated",
            FrustrationLevel::Angry => "angry",
        }
    }
}

impl std::fmt::Display for FrustrationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolutionResult {
    Helpful,
    NotHelpful,
    PartiallyHelpful,
    #[default]
    Pending,
}

impl SolutionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolutionResult::Helpful => "helpful",
            SolutionResult::NotHelpful => "not_helpful",
            SolutionResult::PartiallyHelpful => "partially_helpful",
            SolutionResult::Pending => "pending",
        }
    }
}

impl std::fmt::Display for SolutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded solution attempt. Append-only in the session; only the
/// last entry's result/feedback may be amended afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptedSolution {
    pub solution: String,
    pub agent: String,
    #[serde(default)]
    pub result: SolutionResult,
    #[serde(default)]
    pub user_feedback: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Structured classification of the user's issue. Overwritten wholesale
/// on reclassification, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub category: String,
    pub priority: String,
    pub confidence: f32,
    pub description_summary: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub affected_service: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_timestamp")]
    pub classified_at: DateTime<Utc>,
}

/// The authoritative per-conversation record. Every field carries a
/// default so that old or partial snapshots load cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub schema_version: u32,
    pub conversation_id: String,
    pub user_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub status: ConversationStatus,
    pub current_agent: AgentRole,
    pub turn_count: u32,
    pub issue: Option<Issue>,
    pub attempted_solutions: Vec<AttemptedSolution>,
    pub solution_attempts_count: u32,
    pub escalation_count: u32,
    pub escalation_requested: bool,
    pub ticket_id: Option<String>,
    pub triage_complete: bool,
    pub specialist_engaged: bool,
    pub clarifying_questions_asked: u32,
    pub last_kb_search: Option<String>,
    pub last_similar_tickets: Vec<String>,
    pub system_status_checked: bool,
    pub user_context_loaded: bool,
    pub user_name: Option<String>,
    pub user_plan: Option<String>,
    pub recent_tickets: Vec<String>,
    pub user_frustration_level: FrustrationLevel,
}

impl Default for SessionState {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            conversation_id: String::new(),
            user_id: None,
            started_at: now,
            last_activity: now,
            status: ConversationStatus::default(),
            current_agent: AgentRole::default(),
            turn_count: 0,
            issue: None,
            attempted_solutions: Vec::new(),
            solution_attempts_count: 0,
            escalation_count: 0,
            escalation_requested: false,
            ticket_id: None,
            triage_complete: false,
            specialist_engaged: false,
            clarifying_questions_asked: 0,
            last_kb_search: None,
            last_similar_tickets: Vec::new(),
            system_status_checked: false,
            user_context_loaded: false,
            user_name: None,
            user_plan: None,
            recent_tickets: Vec::new(),
            user_frustration_level: FrustrationLevel::default(),
        }
    }
}

impl SessionState {
    pub fn new(conversation_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id,
            ..Self::default()
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Attempts whose result the user reported as not helpful.
    pub fn failed_attempts(&self) -> u32 {
        self.attempted_solutions
            .iter()
            .filter(|s| s.result == SolutionResult::NotHelpful)
            .count() as u32
    }

    pub fn is_frustrated(&self) -> bool {
        self.user_frustration_level != FrustrationLevel::Normal
    }

    pub fn summary(&self) -> StateSummary {
        StateSummary {
            status: self.status,
            current_agent: self.current_agent,
            turn_count: self.turn_count,
            issue_category: self.issue.as_ref().map(|i| i.category.clone()),
            solutions_tried: self.attempted_solutions.len(),
            escalation_count: self.escalation_count,
            user_frustrated: self.is_frustrated(),
            ticket_id: self.ticket_id.clone(),
        }
    }
}

/// Compact state view for logging and operator commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSummary {
    pub status: ConversationStatus,
    pub current_agent: AgentRole,
    pub turn_count: u32,
    pub issue_category: Option<String>,
    pub solutions_tried: usize,
    pub escalation_count: u32,
    pub user_frustrated: bool,
    pub ticket_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeArticle {
    pub id: String,
    pub title: String,
    pub category: String,
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub topic: String,
    pub answer: String,
}

/// A support ticket. Seeded history entries carry a resolution; tickets
/// created mid-conversation carry the session snapshot fields instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub priority: String,
    pub status: TicketStatus,
    pub assigned_team: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    pub description: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub attempted_solutions: Vec<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub frustration_level: Option<FrustrationLevel>,
    #[serde(default)]
    pub turn_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub plan: String,
    pub account_status: String,
    #[serde(default)]
    pub recent_tickets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub status: String,
    pub item: String,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_clean() {
        let state = SessionState::new("conv-1", Some("user_123".into()));
        assert_eq!(state.conversation_id, "conv-1");
        assert_eq!(state.user_id.as_deref(), Some("user_123"));
        assert_eq!(state.status, ConversationStatus::New);
        assert_eq!(state.current_agent, AgentRole::Orchestrator);
        assert_eq!(state.turn_count, 0);
        assert!(state.attempted_solutions.is_empty());
        assert_eq!(state.solution_attempts_count, 0);
        assert!(!state.escalation_requested);
        assert_eq!(state.ticket_id, None);
        assert_eq!(state.user_frustration_level, FrustrationLevel::Normal);
        assert_eq!(state.schema_version, STATE_SCHEMA_VERSION);
    }

    #[test]
    fn snapshot_backward_compat() {
        // Old snapshots may predate most fields; everything missing must
        // resolve to its documented default.
        let old_json = r#"{
            "conversation_id": "conv-old",
            "started_at": "2025-02-12T10:00:00Z",
            "last_activity": "2025-02-12T10:05:00Z",
            "status": "in_progress",
            "turn_count": 4
        }"#;

        let state: SessionState = serde_json::from_str(old_json).unwrap();
        assert_eq!(state.conversation_id, "conv-old");
        assert_eq!(state.status, ConversationStatus::InProgress);
        assert_eq!(state.turn_count, 4);
        assert_eq!(state.user_id, None);
        assert!(state.attempted_solutions.is_empty());
        assert_eq!(state.escalation_count, 0);
        assert!(!state.escalation_requested);
        assert_eq!(state.user_frustration_level, FrustrationLevel::Normal);
        assert!(state.last_similar_tickets.is_empty());
    }

    #[test]
    fn snapshot_ignores_unknown_fields() {
        let json = r#"{
            "conversation_id": "conv-2",
            "status": "escalated",
            "some_future_field": {"nested": true}
        }"#;

        let state: SessionState = serde_json::from_str(json).unwrap();
        assert_eq!(state.status, ConversationStatus::Escalated);
    }

    #[test]
    fn state_serde_roundtrip() {
        let mut state = SessionState::new("conv-3", None);
        state.issue = Some(Issue {
            category: "integration".into(),
            priority: "high".into(),
            confidence: 0.9,
            description_summary: "Webhook signature failures".into(),
            error_type: Some("signature_mismatch".into()),
            affected_service: None,
            keywords: vec!["webhook".into(), "signature".into()],
            classified_at: Utc::now(),
        });
        state.attempted_solutions.push(AttemptedSolution {
            solution: "Regenerate webhook secret".into(),
            agent: "specialist".into(),
            result: SolutionResult::NotHelpful,
            user_feedback: Some("still failing".into()),
            timestamp: Utc::now(),
        });
        state.solution_attempts_count = 1;

        let json = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.issue.as_ref().unwrap().category, "integration");
        assert_eq!(back.attempted_solutions.len(), 1);
        assert_eq!(
            back.attempted_solutions[0].result,
            SolutionResult::NotHelpful
        );
        assert_eq!(back.solution_attempts_count, 1);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ConversationStatus::AwaitingUser).unwrap();
        assert_eq!(json, "\"awaiting_user\"");
        let back: ConversationStatus = serde_json::from_str("\"escalated\"").unwrap();
        assert_eq!(back, ConversationStatus::Escalated);
    }

    #[test]
    fn failed_attempts_counts_not_helpful_only() {
        let mut state = SessionState::new("conv-4", None);
        for result in [
            SolutionResult::Helpful,
            SolutionResult::NotHelpful,
            SolutionResult::PartiallyHelpful,
            SolutionResult::NotHelpful,
            SolutionResult::Pending,
        ] {
            state.attempted_solutions.push(AttemptedSolution {
                solution: "attempt".into(),
                agent: "specialist".into(),
                result,
                user_feedback: None,
                timestamp: Utc::now(),
            });
        }
        assert_eq!(state.failed_attempts(), 2);
    }

    #[test]
    fn summary_projects_key_fields() {
        let mut state = SessionState::new("conv-5", None);
        state.turn_count = 7;
        state.user_frustration_level = FrustrationLevel::Frustrated;
        state.ticket_id = Some("TICKET-1234".into());
        let summary = state.summary();
        assert_eq!(summary.turn_count, 7);
        assert!(summary.user_frustrated);
        assert_eq!(summary.ticket_id.as_deref(), Some("TICKET-1234"));
        assert_eq!(summary.issue_category, None);
    }

    #[test]
    fn conversation_keys_are_unique() {
        let a = ConversationKey::generate();
        let b = ConversationKey::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn ticket_record_minimal_json() {
        // Seed-style records omit the session snapshot fields entirely.
        let json = r#"{
            "id": "TICKET-789",
            "title": "Cannot connect to API",
            "category": "integration",
            "priority": "high",
            "status": "resolved",
            "assigned_team": "integration_team",
            "created_at": "2024-12-20T10:00:00Z",
            "description": "User unable to authenticate with API using provided key"
        }"#;
        let ticket: TicketRecord = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.status, TicketStatus::Resolved);
        assert_eq!(ticket.resolution, None);
        assert!(ticket.attempted_solutions.is_empty());
        assert_eq!(ticket.frustration_level, None);
    }
}
