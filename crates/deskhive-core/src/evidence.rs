//! Concurrent evidence gathering ahead of escalation decisions.
//!
//! Three read-mostly lookups (knowledge base, ticket history, external
//! search) run concurrently and join before any synthesis. A failing source
//! degrades the report instead of aborting the turn.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::knowledge::{KnowledgeSearch, ScoredArticle};
use crate::session::StateStore;
use crate::tickets::{ScoredTicket, TicketHistorySearch};

/// External search collaborator, typically a web search behind the LLM
/// layer. Best effort by contract.
#[async_trait]
pub trait ExternalProbe: Send + Sync {
    async fn probe(&self, query: &str) -> Result<Option<String>>;
}

/// Probe used when no external search is configured. Always responds,
/// never finds anything.
pub struct NoExternalProbe;

#[async_trait]
impl ExternalProbe for NoExternalProbe {
    async fn probe(&self, _query: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Joined lookup results. `None` in a field means that source failed this
/// turn; an empty list means it answered and found nothing.
#[derive(Debug)]
pub struct EvidenceReport {
    pub articles: Option<Vec<ScoredArticle>>,
    pub similar_tickets: Option<Vec<ScoredTicket>>,
    pub external_findings: Option<String>,
    /// How many of the three sources answered this turn.
    pub sources_available: usize,
}

#[derive(Clone)]
pub struct EvidenceGatherer {
    knowledge: KnowledgeSearch,
    history: TicketHistorySearch,
    probe: Arc<dyn ExternalProbe>,
    limits: SearchConfig,
}

impl EvidenceGatherer {
    pub fn new(
        knowledge: KnowledgeSearch,
        history: TicketHistorySearch,
        probe: Arc<dyn ExternalProbe>,
        limits: SearchConfig,
    ) -> Self {
        Self {
            knowledge,
            history,
            probe,
            limits,
        }
    }

    /// Fan out the three lookups and join them all; no partial synthesis.
    /// Records the query and any found tickets on the session as evidence
    /// breadcrumbs.
    pub async fn gather(
        &self,
        session: &StateStore,
        query: &str,
        category: Option<&str>,
    ) -> Result<EvidenceReport> {
        session.record_kb_search(query).await?;

        let (articles, tickets, external) = tokio::join!(
            self.knowledge.search(query, self.limits.kb_results),
            self.history.search(query, category, self.limits.ticket_results),
            self.probe.probe(query),
        );

        let mut sources_available = 0;
        let articles = match articles {
            Ok(list) => {
                sources_available += 1;
                Some(list)
            }
            Err(error) => {
                warn!(%error, "knowledge source unavailable");
                None
            }
        };
        let similar_tickets = match tickets {
            Ok(list) => {
                sources_available += 1;
                Some(list)
            }
            Err(error) => {
                warn!(%error, "ticket history unavailable");
                None
            }
        };
        let external_findings = match external {
            Ok(findings) => {
                sources_available += 1;
                findings
            }
            Err(error) => {
                warn!(%error, "external search unavailable");
                None
            }
        };

        if let Some(found) = &similar_tickets {
            if !found.is_empty() {
                let ids = found.iter().map(|t| t.ticket.id.clone()).collect();
                session.record_similar_tickets(ids).await?;
            }
        }

        debug!(
            conversation_id = session.conversation_id(),
            sources_available, "evidence gathered"
        );
        Ok(EvidenceReport {
            articles,
            similar_tickets,
            external_findings,
            sources_available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{KnowledgeRepository, StaticKnowledgeBase};
    use crate::session::SessionManager;
    use crate::tickets::InMemoryTicketSystem;
    use anyhow::anyhow;
    use deskhive_memory::MemorySessionStore;
    use deskhive_schema::{ConversationKey, FaqEntry, KnowledgeArticle};

    struct DownKnowledgeBase;

    #[async_trait]
    impl KnowledgeRepository for DownKnowledgeBase {
        async fn articles(&self) -> Result<Vec<KnowledgeArticle>> {
            Err(anyhow!("documentation service unreachable"))
        }

        async fn faq_entries(&self) -> Result<Vec<FaqEntry>> {
            Err(anyhow!("documentation service unreachable"))
        }
    }

    struct DownProbe;

    #[async_trait]
    impl ExternalProbe for DownProbe {
        async fn probe(&self, _query: &str) -> Result<Option<String>> {
            Err(anyhow!("search provider timed out"))
        }
    }

    async fn test_session() -> StateStore {
        let manager = SessionManager::new(Arc::new(MemorySessionStore::new()));
        manager
            .get_or_create(&ConversationKey::generate(), None)
            .await
            .unwrap()
    }

    fn gatherer_with(
        knowledge: Arc<dyn KnowledgeRepository>,
        probe: Arc<dyn ExternalProbe>,
    ) -> EvidenceGatherer {
        EvidenceGatherer::new(
            KnowledgeSearch::new(knowledge),
            TicketHistorySearch::new(Arc::new(InMemoryTicketSystem::seeded())),
            probe,
            SearchConfig::default(),
        )
    }

    #[tokio::test]
    async fn all_sources_answering_gives_full_report() {
        let gatherer = gatherer_with(
            Arc::new(StaticKnowledgeBase::seeded()),
            Arc::new(NoExternalProbe),
        );
        let session = test_session().await;

        let report = gatherer
            .gather(&session, "webhook endpoint not receiving events", None)
            .await
            .unwrap();

        assert_eq!(report.sources_available, 3);
        assert!(!report.articles.unwrap().is_empty());
        let tickets = report.similar_tickets.unwrap();
        assert!(tickets.iter().any(|t| t.ticket.id == "TICKET-456"));
        assert!(report.external_findings.is_none());
    }

    #[tokio::test]
    async fn gather_records_breadcrumbs() {
        let gatherer = gatherer_with(
            Arc::new(StaticKnowledgeBase::seeded()),
            Arc::new(NoExternalProbe),
        );
        let session = test_session().await;

        gatherer
            .gather(&session, "webhook endpoint not receiving events", None)
            .await
            .unwrap();

        let state = session.read().await.unwrap();
        assert_eq!(
            state.last_kb_search.as_deref(),
            Some("webhook endpoint not receiving events")
        );
        assert!(state
            .last_similar_tickets
            .contains(&"TICKET-456".to_string()));
    }

    #[tokio::test]
    async fn failing_probe_degrades_without_aborting() {
        let gatherer = gatherer_with(Arc::new(StaticKnowledgeBase::seeded()), Arc::new(DownProbe));
        let session = test_session().await;

        let report = gatherer
            .gather(&session, "webhook signature error", None)
            .await
            .unwrap();

        assert_eq!(report.sources_available, 2);
        assert!(report.articles.is_some());
        assert!(report.similar_tickets.is_some());
        assert!(report.external_findings.is_none());
    }

    #[tokio::test]
    async fn failing_knowledge_source_leaves_field_empty() {
        let gatherer = gatherer_with(Arc::new(DownKnowledgeBase), Arc::new(NoExternalProbe));
        let session = test_session().await;

        let report = gatherer
            .gather(&session, "billing discrepancy", Some("billing"))
            .await
            .unwrap();

        assert_eq!(report.sources_available, 2);
        assert!(report.articles.is_none());
        let tickets = report.similar_tickets.unwrap();
        assert!(tickets.iter().any(|t| t.ticket.id == "TICKET-234"));
    }

    #[tokio::test]
    async fn no_matches_is_not_a_failure() {
        let gatherer = gatherer_with(
            Arc::new(StaticKnowledgeBase::seeded()),
            Arc::new(NoExternalProbe),
        );
        let session = test_session().await;

        let report = gatherer.gather(&session, "zzzz", None).await.unwrap();

        assert_eq!(report.sources_available, 3);
        assert_eq!(report.articles.unwrap().len(), 0);
        assert_eq!(report.similar_tickets.unwrap().len(), 0);
        let state = session.read().await.unwrap();
        assert!(state.last_similar_tickets.is_empty());
    }
}
