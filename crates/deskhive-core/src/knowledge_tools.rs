//! Agent tools for knowledge base and FAQ lookups

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::knowledge::KnowledgeSearch;
use crate::tool::{tool_ok, ToolContext, ToolDef, ToolExecutor, ToolOutput};

pub const SEARCH_KNOWLEDGE_BASE_TOOL_NAME: &str = "search_knowledge_base";
pub const GET_FAQ_ANSWER_TOOL_NAME: &str = "get_faq_answer";

fn default_max_results() -> usize {
    3
}

pub struct SearchKnowledgeBaseTool {
    search: KnowledgeSearch,
}

impl SearchKnowledgeBaseTool {
    pub fn new(search: KnowledgeSearch) -> Self {
        Self { search }
    }
}

#[derive(Debug, Deserialize)]
struct SearchKnowledgeBaseInput {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

#[async_trait]
impl ToolExecutor for SearchKnowledgeBaseTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            name: SEARCH_KNOWLEDGE_BASE_TOOL_NAME.to_string(),
            description: "Search the support knowledge base for help articles matching a query. Returns ranked articles with relevance scores.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (e.g. 'webhook signature error')"
                    },
                    "max_results": {
                        "type": "number",
                        "description": "Maximum number of articles to return (default 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let parsed: SearchKnowledgeBaseInput = serde_json::from_value(input)
            .map_err(|e| anyhow!("invalid search_knowledge_base input: {e}"))?;

        ctx.session().record_kb_search(&parsed.query).await?;

        let results = self
            .search
            .search(&parsed.query, parsed.max_results)
            .await?;
        let articles = results
            .iter()
            .map(|r| {
                json!({
                    "id": r.article.id,
                    "title": r.article.title,
                    "category": r.article.category,
                    "content": r.article.content,
                    "relevance_score": r.relevance_score,
                })
            })
            .collect::<Vec<_>>();

        let total_found = articles.len();
        let body = json!({
            "status": "success",
            "articles": articles,
            "total_found": total_found,
        });
        Ok(tool_ok(serde_json::to_string_pretty(&body)?))
    }
}

pub struct FaqAnswerTool {
    search: KnowledgeSearch,
}

impl FaqAnswerTool {
    pub fn new(search: KnowledgeSearch) -> Self {
        Self { search }
    }
}

#[derive(Debug, Deserialize)]
struct FaqAnswerInput {
    question: String,
}

#[async_trait]
impl ToolExecutor for FaqAnswerTool {
    fn definition(&self) -> ToolDef {
        ToolDef {
            name: GET_FAQ_ANSWER_TOOL_NAME.to_string(),
            description: "Get a quick answer from the FAQ database for common questions like password resets or billing cycles.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question to look up (e.g. 'how to reset password')"
                    }
                },
                "required": ["question"]
            }),
        }
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let parsed: FaqAnswerInput = serde_json::from_value(input)
            .map_err(|e| anyhow!("invalid get_faq_answer input: {e}"))?;

        let body = match self.search.faq_answer(&parsed.question).await? {
            Some(entry) => json!({
                "status": "found",
                "topic": entry.topic,
                "answer": entry.answer,
            }),
            None => json!({
                "status": "not_found",
                "message": "No FAQ entry found for this question. Try searching the knowledge base for more detailed articles.",
            }),
        };
        Ok(tool_ok(serde_json::to_string_pretty(&body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::StaticKnowledgeBase;
    use crate::session::SessionManager;
    use deskhive_memory::MemorySessionStore;
    use deskhive_schema::ConversationKey;
    use std::sync::Arc;

    fn kb_search() -> KnowledgeSearch {
        KnowledgeSearch::new(Arc::new(StaticKnowledgeBase::seeded()))
    }

    async fn test_ctx() -> ToolContext {
        let manager = SessionManager::new(Arc::new(MemorySessionStore::new()));
        let session = manager
            .get_or_create(&ConversationKey::generate(), None)
            .await
            .unwrap();
        ToolContext::new(session)
    }

    #[tokio::test]
    async fn search_returns_ranked_articles_and_records_query() {
        let tool = SearchKnowledgeBaseTool::new(kb_search());
        let ctx = test_ctx().await;

        let output = tool
            .execute(json!({"query": "webhook signature error"}), &ctx)
            .await
            .unwrap();
        assert!(!output.is_error);

        let body: serde_json::Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["articles"][0]["id"], "KB002");
        assert_eq!(body["total_found"], body["articles"].as_array().unwrap().len());

        let state = ctx.session().read().await.unwrap();
        assert_eq!(state.last_kb_search.as_deref(), Some("webhook signature error"));
    }

    #[tokio::test]
    async fn search_with_no_hits_is_still_success() {
        let tool = SearchKnowledgeBaseTool::new(kb_search());
        let ctx = test_ctx().await;

        let output = tool.execute(json!({"query": "zzzz"}), &ctx).await.unwrap();
        assert!(!output.is_error);

        let body: serde_json::Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["total_found"], 0);
    }

    #[tokio::test]
    async fn search_honors_max_results() {
        let tool = SearchKnowledgeBaseTool::new(kb_search());
        let ctx = test_ctx().await;

        let output = tool
            .execute(json!({"query": "api", "max_results": 1}), &ctx)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(body["articles"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_rejects_malformed_input() {
        let tool = SearchKnowledgeBaseTool::new(kb_search());
        let ctx = test_ctx().await;

        let result = tool.execute(json!({"max_results": 3}), &ctx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn faq_hit_returns_topic_and_answer() {
        let tool = FaqAnswerTool::new(kb_search());
        let ctx = test_ctx().await;

        let output = tool
            .execute(json!({"question": "what is the billing cycle"}), &ctx)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(body["status"], "found");
        assert_eq!(body["topic"], "billing cycle");
        assert!(body["answer"].as_str().unwrap().contains("1st of each month"));
    }

    #[tokio::test]
    async fn faq_miss_suggests_knowledge_base() {
        let tool = FaqAnswerTool::new(kb_search());
        let ctx = test_ctx().await;

        let output = tool
            .execute(json!({"question": "completely unrelated"}), &ctx)
            .await
            .unwrap();
        assert!(!output.is_error);

        let body: serde_json::Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(body["status"], "not_found");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("searching the knowledge base"));
    }
}
