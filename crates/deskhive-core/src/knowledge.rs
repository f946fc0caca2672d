use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use deskhive_schema::{FaqEntry, KnowledgeArticle};
use tracing::debug;

/// Read-only source of help articles and FAQ entries.
#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    async fn articles(&self) -> Result<Vec<KnowledgeArticle>>;
    async fn faq_entries(&self) -> Result<Vec<FaqEntry>>;
}

/// Built-in corpus used until a real documentation backend is wired in.
pub struct StaticKnowledgeBase {
    articles: Vec<KnowledgeArticle>,
    faq: Vec<FaqEntry>,
}

fn article(
    id: &str,
    title: &str,
    category: &str,
    content: &str,
    keywords: &[&str],
) -> KnowledgeArticle {
    KnowledgeArticle {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        content: content.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn faq(topic: &str, answer: &str) -> FaqEntry {
    FaqEntry {
        topic: topic.to_string(),
        answer: answer.to_string(),
    }
}

impl StaticKnowledgeBase {
    pub fn seeded() -> Self {
        let articles = vec![
            article(
                "KB001",
                "How to Reset Your Password",
                "password_reset",
                "To reset your password:\n\
                 1. Go to the login page and click 'Forgot Password'\n\
                 2. Enter your email address\n\
                 3. Check your inbox for a reset link (check spam folder too)\n\
                 4. Click the link and create a new password\n\
                 5. Password must be at least 8 characters with one number and one special character\n\
                 \n\
                 If you don't receive the email within 5 minutes, contact support.",
                &["password", "reset", "forgot", "login", "access"],
            ),
            article(
                "KB002",
                "Webhook Configuration Guide",
                "integration",
                "Setting up webhooks:\n\
                 1. Navigate to Settings > Integrations > Webhooks\n\
                 2. Click 'Add Webhook Endpoint'\n\
                 3. Enter your endpoint URL (must be HTTPS)\n\
                 4. Select the events you want to receive\n\
                 5. Copy the webhook secret for signature verification\n\
                 \n\
                 Common issues:\n\
                 - Signature mismatch: Regenerate your webhook secret and update your code\n\
                 - Events not received: Check your endpoint returns 200 OK within 30 seconds\n\
                 - SSL errors: Ensure your certificate is valid and not self-signed",
                &["webhook", "integration", "api", "events", "endpoint", "signature"],
            ),
            article(
                "KB003",
                "API Authentication Guide",
                "integration",
                "API Authentication:\n\
                 1. Generate an API key from Settings > API Keys\n\
                 2. Include the key in the Authorization header: 'Bearer YOUR_API_KEY'\n\
                 3. API keys are environment-specific (test/production)\n\
                 \n\
                 Rate limits:\n\
                 - Standard plan: 100 requests/minute\n\
                 - Pro plan: 1000 requests/minute\n\
                 - Enterprise: Custom limits\n\
                 \n\
                 If you receive 401 errors, verify your API key is correct and active.",
                &["api", "authentication", "auth", "key", "401", "bearer", "token"],
            ),
            article(
                "KB004",
                "Billing and Subscription FAQ",
                "billing",
                "Billing Information:\n\
                 - Invoices are generated on the 1st of each month\n\
                 - Payment methods: Credit card, ACH, Wire transfer (Enterprise only)\n\
                 - Upgrade/downgrade takes effect immediately, prorated billing applies\n\
                 \n\
                 Common questions:\n\
                 - View invoices: Settings > Billing > Invoice History\n\
                 - Update payment method: Settings > Billing > Payment Methods\n\
                 - Cancel subscription: Settings > Billing > Manage Plan > Cancel",
                &["billing", "invoice", "payment", "subscription", "cancel", "upgrade"],
            ),
            article(
                "KB005",
                "Troubleshooting 500 Errors",
                "bug_report",
                "If you're experiencing 500 Internal Server Errors:\n\
                 \n\
                 1. Check our status page for ongoing incidents\n\
                 2. Retry the request after a few seconds (may be temporary)\n\
                 3. If persistent, note:\n\
                 \x20  - The exact endpoint being called\n\
                 \x20  - Request body/parameters\n\
                 \x20  - Time of occurrence\n\
                 \x20  - Any error message returned\n\
                 \n\
                 Common causes:\n\
                 - Large payload sizes (max 10MB)\n\
                 - Invalid JSON format\n\
                 - Missing required fields\n\
                 - Rate limit exceeded (returns 429, not 500)\n\
                 \n\
                 If the issue persists, contact support with the details above.",
                &["500", "error", "server", "bug", "crash", "internal"],
            ),
        ];

        let faq = vec![
            faq(
                "password reset",
                "You can reset your password at the login page by clicking 'Forgot Password' and following the email instructions.",
            ),
            faq(
                "api rate limit",
                "Rate limits are: Standard (100/min), Pro (1000/min), Enterprise (custom). Check headers for X-RateLimit-Remaining.",
            ),
            faq(
                "webhook timeout",
                "Webhooks timeout after 30 seconds. Ensure your endpoint responds with 200 OK quickly. Process heavy operations asynchronously.",
            ),
            faq(
                "billing cycle",
                "Billing occurs on the 1st of each month. Changes are prorated.",
            ),
            faq(
                "cancel subscription",
                "Go to Settings > Billing > Manage Plan > Cancel. You'll retain access until the end of your billing period.",
            ),
            faq(
                "api key",
                "Generate API keys at Settings > API Keys. Keep them secure and never share in public repositories.",
            ),
            faq(
                "supported browsers",
                "We support the latest versions of Chrome, Firefox, Safari, and Edge.",
            ),
            faq(
                "data export",
                "Export your data from Settings > Account > Export Data. Processing may take up to 24 hours for large accounts.",
            ),
        ];

        Self { articles, faq }
    }
}

#[async_trait]
impl KnowledgeRepository for StaticKnowledgeBase {
    async fn articles(&self) -> Result<Vec<KnowledgeArticle>> {
        Ok(self.articles.clone())
    }

    async fn faq_entries(&self) -> Result<Vec<FaqEntry>> {
        Ok(self.faq.clone())
    }
}

/// An article together with the score the query earned against it.
#[derive(Debug, Clone)]
pub struct ScoredArticle {
    pub article: KnowledgeArticle,
    pub relevance_score: u32,
}

/// Score one article against a lower-cased query and its word set.
///
/// Weights: whole query in the title +10, each keyword found in the query
/// +5, whole query in the content +3, then per query word longer than
/// three characters +1 for a content hit and +2 for a title hit.
/// Keyword and word matches are plain substring checks.
pub fn score_article(
    article: &KnowledgeArticle,
    query_lower: &str,
    query_words: &HashSet<&str>,
) -> u32 {
    let title_lower = article.title.to_lowercase();
    let content_lower = article.content.to_lowercase();
    let mut score = 0;

    if title_lower.contains(query_lower) {
        score += 10;
    }

    for keyword in &article.keywords {
        if query_lower.contains(keyword.as_str()) || query_words.contains(keyword.as_str()) {
            score += 5;
        }
    }

    if content_lower.contains(query_lower) {
        score += 3;
    }

    for word in query_words {
        if word.chars().count() > 3 {
            if content_lower.contains(word) {
                score += 1;
            }
            if title_lower.contains(word) {
                score += 2;
            }
        }
    }

    score
}

/// Ranked retrieval over a [`KnowledgeRepository`].
#[derive(Clone)]
pub struct KnowledgeSearch {
    repo: Arc<dyn KnowledgeRepository>,
}

impl KnowledgeSearch {
    pub fn new(repo: Arc<dyn KnowledgeRepository>) -> Self {
        Self { repo }
    }

    /// Top `max_results` articles with a positive score, best first. Ties
    /// keep corpus order (the sort is stable).
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ScoredArticle>> {
        let query_lower = query.to_lowercase();
        let query_words: HashSet<&str> = query_lower.split_whitespace().collect();

        let mut scored = Vec::new();
        for article in self.repo.articles().await? {
            let score = score_article(&article, &query_lower, &query_words);
            if score > 0 {
                scored.push(ScoredArticle {
                    article,
                    relevance_score: score,
                });
            }
        }

        scored.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
        scored.truncate(max_results);
        debug!(query, found = scored.len(), "knowledge base searched");
        Ok(scored)
    }

    /// Quick FAQ lookup: direct topic-substring match first, then a fuzzy
    /// pass keeping the topic with the largest word overlap. Ties keep the
    /// earliest entry.
    pub async fn faq_answer(&self, question: &str) -> Result<Option<FaqEntry>> {
        let question_lower = question.to_lowercase();
        let entries = self.repo.faq_entries().await?;

        for entry in &entries {
            if question_lower.contains(&entry.topic) {
                debug!(topic = %entry.topic, "faq direct match");
                return Ok(Some(entry.clone()));
            }
        }

        let question_words: HashSet<&str> = question_lower.split_whitespace().collect();
        let mut best: Option<&FaqEntry> = None;
        let mut best_score = 0usize;
        for entry in &entries {
            let overlap = entry
                .topic
                .split_whitespace()
                .filter(|word| question_words.contains(word))
                .count();
            if overlap > best_score {
                best_score = overlap;
                best = Some(entry);
            }
        }

        if let Some(entry) = best {
            debug!(topic = %entry.topic, overlap = best_score, "faq fuzzy match");
        }
        Ok(best.cloned())
    }
}
