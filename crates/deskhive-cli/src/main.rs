use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use deskhive_core::*;
use deskhive_memory::{MemorySessionStore, SessionStore, SqliteSessionStore};
use deskhive_schema::ConversationKey;

#[derive(Parser)]
#[command(name = "deskhive", version, about = "deskhive customer support engine")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.deskhive",
        help = "Config root directory (contains deskhive.yaml, data/ and logs/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Interactive support conversation (local REPL)")]
    Chat {
        #[arg(long, help = "User ID to bind to the conversation")]
        user: Option<String>,
        #[arg(long, help = "Resume an existing conversation by ID")]
        conversation: Option<String>,
    },
    #[command(about = "Search the knowledge base")]
    Kb {
        #[arg(help = "Search query")]
        query: String,
        #[arg(long, default_value = "3", help = "Maximum number of articles")]
        limit: usize,
    },
    #[command(about = "Look up a quick FAQ answer")]
    Faq {
        #[arg(help = "Question text")]
        question: String,
    },
    #[command(about = "Search resolved tickets for similar issues")]
    Tickets {
        #[arg(help = "Issue description")]
        description: String,
        #[arg(long, help = "Restrict matches to one category")]
        category: Option<String>,
        #[arg(long, default_value = "3", help = "Maximum number of tickets")]
        limit: usize,
    },
    #[command(about = "Show the status of a support ticket")]
    Ticket {
        #[arg(help = "Ticket ID, e.g. TICKET-456")]
        ticket_id: String,
    },
    #[command(about = "Resolve team routing for a category and priority")]
    Assign {
        #[arg(help = "Issue category")]
        category: String,
        #[arg(long, default_value = "medium", help = "Issue priority")]
        priority: String,
    },
    #[command(about = "Show a user profile with support context")]
    User {
        #[arg(help = "User ID (defaults to the demo account)")]
        user_id: Option<String>,
    },
    #[command(about = "Show the status of an order")]
    Order {
        #[arg(help = "Order ID")]
        order_id: String,
    },
    #[command(about = "Generate troubleshooting steps for an error type")]
    Steps {
        #[arg(help = "Error type, e.g. timeout or auth_failure")]
        error_type: String,
        #[arg(long, help = "Extra context to echo into the plan")]
        context: Option<String>,
    },
    #[command(about = "List the tools the engine exposes")]
    Tools,
    #[command(subcommand, about = "Conversation management")]
    Session(SessionCommands),
    #[command(about = "Validate config file")]
    Validate,
}

#[derive(Subcommand)]
enum SessionCommands {
    #[command(about = "List persisted conversations")]
    List,
    #[command(about = "Reset a conversation by ID")]
    Reset {
        #[arg(help = "Conversation ID")]
        conversation_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // ~ in --config-root resolves against $HOME
    if cli.config_root.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            cli.config_root = PathBuf::from(home).join(
                cli.config_root
                    .strip_prefix("~")
                    .unwrap_or(&cli.config_root),
            );
        }
    }

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "deskhive.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Validate => {
            let config = load_config(&cli.config_root)?;
            let backend = match config.session.backend {
                SessionBackend::Memory => "memory",
                SessionBackend::Sqlite => "sqlite",
            };
            println!(
                "Config valid. Session backend: {backend}, escalation after {} failed attempts, search limits {} articles / {} tickets.",
                config.escalation.max_attempts,
                config.search.kb_results,
                config.search.ticket_results,
            );
        }
        Commands::Chat { user, conversation } => {
            run_chat(&cli.config_root, user, conversation).await?;
        }
        Commands::Kb { query, limit } => {
            run_tool(
                &cli.config_root,
                SEARCH_KNOWLEDGE_BASE_TOOL_NAME,
                json!({ "query": query, "max_results": limit }),
            )
            .await?;
        }
        Commands::Faq { question } => {
            run_tool(
                &cli.config_root,
                GET_FAQ_ANSWER_TOOL_NAME,
                json!({ "question": question }),
            )
            .await?;
        }
        Commands::Tickets {
            description,
            category,
            limit,
        } => {
            run_tool(
                &cli.config_root,
                SEARCH_SIMILAR_TICKETS_TOOL_NAME,
                json!({ "description": description, "category": category, "limit": limit }),
            )
            .await?;
        }
        Commands::Ticket { ticket_id } => {
            run_tool(
                &cli.config_root,
                GET_TICKET_STATUS_TOOL_NAME,
                json!({ "ticket_id": ticket_id }),
            )
            .await?;
        }
        Commands::Assign { category, priority } => {
            run_tool(
                &cli.config_root,
                ASSIGN_TO_TEAM_TOOL_NAME,
                json!({ "category": category, "priority": priority }),
            )
            .await?;
        }
        Commands::User { user_id } => {
            run_tool(
                &cli.config_root,
                GET_USER_CONTEXT_TOOL_NAME,
                json!({ "user_id": user_id }),
            )
            .await?;
        }
        Commands::Order { order_id } => {
            run_tool(
                &cli.config_root,
                GET_ORDER_STATUS_TOOL_NAME,
                json!({ "order_id": order_id }),
            )
            .await?;
        }
        Commands::Steps {
            error_type,
            context,
        } => {
            run_tool(
                &cli.config_root,
                GENERATE_SOLUTION_STEPS_TOOL_NAME,
                json!({ "error_type": error_type, "context": context }),
            )
            .await?;
        }
        Commands::Tools => {
            let engine = lookup_engine(&cli.config_root)?;
            println!("{:<26} {}", "NAME", "DESCRIPTION");
            println!("{}", "-".repeat(100));
            for def in engine.tool_definitions() {
                println!("{:<26} {}", def.name, def.description);
            }
        }
        Commands::Session(cmd) => {
            let engine = bootstrap(&cli.config_root)?;
            match cmd {
                SessionCommands::List => {
                    let conversations = engine.sessions().list().await?;
                    if conversations.is_empty() {
                        println!("No persisted conversations.");
                    } else {
                        for conversation_id in conversations {
                            println!("{conversation_id}");
                        }
                    }
                }
                SessionCommands::Reset { conversation_id } => {
                    let key = ConversationKey(conversation_id.clone());
                    match engine.sessions().reset(&key).await? {
                        true => println!("Conversation '{conversation_id}' reset successfully."),
                        false => println!("Conversation '{conversation_id}' not found."),
                    }
                }
            }
        }
    }

    Ok(())
}

/// Build the engine over the session store named in config.
fn bootstrap(root: &Path) -> Result<SupportEngine> {
    let config = load_config(root)?;

    let store: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Memory => {
            tracing::info!("session store: in-memory, conversations are not persisted");
            Arc::new(MemorySessionStore::new())
        }
        SessionBackend::Sqlite => {
            let db_path = config.session.resolve_db_path(root);
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!("session store: sqlite at {}", db_path.display());
            Arc::new(SqliteSessionStore::open(
                db_path.to_str().unwrap_or("sessions.db3"),
            )?)
        }
    };

    Ok(SupportEngine::new(config, store))
}

/// One-shot lookups run over a throwaway in-memory store; nothing persists.
fn lookup_engine(root: &Path) -> Result<SupportEngine> {
    let config = load_config(root)?;
    Ok(SupportEngine::new(
        config,
        Arc::new(MemorySessionStore::new()),
    ))
}

async fn run_tool(root: &Path, name: &str, input: serde_json::Value) -> Result<()> {
    let engine = lookup_engine(root)?;
    let key = ConversationKey::generate();
    let output = engine.execute_tool(&key, name, input).await?;
    println!("{}", output.content);
    Ok(())
}

async fn run_chat(root: &Path, user: Option<String>, conversation: Option<String>) -> Result<()> {
    let engine = bootstrap(root)?;
    let key = match conversation {
        Some(id) => ConversationKey(id),
        None => ConversationKey::generate(),
    };
    let session = engine.start_conversation(&key, user.as_deref()).await?;

    println!("deskhive support chat. Conversation {key}.");
    println!("Commands: /status, /escalate, /quit");
    println!("---");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" || input == "quit" || input == "exit" {
            break;
        }
        if input == "/status" {
            let state = session.read().await?;
            println!("{}", serde_json::to_string_pretty(&state.summary())?);
            continue;
        }
        if input == "/escalate" {
            let state = session.read().await?;
            let (summary, category, priority) = match &state.issue {
                Some(issue) => (
                    issue.description_summary.clone(),
                    issue.category.clone(),
                    issue.priority.clone(),
                ),
                None => (
                    "Escalation requested by user".to_string(),
                    "general".to_string(),
                    "medium".to_string(),
                ),
            };
            let output = engine
                .execute_tool(
                    &key,
                    CREATE_TICKET_TOOL_NAME,
                    json!({
                        "summary": &summary,
                        "category": category,
                        "priority": priority,
                        "description": &summary,
                    }),
                )
                .await?;
            println!("{}", output.content);
            continue;
        }

        let state = engine.record_user_message(&key, input).await?;
        if state.is_frustrated() {
            println!("[frustration: {}]", state.user_frustration_level);
        }

        let category = state.issue.as_ref().map(|issue| issue.category.clone());
        match engine
            .gather_evidence(&key, input, category.as_deref())
            .await
        {
            Ok(report) => print_evidence(&report),
            Err(err) => eprintln!("Evidence gathering failed: {err}"),
        }

        if let Some(trigger) = engine.check_escalation(&key).await? {
            println!("[escalation recommended: {trigger}]");
            println!("Type /escalate to open a ticket with a human team.");
        }
    }

    Ok(())
}

fn print_evidence(report: &EvidenceReport) {
    if let Some(articles) = &report.articles {
        if articles.is_empty() {
            println!("No matching knowledge base articles.");
        } else {
            println!("Knowledge base:");
            for entry in articles {
                println!(
                    "  [{}] {} (score {})",
                    entry.article.id, entry.article.title, entry.relevance_score
                );
            }
        }
    }
    if let Some(tickets) = &report.similar_tickets {
        if !tickets.is_empty() {
            println!("Similar resolved tickets:");
            for entry in tickets {
                println!(
                    "  [{}] {} (score {})",
                    entry.ticket.id, entry.ticket.title, entry.relevance_score
                );
            }
        }
    }
    if let Some(findings) = &report.external_findings {
        println!("External findings: {findings}");
    }
    if report.sources_available < 3 {
        println!(
            "[{} of 3 evidence sources available]",
            report.sources_available
        );
    }
}
