// ============================================================================
// assist - CLI for the support assistant core
// ============================================================================
// Usage:
//   assist stats                                   Show database statistics
//   assist tools                                   Print the tool manifest
//   assist import --tenant T --file data.json      Load items/products/rates
//   assist search --tenant T "red shirt"           Search tenant knowledge
//   assist invoke --tenant T get_product_price '{"product_id":"p1"}'
//   assist invoke-all --tenant T '[{"name":"get_shipping_info","args":{"location":"cairo"}}]'
//   assist tone "ازيك يا معلم" "عايز اعرف السعر"   Classify register
//   assist record-outcome --tenant T --intent refund --outcome unsatisfied
//   assist analyze [--tenant T]                    Run pattern analysis now
//   assist alerts --tenant T                       List stored alerts
//   assist schedule                                Run the nightly job until Ctrl-C
// ============================================================================

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use assist_core::analysis::{Outcome, OutcomeRecord};
use assist_core::retrieval::KnowledgeItem;
use assist_core::tools::{FlatRateTable, Product, ToolCall};
use assist_core::{AssistConfig, AssistDb, Assistant, Collaborators, TenantContext, TenantId};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Support assistant core tool
#[derive(Parser)]
#[command(name = "assist", version, about = "Inspect and drive the support assistant core")]
struct Cli {
    /// Path to the database file (default: ~/.assist/assist.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show database statistics
    Stats,

    /// Print the function-calling manifest as JSON
    Tools,

    /// Import knowledge items, products and shipping rates from a JSON file
    Import {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        file: String,
    },

    /// Search a tenant's knowledge
    Search {
        #[arg(long)]
        tenant: String,
        query: String,
        /// Number of results (default from config)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Invoke a tool by name with JSON arguments
    Invoke {
        #[arg(long)]
        tenant: String,
        name: String,
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Invoke several tools concurrently; JSON array of {"name", "args"}
    InvokeAll {
        #[arg(long)]
        tenant: String,
        calls: String,
    },

    /// Classify the register of recent messages (oldest first)
    Tone {
        messages: Vec<String>,
        /// Draft reply to adapt to the detected register
        #[arg(long)]
        draft: Option<String>,
    },

    /// Append an interaction outcome
    RecordOutcome {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        intent: String,
        /// satisfied, unsatisfied, escalated or unknown
        #[arg(long)]
        outcome: String,
        #[arg(long)]
        conversation: Option<String>,
        /// Id of the record this one relabels
        #[arg(long)]
        corrects: Option<String>,
    },

    /// Run pattern analysis for one tenant, or every tenant
    Analyze {
        #[arg(long)]
        tenant: Option<String>,
    },

    /// List alerts raised for a tenant
    Alerts {
        #[arg(long)]
        tenant: String,
    },

    /// Run the daily pattern analysis scheduler in the foreground
    Schedule,
}

#[derive(Debug, Deserialize)]
struct ImportItem {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default = "default_true")]
    active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct ImportFile {
    #[serde(default)]
    items: Vec<ImportItem>,
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    shipping: Option<FlatRateTable>,
}

fn parse_tenant(s: &str) -> Result<TenantId> {
    Ok(TenantId::new(s)?)
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("assist_core=info".parse()?)
                .add_directive("assist=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = Arc::new(AssistDb::open(cli.db_path.as_deref())?);

    // Commands that only touch the store
    match &cli.command {
        Commands::Stats => return cmd_stats(&db),
        Commands::Alerts { tenant } => return cmd_alerts(&db, tenant),
        _ => {}
    }

    let config = AssistConfig::from_env();
    let assistant = Assistant::start(config, Collaborators::from_db(db.clone())).await?;

    match cli.command {
        Commands::Stats | Commands::Alerts { .. } => Ok(()),
        Commands::Tools => cmd_tools(&assistant),
        Commands::Import { tenant, file } => cmd_import(&db, &assistant, &tenant, &file).await,
        Commands::Search { tenant, query, k } => cmd_search(&assistant, &tenant, &query, k).await,
        Commands::Invoke { tenant, name, args } => cmd_invoke(&assistant, &tenant, &name, &args).await,
        Commands::InvokeAll { tenant, calls } => cmd_invoke_all(&assistant, &tenant, &calls).await,
        Commands::Tone { messages, draft } => cmd_tone(&assistant, &messages, draft.as_deref()),
        Commands::RecordOutcome {
            tenant,
            intent,
            outcome,
            conversation,
            corrects,
        } => cmd_record_outcome(&assistant, &tenant, &intent, &outcome, conversation, corrects).await,
        Commands::Analyze { tenant } => cmd_analyze(&assistant, tenant.as_deref()).await,
        Commands::Schedule => cmd_schedule(&assistant).await,
    }
}

fn cmd_stats(db: &AssistDb) -> Result<()> {
    let stats = db.stats()?;

    println!("=== Support Assistant Database Stats ===");
    println!("Database: {}", db.path().display());
    println!();
    println!("Tenants:         {}", stats.tenants);
    println!("Knowledge items: {} ({} embedded)", stats.knowledge_items, stats.embedded_items);
    println!("Products:        {}", stats.products);
    println!("Shipping tables: {}", stats.shipping_tables);
    println!("Outcomes:        {}", stats.outcomes);
    println!("Alerts:          {}", stats.alerts);

    Ok(())
}

fn cmd_tools(assistant: &Assistant) -> Result<()> {
    let defs = assistant.list_tool_definitions();
    println!("{}", serde_json::to_string_pretty(&defs)?);
    Ok(())
}

async fn cmd_import(db: &AssistDb, assistant: &Assistant, tenant: &str, file: &str) -> Result<()> {
    let tenant = parse_tenant(tenant)?;
    let raw = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?;
    let data: ImportFile =
        serde_json::from_str(&raw).map_err(|e| anyhow!("Invalid import file {}: {}", file, e))?;

    let mut indexed = 0;
    for entry in data.items {
        let mut item = KnowledgeItem::new(tenant.clone(), entry.id, entry.name)
            .with_description(entry.description);
        item.embedding = entry.embedding;
        item.active = entry.active;

        let item = match assistant.index_item(item.clone()).await {
            Ok(embedded) => {
                indexed += 1;
                embedded
            }
            Err(e) => {
                warn!("Storing item {} without embedding: {}", item.id, e);
                item
            }
        };
        db.put_item(&item)?;
    }

    for product in &data.products {
        db.put_product(&tenant, product)?;
    }
    if let Some(shipping) = &data.shipping {
        db.put_shipping_table(&tenant, shipping)?;
    }

    info!("Import for {} finished", tenant);
    println!(
        "Imported {} products{} and indexed {} knowledge items for {}",
        data.products.len(),
        if data.shipping.is_some() { ", shipping rates" } else { "" },
        indexed,
        tenant
    );
    Ok(())
}

async fn cmd_search(assistant: &Assistant, tenant: &str, query: &str, k: Option<usize>) -> Result<()> {
    let tenant = parse_tenant(tenant)?;
    let results = assistant.search_knowledge(query, &tenant, k).await?;

    if results.is_empty() {
        println!("Nothing matched.");
        return Ok(());
    }

    println!("{:<20}  {:<6}  {:<14}  {}", "ITEM ID", "SCORE", "PROVENANCE", "NAME");
    println!("{}", "-".repeat(70));
    for r in &results {
        let provenance = if r.degraded {
            format!("{}*", r.provenance)
        } else {
            r.provenance.to_string()
        };
        println!("{:<20}  {:<6.3}  {:<14}  {}", r.item_id, r.score, provenance, r.name);
    }
    if results.iter().any(|r| r.degraded) {
        println!("\n* degraded: hash pseudo-embedding, only exact repeats rank meaningfully");
    }
    Ok(())
}

async fn cmd_invoke(assistant: &Assistant, tenant: &str, name: &str, args: &str) -> Result<()> {
    let ctx = TenantContext::new(parse_tenant(tenant)?).with_caller("cli");
    let args: serde_json::Value =
        serde_json::from_str(args).map_err(|e| anyhow!("Arguments must be JSON: {}", e))?;

    let outcome = assistant.invoke_tool(name, &args, &ctx).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn cmd_invoke_all(assistant: &Assistant, tenant: &str, calls: &str) -> Result<()> {
    let ctx = TenantContext::new(parse_tenant(tenant)?).with_caller("cli");
    let calls: Vec<ToolCall> =
        serde_json::from_str(calls).map_err(|e| anyhow!("Calls must be a JSON array: {}", e))?;

    let outcomes = assistant.invoke_tools(&calls, &ctx).await;
    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}

fn cmd_tone(assistant: &Assistant, messages: &[String], draft: Option<&str>) -> Result<()> {
    let analysis = assistant.analyze_tone(messages);

    println!("Dominant tone: {}", analysis.dominant_tone);
    if let Some(nominal) = analysis.nominal_tone {
        if nominal != analysis.dominant_tone {
            println!("Nominal tone:  {} (below confidence cutoff)", nominal);
        }
    }
    println!("Confidence:    {:.2}", analysis.confidence);
    for (tone, score) in &analysis.scores {
        println!("  {:14} {}", tone.to_string(), score);
    }

    if let Some(draft) = draft {
        let adapted = assistant.adapt_reply(draft, &analysis);
        println!();
        println!("Directive: {}", adapted.directive);
        println!("Reply:     {}", adapted.reply);
    }
    Ok(())
}

async fn cmd_record_outcome(
    assistant: &Assistant,
    tenant: &str,
    intent: &str,
    outcome: &str,
    conversation: Option<String>,
    corrects: Option<String>,
) -> Result<()> {
    let outcome: Outcome = outcome.parse().map_err(|e: String| anyhow!(e))?;
    let mut record = OutcomeRecord::new(parse_tenant(tenant)?, intent, outcome);
    record.conversation_id = conversation;
    record.corrects = corrects
        .as_deref()
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|e| anyhow!("Invalid --corrects id: {}", e))?;

    let id = record.id;
    assistant.record_outcome(record).await?;
    println!("Recorded outcome {}", id);
    Ok(())
}

async fn cmd_analyze(assistant: &Assistant, tenant: Option<&str>) -> Result<()> {
    match tenant {
        Some(tenant) => {
            let tenant = parse_tenant(tenant)?;
            let findings = assistant.run_daily_pattern_analysis(&tenant).await?;
            if findings.is_empty() {
                println!("No weak topics for {}.", tenant);
                return Ok(());
            }
            println!("{:<24}  {:>6}  {:>11}  {:>6}", "INTENT", "TOTAL", "UNSATISFIED", "RATE");
            println!("{}", "-".repeat(55));
            for f in &findings {
                println!(
                    "{:<24}  {:>6}  {:>11}  {:>5.0}%",
                    f.intent,
                    f.total,
                    f.unsatisfied,
                    f.rate * 100.0
                );
            }
        }
        None => {
            let report = assistant.run_pattern_batch().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn cmd_alerts(db: &AssistDb, tenant: &str) -> Result<()> {
    let tenant = parse_tenant(tenant)?;
    let alerts = db.list_alerts(&tenant)?;

    if alerts.is_empty() {
        println!("No alerts for {}.", tenant);
        return Ok(());
    }

    for alert in &alerts {
        println!("[{}] {}", format_timestamp(alert.created_at), alert.title);
        println!("{}", alert.message);
    }
    println!("Total: {} alerts", alerts.len());
    Ok(())
}

async fn cmd_schedule(assistant: &Assistant) -> Result<()> {
    let handle = assistant.spawn_pattern_scheduler();
    println!("Pattern analysis scheduler running. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    handle.abort();
    info!("Scheduler stopped");
    Ok(())
}
