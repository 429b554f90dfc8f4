use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comicdex_core::{run_update, AuditSink, Document, IndexBuilder, IndexStore, NoAudit, QueryEngine, StopReason};
use comicdex_crawler::{FetchConfig, HttpFetcher, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

mod audit;

use audit::AuditLog;

#[derive(Parser)]
#[command(name = "comicdex")]
#[command(about = "Harvest comic metadata into an inverted index and search it", long_about = None)]
struct Cli {
    /// Index database directory
    #[arg(long, global = true, default_value = "./comicdex.db")]
    db: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch documents from the stored cursor up to the frontier and index them
    Update {
        /// Base URL of the comic site
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
        /// Request timeout seconds
        #[arg(long, default_value_t = 12)]
        timeout_secs: u64,
        /// User-Agent header for requests
        #[arg(long, default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
        /// Pause between requests, in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
        /// Stop after this many documents in one run
        #[arg(long)]
        max_docs: Option<usize>,
        /// Append-only log of processed documents
        #[arg(long, default_value = "./comic_log.jsonl")]
        audit_log: String,
        /// Do not write the audit log
        #[arg(long, default_value_t = false)]
        no_audit: bool,
    },
    /// Print every term with its postings
    Postings,
    /// Print every stored document
    Documents,
    /// Find documents containing all query terms; prompts when no query is given
    Search {
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Print term, document and cursor counts
    Stats,
}

fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = IndexStore::open(&cli.db).with_context(|| format!("opening index at {}", cli.db))?;
    match cli.command {
        Commands::Update { base_url, timeout_secs, user_agent, delay_ms, max_docs, audit_log, no_audit } => {
            let fetcher = HttpFetcher::new(FetchConfig {
                base_url,
                user_agent,
                timeout: Duration::from_secs(timeout_secs),
                delay: Duration::from_millis(delay_ms),
            })?;
            let mut sink: Box<dyn AuditSink> = if no_audit {
                Box::new(NoAudit)
            } else {
                let log = AuditLog::open(&audit_log)?;
                tracing::info!(path = %log.path().display(), entries = log.len(), "audit log ready");
                Box::new(log)
            };
            update(&store, &fetcher, sink.as_mut(), max_docs)
        }
        Commands::Postings => dump_postings(&store),
        Commands::Documents => dump_documents(&store),
        Commands::Search { query } => {
            let query = match query {
                Some(q) => q,
                None => prompt("Enter search query: ")?,
            };
            search(&store, &query)
        }
        Commands::Stats => {
            let stats = store.stats()?;
            println!("terms: {}", stats.terms);
            println!("documents: {}", stats.documents);
            match stats.cursor {
                Some(c) => println!("next id: {c}"),
                None => println!("next id: 1 (no updates yet)"),
            }
            Ok(())
        }
    }
}

fn update(store: &IndexStore, fetcher: &HttpFetcher, sink: &mut dyn AuditSink, max_docs: Option<usize>) -> Result<()> {
    let mut builder = IndexBuilder::new(fetcher, sink).max_docs(max_docs);
    let summary = run_update(store, &mut builder).context("update failed")?;
    match summary.stop {
        StopReason::Frontier(id) => println!("reached frontier at {id}"),
        StopReason::Limit => println!("stopped at document limit"),
    }
    println!(
        "documents processed: {} (from {}), terms touched: {}, next id: {}",
        summary.processed, summary.start_id, summary.flush.terms, summary.flush.cursor
    );
    Ok(())
}

fn dump_postings(store: &IndexStore) -> Result<()> {
    let mut out = io::stdout().lock();
    let mut total = 0usize;
    for entry in store.scan_postings() {
        let (term, ids) = entry?;
        writeln!(out, "key = '{term}'\tvalue = {:?}", ids.as_slice())?;
        total += 1;
    }
    writeln!(out, "\nTotal entries: {total}")?;
    Ok(())
}

fn dump_documents(store: &IndexStore) -> Result<()> {
    let mut out = io::stdout().lock();
    let mut total = 0usize;
    for entry in store.scan_documents() {
        let (id, doc) = entry?;
        writeln!(out, "key = '{id}'\tvalue = {doc:?}\n")?;
        total += 1;
    }
    writeln!(out, "\nTotal entries: {total}")?;
    Ok(())
}

fn search(store: &IndexStore, query: &str) -> Result<()> {
    let engine = QueryEngine::new(store.clone());
    let docs = engine.search(query).context("search failed")?;
    let mut out = io::stdout().lock();
    if docs.is_empty() {
        writeln!(out, "no results")?;
        return Ok(());
    }
    for doc in &docs {
        print_document(&mut out, doc)?;
    }
    writeln!(out, "{} results", docs.len())?;
    Ok(())
}

fn print_document(out: &mut impl Write, doc: &Document) -> io::Result<()> {
    writeln!(out, "Num: {}\nLink: {}\nTitle: {}\nTranscript: {}\n", doc.id, doc.link, doc.title, doc.transcript)
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
