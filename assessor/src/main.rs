//! markwise: trademark registrability risk assessment from the command line
//!
//! Loads a knowledge base of examination guidance, analyzes issue topics
//! for a mark against an OpenAI-compatible model server and prints the
//! assessment report as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use assessor::{
    parse_report, AssessmentRequest, Assessor, AssessorConfig, EvidenceBundle, PriorMark,
};
use knowledge::{CitationRegistry, KnowledgeStore};

#[derive(Parser)]
#[command(name = "markwise")]
#[command(about = "Trademark registrability risk assessment")]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, env = "MARKWISE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Knowledge base location shared by subcommands.
#[derive(Debug, clap::Args)]
struct KnowledgeArgs {
    /// Knowledge base JSON (list or map of sections)
    #[arg(short, long, env = "MARKWISE_KNOWLEDGE", default_value = "data/tmep_sections.json")]
    knowledge: PathBuf,

    /// Additional citation map JSON
    #[arg(long, env = "MARKWISE_CITATIONS")]
    citations: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assess a mark and print the report
    Assess {
        #[command(flatten)]
        knowledge: KnowledgeArgs,

        /// Mark to assess (defaults to the report's mark)
        #[arg(short, long)]
        mark: Option<String>,

        /// Goods/services description (defaults to the report's goods)
        #[arg(short, long)]
        goods: Option<String>,

        /// Issue topic to analyze; repeat for several
        #[arg(short, long = "topic")]
        topics: Vec<String>,

        /// Prior marks JSON array
        #[arg(long)]
        prior_marks: Option<PathBuf>,

        /// Evidence JSON (case law, third-party registrations)
        #[arg(long)]
        evidence: Option<PathBuf>,

        /// Plain-text search report
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate citations against the knowledge base
    Citations {
        #[command(flatten)]
        knowledge: KnowledgeArgs,

        /// Citations to check, e.g. "TMEP §1207.01"
        #[arg(required = true, value_name = "CITATION")]
        claimed: Vec<String>,
    },

    /// Parse a plain-text search report
    ParseReport {
        /// Report text file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AssessorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AssessorConfig::default(),
    };

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in log_directives(&config.general.log_level) {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    match cli.command {
        Command::Assess {
            knowledge,
            mark,
            goods,
            topics,
            prior_marks,
            evidence,
            report,
        } => {
            let store = Arc::new(load_store(&knowledge)?);

            let parsed = match &report {
                Some(path) => Some(parse_report(&read(path)?)?),
                None => None,
            };

            let trademark = mark
                .or_else(|| parsed.as_ref().and_then(|r| r.mark.clone()))
                .context("no mark given and none found in the report")?;
            let goods_services = goods
                .or_else(|| parsed.as_ref().and_then(|r| r.goods_services_text()))
                .context("no goods/services given and none found in the report")?;

            let mut marks: Vec<PriorMark> = match &prior_marks {
                Some(path) => serde_json::from_str(&read(path)?)
                    .with_context(|| format!("parsing prior marks {}", path.display()))?,
                None => Vec::new(),
            };
            if let Some(parsed) = parsed {
                marks.extend(parsed.prior_marks);
            }

            let evidence: EvidenceBundle = match &evidence {
                Some(path) => serde_json::from_str(&read(path)?)
                    .with_context(|| format!("parsing evidence {}", path.display()))?,
                None => EvidenceBundle::default(),
            };

            let request = AssessmentRequest::new(trademark, goods_services)
                .with_topics(topics)
                .with_prior_marks(marks)
                .with_evidence(evidence);

            let assessor = Assessor::from_config(config, store)?;
            let report = assessor.assess_report(&request).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Citations { knowledge, claimed } => {
            let store = load_store(&knowledge)?;
            let validation = store.registry().validate(claimed.as_slice());
            println!("{}", serde_json::to_string_pretty(&validation)?);
        }

        Command::ParseReport { path } => {
            let parsed = parse_report(&read(&path)?)?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
    }

    Ok(())
}

/// Crate targets that log during an assessment.
const LOG_TARGETS: &[&str] = &["markwise", "assessor", "markwise_agent", "knowledge"];

fn log_directives(level: &str) -> Vec<String> {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect()
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load_store(args: &KnowledgeArgs) -> anyhow::Result<KnowledgeStore> {
    let mut store = KnowledgeStore::from_file(&args.knowledge)
        .with_context(|| format!("loading knowledge base {}", args.knowledge.display()))?;

    if let Some(path) = &args.citations {
        let registry = CitationRegistry::from_json(&read(path)?)
            .with_context(|| format!("parsing citation map {}", path.display()))?;
        store = store.with_citation_map(registry);
    }

    info!(
        sections = store.len(),
        fingerprint = %store.fingerprint(),
        "Knowledge base loaded"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::Directive;

    #[test]
    fn test_log_level_reaches_every_crate() {
        let directives = log_directives("warn");

        assert_eq!(
            directives,
            vec!["markwise=warn", "assessor=warn", "markwise_agent=warn", "knowledge=warn"]
        );
        for directive in &directives {
            assert!(directive.parse::<Directive>().is_ok(), "{directive}");
        }
    }
}
