//! quadgraph CLI: load a statement file into an in-memory store and inspect it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use quadgraph::config::StoreConfig;
use quadgraph::encoding::EncodingPolicy;
use quadgraph::model::{BlankNode, CompleteStatement, Context, Literal, Resource, Uri};
use quadgraph::query::Pattern;
use quadgraph::{interop, RdfStore};

#[derive(Parser)]
#[command(name = "quadgraph", version, about = "RDF statements over a property graph")]
struct Cli {
    /// TOML store configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Encoding policy, overriding the configuration.
    #[arg(long, global = true)]
    encoding: Option<EncodingPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a statement file and print store statistics.
    Stats {
        /// JSON array of statements.
        #[arg(long)]
        file: PathBuf,
    },

    /// Load a statement file and print statements matching a pattern.
    Query {
        #[arg(long)]
        file: PathBuf,

        /// Subject URI, or `_:id` for a blank node.
        #[arg(long)]
        subject: Option<String>,

        #[arg(long)]
        predicate: Option<String>,

        /// Object URI, or `_:id` for a blank node.
        #[arg(long, conflicts_with = "literal")]
        object: Option<String>,

        /// Plain literal object.
        #[arg(long)]
        literal: Option<String>,

        /// Context URI, or `default` for the default graph. Repeatable.
        #[arg(long)]
        context: Vec<String>,
    },

    /// Load a statement file and print it as N-Quads.
    Export {
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(encoding) = cli.encoding {
        config.encoding = encoding;
    }

    match cli.command {
        Commands::Stats { file } => {
            let statements = read_statements(&file)?;
            let store = RdfStore::in_memory(config)?;
            store.add_statements(&statements)?;
            let stats = store.store().stats()?;
            println!("encoding:   {}", store.policy());
            println!("statements: {}", statements.len());
            println!("vertices:   {}", stats.vertices);
            println!("  keyed:    {}", stats.keyed_vertices);
            println!("edges:      {}", stats.edges);
        }

        Commands::Query {
            file,
            subject,
            predicate,
            object,
            literal,
            context,
        } => {
            let statements = read_statements(&file)?;
            let store = RdfStore::in_memory(config)?;
            store.add_statements(&statements)?;

            let mut pattern = Pattern::new();
            if let Some(s) = subject {
                pattern = pattern.subject(parse_resource(&s)?);
            }
            if let Some(p) = predicate {
                pattern = pattern.predicate(Uri::new(p)?);
            }
            if let Some(o) = object {
                pattern = pattern.object(parse_resource(&o)?);
            }
            if let Some(l) = literal {
                pattern = pattern.object(Literal::plain(l));
            }
            if !context.is_empty() {
                let contexts = context
                    .iter()
                    .map(|c| parse_context(c.as_str()))
                    .collect::<Result<Vec<_>>>()?;
                pattern = pattern.in_contexts(contexts);
            }

            let found = store.find(&pattern)?;
            if found.is_empty() {
                println!("No statements match {pattern}.");
            } else {
                println!("Matches for {pattern} ({}):", found.len());
                for statement in &found {
                    println!("  {statement}");
                }
            }
        }

        Commands::Export { file } => {
            let statements = read_statements(&file)?;
            let store = RdfStore::in_memory(config)?;
            store.add_statements(&statements)?;
            // Whole-graph scans have no access path; walk the loaded subjects.
            let subjects: BTreeSet<&Resource> = statements.iter().map(|s| s.subject()).collect();
            let mut stored = Vec::new();
            for subject in subjects {
                stored.extend(store.find(&Pattern::new().subject(subject.clone()))?);
            }
            let mut out = std::io::stdout().lock();
            let written = interop::write_nquads(&mut out, &stored)?;
            tracing::info!(quads = written, "exported");
        }
    }

    Ok(())
}

fn read_statements(path: &Path) -> Result<Vec<CompleteStatement>> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    let statements: Vec<CompleteStatement> = serde_json::from_str(&content).into_diagnostic()?;
    tracing::debug!(count = statements.len(), file = %path.display(), "read statements");
    Ok(statements)
}

fn parse_resource(term: &str) -> Result<Resource> {
    Ok(match term.strip_prefix("_:") {
        Some(id) => BlankNode::new(id)?.into(),
        None => Uri::new(term)?.into(),
    })
}

fn parse_context(term: &str) -> Result<Context> {
    if term == "default" {
        return Ok(Context::NULL);
    }
    Ok(Context::named(Uri::new(term)?))
}
