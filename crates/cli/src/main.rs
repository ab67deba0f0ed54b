use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use nac_api::{ConsoleClient, ConsoleConfig, StaticSessionHeaders, Transport, default_option_cache_path};
use nac_engine::{CachingOrchestrator, FieldOutcome, OptionCache, Orchestrator, PlannedRequests, Resolver};
use nac_types::{PageContext, RequestSpec};
use nac_util::redact_sensitive;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

mod form;

#[derive(Parser, Debug)]
#[command(name = "nac-console", version, about = "Resolve NAC console form options")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve every field of a form document
    Resolve {
        /// Form document (`.json`, otherwise YAML)
        form: PathBuf,

        /// Path of the page hosting the form, for page-bound fields
        #[arg(long)]
        page_path: Option<String>,

        /// Set a form value (`key=value`, value parsed as JSON when possible)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Print the requests instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// Neither read nor write the option cache file
        #[arg(long)]
        no_cache: bool,
    },
    /// Print the combined lookup table for dictionary types
    Dictionaries {
        #[arg(required = true)]
        types: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = ConsoleConfig::load().context("load console configuration")?;
    debug!(base_url = %config.base_url, "configuration loaded");

    match cli.command {
        Command::Resolve {
            form,
            page_path,
            set,
            dry_run,
            no_cache,
        } => run_resolve(&config, &form, page_path, &set, dry_run, no_cache).await,
        Command::Dictionaries { types } => run_dictionaries(&config, &types).await,
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_orchestrator(config: &ConsoleConfig) -> Result<Orchestrator> {
    let client: Arc<dyn Transport> = Arc::new(ConsoleClient::new(config)?);
    let headers = StaticSessionHeaders::from_env().context("build session headers")?;
    let resolver = Resolver::new(client, Arc::new(headers)).with_cache_defeat_param(config.cache_defeat_param.clone());
    Ok(Orchestrator::new(resolver, config.paths.clone()))
}

async fn run_resolve(
    config: &ConsoleConfig,
    form_path: &std::path::Path,
    page_path: Option<String>,
    assignments: &[String],
    dry_run: bool,
    no_cache: bool,
) -> Result<()> {
    let document = form::load_form(form_path)?;
    let mut context = document.context();
    for assignment in assignments {
        let (key, value) = form::parse_assignment(assignment)?;
        context.values.insert(key, value);
    }
    if let Some(page_path) = page_path {
        context.page = Some(PageContext::new(page_path));
    }

    let orchestrator = build_orchestrator(config)?;
    if dry_run {
        let planned = orchestrator.build_requests(&document.fields, &context)?;
        println!("{}", serde_json::to_string_pretty(&render_planned(&orchestrator, &planned))?);
        return Ok(());
    }

    let outcomes = if no_cache {
        orchestrator.resolve_all(&document.fields, &context).await?
    } else {
        let cache_path = default_option_cache_path();
        let cache = OptionCache::load(&cache_path, config.option_cache_ttl());
        let caching = CachingOrchestrator::with_cache(orchestrator, cache);
        let outcomes = caching.resolve_all(&document.fields, &context).await?;
        if let Err(error) = caching.cache().save(&cache_path) {
            warn!(path = %cache_path.display(), error = %error, "Failed to save option cache");
        }
        outcomes
    };
    println!("{}", serde_json::to_string_pretty(&render_outcomes(outcomes))?);
    Ok(())
}

async fn run_dictionaries(config: &ConsoleConfig, types: &[String]) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let table = orchestrator.dictionaries().load_combined(types).await?;
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}

/// Dry-run output: the shared dictionary request once, then one entry per other field.
fn render_planned(orchestrator: &Orchestrator, planned: &PlannedRequests) -> Value {
    let fields = planned
        .fields
        .iter()
        .map(|(field_id, request)| {
            let rendered = match request {
                Ok(spec) => render_dry_run(orchestrator, spec),
                Err(error) => json!({ "error": error.to_json() }),
            };
            (field_id.clone(), rendered)
        })
        .collect::<Map<_, _>>();

    let mut output = Map::new();
    if let Some(shared) = &planned.dictionary {
        output.insert(
            "dictionaries".to_string(),
            json!({ "fields": shared.field_ids, "request": render_dry_run(orchestrator, &shared.request) }),
        );
    }
    output.insert("fields".to_string(), Value::Object(fields));
    Value::Object(output)
}

fn render_dry_run(orchestrator: &Orchestrator, spec: &RequestSpec) -> Value {
    let request = orchestrator.resolver().prepare(spec);
    let mut headers_out = Map::new();
    for (name, value) in request.headers.iter() {
        let line = format!("{}: {}", name.as_str(), value.to_str().unwrap_or(""));
        let redacted = redact_sensitive(&line);
        let out_value = redacted.split_once(':').map(|(_, value)| value.trim()).unwrap_or("").to_string();
        headers_out.insert(name.as_str().to_string(), Value::String(out_value));
    }
    json!({
        "method": request.method,
        "url": request.url,
        "query": request.query,
        "headers": headers_out,
        "body": request.body,
    })
}

fn render_outcomes(outcomes: IndexMap<String, FieldOutcome>) -> Value {
    let rendered = outcomes
        .into_iter()
        .map(|(field_id, outcome)| {
            let value = match outcome {
                Ok(options) => json!({ "options": options }),
                Err(error) => json!({ "error": error.to_json() }),
            };
            (field_id, value)
        })
        .collect::<Map<_, _>>();
    Value::Object(rendered)
}
