//! Semantic Client CLI
//!
//! Command-line interface for resolving semantic terms and relations in API payloads.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use semantic_client::{
    load_document, load_documentation, ApiContext, HttpResponse, OfflineTransport, Relation,
    SemanticResource, Transport,
};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "remote")]
use semantic_client::{HttpTransport, TransportOptions};
#[cfg(feature = "remote")]
use std::time::Duration;

#[derive(Parser)]
#[command(name = "semantic-client")]
#[command(about = "Resolve semantic terms and hypermedia relations in API payloads")]
#[command(version)]
struct Cli {
    /// Log engine activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PayloadArgs {
    /// Payload file (JSON) returned by the operation
    payload: PathBuf,

    /// API documentation: file path or URL (http:// or https://)
    #[arg(long)]
    doc: String,

    /// operationId of the operation that returned the payload
    #[arg(long)]
    operation: String,

    /// Response status the payload was returned with
    #[arg(long, default_value_t = 200)]
    status: u16,

    /// Media type the payload was returned with
    #[arg(long, default_value = "application/json")]
    media_type: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value carrying a semantic term
    Get {
        #[command(flatten)]
        payload: PayloadArgs,

        /// Semantic term to look up (absolute URI)
        #[arg(long)]
        key: String,

        /// Base URL used to follow parent links (local lookup only if omitted)
        #[arg(long)]
        base_url: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },

    /// List the operations available for a relation (every control if omitted)
    Relations {
        #[command(flatten)]
        payload: PayloadArgs,

        /// Semantic relation to resolve
        #[arg(long)]
        relation: Option<String>,

        /// Maximum number of operations to list (0 lists all)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the data and relations not surfaced by the given terms
    Remaining {
        #[command(flatten)]
        payload: PayloadArgs,

        /// Semantic term already displayed (repeatable)
        #[arg(long = "read")]
        read: Vec<String>,

        /// Semantic relation already displayed (repeatable)
        #[arg(long = "read-relation")]
        read_relations: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Get {
            payload,
            key,
            base_url,
            timeout,
        } => run_get(&payload, &key, base_url.as_deref(), timeout).await,

        Commands::Relations {
            payload,
            relation,
            limit,
        } => run_relations(&payload, relation.as_deref(), limit).await,

        Commands::Remaining {
            payload,
            read,
            read_relations,
        } => run_remaining(&payload, &read, &read_relations).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_get(
    args: &PayloadArgs,
    key: &str,
    base_url: Option<&str>,
    timeout: u64,
) -> Result<(), u8> {
    let transport = transport_for(base_url, timeout)?;
    let mut resource = load_resource(args, transport).await?;

    let found = match base_url {
        Some(_) => resource.get(key).await,
        None => resource.get_local(key),
    }
    .map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    match found {
        Some(found) => print_json(&found.into_value(), args.pretty),
        None => {
            eprintln!("No value for {}", key);
            Err(1)
        }
    }
}

async fn run_relations(
    args: &PayloadArgs,
    relation: Option<&str>,
    limit: Option<usize>,
) -> Result<(), u8> {
    let mut resource = load_resource(args, Arc::new(OfflineTransport)).await?;

    let mut relations = match relation {
        Some(relation) => resource.get_relation(relation, limit),
        None => resource.get_other_relations(),
    };
    if let Some(limit) = limit.filter(|&n| n > 0) {
        relations.truncate(limit);
    }

    let output: Vec<Value> = relations.iter().map(describe_relation).collect();
    print_json(&Value::Array(output), args.pretty)
}

async fn run_remaining(
    args: &PayloadArgs,
    read: &[String],
    read_relations: &[String],
) -> Result<(), u8> {
    let mut resource = load_resource(args, Arc::new(OfflineTransport)).await?;

    // Replay what the caller already displayed so it drops out of the output.
    for key in read {
        resource.get_local(key).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    }
    for relation in read_relations {
        resource.get_relation(relation, None);
    }

    let data: Map<String, Value> = resource
        .get_other_data()
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?
        .into_iter()
        .map(|(name, found)| (name, found.into_value()))
        .collect();
    let relations: Vec<Value> = resource
        .get_other_relations()
        .iter()
        .map(describe_relation)
        .collect();

    print_json(&json!({ "data": data, "relations": relations }), args.pretty)
}

async fn load_resource(
    args: &PayloadArgs,
    transport: Arc<dyn Transport>,
) -> Result<SemanticResource, u8> {
    let documentation = load_documentation(&args.doc).await.map_err(|e| {
        eprintln!("Error loading documentation: {}", e);
        e.exit_code() as u8
    })?;

    let payload = load_document(&args.payload).map_err(|e| {
        eprintln!("Error loading payload: {}", e);
        e.exit_code() as u8
    })?;

    let mut response = HttpResponse::json(args.status, payload);
    response
        .headers
        .insert("content-type".to_string(), args.media_type.clone());

    let context = ApiContext::from_shared(Arc::new(documentation), transport);
    context
        .resource_for_response(&args.operation, response)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })
}

#[cfg(feature = "remote")]
fn transport_for(base_url: Option<&str>, timeout: u64) -> Result<Arc<dyn Transport>, u8> {
    let Some(base_url) = base_url else {
        return Ok(Arc::new(OfflineTransport));
    };
    let options = TransportOptions::new(base_url).timeout(Duration::from_secs(timeout));
    let transport = HttpTransport::new(&options).map_err(|e| {
        eprintln!("Error: {}", e);
        3u8
    })?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "remote"))]
fn transport_for(base_url: Option<&str>, _timeout: u64) -> Result<Arc<dyn Transport>, u8> {
    match base_url {
        Some(_) => {
            eprintln!("Error: --base-url requires the `remote` feature");
            Err(2)
        }
        None => Ok(Arc::new(OfflineTransport)),
    }
}

fn describe_relation(relation: &Relation) -> Value {
    json!({
        "key": relation.key,
        "relation": relation.relation,
        "operation": relation.operation.describe(),
    })
}

fn print_json(value: &Value, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    println!("{}", output);
    Ok(())
}
