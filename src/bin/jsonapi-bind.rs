//! JSON:API bind CLI
//!
//! Command-line interface for binding and validating resource documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jsonapi_bind::{
    compile_includes, load_document_str, load_json_auto, load_store, save_store,
    validate_document, BindOptions, Binder, LoadError, MemoryStore, Record, Scope, SchemaRegistry,
    DEFAULT_MAX_DEPTH,
};
use serde_json::Value;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsonapi-bind")]
#[command(about = "Bind JSON:API resource documents onto stored records")]
#[command(version)]
struct Cli {
    /// Log binding decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind a document against a store fixture and print the bound record
    Bind {
        /// Document source: file path, URL (http:// or https://), or - for stdin
        document: String,

        /// Schema registry: file path or URL
        #[arg(long)]
        schemas: String,

        /// Store fixture file
        #[arg(long)]
        store: PathBuf,

        /// Element type of the collection to bind the root into
        #[arg(long)]
        scope_type: Option<String>,

        /// Restrict the scope to an association, as owner_type:owner_id:relationship
        #[arg(long, requires = "scope_type")]
        within: Option<String>,

        /// Bind the root with this named schema instead of its type's own
        #[arg(long)]
        schema: Option<String>,

        /// Extra attribute names to allow (comma-separated)
        #[arg(long, value_delimiter = ',')]
        permit: Vec<String>,

        /// Maximum nesting depth of related resources
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Save the bound record and write the store fixture back
        #[arg(long)]
        save: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Report errors as a JSON:API error document on stdout
        #[arg(long)]
        json: bool,
    },

    /// Check a document's shape without binding it
    Validate {
        /// Document source: file path, URL, or - for stdin
        document: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Compile an include parameter into nested relationship paths
    Includes {
        /// Comma-separated dotted paths, e.g. "author,comments.author"
        paths: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Bind {
            document,
            schemas,
            store,
            scope_type,
            within,
            schema,
            permit,
            max_depth,
            save,
            pretty,
            json,
        } => run_bind(BindArgs {
            document,
            schemas,
            store,
            scope_type,
            within,
            schema,
            permit,
            max_depth,
            save,
            pretty,
            json_output: json,
        }),

        Commands::Validate { document, json } => run_validate(&document, json),

        Commands::Includes { paths, pretty } => run_includes(&paths, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("jsonapi_bind=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

struct BindArgs {
    document: String,
    schemas: String,
    store: PathBuf,
    scope_type: Option<String>,
    within: Option<String>,
    schema: Option<String>,
    permit: Vec<String>,
    max_depth: usize,
    save: bool,
    pretty: bool,
    json_output: bool,
}

fn run_bind(args: BindArgs) -> Result<(), u8> {
    let document = read_document(&args.document).map_err(|e| {
        report_error(args.json_output, BAD_DOCUMENT, &format!("loading document: {}", e));
        e.exit_code() as u8
    })?;

    let registry: SchemaRegistry = load_json_auto(&args.schemas).map_err(|e| {
        report_error(args.json_output, LOAD_FAILURE, &format!("loading schemas: {}", e));
        e.exit_code() as u8
    })?;

    if registry.is_empty() {
        warn!(source = %args.schemas, "schema registry is empty");
    } else {
        debug!(schemas = registry.len(), "loaded schema registry");
    }

    let mut store = load_store(&args.store).map_err(|e| {
        report_error(args.json_output, LOAD_FAILURE, &format!("loading store: {}", e));
        e.exit_code() as u8
    })?;

    let mut options = BindOptions::new().permit(args.permit);
    if let Some(name) = args.schema {
        options = options.schema(name);
    }
    if let Some(resource_type) = args.scope_type {
        let mut scope = Scope::new(resource_type);
        if let Some(within) = &args.within {
            let Some((owner_type, owner_id, relationship)) = parse_within(within) else {
                report_error(
                    args.json_output,
                    BAD_ARGUMENT,
                    &format!("--within expects owner_type:owner_id:relationship, got '{}'", within),
                );
                return Err(2);
            };
            scope = scope.within(owner_type, owner_id, relationship);
        }
        options = options.scope(scope);
    }

    let bound = Binder::new(&store, &registry)
        .max_depth(args.max_depth)
        .bind(&document, &options);
    let mut record = match bound {
        Ok(record) => record,
        Err(e) => {
            if args.json_output {
                println!("{}", e.to_error_document());
            } else {
                eprintln!("Error: {}", e);
            }
            return Err(e.exit_code() as u8);
        }
    };

    if args.save {
        persist(&mut store, &mut record, &args.store, args.json_output)?;
    }

    print_json(&record.to_document(), args.pretty)
}

fn persist(
    store: &mut MemoryStore,
    record: &mut Record,
    path: &Path,
    json_output: bool,
) -> Result<(), u8> {
    store.save(record).map_err(|e| {
        report_error(json_output, SAVE_FAILURE, &format!("saving record: {}", e));
        2u8
    })?;
    save_store(store, path).map_err(|e| {
        report_error(json_output, SAVE_FAILURE, &format!("writing store: {}", e));
        e.exit_code() as u8
    })
}

fn run_validate(source: &str, json_output: bool) -> Result<(), u8> {
    let document = read_document(source).map_err(|e| {
        report_error(json_output, BAD_DOCUMENT, &format!("loading document: {}", e));
        e.exit_code() as u8
    })?;

    match validate_document(&document) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(e) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": e.fields(),
                    "message": e.message(),
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed: {}", e);
            }
            Err(1)
        }
    }
}

fn run_includes(paths: &str, pretty: bool) -> Result<(), u8> {
    let compiled = serde_json::to_value(compile_includes(paths)).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    print_json(&compiled, pretty)
}

/// Load a document from a file, a URL, or stdin when `source` is `-`.
fn read_document(source: &str) -> Result<Value, LoadError> {
    if source != "-" {
        return load_json_auto(source);
    }
    let mut content = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut content).map_err(|source| {
        LoadError::ReadError {
            path: PathBuf::from("-"),
            source,
        }
    })?;
    load_document_str(&content)
}

fn parse_within(raw: &str) -> Option<(&str, &str, &str)> {
    let mut parts = raw.splitn(3, ':');
    let owner_type = parts.next().filter(|s| !s.is_empty())?;
    let owner_id = parts.next().filter(|s| !s.is_empty())?;
    let relationship = parts.next().filter(|s| !s.is_empty())?;
    Some((owner_type, owner_id, relationship))
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

/// How a failure outside the binder is labelled in a JSON error document.
#[derive(Clone, Copy)]
struct Failure {
    status: u16,
    title: &'static str,
}

const BAD_DOCUMENT: Failure = Failure {
    status: 400,
    title: "Unreadable Document",
};
const BAD_ARGUMENT: Failure = Failure {
    status: 400,
    title: "Invalid Argument",
};
const LOAD_FAILURE: Failure = Failure {
    status: 500,
    title: "Load Failure",
};
const SAVE_FAILURE: Failure = Failure {
    status: 500,
    title: "Save Failure",
};

/// Output an error message in plain text or as a JSON:API error document.
fn report_error(json_output: bool, failure: Failure, msg: &str) {
    if json_output {
        let document = serde_json::json!({
            "errors": [{
                "status": failure.status.to_string(),
                "title": failure.title,
                "detail": msg,
            }]
        });
        println!("{}", document);
    } else {
        eprintln!("Error: {}", msg);
    }
}
