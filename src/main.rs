//! mongo-query-exec
//!
//! Executes a MongoDB shell-style query string and prints a JSON outcome.
//!
//! # Usage
//!
//! ```bash
//! mongo-query-exec "db.orders.find({status:'open'}).sort({date:-1}).limit(10)"
//! echo "db.orders.count({})" | mongo-query-exec --database shop
//! mongo-query-exec --dry-run "db.orders.distinct('status')"
//! ```

use std::sync::Arc;

use mongodb::bson::{Bson, doc};
use tracing::{Level, debug};

use mongo_query_exec::cli::CliInterface;
use mongo_query_exec::connection::ConnectionManager;
use mongo_query_exec::error::Result;
use mongo_query_exec::executor::{QueryOutcome, QueryRunner};
use mongo_query_exec::formatter::OutcomeFormatter;
use mongo_query_exec::parser::Parser;

/// Application entry point
#[tokio::main]
async fn main() {
    // Initialize the application and handle any errors
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Compile (dry run) or execute the query
///
/// # Returns
/// * `Result<bool>` - Whether the query succeeded, or a setup error
async fn run() -> Result<bool> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);

    let query = cli.read_query()?;
    let formatter = OutcomeFormatter::new(
        cli.config().output.pretty,
        cli.use_colors(),
        cli.config().output.indent,
    );

    if cli.args().dry_run {
        return print_compiled(&query, &formatter);
    }

    let outcome = match connect(&cli).await {
        Ok(runner) => runner.run(&query, cli.output_file()).await,
        Err(e) => QueryOutcome::failure(e),
    };

    println!("{}", formatter.format(&outcome)?);
    Ok(outcome.is_success())
}

/// Connect to MongoDB and build a runner over the configured database
async fn connect(cli: &CliInterface) -> Result<QueryRunner> {
    debug!("Connecting to: {}", cli.get_sanitized_connection_uri());
    let mut manager = ConnectionManager::new(cli.config().connection.clone());
    manager.connect().await?;
    Ok(QueryRunner::new(Arc::new(manager.store()?)))
}

/// Print the compiled operations without touching the database
fn print_compiled(query: &str, formatter: &OutcomeFormatter) -> Result<bool> {
    let outcome = match Parser::new().parse(query) {
        Ok(compiled) => {
            let operations: Vec<Bson> = compiled
                .operations
                .iter()
                .map(|op| Bson::Document(op.to_document()))
                .collect();
            let plan = doc! {
                "collection": compiled.collection,
                "operations": operations,
            };
            QueryOutcome::success(Bson::Document(plan).into_relaxed_extjson(), None)
        }
        Err(e) => QueryOutcome::failure(e),
    };

    println!("{}", formatter.format(&outcome)?);
    Ok(outcome.is_success())
}

/// Initialize logging system based on verbosity level
///
/// Logs go to stderr so stdout carries only the outcome.
fn initialize_logging(cli: &CliInterface) {
    let level: Level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    // Configure timestamps
    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
