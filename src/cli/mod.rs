//! Command-line interface for mongo-query-exec
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI overrides
//! - Reading the query from the argument or stdin

use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::{Config, ENV_LOG, LogLevel};
use crate::error::{ParseError, Result};

/// Run a MongoDB shell-style query string and print the outcome as JSON
#[derive(Parser, Debug)]
#[command(
    name = "mongo-query-exec",
    version,
    about = "Execute MongoDB shell-style queries",
    long_about = "Parses a MongoDB shell query such as db.orders.find({status:'open'}).limit(5),
runs it against the configured database and prints a JSON outcome."
)]
pub struct CliArgs {
    /// Query to execute, read from stdin when omitted
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(long, value_name = "URI")]
    pub uri: Option<String>,

    /// Database name to use
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Persist the result data to this file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Print the outcome on a single line
    #[arg(long)]
    pub compact: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (debug logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Print the compiled operations without connecting
    #[arg(long)]
    pub dry_run: bool,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and environment, then apply arguments
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        Self::load_config_with_env(args, |key| std::env::var(key).ok())
    }

    /// Layer file, environment and arguments, then validate the result
    ///
    /// The log level variable is not consulted when `-v`/`--vv` already
    /// decides the level.
    fn load_config_with_env<F>(args: &CliArgs, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let level_from_args = args.verbose || args.very_verbose;
        let mut config = Config::load(args.config_file.as_deref(), |key| {
            if level_from_args && key == ENV_LOG {
                None
            } else {
                lookup(key)
            }
        })?;

        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }
        if let Some(database) = &args.database {
            config.connection.database = database.clone();
        }
        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }

        if let Some(output) = &args.output {
            config.output.file = Some(output.clone());
        }
        if args.compact {
            config.output.pretty = false;
        }

        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else {
            config.logging.level
        };
    }

    /// Get the query text from the argument or stdin
    ///
    /// # Returns
    /// * `Result<String>` - Trimmed query text, never empty
    pub fn read_query(&self) -> Result<String> {
        let query = match &self.args.query {
            Some(query) => query.clone(),
            None => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        let query = query.trim();
        if query.is_empty() {
            return Err(ParseError::MalformedQuery("no query given".to_string()).into());
        }
        Ok(query.to_string())
    }

    /// Get the file results are persisted to, if any
    pub fn output_file(&self) -> Option<&Path> {
        self.config.output.file.as_deref()
    }

    /// Whether colors should be applied to terminal output
    pub fn use_colors(&self) -> bool {
        !self.args.no_color
    }

    /// Get sanitized connection URI for display (hides credentials)
    ///
    /// # Returns
    /// * `String` - Sanitized URI with credentials replaced by ***
    pub fn get_sanitized_connection_uri(&self) -> String {
        Self::sanitize_uri(&self.config.connection.uri)
    }

    /// Sanitize URI by hiding credentials
    fn sanitize_uri(uri: &str) -> String {
        if let (Some(proto_end), Some(host_start)) = (uri.find("://"), uri.rfind('@')) {
            if host_start > proto_end {
                return format!("{}***{}", &uri[..proto_end + 3], &uri[host_start..]);
            }
        }
        uri.to_string()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }
}
