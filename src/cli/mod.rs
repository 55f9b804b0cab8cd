//! Command-line interface for esdump
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI overrides
//! - Query resolution from a literal string or a file
//! - Credential loading (flags or `ES_USER` / `ES_PASSWD`)
//! - Shell completion generation

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::{Config, LogLevel};
use crate::connection::Credentials;
use crate::error::{EsdumpError, Result};
use crate::export::FetchRequest;

/// Stream every document matching an Elasticsearch query as JSON lines
#[derive(Parser, Debug)]
#[command(
    name = "esdump",
    version,
    about = "Stream every document matching an Elasticsearch query as JSON lines",
    long_about = "Runs a search against an Elasticsearch index and writes every hit to stdout,
one JSON document per line. With --fetch-all the whole result set is paged
through with a scroll, optionally split into concurrent slices."
)]
pub struct CliArgs {
    /// URL of the Elasticsearch cluster
    #[arg(
        short = 'u',
        long = "elasticsearch-url",
        value_name = "URL",
        required_unless_present = "generate_completion"
    )]
    pub elasticsearch_url: Option<String>,

    /// User to authenticate with Elasticsearch
    #[arg(long, env = "ES_USER", value_name = "USER")]
    pub user: Option<String>,

    /// Password to authenticate with Elasticsearch
    #[arg(long, env = "ES_PASSWD", hide_env_values = true, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Index to search in
    #[arg(
        short = 'i',
        long,
        value_name = "INDEX",
        required_unless_present = "generate_completion"
    )]
    pub index: Option<String>,

    /// Query to run against the index
    #[arg(short = 'q', long, value_name = "JSON")]
    pub query: Option<String>,

    /// File containing the query to run against the index
    #[arg(short = 'f', long = "query-file", value_name = "FILE")]
    pub query_file: Option<PathBuf>,

    /// Fetch all results by paginating through them with a scroll
    ///
    /// Use with caution, as this can be a lot of data. See also --slices.
    #[arg(short = 'a', long)]
    pub fetch_all: bool,

    /// Number of slices to split the scroll into
    ///
    /// Improves throughput. Do not use more slices than the index has shards.
    #[arg(short = 's', long, default_value_t = 1, value_name = "N")]
    pub slices: usize,

    /// Scroll keep-alive, e.g. 1m or 30s
    #[arg(long, value_name = "DURATION")]
    pub scroll_keep_alive: Option<String>,

    /// Request timeout in seconds (0 disables)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Disable TLS certificate validation
    #[arg(long)]
    pub insecure: bool,

    /// Draw a progress bar on stderr
    #[arg(long)]
    pub progress: bool,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(long)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_name = "SHELL")]
    pub generate_completion: Option<Shell>,
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

    /// Load configuration from file and merge with arguments
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Effective configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;

        // Apply CLI arguments to override config values
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI arguments to configuration
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_logging_args(config, args);
        Self::apply_connection_args(config, args);

        if args.progress {
            config.output.progress_bar = true;
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Apply connection-related CLI arguments to configuration
    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }

        if let Some(keep_alive) = &args.scroll_keep_alive {
            config.connection.scroll_keep_alive = keep_alive.clone();
        }

        if args.insecure {
            config.connection.accept_invalid_certs = true;
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the store URL
    pub fn store_url(&self) -> Result<&str> {
        self.args
            .elasticsearch_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| EsdumpError::Usage("--elasticsearch-url is required".to_string()))
    }

    /// Get basic-auth credentials, if a user was given
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(self.args.user.clone(), self.args.password.clone())
    }

    /// Resolve the query text
    ///
    /// `--query` and `--query-file` are mutually exclusive. Without either the
    /// query is empty and the store applies its match-all default.
    ///
    /// # Returns
    /// * `Result<String>` - Query text or error
    pub fn resolve_query(&self) -> Result<String> {
        match (&self.args.query, &self.args.query_file) {
            (Some(_), Some(_)) => Err(EsdumpError::Usage(
                "both query and query-file were provided, please provide only one".to_string(),
            )),
            (Some(query), None) => Ok(query.clone()),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                EsdumpError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to read from file {}: {}", path.display(), e),
                ))
            }),
            (None, None) => Ok(String::new()),
        }
    }

    /// Build the fetch request from the arguments
    pub fn fetch_request(&self) -> Result<FetchRequest> {
        let index = self
            .args
            .index
            .clone()
            .filter(|i| !i.is_empty())
            .ok_or_else(|| EsdumpError::Usage("--index is required".to_string()))?;

        Ok(FetchRequest {
            index,
            query: self.resolve_query()?,
            fetch_all: self.args.fetch_all,
            slices: self.args.slices.max(1),
        })
    }

    /// Handle `--generate-completion`
    ///
    /// # Returns
    /// * `bool` - True if a completion script was printed
    pub fn handle_completion(&self) -> bool {
        let Some(shell) = self.args.generate_completion else {
            return false;
        };

        let mut command = CliArgs::command();
        clap_complete::generate(shell, &mut command, "esdump", &mut std::io::stdout());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let mut argv = vec!["esdump"];
        argv.extend_from_slice(args);
        CliArgs::try_parse_from(argv).unwrap()
    }

    fn interface(args: &[&str]) -> CliInterface {
        let mut argv = vec!["-c", "/dev/null"];
        argv.extend_from_slice(args);
        CliInterface::from_args(parse(&argv)).unwrap()
    }

    #[test]
    fn test_verify_cli() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_required_arguments() {
        assert!(CliArgs::try_parse_from(["esdump", "-i", "logs"]).is_err());
        assert!(CliArgs::try_parse_from(["esdump", "-u", "http://es:9200"]).is_err());
        assert!(CliArgs::try_parse_from(["esdump", "--generate-completion", "bash"]).is_ok());
    }

    #[test]
    fn test_fetch_request_defaults() {
        let cli = interface(&["-u", "http://es:9200", "-i", "logs"]);
        let request = cli.fetch_request().unwrap();

        assert_eq!(request.index, "logs");
        assert_eq!(request.query, "");
        assert!(!request.fetch_all);
        assert_eq!(request.slices, 1);
        assert_eq!(cli.store_url().unwrap(), "http://es:9200");
    }

    #[test]
    fn test_slices_are_clamped() {
        let cli = interface(&["-u", "http://es:9200", "-i", "logs", "-a", "-s", "0"]);
        let request = cli.fetch_request().unwrap();
        assert!(request.fetch_all);
        assert_eq!(request.slices, 1);
    }

    #[test]
    fn test_query_and_query_file_conflict() {
        let cli = interface(&[
            "-u",
            "http://es:9200",
            "-i",
            "logs",
            "-q",
            "{}",
            "-f",
            "query.json",
        ]);
        let err = cli.fetch_request().unwrap_err();
        assert!(matches!(err, EsdumpError::Usage(_)));
        assert_eq!(
            err.to_string(),
            "both query and query-file were provided, please provide only one"
        );
    }

    #[test]
    fn test_query_from_file() {
        let path = std::env::temp_dir().join("esdump_cli_query.json");
        std::fs::write(&path, r#"{"query":{"term":{"level":"error"}}}"#).unwrap();

        let cli = interface(&[
            "-u",
            "http://es:9200",
            "-i",
            "logs",
            "--query-file",
            path.to_str().unwrap(),
        ]);
        assert_eq!(
            cli.resolve_query().unwrap(),
            r#"{"query":{"term":{"level":"error"}}}"#
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_query_file() {
        let cli = interface(&[
            "-u",
            "http://es:9200",
            "-i",
            "logs",
            "-f",
            "/nonexistent/query.json",
        ]);
        let err = cli.resolve_query().unwrap_err();
        assert!(err.to_string().contains("failed to read from file /nonexistent/query.json"));
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = interface(&[
            "-u",
            "http://es:9200",
            "-i",
            "logs",
            "--scroll-keep-alive",
            "5m",
            "--timeout",
            "0",
            "--insecure",
            "--progress",
            "-v",
        ]);
        let config = cli.config();
        assert_eq!(config.connection.scroll_keep_alive, "5m");
        assert_eq!(config.connection.timeout, 0);
        assert!(config.connection.accept_invalid_certs);
        assert!(config.output.progress_bar);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_keep_alive_rejected() {
        let args = parse(&[
            "-c",
            "/dev/null",
            "-u",
            "http://es:9200",
            "-i",
            "logs",
            "--scroll-keep-alive",
            "a while",
        ]);
        assert!(matches!(
            CliInterface::from_args(args),
            Err(EsdumpError::Config(_))
        ));
    }

    #[test]
    fn test_credentials_from_flags() {
        let cli = interface(&[
            "-u",
            "http://es:9200",
            "-i",
            "logs",
            "--user",
            "elastic",
            "--password",
            "changeme",
        ]);
        let creds = cli.credentials().unwrap();
        assert_eq!(creds.username, "elastic");
        assert_eq!(creds.password.as_deref(), Some("changeme"));
    }
}
