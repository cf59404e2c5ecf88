use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use lumen_client::api::{FetchStrategy, LaunchSpacing, PaginatedSearch, RequestManager};
use lumen_client::config::{
    default_config_path, find_config_file, get_config, load_config, Config, ConfigFile,
};
use lumen_client::models::{ParamBuilder, Sort, Topic};
use lumen_client::utils::{with_retry, CacheStore, RetryConfig};
use lumen_client::ClientError;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Lumen Client - Query the Lumen database of takedown notices
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query the Lumen database of takedown notices", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable the response cache for this command
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    /// Cache directory to use instead of the configured one
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Retry transient failures (network errors, 429 and 5xx) this many times
    #[arg(long, global = true, default_value_t = 0)]
    retries: u32,

    #[command(subcommand)]
    command: Commands,
}

/// Sort order for search results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortArg {
    /// Most relevant first
    Relevance,
    /// Least relevant first
    RelevanceAsc,
    /// Newest first
    Newest,
    /// Oldest first
    Oldest,
}

impl From<SortArg> for Sort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Relevance => Sort::RelevancyDesc,
            SortArg::RelevanceAsc => Sort::RelevancyAsc,
            SortArg::Newest => Sort::DateReceivedDesc,
            SortArg::Oldest => Sort::DateReceivedAsc,
        }
    }
}

/// Search filters shared by `search` and `pages`
#[derive(Args, Debug, Clone, Default)]
struct QueryArgs {
    /// Full-text search term
    query: Option<String>,

    /// Notice title
    #[arg(long)]
    title: Option<String>,

    /// Topic name, e.g. "Copyright"
    #[arg(long, value_parser = parse_topic)]
    topic: Option<Topic>,

    #[arg(long)]
    tags: Option<String>,

    #[arg(long)]
    jurisdictions: Option<String>,

    /// Sender name
    #[arg(long)]
    sender: Option<String>,

    /// Principal name
    #[arg(long)]
    principal: Option<String>,

    /// Recipient name
    #[arg(long)]
    recipient: Option<String>,

    /// Description of the allegedly infringed works
    #[arg(long)]
    works: Option<String>,

    /// Action taken by the recipient
    #[arg(long)]
    action_taken: Option<String>,

    /// Two-letter country code
    #[arg(long)]
    country: Option<String>,

    /// Language code
    #[arg(long)]
    language: Option<String>,

    /// Require every word of the text filters to match
    #[arg(long)]
    require_all: bool,

    /// Results per page (max 10000)
    #[arg(long)]
    per_page: Option<u32>,

    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Received on or after this date (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Received on or before this date (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
}

fn parse_topic(value: &str) -> Result<Topic, String> {
    value.parse().map_err(|e| format!("{}", e))
}

impl QueryArgs {
    fn to_builder(&self) -> Result<ParamBuilder, ClientError> {
        let require_all = self.require_all.then_some(true);
        let mut builder = ParamBuilder::new();

        let text_fields: [(&Option<String>, fn(ParamBuilder, String, Option<bool>) -> ParamBuilder); 8] = [
            (&self.query, |b, v, r| b.with_query(v, r)),
            (&self.title, |b, v, r| b.with_title(v, r)),
            (&self.tags, |b, v, r| b.with_tags(v, r)),
            (&self.jurisdictions, |b, v, r| b.with_jurisdictions(v, r)),
            (&self.sender, |b, v, r| b.with_sender(v, r)),
            (&self.principal, |b, v, r| b.with_principal(v, r)),
            (&self.recipient, |b, v, r| b.with_recipient(v, r)),
            (&self.works, |b, v, r| b.with_works_desc(v, r)),
        ];
        for (value, apply) in text_fields {
            if let Some(value) = value {
                builder = apply(builder, value.clone(), require_all);
            }
        }

        if let Some(topic) = self.topic {
            builder = builder.with_topic(topic, require_all);
        }
        if let Some(action) = &self.action_taken {
            builder = builder.with_action_taken(action.clone());
        }
        if let Some(country) = &self.country {
            builder = builder.with_country_code(country.clone());
        }
        if let Some(language) = &self.language {
            builder = builder.with_language(language.clone());
        }
        if let Some(per_page) = self.per_page {
            builder = builder.with_amount(per_page)?;
        }
        if let Some(sort) = self.sort {
            builder = builder.with_order(sort.into());
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            builder = builder.with_date_range(from, to)?;
        }
        Ok(builder)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search notices (one page)
    #[command(alias = "s")]
    Search {
        #[command(flatten)]
        query: QueryArgs,

        /// Result page
        #[arg(long)]
        page: Option<u32>,

        /// Print the payload exactly as received
        #[arg(long)]
        raw: bool,
    },

    /// Search notices over a range of pages and print the merged notices
    Pages {
        #[command(flatten)]
        query: QueryArgs,

        /// First page (inclusive)
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Last page (inclusive)
        #[arg(long)]
        end: u32,

        /// Fetch pages one after another
        #[arg(long, conflicts_with = "no_spacing")]
        sequential: bool,

        /// Launch concurrent page fetches without waiting between launches
        #[arg(long)]
        no_spacing: bool,
    },

    /// Fetch a single notice by id
    Notice {
        id: u64,
    },

    /// List all topics
    Topics,

    /// Search senders, recipients and principals by name
    Entities {
        name: String,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        per_page: Option<u32>,
    },

    /// Manage the local response cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show cache status and statistics
    Status,

    /// Clear all cached responses
    Clear,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Where to write the file (defaults to the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("lumen_client={level},lumen={level}"));

    let json = config.logging.is_json();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn resolve_config(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let path = cli.config.clone().or_else(find_config_file);
    let mut config = match &path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => get_config(),
    };

    if let Some(dir) = &cli.cache_dir {
        config.cache.enabled = true;
        config.cache.directory = Some(dir.clone());
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    Ok((config, path))
}

/// Run `operation` once, or under [`with_retry`] when retries were requested
async fn run_with_retries<T, F, Fut>(retries: u32, mut operation: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ClientError>>,
{
    if retries == 0 {
        return operation().await;
    }
    with_retry(RetryConfig::default().with_retries(retries), operation).await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn spinner(cli: &Cli, msg: String) -> Option<indicatif::ProgressBar> {
    if cli.quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = resolve_config(&cli)?;
    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let retries = cli.retries;

    match &cli.command {
        Commands::Search { query, page, raw } => {
            let mut builder = query.to_builder()?;
            if let Some(page) = page {
                builder = builder.with_page(*page);
            }
            let manager = RequestManager::from_config(&config)?;
            let data = run_with_retries(retries, || manager.search(&builder)).await?;

            if *raw {
                print_json(&data.raw)?;
            } else {
                print_json(&serde_json::json!({
                    "notices": data.notices,
                    "metadata": data.metadata,
                    "page_info": data.page_info,
                }))?;
            }
        }

        Commands::Pages {
            query,
            start,
            end,
            sequential,
            no_spacing,
        } => {
            let strategy = if *sequential {
                FetchStrategy::Sequential
            } else if *no_spacing {
                FetchStrategy::Concurrent(LaunchSpacing::None)
            } else {
                FetchStrategy::from_config(&config.pagination)
            };
            let search = PaginatedSearch::new(query.to_builder()?)
                .with_page_range(*start, *end)?
                .with_strategy(strategy);
            let manager = RequestManager::from_config(&config)?;

            let pb = spinner(&cli, format!("Fetching pages {}..={}", start, end));
            let result = run_with_retries(retries, || search.search(&manager)).await;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            let notices = result?;

            if !cli.quiet {
                eprintln!("Fetched {} notices from {} pages", notices.len(), search.range().len());
            }
            print_json(&notices)?;
        }

        Commands::Notice { id } => {
            let manager = RequestManager::from_config(&config)?;
            let notice = run_with_retries(retries, || manager.get_notice(*id)).await?;
            print_json(&notice)?;
        }

        Commands::Topics => {
            let manager = RequestManager::from_config(&config)?;
            let topics = run_with_retries(retries, || manager.get_topics()).await?;
            print_json(&topics)?;
        }

        Commands::Entities {
            name,
            page,
            per_page,
        } => {
            let manager = RequestManager::from_config(&config)?;
            let result = run_with_retries(retries, || manager.search_entity(name, *page, *per_page))
                    .await?;
            print_json(&serde_json::json!({
                "entities": result.entities,
                "page_info": result.page_info,
            }))?;
        }

        Commands::Cache { command } => {
            let cache = CacheStore::from_dir(config.cache.effective_dir())?;

            match command {
                CacheCommands::Status => {
                    let stats = cache.stats();
                    if !stats.enabled {
                        println!("Cache: disabled");
                        println!("To enable, set cache.enabled = true or pass --cache-dir");
                    } else {
                        println!("Cache: enabled");
                        if let Some(dir) = &stats.cache_dir {
                            println!("Directory: {}", dir.display());
                        }
                        println!("Entries: {} ({} KB)", stats.entry_count, stats.size_kb);
                    }
                }
                CacheCommands::Clear => {
                    if !cli.quiet {
                        eprintln!("Clearing all cached responses...");
                    }
                    cache.clear()?;
                    if !cli.quiet {
                        eprintln!("Cache cleared successfully.");
                    }
                }
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Init { path, force } => {
                let Some(path) = path.clone().or_else(default_config_path) else {
                    bail!("No config directory available; pass --path");
                };
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                ConfigFile::template().save(&path)?;
                if !cli.quiet {
                    eprintln!("Wrote {}", path.display());
                }
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_client::models::keys;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["lumen", "topics"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(!cli.no_cache);
        assert_eq!(cli.retries, 0);
        assert!(matches!(cli.command, Commands::Topics));
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["lumen", "-v", "topics"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["lumen", "topics", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_search_args_build_params() {
        let cli = Cli::parse_from([
            "lumen",
            "search",
            "fan fiction",
            "--sender",
            "Studio",
            "--require-all",
            "--topic",
            "copyright",
            "--per-page",
            "25",
            "--sort",
            "newest",
            "--page",
            "3",
        ]);
        let Commands::Search { query, page, raw } = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(page, Some(3));
        assert!(!raw);

        let builder = query.to_builder().unwrap();
        let params = builder.params();
        assert_eq!(params.get(keys::TERM), Some("fan fiction"));
        assert_eq!(params.get("term-require-all"), Some("true"));
        assert_eq!(params.get(keys::SENDER), Some("Studio"));
        assert_eq!(params.get(keys::TOPICS), Some("Copyright"));
        assert_eq!(params.get(keys::PER_PAGE), Some("25"));
        assert_eq!(params.get(keys::SORT_BY), Some("date_received desc"));
    }

    #[test]
    fn test_search_rejects_oversized_pages() {
        let query = QueryArgs {
            query: Some("x".to_string()),
            per_page: Some(10_001),
            ..Default::default()
        };
        assert!(matches!(
            query.to_builder(),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_topic_rejected() {
        let result = Cli::try_parse_from(["lumen", "search", "--topic", "Nonsense Topic"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_date_range_requires_both_ends() {
        let result = Cli::try_parse_from(["lumen", "search", "x", "--from", "2023-01-01"]);
        assert!(result.is_err());

        let cli = Cli::parse_from([
            "lumen", "search", "x", "--from", "2023-01-01", "--to", "2023-01-31",
        ]);
        let Commands::Search { query, .. } = cli.command else {
            panic!("expected search command");
        };
        assert!(query.to_builder().unwrap().params().get(keys::DATE_RECEIVED).is_some());
    }

    #[test]
    fn test_pages_command() {
        let cli = Cli::parse_from(["lumen", "pages", "movie", "--end", "4", "--sequential"]);
        match cli.command {
            Commands::Pages {
                start,
                end,
                sequential,
                no_spacing,
                ..
            } => {
                assert_eq!(start, 1);
                assert_eq!(end, 4);
                assert!(sequential);
                assert!(!no_spacing);
            }
            _ => panic!("expected pages command"),
        }

        let conflict =
            Cli::try_parse_from(["lumen", "pages", "movie", "--end", "2", "--sequential", "--no-spacing"]);
        assert!(conflict.is_err());
    }

    #[test]
    fn test_cache_flags_override_config() {
        let cli = Cli::parse_from(["lumen", "--no-cache", "cache", "status"]);
        let (config, _) = resolve_config(&cli).unwrap();
        assert_eq!(config.cache.effective_dir(), None);

        let cli = Cli::parse_from(["lumen", "--cache-dir", "/tmp/lumen-cli-test", "cache", "status"]);
        let (config, _) = resolve_config(&cli).unwrap();
        assert_eq!(
            config.cache.effective_dir(),
            Some(std::path::Path::new("/tmp/lumen-cli-test"))
        );
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let mut calls = 0;
        let result: Result<(), ClientError> = run_with_retries(0, || {
            calls += 1;
            async { Err(ClientError::Network("connection reset".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(ClientError::Network(_))));
        assert_eq!(calls, 1);
    }
}
