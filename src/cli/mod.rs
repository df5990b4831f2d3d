//! Command-line interface for catalog-export
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI overrides
//! - Wiring the configured catalog, profile store and collaborators
//! - Dispatching subcommands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{CatalogStore, ClientId, MemoryCatalog, MongoCatalog, OperatorId};
use crate::config::{CatalogBackend, Config, LogLevel};
use crate::error::{ConfigError, Result, ValidationError};
use crate::export::{DownloadService, ExportEngine, ExportJob, ExportSummary, writers};
use crate::filter::FilterNode;
use crate::profile::{
    ExportFormat, ExportOptions, FieldSelection, FileProfileStore, HeaderStyle, NewProfile,
    ProfileService, ProfileUpdate,
};
use crate::services::Services;

pub mod table;

/// Profile-driven product catalog export
#[derive(Parser, Debug)]
#[command(
    name = "catalog-export",
    version,
    about = "Export product catalogs as JSON, CSV, XML or XLSX",
    long_about = "Export product catalogs through saved export profiles. A profile selects
fields, filters and a format; its public hash is all a client needs to download it."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Hide the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the fields available for export and filtering
    Fields {
        /// Only fields usable in filters, in filter grouping
        #[arg(long)]
        filterable: bool,
    },

    /// Manage export profiles
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Download the export behind a public profile hash
    Download {
        #[arg(value_name = "HASH")]
        hash: String,

        /// Output file (stdout if omitted)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run an export job file without storing a profile
    Export {
        /// JSON job file with format, fields, filters and options
        #[arg(long, value_name = "FILE")]
        profile: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Create a profile and print its download hash
    Create(CreateArgs),

    /// Show one profile
    Show {
        #[arg(value_name = "ID")]
        id: Uuid,
    },

    /// Change a profile; the hash never changes
    Update(UpdateArgs),

    /// Disable a profile's public hash
    Deactivate {
        #[arg(value_name = "ID")]
        id: Uuid,
    },

    /// List an operator's profiles, newest first
    List {
        #[arg(long, value_name = "ID")]
        owner: i64,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Operator who owns the profile
    #[arg(long, value_name = "ID")]
    pub owner: i64,

    #[arg(long)]
    pub name: String,

    /// json, csv, xml or xls
    #[arg(long, value_parser = parse_format)]
    pub format: ExportFormat,

    /// Field key, optionally `key:CUR` for prices (repeatable, in column order)
    #[arg(long = "field", value_name = "KEY", required = true)]
    pub fields: Vec<String>,

    /// Filter tree as JSON, or `@file`
    #[arg(long, value_name = "JSON")]
    pub filters: Option<String>,

    /// Client whose prices and stock the export reflects
    #[arg(long, value_name = "ID")]
    pub client: Option<i64>,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(value_name = "ID")]
    pub id: Uuid,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, value_parser = parse_format)]
    pub format: Option<ExportFormat>,

    /// Replaces the whole field list
    #[arg(long = "field", value_name = "KEY")]
    pub fields: Vec<String>,

    #[arg(long, value_name = "JSON")]
    pub filters: Option<String>,

    #[arg(long, value_name = "ID", conflicts_with = "no_client")]
    pub client: Option<i64>,

    /// Remove the client context
    #[arg(long)]
    pub no_client: bool,

    /// Re-enable a deactivated hash
    #[arg(long)]
    pub activate: bool,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args, Debug, Default)]
pub struct OptionArgs {
    /// Separator for multi-value fields
    #[arg(long)]
    pub separator: Option<String>,

    /// Fail instead of degrading fields when a collaborator errors
    #[arg(long)]
    pub strict: bool,

    /// Label columns with field keys instead of display names
    #[arg(long)]
    pub key_headers: bool,
}

impl OptionArgs {
    fn is_empty(&self) -> bool {
        self.separator.is_none() && !self.strict && !self.key_headers
    }

    fn apply(&self, mut options: ExportOptions) -> ExportOptions {
        if let Some(separator) = &self.separator {
            options.separator = separator.clone();
        }
        if self.strict {
            options.strict = true;
        }
        if self.key_headers {
            options.header = HeaderStyle::Key;
        }
        options
    }
}

fn parse_format(raw: &str) -> std::result::Result<ExportFormat, String> {
    raw.parse()
}

/// Parse a filter tree from inline JSON or `@path`
pub fn parse_filters(raw: &str) -> Result<FilterNode> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.to_string()))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| ValidationError::MalformedFilter(e.to_string()).into())
}

fn parse_fields(raw: &[String]) -> Vec<FieldSelection> {
    raw.iter().map(|f| FieldSelection::parse(f)).collect()
}

/// CLI interface handler
pub struct CliInterface {
    args: CliArgs,
    config: Config,
}

impl CliInterface {
    /// Parse arguments and load configuration
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        Ok(config)
    }

    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
        if args.no_progress || args.quiet {
            config.export.progress = false;
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Run the selected subcommand
    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Commands::Fields { filterable } => self.list_fields(*filterable).await,
            Commands::Profile(command) => self.handle_profile(command).await,
            Commands::Download { hash, output } => self.download(hash, output.as_deref()).await,
            Commands::Export { profile, output } => self.export(profile, output.as_deref()).await,
            Commands::Config { show, validate } => self.handle_config_command(*show, *validate),
            Commands::Version => {
                println!("catalog-export version {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }

    async fn open_catalog(&self) -> Result<Arc<dyn CatalogStore>> {
        let catalog = &self.config.catalog;
        let store: Arc<dyn CatalogStore> = match catalog.backend {
            CatalogBackend::Json => Arc::new(MemoryCatalog::from_json_file(&catalog.file).await?),
            CatalogBackend::MongoDb => Arc::new(MongoCatalog::connect(catalog).await?),
        };
        Ok(store)
    }

    async fn profile_service(&self) -> Result<ProfileService> {
        let store = FileProfileStore::open(&self.config.profiles.path).await?;
        Ok(ProfileService::new(Arc::new(store), self.open_catalog().await?))
    }

    fn services(&self) -> Services {
        Services::from_config(&self.config.currency, &self.config.clients)
    }

    /// Engine with settings from config and Ctrl+C wired to cancellation
    fn engine(&self, catalog: Arc<dyn CatalogStore>) -> ExportEngine {
        let token = CancellationToken::new();
        let listener = token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupted, finishing partial export");
                    listener.cancel();
                }
                Err(err) => eprintln!("Failed to listen for Ctrl+C: {}", err),
            }
        });

        ExportEngine::new(catalog, self.services())
            .with_settings(self.config.export_settings())
            .with_cancellation(token)
    }

    async fn list_fields(&self, filterable: bool) -> Result<()> {
        let catalog = self.open_catalog().await?;
        let registry = crate::fields::FieldRegistry::build(&catalog.attributes().await?)?;
        println!("{}", table::fields_table(&registry, filterable));
        Ok(())
    }

    async fn handle_profile(&self, command: &ProfileCommand) -> Result<()> {
        let service = self.profile_service().await?;
        match command {
            ProfileCommand::Create(args) => {
                let defaults = ExportOptions {
                    separator: self.config.export.separator.clone(),
                    strict: self.config.export.strict,
                    ..ExportOptions::default()
                };
                let profile = service
                    .create(NewProfile {
                        owner: OperatorId(args.owner),
                        client: args.client.map(ClientId),
                        name: args.name.clone(),
                        format: args.format,
                        fields: parse_fields(&args.fields),
                        filters: args
                            .filters
                            .as_deref()
                            .map(parse_filters)
                            .transpose()?
                            .unwrap_or_default(),
                        options: args.options.apply(defaults),
                    })
                    .await?;
                println!("Created profile {}", profile.id);
                println!("Download hash: {}", profile.hash);
            }
            ProfileCommand::Show { id } => {
                let profile = service.get(*id).await?;
                println!("{}", serde_json::to_string_pretty(&profile)?);
            }
            ProfileCommand::Update(args) => {
                let options = if args.options.is_empty() {
                    None
                } else {
                    let current = service.get(args.id).await?;
                    Some(args.options.apply(current.options))
                };
                let client = if args.no_client {
                    Some(None)
                } else {
                    args.client.map(|c| Some(ClientId(c)))
                };
                let update = ProfileUpdate {
                    name: args.name.clone(),
                    client,
                    format: args.format,
                    fields: (!args.fields.is_empty()).then(|| parse_fields(&args.fields)),
                    filters: args.filters.as_deref().map(parse_filters).transpose()?,
                    options,
                    is_active: args.activate.then_some(true),
                };
                let profile = service.update(args.id, update).await?;
                println!("Updated profile {} (hash unchanged)", profile.id);
            }
            ProfileCommand::Deactivate { id } => {
                service.deactivate(*id).await?;
                println!("Profile {} deactivated", id);
            }
            ProfileCommand::List { owner } => {
                let profiles = service.list_by_owner(OperatorId(*owner)).await?;
                println!("{}", table::profiles_table(&profiles));
            }
        }
        Ok(())
    }

    async fn download(&self, hash: &str, output: Option<&Path>) -> Result<()> {
        let store = FileProfileStore::open(&self.config.profiles.path).await?;
        let service = DownloadService::new(Arc::new(store), self.engine(self.open_catalog().await?));

        let download = match output {
            Some(path) => service.download(hash, writers::create_file(path).await?).await?,
            None => service.download(hash, tokio::io::stdout()).await?,
        };
        info!(content_type = download.content_type, file = %download.file_name, "download served");
        self.report(&download.summary, output);
        Ok(())
    }

    async fn export(&self, job_file: &Path, output: Option<&Path>) -> Result<()> {
        let raw = tokio::fs::read_to_string(job_file)
            .await
            .map_err(|_| ConfigError::FileNotFound(job_file.display().to_string()))?;
        let job: ExportJob = serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        let engine = self.engine(self.open_catalog().await?);

        let summary = match output {
            Some(path) => run_into(&engine, &job, writers::create_file(path).await?).await?,
            None => run_into(&engine, &job, tokio::io::stdout()).await?,
        };
        self.report(&summary, output);
        Ok(())
    }

    /// Summary goes to stderr so stdout carries only the document
    fn report(&self, summary: &ExportSummary, output: Option<&Path>) {
        if self.args.quiet {
            return;
        }
        let target = output
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".to_string());
        eprintln!(
            "{} rows ({} degraded) -> {} ({} bytes, {} ms){}",
            summary.rows,
            summary.degraded,
            target,
            summary.bytes,
            summary.elapsed_ms,
            if summary.truncated { ", truncated" } else { "" }
        );
    }

    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        let path = self
            .args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path);
        if validate {
            println!("Validating configuration file: {}", path.display());
            match Config::from_file(&path) {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => println!("Configuration is invalid: {}", e),
            }
        }
        if show || !validate {
            println!("Configuration file: {}", path.display());
            println!();
            let rendered = toml::to_string_pretty(&self.config)
                .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
            println!("{}", rendered);
        }
        Ok(())
    }
}

async fn run_into<W>(engine: &ExportEngine, job: &ExportJob, sink: W) -> Result<ExportSummary>
where
    W: AsyncWrite + Unpin + Send,
{
    engine.run(job, sink).await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::filter::Logic;

    #[test]
    fn test_cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_profile_create() {
        let args = CliArgs::try_parse_from([
            "catalog-export",
            "profile",
            "create",
            "--owner",
            "3",
            "--name",
            "Прайс",
            "--format",
            "xlsx",
            "--field",
            "id",
            "--field",
            "discounted_price:usd",
            "--separator",
            "; ",
        ])
        .unwrap();

        let Commands::Profile(ProfileCommand::Create(create)) = args.command else {
            panic!("expected profile create");
        };
        assert_eq!(create.format, ExportFormat::Xls);
        let fields = parse_fields(&create.fields);
        assert_eq!(fields[1].currency.as_deref(), Some("usd"));
        assert_eq!(create.options.apply(ExportOptions::default()).separator, "; ");
    }

    #[test]
    fn test_update_client_flags_conflict() {
        let id = Uuid::new_v4().to_string();
        let result = CliArgs::try_parse_from([
            "catalog-export",
            "profile",
            "update",
            id.as_str(),
            "--client",
            "7",
            "--no-client",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_filters_inline() {
        let node = parse_filters(
            r#"{"logic": "OR", "children": [{"field": "is_new", "op": "equals", "value": true}]}"#,
        )
        .unwrap();
        let FilterNode::Group { logic, children } = node else {
            panic!("expected group");
        };
        assert_eq!(logic, Logic::Or);
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_parse_filters_rejects_garbage() {
        assert!(matches!(
            parse_filters("{not json"),
            Err(crate::error::ExportError::Validation(ValidationError::MalformedFilter(_)))
        ));
        assert!(parse_filters("@/nonexistent/filters.json").is_err());
    }
}
