use std::path::PathBuf;

use anyhow::{Context, bail};
use browser_history_core::{HistoryEntry, HistoryItem, QueryOptions, Site, SortOrder, Visit, VisitType};
use browser_history_sqlite::{Migration, StoreConfig};
use chrono::{DateTime, Utc};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// CLI-specific visit type enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliVisitType {
    Unknown,
    Link,
    Typed,
    Bookmark,
    Embed,
    PermanentRedirect,
    TemporaryRedirect,
    Download,
    FramedLink,
}

impl From<CliVisitType> for VisitType {
    fn from(t: CliVisitType) -> Self {
        match t {
            CliVisitType::Unknown => Self::Unknown,
            CliVisitType::Link => Self::Link,
            CliVisitType::Typed => Self::Typed,
            CliVisitType::Bookmark => Self::Bookmark,
            CliVisitType::Embed => Self::Embed,
            CliVisitType::PermanentRedirect => Self::PermanentRedirect,
            CliVisitType::TemporaryRedirect => Self::TemporaryRedirect,
            CliVisitType::Download => Self::Download,
            CliVisitType::FramedLink => Self::FramedLink,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "history")]
#[command(about = "Record and query browsing history in SQLite")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file path (overrides the config file).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Table prefix (overrides the config file).
    #[arg(long, global = true)]
    prefix: Option<String>,
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Table migration operations.
    Migrate(MigrateArgs),
    /// Record a visit, creating or refreshing its site.
    Visit(VisitArgs),
    /// Record a site without a visit.
    Site(SiteArgs),
    /// List sites with their most recent visit.
    List(ListArgs),
    /// List stored sites.
    Sites(SitesArgs),
    /// Change the date or type of a recorded visit.
    UpdateVisit(UpdateVisitArgs),
    /// Delete a visit, a site with all its visits, or everything.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create the tables, or upgrade them to the configured schema version.
    Up,
    /// Drop the tables.
    Down,
    /// Show migration and table status.
    Status,
}

#[derive(Debug, Args)]
struct VisitArgs {
    /// Visited url.
    url: String,
    /// Page title.
    #[arg(long, default_value = "")]
    title: String,
    /// How the page was reached.
    #[arg(long = "type", value_enum, default_value = "link")]
    visit_type: CliVisitType,
    /// Visit time as RFC 3339 (default: now).
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
struct SiteArgs {
    /// Site url.
    url: String,
    /// Page title.
    #[arg(long, default_value = "")]
    title: String,
    /// Also record a visit of unknown type at the current time.
    #[arg(long)]
    with_visit: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Only sites whose url contains this text (case-sensitive).
    #[arg(long)]
    filter: Option<String>,
    /// Most recently visited first.
    #[arg(long)]
    recent: bool,
    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct SitesArgs {
    /// Only sites whose url contains this text (case-sensitive).
    #[arg(long)]
    filter: Option<String>,
    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct UpdateVisitArgs {
    /// Visit id, as printed by `list`.
    id: i64,
    /// New visit type.
    #[arg(long = "type", value_enum)]
    visit_type: Option<CliVisitType>,
    /// New visit time as RFC 3339.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["visit_id", "url", "all"])))]
struct DeleteArgs {
    /// Delete one visit by id.
    #[arg(long)]
    visit_id: Option<i64>,
    /// Delete a site and every visit to it.
    #[arg(long)]
    url: Option<String>,
    /// Delete all history.
    #[arg(long)]
    all: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = resolve_config(&cli).and_then(|config| match cli.command {
        Command::Migrate(args) => run_migrate(&config, args),
        Command::Visit(args) => run_visit(&config, args),
        Command::Site(args) => run_site(&config, args),
        Command::List(args) => run_list(&config, args),
        Command::Sites(args) => run_sites(&config, args),
        Command::UpdateVisit(args) => run_update_visit(&config, args),
        Command::Delete(args) => run_delete(&config, args),
    });

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

/// Loads the config file (if any) and applies command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database = db.clone();
    }
    if let Some(prefix) = &cli.prefix {
        config.table_prefix = prefix.clone();
    }
    config.validate()?;
    tracing::debug!(
        database = %config.database.display(),
        prefix = %config.table_prefix,
        version = config.schema_version,
        "Resolved configuration"
    );
    Ok(config)
}

fn open(config: &StoreConfig) -> anyhow::Result<Migration> {
    config
        .migration()
        .with_context(|| format!("Failed to open database '{}'", config.database.display()))
}

/// Opens the database with its tables in place.
fn open_store(config: &StoreConfig) -> anyhow::Result<Migration> {
    let mut migration = open(config)?;
    migration
        .up_to(config.schema_version)
        .context("Failed to prepare history tables")?;
    Ok(migration)
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

fn run_migrate(config: &StoreConfig, args: MigrateArgs) -> anyhow::Result<()> {
    let mut migration = open(config)?;
    match args.operation {
        MigrateOperation::Up => {
            let version = migration
                .up_to(config.schema_version)
                .context("Migration up failed")?;
            println!(
                "Migration up complete. Tables with prefix '{}' at schema version {version} in '{}'.",
                config.table_prefix,
                config.database.display()
            );
        }
        MigrateOperation::Down => {
            migration.down().context("Migration down failed")?;
            println!(
                "Migration down complete. Tables with prefix '{}' dropped from '{}'.",
                config.table_prefix,
                config.database.display()
            );
        }
        MigrateOperation::Status => {
            let status = migration
                .status()
                .context("Failed to get migration status")?;
            println!("Migration Status:");
            println!(
                "  Tables exist: {}",
                if status.tables_exist { "yes" } else { "no" }
            );
            match status.schema_version {
                Some(v) => println!("  Schema version: {v}"),
                None => println!("  Schema version: none"),
            }
            println!("  Site count: {}", status.site_count);
            println!("  Visit count: {}", status.visit_count);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// write commands
// ---------------------------------------------------------------------------

fn run_visit(config: &StoreConfig, args: VisitArgs) -> anyhow::Result<()> {
    let migration = open_store(config)?;
    let site = Site::new(args.url, args.title);
    let visit = Visit::new(site, args.at.unwrap_or_else(Utc::now)).with_type(args.visit_type.into());
    let mut item = HistoryItem::visit(visit);
    let id = migration
        .store()
        .insert(migration.connection(), &mut item)
        .context("Failed to record visit")?;
    println!("Recorded visit {id}");
    Ok(())
}

fn run_site(config: &StoreConfig, args: SiteArgs) -> anyhow::Result<()> {
    let migration = open_store(config)?;
    let store = migration.store();
    let conn = migration.connection();
    let site = Site::new(args.url, args.title);

    if args.with_visit {
        let mut item = HistoryItem::site(site);
        let visit_id = store
            .insert(conn, &mut item)
            .context("Failed to record site")?;
        println!("Recorded site with visit {visit_id}");
    } else {
        let mut site = site;
        let id = store
            .record_site(conn, &mut site)
            .context("Failed to record site")?;
        println!("Recorded site {id}");
    }
    Ok(())
}

fn run_update_visit(config: &StoreConfig, args: UpdateVisitArgs) -> anyhow::Result<()> {
    if args.visit_type.is_none() && args.at.is_none() {
        bail!("Nothing to update: pass --type and/or --at");
    }
    let migration = open_store(config)?;
    let store = migration.store();
    let conn = migration.connection();

    let Some(mut visit) = store.visits().find(conn, args.id)? else {
        bail!("No visit with id {}", args.id);
    };
    if let Some(t) = args.visit_type {
        visit.visit_type = t.into();
    }
    if let Some(at) = args.at {
        visit.date = at;
    }
    store
        .update(conn, &HistoryItem::visit(visit))
        .context("Failed to update visit")?;
    println!("Updated visit {}", args.id);
    Ok(())
}

fn run_delete(config: &StoreConfig, args: DeleteArgs) -> anyhow::Result<()> {
    let migration = open_store(config)?;
    let store = migration.store();
    let conn = migration.connection();

    if args.all {
        let visits = store.delete(conn, None).context("Failed to clear history")?;
        println!("Deleted all history ({visits} visits)");
    } else if let Some(url) = args.url {
        let item = HistoryItem::site(Site::new(url.as_str(), ""));
        let sites = store.delete(conn, Some(&item)).context("Failed to delete site")?;
        println!("Deleted {sites} site(s) matching '{url}'");
    } else if let Some(id) = args.visit_id {
        let Some(visit) = store.visits().find(conn, id)? else {
            bail!("No visit with id {id}");
        };
        let visits = store
            .delete(conn, Some(&HistoryItem::visit(visit)))
            .context("Failed to delete visit")?;
        println!("Deleted {visits} visit(s)");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// read commands
// ---------------------------------------------------------------------------

fn run_list(config: &StoreConfig, args: ListArgs) -> anyhow::Result<()> {
    let migration = open_store(config)?;
    let mut options = QueryOptions::default();
    if let Some(filter) = args.filter {
        options = options.with_filter(filter);
    }
    if args.recent {
        options = options.sorted(SortOrder::LastVisit);
    }
    let entries = migration
        .store()
        .query(migration.connection(), Some(&options))
        .context("Failed to query history")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{}", format_entry(entry));
        }
    }
    Ok(())
}

fn run_sites(config: &StoreConfig, args: SitesArgs) -> anyhow::Result<()> {
    let migration = open_store(config)?;
    let options = match args.filter {
        Some(filter) => QueryOptions::default().with_filter(filter),
        None => QueryOptions::default(),
    };
    let sites = migration
        .store()
        .query_sites(migration.connection(), Some(&options))
        .context("Failed to query sites")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sites)?);
    } else {
        for site in &sites {
            println!(
                "{:>6}  {}  {}",
                site.id.unwrap_or_default(),
                site.url,
                site.title
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One table line: visit id, visit time, type, url, title.
fn format_entry(entry: &HistoryEntry) -> String {
    format!(
        "{:>6}  {}  {:<18}  {}  {}",
        entry.visit.id.unwrap_or_default(),
        entry.visit.date.format("%Y-%m-%d %H:%M:%S"),
        entry.visit.visit_type,
        entry.site.url,
        entry.site.title
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cli_visit_type_maps_every_variant() {
        use clap::ValueEnum;
        let mapped: Vec<VisitType> = CliVisitType::value_variants()
            .iter()
            .map(|t| VisitType::from(*t))
            .collect();
        assert_eq!(mapped, VisitType::ALL.to_vec());
    }

    #[test]
    fn test_format_entry_columns() {
        let mut site = Site::new("https://example.com/", "Example");
        site.id = Some(1);
        let mut visit = Visit::new(site.clone(), Utc.timestamp_opt(0, 0).unwrap())
            .with_type(VisitType::Typed);
        visit.id = Some(42);
        let line = format_entry(&HistoryEntry { site, visit });
        assert!(line.starts_with("    42  1970-01-01 00:00:00  typed               https://"));
        assert!(line.ends_with("https://example.com/  Example"));
    }

    #[test]
    fn test_delete_requires_a_target() {
        assert!(Cli::try_parse_from(["history", "delete"]).is_err());
        assert!(Cli::try_parse_from(["history", "delete", "--all", "--url", "x"]).is_err());
        assert!(Cli::try_parse_from(["history", "delete", "--all"]).is_ok());
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = Cli::try_parse_from([
            "history", "list", "--db", "/tmp/x.db", "--prefix", "ff_",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.table_prefix, "ff_");

        let bad = Cli::try_parse_from(["history", "list", "--prefix", "bad-prefix"]).unwrap();
        assert!(resolve_config(&bad).is_err());
    }
}
