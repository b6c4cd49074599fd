use anyhow::{Context, Result};
use chandb_chain::HttpChannelLookup;
use chandb_migrate::version::read_version;
use chandb_migrate::{pending_migrations, MigrateConfig, MigrationReport, Migrator, MIGRATIONS, VERSION};
use chandb_store::{KvStore, MemoryStore, RedbStore, StoreSnapshot};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let db = Arg::new("db")
        .long("db")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Channel database file");

    Command::new("chandb-migrate")
        .version(VERSION)
        .about("Upgrade channel database records to the latest schema")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("status")
                .about("Show stored version and pending migrations")
                .arg(db.clone()),
        )
        .subcommand(
            Command::new("run")
                .about("Apply pending migrations")
                .arg(db.clone())
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("chain-api")
                        .long("chain-api")
                        .help("Transaction lookup service root, overrides config"),
                )
                .arg(
                    Arg::new("timeout-secs")
                        .long("timeout-secs")
                        .value_parser(value_parser!(u64))
                        .help("Lookup timeout in seconds, overrides config"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Migrate an in-memory copy and leave the database untouched"),
                ),
        )
        .subcommand(
            Command::new("dump")
                .about("Write every bucket as a JSON snapshot")
                .arg(db.clone())
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Snapshot file, stdout if omitted"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Load a JSON snapshot into a database, creating it if missing")
                .arg(db)
                .arg(
                    Arg::new("snapshot")
                        .long("snapshot")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Snapshot file to load"),
                ),
        )
}

fn db_path(args: &ArgMatches) -> Result<&PathBuf> {
    args.get_one::<PathBuf>("db").context("--db is required")
}

fn open_db(path: &Path) -> Result<RedbStore> {
    RedbStore::open(path).with_context(|| format!("failed to open database {}", path.display()))
}

fn status(args: &ArgMatches) -> Result<()> {
    let store = open_db(db_path(args)?)?;

    let current = store.view(|tx| read_version(tx))?;
    let latest = MIGRATIONS.last().map_or(0, |m| m.version);
    println!("version: {current} (latest {latest})");
    let pending = pending_migrations(&MIGRATIONS, current)?;
    if pending.is_empty() {
        println!("up to date");
    }
    for migration in pending {
        println!("pending: {} {}", migration.version, migration.name);
    }
    Ok(())
}

fn print_reports(reports: &[MigrationReport]) {
    for report in reports {
        println!("applied {} {}: {}", report.version, report.name, report.bucket);
    }
    if reports.is_empty() {
        println!("up to date");
    }
}

fn run(args: &ArgMatches) -> Result<()> {
    let path = db_path(args)?;

    let mut config = match args.get_one::<PathBuf>("config") {
        Some(config_path) => MigrateConfig::load(config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?,
        None => MigrateConfig::new(),
    };
    if let Some(url) = args.get_one::<String>("chain-api") {
        config = config.with_base_url(url.clone());
    }
    if let Some(secs) = args.get_one::<u64>("timeout-secs") {
        config = config.with_timeout_secs(*secs);
    }

    let lookup = HttpChannelLookup::new(config.chain_api_config()?)?;
    let migrator = Migrator::new(Arc::new(lookup));
    let store = open_db(path)?;

    let reports = if args.get_flag("dry-run") {
        let copy = MemoryStore::from_snapshot(&StoreSnapshot::capture(&store)?)?;
        let reports = migrator.run(&copy).context("migration failed")?;
        tracing::info!(path = %path.display(), "dry run, database not modified");
        reports
    } else {
        migrator.run(&store).context("migration failed")?
    };

    print_reports(&reports);
    Ok(())
}

fn dump(args: &ArgMatches) -> Result<()> {
    let store = open_db(db_path(args)?)?;
    let snapshot = StoreSnapshot::capture(&store)?;
    match args.get_one::<PathBuf>("out") {
        Some(out) => snapshot
            .save(out)
            .with_context(|| format!("failed to write snapshot {}", out.display()))?,
        None => println!("{}", snapshot.to_json()?),
    }
    Ok(())
}

fn import(args: &ArgMatches) -> Result<()> {
    let path = db_path(args)?;
    let source = args
        .get_one::<PathBuf>("snapshot")
        .context("--snapshot is required")?;
    let snapshot = StoreSnapshot::load(source)
        .with_context(|| format!("failed to load snapshot {}", source.display()))?;
    let store = RedbStore::create(path)
        .with_context(|| format!("failed to create database {}", path.display()))?;
    snapshot.restore(&store)?;
    tracing::info!(path = %path.display(), buckets = snapshot.buckets.len(), "snapshot imported");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("status", args)) => status(args),
        Some(("run", args)) => run(args),
        Some(("dump", args)) => dump(args),
        Some(("import", args)) => import(args),
        _ => unreachable!("subcommand_required"),
    }
}
