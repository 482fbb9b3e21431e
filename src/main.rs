use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dnsimple_ddns::{
    config::{Settings, CONFIG_PATH_ENV},
    dns::{DnsimpleProvider, RecordType, ZoneRecord},
    engine::{DesiredRecord, EngineError, Outcome, Reconciler},
    ip::HttpIpResolver,
    secrets::{TokenStore, TOKEN_ENV},
};

#[derive(Parser)]
#[command(name = "dnsimple-ddns")]
#[command(about = "Keeps a DNSimple zone record in sync with your public IP address")]
#[command(version)]
struct Cli {
    /// DNSimple API OAuth token
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,

    /// Configuration file
    #[arg(long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Talk to the DNSimple sandbox API
    #[arg(long)]
    sandbox: bool,

    /// Enable debug output
    #[arg(short = 'D', long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new record
    #[command(visible_aliases = ["add", "cr"])]
    Create(RecordArgs),

    /// Delete a record if it exists
    #[command(visible_alias = "del")]
    Delete(RecordArgs),

    /// Create the record, or update it if it already exists (existing AAAA records are deleted)
    Upsert(RecordArgs),

    /// Store the DNSimple API token
    SetToken,

    /// Delete the stored DNSimple API token
    DeleteToken,

    /// Show configuration file location and contents
    Config,
}

#[derive(Args)]
struct RecordArgs {
    /// Record name ("@" for the zone apex)
    name: String,

    /// Domain name to operate on
    #[arg(short, long)]
    domain: String,

    /// Record type
    #[arg(short = 't', long = "type", default_value = "A")]
    record_type: RecordType,

    /// Literal record data; the current public IP is looked up when omitted
    #[arg(long)]
    data: Option<String>,

    /// Look up an IPv6 address instead of IPv4
    #[arg(short = '6', long)]
    ipv6: bool,

    /// TTL for created or updated records
    #[arg(long)]
    ttl: Option<u32>,
}

#[derive(Clone, Copy)]
enum Operation {
    Create,
    Delete,
    Upsert,
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let settings = Settings::load(&config_path);

    let log_level = match (&settings, cli.debug) {
        (_, true) => "debug",
        (Ok(s), false) => s.client.log_level.as_str(),
        (Err(_), false) => "info",
    };
    init_logging(log_level);

    let result = match settings {
        Ok(mut settings) => {
            if cli.sandbox {
                settings.client.sandbox = true;
            }
            run(cli, &config_path, settings).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<EngineError>() {
                Some(engine_err) => log_engine_error(engine_err),
                None => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config_path: &Path, settings: Settings) -> Result<()> {
    let store = TokenStore::in_dir(config_path.parent().unwrap_or(Path::new(".")));

    match cli.command {
        Commands::Create(args) => {
            reconcile(Operation::Create, args, cli.token.as_deref(), &store, &settings).await
        }
        Commands::Delete(args) => {
            reconcile(Operation::Delete, args, cli.token.as_deref(), &store, &settings).await
        }
        Commands::Upsert(args) => {
            reconcile(Operation::Upsert, args, cli.token.as_deref(), &store, &settings).await
        }

        Commands::SetToken => {
            let token = rpassword::prompt_password("DNSimple API token: ")?;
            store.store(&token)?;
            println!("Token stored in {}", store.path().display());
            Ok(())
        }

        Commands::DeleteToken => {
            store.delete()?;
            println!("Token deleted from {}", store.path().display());
            Ok(())
        }

        Commands::Config => show_config(config_path, &settings),
    }
}

async fn reconcile(
    operation: Operation,
    args: RecordArgs,
    token: Option<&str>,
    store: &TokenStore,
    settings: &Settings,
) -> Result<()> {
    let desired = DesiredRecord::new(&args.name, &args.domain, args.record_type)?
        .with_value(args.data)
        .prefer_ipv6(args.ipv6);

    let token = store.resolve(token)?;
    let provider = DnsimpleProvider::connect(&token, &settings.client).await?;
    let resolver = HttpIpResolver::new(&settings.ip, &settings.client)?;

    let reconciler = Reconciler::new(Arc::new(provider), Arc::new(resolver))
        .with_ttl(args.ttl.unwrap_or(settings.records.ttl));

    match operation {
        Operation::Create => {
            let record = reconciler.create(desired).await?;
            log_record(&record, "Create record complete");
        }
        Operation::Delete => match reconciler.delete(desired).await? {
            Some(id) => info!(id, "Delete record complete"),
            None => info!("Record not found, nothing to delete"),
        },
        Operation::Upsert => match reconciler.upsert(desired).await? {
            Outcome::Created(record) => log_record(&record, "Upsert record complete (created)"),
            Outcome::Updated(record) => log_record(&record, "Upsert record complete (updated)"),
            Outcome::Deleted { id } => info!(id, "Upsert record complete (existing AAAA record deleted)"),
        },
    }

    Ok(())
}

fn log_record(record: &ZoneRecord, message: &str) {
    info!(
        id = record.id,
        domain = %record.zone,
        name = %record.name,
        record_type = %record.record_type,
        content = %record.content,
        ttl = record.ttl,
        "{}",
        message
    );
}

fn log_engine_error(err: &EngineError) {
    let ctx = err.context();
    let cause = std::error::Error::source(err)
        .map(|s| s.to_string())
        .unwrap_or_default();

    error!(
        stage = %err.stage(),
        domain = %ctx.domain,
        name = %ctx.name,
        record_type = %ctx.record_type,
        data = ctx.value.as_deref().unwrap_or(""),
        cause = %cause,
        "{}",
        err
    );
}

fn show_config(config_path: &Path, settings: &Settings) -> Result<()> {
    println!("Configuration file location: {}", config_path.display());
    if !config_path.exists() {
        println!("(file not found, using defaults)");
    }

    println!("\nEffective configuration:\n");
    println!("{}", toml::to_string_pretty(settings)?);

    Ok(())
}
