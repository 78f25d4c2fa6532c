//! subledger command line
//!
//! Settings are resolved once per invocation, then one subcommand runs
//! against a connector built from them. Results go to stdout as JSON; logs go
//! to stderr.

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::sync::Arc;
use subledger_config::{
    ConfigResolver, ConfigSnapshot, EnvironmentStrategy, KeyTable, RemoteStrategy,
    SsmParameterStore, DEFAULT_NAMESPACE, NAMESPACE_ENV,
};
use subledger_core::{
    origin_address, AppSettings, ErrorClass, HealthProbe, IngestResponse, StatsAggregator,
    StatsResponse, SubscriptionIngestion, SubscriptionPayload,
};
use subledger_store::{connector_for, with_connection, StoreConnector};
use tracing_subscriber::EnvFilter;

/// Success
pub const EXIT_OK: u8 = 0;
/// Store failure or unhealthy
pub const EXIT_SERVER_ERROR: u8 = 1;
/// Bad input
pub const EXIT_CLIENT_ERROR: u8 = 2;

/// Process exit code for a failure class
#[must_use]
pub fn exit_code(class: Option<ErrorClass>) -> u8 {
    match class {
        None => EXIT_OK,
        Some(ErrorClass::Client) => EXIT_CLIENT_ERROR,
        Some(ErrorClass::Server) => EXIT_SERVER_ERROR,
    }
}

/// Build the argument parser
#[must_use]
pub fn command() -> Command {
    Command::new("subledger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Interest-form subscriptions: settings, ingestion, statistics, health")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("namespace")
                .long("namespace")
                .value_name("PREFIX")
                .help(format!(
                    "Parameter store prefix [env: {NAMESPACE_ENV}] [default: {DEFAULT_NAMESPACE}]"
                )),
        )
        .arg(
            Arg::new("region")
                .long("region")
                .value_name("REGION")
                .help("AWS region for the parameter store"),
        )
        .arg(
            Arg::new("no-remote")
                .long("no-remote")
                .action(ArgAction::SetTrue)
                .help("Skip the parameter store; use environment and defaults only"),
        )
        .subcommand(Command::new("config").about("Print resolved settings and their sources"))
        .subcommand(Command::new("init").about("Create the subscription table if missing"))
        .subcommand(
            Command::new("subscribe")
                .about("Ingest one submission")
                .arg(Arg::new("name").long("name").help("Display name"))
                .arg(Arg::new("email").long("email").help("Email address"))
                .arg(Arg::new("source").long("source").help("Acquisition source tag"))
                .arg(Arg::new("company").long("company").help("Company"))
                .arg(
                    Arg::new("origin")
                        .long("origin")
                        .value_name("ADDR")
                        .help("Peer address of the submitter"),
                )
                .arg(
                    Arg::new("forwarded-for")
                        .long("forwarded-for")
                        .value_name("HEADER")
                        .help("X-Forwarded-For header value; first entry wins over --origin"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .value_name("BODY")
                        .conflicts_with_all(["name", "email", "source", "company"])
                        .help("Raw JSON request body"),
                ),
        )
        .subcommand(Command::new("stats").about("Print aggregate subscription counts"))
        .subcommand(Command::new("health").about("Probe the store"))
}

/// Options that apply before any subcommand runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Parameter store prefix
    pub namespace: String,
    /// AWS region override
    pub region: Option<String>,
    /// Whether to consult the parameter store
    pub remote: bool,
}

impl GlobalOptions {
    /// Read options, taking the namespace from `--namespace`, then
    /// `namespace_env`, then the default
    #[must_use]
    pub fn from_matches(matches: &ArgMatches, namespace_env: Option<String>) -> Self {
        let namespace = matches
            .get_one::<String>("namespace")
            .cloned()
            .or(namespace_env.filter(|ns| !ns.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        Self {
            namespace,
            region: matches.get_one::<String>("region").cloned(),
            remote: !matches.get_flag("no-remote"),
        }
    }
}

/// Resolve the standard key table once
///
/// A parameter store client that cannot be built is not fatal; every key
/// falls through to environment and defaults.
pub async fn resolve_snapshot(options: &GlobalOptions) -> ConfigSnapshot {
    let remote = if options.remote {
        match SsmParameterStore::connect(options.region.clone()).await {
            Ok(store) => RemoteStrategy::new(Arc::new(store)),
            Err(err) => {
                tracing::warn!("Parameter store unavailable, using environment and defaults: {err}");
                RemoteStrategy::unavailable(err.to_string())
            }
        }
    } else {
        RemoteStrategy::unavailable("remote lookups disabled")
    };

    ConfigResolver::new(remote, EnvironmentStrategy::process())
        .resolve(&options.namespace, &KeyTable::standard())
        .await
}

/// What to print and how to exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Text for stdout
    pub output: String,
    /// Process exit code
    pub exit_code: u8,
}

impl Outcome {
    fn json<T: serde::Serialize>(value: &T, class: Option<ErrorClass>) -> anyhow::Result<Self> {
        Ok(Self {
            output: serde_json::to_string_pretty(value)?,
            exit_code: exit_code(class),
        })
    }
}

/// Run the selected subcommand
///
/// # Errors
/// Invalid settings or a failed `init`
pub async fn execute(matches: &ArgMatches, snapshot: &ConfigSnapshot) -> anyhow::Result<Outcome> {
    let Some((name, args)) = matches.subcommand() else {
        anyhow::bail!("no subcommand given");
    };

    if name == "config" {
        return Ok(Outcome {
            output: snapshot.to_string(),
            exit_code: EXIT_OK,
        });
    }

    let settings = AppSettings::from_snapshot(snapshot).context("invalid settings")?;
    tracing::debug!(backend = settings.store.backend(), "Using store backend");
    let connector = connector_for(&settings.store).context("invalid store settings")?;
    run_store_command(name, args, connector).await
}

/// Run a store-backed subcommand against `connector`
///
/// # Errors
/// Unknown subcommand or a failed `init`
pub async fn run_store_command(
    name: &str,
    args: &ArgMatches,
    connector: Arc<dyn StoreConnector>,
) -> anyhow::Result<Outcome> {
    match name {
        "init" => {
            let backend = connector.backend();
            with_connection(connector.as_ref(), |conn| {
                Box::pin(async move { conn.ensure_schema().await })
            })
            .await
            .with_context(|| format!("failed to initialize {backend} schema"))?;
            tracing::info!(backend, "Database table initialized successfully");
            Outcome::json(&serde_json::json!({ "initialized": true, "backend": backend }), None)
        }
        "subscribe" => {
            let origin = origin_address(
                args.get_one::<String>("forwarded-for").map(String::as_str),
                args.get_one::<String>("origin").map(String::as_str),
            );
            let ingestion = SubscriptionIngestion::new(connector);
            let result = match args.get_one::<String>("json") {
                Some(body) => ingestion.ingest_json(body, &origin).await,
                None => ingestion.ingest(&payload_from_args(args), &origin).await,
            };
            let class = result.as_ref().err().map(subledger_core::IngestError::class);
            Outcome::json(&IngestResponse::from_result(&result), class)
        }
        "stats" => {
            let response = StatsResponse::from_result(StatsAggregator::new(connector).snapshot().await);
            Outcome::json(&response, response.error_class())
        }
        "health" => {
            let report = HealthProbe::new(connector).report().await;
            Outcome::json(&report, report.error_class())
        }
        other => anyhow::bail!("unknown subcommand {other}"),
    }
}

fn payload_from_args(args: &ArgMatches) -> SubscriptionPayload {
    let field = |name: &str| args.get_one::<String>(name).cloned();
    SubscriptionPayload {
        name: field("name"),
        company: field("company"),
        email: field("email"),
        source: field("source"),
    }
}

/// Install the stderr subscriber
///
/// Filter from `RUST_LOG`, else `LOG_LEVEL`, else `info`. `LOG_FORMAT=json`
/// selects JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(err) = installed {
        eprintln!("tracing subscriber already installed: {err}");
    }
}
