//! `subledger` binary entry point

use std::process::ExitCode;
use subledger_cli::{command, execute, init_tracing, resolve_snapshot, GlobalOptions};
use subledger_config::NAMESPACE_ENV;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let matches = command().get_matches();
    let options = GlobalOptions::from_matches(&matches, std::env::var(NAMESPACE_ENV).ok());
    tracing::info!(namespace = %options.namespace, remote = options.remote, "Resolving settings");

    let snapshot = resolve_snapshot(&options).await;
    let outcome = execute(&matches, &snapshot).await?;

    println!("{}", outcome.output);
    Ok(ExitCode::from(outcome.exit_code))
}
