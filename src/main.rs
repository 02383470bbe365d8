use clap::Parser;
use maestro_probe::configuration::{ConfigResolver, EnvironmentSettings};
use maestro_probe::orchestrator::Orchestrator;
use maestro_probe::services::PgResultLogger;
use maestro_probe::telemetry::{get_subscriber, init_subscriber};
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "maestro-probe",
    version,
    about = "Check that the Maestro database, message broker and API are reachable"
)]
struct Cli {
    /// Job whose log receives one entry per probe outcome
    #[arg(long, env = "MAESTRO_JOB_ID", value_name = "UUID")]
    job_id: Option<Uuid>,
    /// Print the run summary as JSON after the status lines
    #[arg(long)]
    json: bool,
    /// Exit with status 1 when any probe fails
    #[arg(long, env = "MAESTRO_FAIL_ON_ERROR")]
    fail_on_error: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // stdout carries the status lines, structured logs go to stderr
    let subscriber = get_subscriber("maestro-probe".into(), "warn".into(), std::io::stderr);
    init_subscriber(subscriber);

    let settings = EnvironmentSettings::load();
    let cli = Cli::parse();

    let resolver = ConfigResolver::new(settings);
    let mut orchestrator = Orchestrator::from_resolver(&resolver);

    if let Some(job_id) = cli.job_id {
        let logger =
            PgResultLogger::new(resolver.database()).with_timeout(resolver.probe_timeout());
        orchestrator = orchestrator.with_recording(job_id, Box::new(logger));
    }

    let mut stdout = std::io::stdout();
    let summary = orchestrator.run(&mut stdout).await;

    if cli.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(err) => tracing::error!("Failed to serialize run summary: {:?}", err),
        }
    }

    if cli.fail_on_error && !summary.all_passed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
