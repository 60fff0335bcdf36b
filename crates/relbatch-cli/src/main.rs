use clap::Parser;
use relbatch_cli::cli::{Cli, Command, WriteArgs};
use relbatch_cli::config::{AppConfig, LogFormat};
use relbatch_cli::input::OperationFile;
use relbatch_cli::report;
use relbatch_client::{
    BatchOptions, BatchOrchestrator, BatchResult, GrpcTransport, InMemoryTransport, Transport,
    WriteTarget,
};
use relbatch_core::{OperationSet, chunk_operations, deduplicate};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    // Reports go to stdout, so logs stay on stderr.
    let registry = tracing_subscriber::registry().with(filter);

    match config.log.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr);
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr);
            registry.with(fmt_layer).init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Command::Plan { file } => run_plan(&config, &file),
        Command::Write(args) => run_write(&config, args).await,
    }
}

fn load_operations(path: &std::path::Path) -> Result<OperationSet, Box<dyn std::error::Error>> {
    let (writes, deletes) = OperationFile::load(path)?.into_keys();
    Ok(deduplicate(writes, deletes))
}

fn run_plan(config: &AppConfig, file: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let operations = load_operations(file)?;
    let options = config.batch_options();
    let chunks = chunk_operations(&operations, options.max_tuples_per_chunk)?;

    print!(
        "{}",
        report::plan_summary(&operations, &chunks, options.transactional)
    );
    Ok(())
}

async fn run_write(config: &AppConfig, args: WriteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let target = config.write_target(args.store_id.as_deref(), args.model_id.as_deref())?;

    let mut options = config.batch_options();
    if let Some(transactional) = args.transactional_override() {
        options.transactional = transactional;
    }
    if args.stop_on_first_error {
        options.stop_on_first_error = true;
    }
    options.validate()?;

    let operations = load_operations(&args.file)?;

    let result = if args.dry_run {
        tracing::info!(store_id = %target.store_id, "dry run against in-memory store");
        let transport = InMemoryTransport::new();
        transport.seed(
            &target.store_id,
            operations
                .iter()
                .filter(|op| op.is_delete())
                .map(|op| op.key.clone()),
        );
        execute(transport, &target, operations, &options).await?
    } else {
        tracing::info!(endpoint = %config.client.endpoint, "connecting");
        let transport =
            GrpcTransport::connect(&config.client.endpoint, config.client_options()).await?;
        execute(transport, &target, operations, &options).await?
    };

    print!("{}", report::result_summary(&result));
    result.into_result()?;
    Ok(())
}

async fn execute<T: Transport + 'static>(
    transport: T,
    target: &WriteTarget,
    operations: OperationSet,
    options: &BatchOptions,
) -> Result<BatchResult, relbatch_client::BatchError> {
    BatchOrchestrator::new(transport)
        .execute_set(target, operations, options)
        .await
}
