use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use app::cli::{Cli, Command, ServeArgs};
use app::routes::{AppState, router};
use services::{Clock, ProgressService};
use storage::repository::Storage;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    app::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let storage = Storage::sqlite(&cli.db)
        .await
        .with_context(|| format!("open database {}", cli.db))?;

    match cli.command {
        Command::Serve(args) => serve(storage, args).await.context("serve")?,
        Command::Seed(args) => {
            let enrollment = app::seed::run(&storage, &args, Clock::default())
                .await
                .context("seed")?;
            println!(
                "Seeded course {} with {} chapters and enrollment {} into {}",
                args.course_id,
                args.chapters,
                enrollment.id(),
                cli.db
            );
        }
    }

    Ok(())
}

async fn serve(storage: Storage, args: ServeArgs) -> anyhow::Result<()> {
    let config = args.service_config();
    let service = ProgressService::from_storage(Clock::default(), config, &storage);
    let app = router(AppState { service }, args.request_timeout());

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(
        addr = %args.addr,
        max_attempts = config.max_attempts(),
        request_timeout_ms = args.request_timeout_ms,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
