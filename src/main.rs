use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use licwatch_core::collector::LmutilCollector;
use licwatch_core::config::{Config, Settings};
use licwatch_core::monitor::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.validate();

    let collector = LmutilCollector::from_settings(&settings.collector);
    let cancel = CancellationToken::new();
    let scheduler = Scheduler::new(collector, &settings, cancel.clone());

    if cli.once {
        let summary = scheduler.run_cycle().await?;
        if summary.failed() > 0 {
            tracing::warn!("{} of {} targets failed", summary.failed(), summary.targets);
        }
        return Ok(());
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current cycle");
            cancel.cancel();
        }
    });

    scheduler.run().await;
    Ok(())
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("licwatch=debug,licwatch_core=debug")
    } else {
        EnvFilter::new("licwatch=info,licwatch_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
