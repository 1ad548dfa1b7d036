//! Seqrelay - Main Entry Point
//! Runs one producer and one consumer over a bounded queue and reports throughput

mod settings;
mod telemetry;

use anyhow::Result;
use seqrelay_core::application::Pipeline;
use settings::DaemonConfig;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (defaults < seqrelay.toml < SEQRELAY_* env)
    let config = DaemonConfig::load()?;

    // 2. Initialize logging; the guard flushes the file sink on exit
    let _log_guard = telemetry::init_logging(&config.log)?;

    info!("Seqrelay v{} starting...", VERSION);
    info!(
        queue = %config.pipeline.queue_name,
        capacity = config.pipeline.queue_capacity,
        item_count = config.pipeline.item_count,
        "Pipeline configured"
    );

    // 3. Build pipeline and hook Ctrl+C to its shutdown handle
    let pipeline = Pipeline::new(config.pipeline.clone())?;
    let shutdown = pipeline.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Stopping pipeline...");
            shutdown.shutdown();
        }
    });

    // 4. Run until the final item is handled
    let report = match pipeline.run().await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            return Err(e.into());
        }
    };

    if report.completed {
        info!(
            "Handled {} item(s) in {}ms ({:.3} ms/item, {:.0} items/sec)",
            report.handled,
            report.elapsed.as_millis(),
            report.ms_per_item(),
            report.items_per_sec()
        );
    } else {
        warn!(
            handled = report.handled,
            published = report.published,
            item_count = report.item_count,
            "Pipeline stopped early"
        );
    }

    info!("Shutdown complete.");

    Ok(())
}
