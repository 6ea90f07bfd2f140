//! Canopy Node binary
//!
//! Runs one member of a Canopy tree.

use canopy_node::{CanopyNode, NodeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canopy_node=info,canopy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Canopy Node");

    let config = NodeConfig::from_env()?;
    let node = CanopyNode::new(config).await?;

    let run = node.run();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, shutting down");
            node.shutdown().await;
            // run() removes the admin socket on its way out
            run.await?;
        }
    }

    Ok(())
}
