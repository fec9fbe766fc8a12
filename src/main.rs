/// Lumera Partner - media edge functions server
///
/// Hosts the three endpoints the partner client calls for media writes:
/// `get-upload-url`, `remove-tmp` and `reorder`.
use anyhow::Result;
use lumera_partner::config::FunctionsConfig;
use lumera_partner::functions::{self, FunctionsContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumera_partner=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        "Lumera Partner media functions v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = FunctionsConfig::from_env()?;
    let ctx = FunctionsContext::new(config).await?;

    functions::maintenance::start(ctx.clone());

    functions::serve(ctx).await?;

    Ok(())
}
