use safepost_http::{serve, telemetry::init_tracing, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(config.log_format, false);
    serve(config).await?;
    Ok(())
}
