use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use safepost_eval::{
    discover, export, report, run, AnalyzeClient, EngineAnalyzeClient, HttpAnalyzeClient, Summary,
};
use safepost_http::{telemetry::init_tracing, AppConfig};
use safepost_infer::{DetectionEngine, GeminiEngine};

#[derive(Parser)]
#[command(name = "safepost", about = "Check images for personal information before posting")]
struct Cli {
    /// Debug-level logs for safepost crates.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server.
    Serve,
    /// Analyze one image with the configured model and print the result.
    Analyze { image: PathBuf },
    /// Score the detector against a labelled image corpus.
    Eval {
        #[arg(long, default_value = "test_images")]
        images: PathBuf,
        #[arg(long, default_value = "test_results_output")]
        output: PathBuf,
        #[arg(long, default_value = "http://localhost:3000")]
        url: String,
        /// Call the model directly instead of a running server.
        #[arg(long)]
        direct: bool,
        #[arg(long, env = "AUTH_USERNAME", default_value = "admin")]
        username: String,
        #[arg(long, env = "AUTH_PASSWORD", default_value = "password", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(config.log_format, cli.verbose);

    match cli.command {
        Command::Serve => safepost_http::serve(config).await?,
        Command::Analyze { image } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("reading {}", image.display()))?;
            let engine = GeminiEngine::new(config.gemini);
            let mime_type = safepost_eval::corpus::mime_type(&image);
            let result = engine.detect(&bytes, mime_type).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Eval {
            images,
            output,
            url,
            direct,
            username,
            password,
        } => {
            let client: Box<dyn AnalyzeClient> = if direct {
                Box::new(EngineAnalyzeClient::new(GeminiEngine::new(config.gemini)))
            } else {
                Box::new(
                    HttpAnalyzeClient::new(url)?
                        .login(&username, &password)
                        .await
                        .context("logging in to the SafePost server")?,
                )
            };
            evaluate(&images, &output, client.as_ref()).await?;
        }
    }

    Ok(())
}

async fn evaluate(
    images: &std::path::Path,
    output: &std::path::Path,
    client: &dyn AnalyzeClient,
) -> anyhow::Result<()> {
    let corpus = discover(images)?;
    if corpus.cases.is_empty() {
        anyhow::bail!("no images found under {}", images.display());
    }
    println!(
        "Found {} images in {} category folders",
        corpus.cases.len(),
        corpus.folders
    );

    println!("Analyzing images...");
    let records = run(corpus.cases, client, |done, total, record| {
        println!("{}", report::progress(done, total, record));
    })
    .await;

    let summary = Summary::from_records(&records);
    println!("\n{}", report::render(&summary));
    println!("{}", report::render_reasoning(&records));

    let stamp = export::file_stamp();
    let copied = export::copy_images(&records, output)?;
    let csv = export::write_csv(&records, output, &stamp)?;
    let json = export::write_json(&records, output, &stamp)?;
    let summary_csv = export::write_summary_csv(&summary, output)?;
    tracing::info!(copied, "copied corpus images");
    println!("CSV results: {}", csv.display());
    println!("JSON results: {}", json.display());
    println!("Summary metrics: {}", summary_csv.display());
    Ok(())
}
