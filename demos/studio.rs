//! Runs one generation from the command line and saves the result.
//!
//! The API key is read from `GEMINI_API_KEY` (or `API_KEY`), optionally via a
//! `.env` file. Press Ctrl-C to abandon a video that is still rendering.
//!
//! Usage:
//! `cargo run --example studio image <PROMPT> [small|medium|large]`
//! `cargo run --example studio video <PROMPT> [16:9|9:16] [REFERENCE_IMAGE]`

use creative_suite::{
    AspectRatio, EnvCredentialHost, GenerationClient, GenerationRequest, ImageSize,
    ReferenceImage, Studio,
};
use std::env;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let tool = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("Please choose `image` or `video`."))?;
    let prompt = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("Please provide a prompt."))?;

    let request = match tool.as_str() {
        "image" => {
            let size = args.next().as_deref().unwrap_or("small").parse::<ImageSize>()?;
            GenerationRequest::image(prompt, size)
        }
        "video" => {
            let aspect_ratio = args.next().as_deref().unwrap_or("16:9").parse::<AspectRatio>()?;
            let reference_image = match args.next() {
                Some(path) => Some(ReferenceImage::from_path(path).await?),
                None => None,
            };
            GenerationRequest::video(prompt, reference_image, aspect_ratio)
        }
        other => anyhow::bail!("Unknown tool `{other}`, expected `image` or `video`."),
    };

    let client = GenerationClient::new(Arc::new(EnvCredentialHost::new()))?;
    let studio = Studio::new(client);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    println!("Generating...");
    let result = match studio.submit(request, &cancel).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("\nGeneration failed: {}", e);
            if e.needs_reselection() {
                eprintln!("Check the API key in your environment and try again.");
            }
            return Ok(());
        }
    };

    let dest_dir = env::current_dir()?;
    let saved = result.asset.write_to(&dest_dir, "generation").await?;
    println!("\nSaved {:?} to {}", result.kind, saved.display());

    Ok(())
}
