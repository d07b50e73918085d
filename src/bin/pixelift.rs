//! Pixelift CLI Tool
//!
//! Command-line interface for batch image enhancement, AI upscaling, and
//! vectorization using the pixelift library.

#[cfg(feature = "cli")]
use pixelift::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
