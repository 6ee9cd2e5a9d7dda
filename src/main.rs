// attendance-export: Normalize attendance rich text and export it as paginated PDFs

use std::io::Read;
use std::path::PathBuf;

use attendance_record::config::{RenderConfig, DEFAULT_LOG_FILTER};
use attendance_record::error::RenderError;
use attendance_record::{HtmlNormalizer, ImageSurface, PaginatedRenderer};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to read input: {0}")]
    InputError(String),
    #[error("Failed to load image: {0}")]
    ImageError(String),
    #[error("Nothing was rendered")]
    NothingRendered,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Normalize attendance rich text and export it as paginated PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite rich-text HTML into its print-safe form
    Normalize {
        /// HTML file to normalize ("-" reads stdin)
        input: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bottom margin between paragraphs, in px
        #[arg(long, default_value = "8")]
        paragraph_spacing: u32,
    },

    /// Paginate a rendered capture of a document onto A4 pages
    Render {
        /// Captured image (file path or URL)
        #[arg(short, long)]
        image: String,

        /// Document title (defaults to "document")
        #[arg(short, long)]
        title: Option<String>,

        /// Output filename (defaults to the title-derived name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Device-pixel scale factor used when rasterizing
        #[arg(long, default_value = "2.0")]
        scale: f32,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Normalize {
            input,
            output,
            paragraph_spacing,
        } => {
            let config = RenderConfig::default().with_paragraph_spacing(paragraph_spacing);
            let raw = read_input(&input)?;
            let normalized = HtmlNormalizer::from(&config).normalize(&raw);
            match output {
                Some(path) => {
                    std::fs::write(&path, normalized)?;
                    println!("✓ Normalized: {}", path.display());
                }
                None => println!("{}", normalized),
            }
        }
        Command::Render {
            image,
            title,
            output,
            scale,
        } => {
            let config = RenderConfig::default().with_scale_factor(scale);
            let surface = load_surface(&image)?;
            let renderer = PaginatedRenderer::new(config);

            let doc = renderer
                .render(Some(&surface), title.as_deref())
                .await?
                .ok_or(AppError::NothingRendered)?;

            let output_file = output.unwrap_or_else(|| PathBuf::from(&doc.filename));
            doc.save(&output_file)?;

            println!("✓ Generated: {}", output_file.display());
            println!("  Title: {}", doc.title);
            println!("  Pages: {}", doc.page_count());
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn read_input(input: &str) -> Result<String, AppError> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::InputError(format!("stdin: {}", e)))?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).map_err(|e| AppError::InputError(format!("{}: {}", input, e)))
}

fn load_surface(path: &str) -> Result<ImageSurface, AppError> {
    let image_bytes = if path.starts_with("http://") || path.starts_with("https://") {
        let response = ureq::get(path)
            .call()
            .map_err(|e| AppError::ImageError(format!("Failed to fetch URL: {}", e)))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| AppError::ImageError(format!("Failed to read response: {}", e)))?;
        bytes
    } else {
        std::fs::read(path).map_err(|e| AppError::ImageError(format!("{}: {}", path, e)))?
    };

    ImageSurface::from_bytes(&image_bytes)
        .map_err(|e| AppError::ImageError(e.to_string()))
}
