use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gallery_core::capture::FileImportCamera;
use gallery_core::{GalleryOptions, Platform};
use tracing_subscriber::EnvFilter;

const DEFAULT_DATA_DIR: &str = "gallery-data";

#[derive(Parser)]
#[command(name = "gallery", version, about = "Photo gallery - capture, list and delete saved photos")]
struct Cli {
    /// Application data directory (default: ./gallery-data)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// JSON options file; command-line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Execution environment: "hybrid" (direct filesystem) or "web"
    #[arg(long)]
    platform: Option<Platform>,

    /// Index file (default: <data-dir>/.gallery-index.json)
    #[arg(long)]
    index_file: Option<PathBuf>,

    /// Capture quality, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: Option<u8>,

    /// Key the photo index is stored under
    #[arg(long)]
    storage_key: Option<String>,

    /// Prefix that device file URIs are rewritten under for display
    #[arg(long)]
    file_src_prefix: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import an image as a newly captured photo
    Capture {
        /// Image to import
        image: PathBuf,
    },
    /// List saved photos, newest first
    List,
    /// Delete a saved photo
    Delete {
        /// Filepath of the photo, as printed by `list`
        filepath: String,

        /// Position the photo was listed at; refuses to delete if it moved
        #[arg(long)]
        position: Option<usize>,
    },
    /// Print how a saved photo is displayed
    Show {
        filepath: String,
    },
}

fn load_options(cli: &Cli) -> anyhow::Result<GalleryOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open config {}", path.display()))?;
            serde_json::from_reader(std::io::BufReader::new(file))
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => GalleryOptions::new(DEFAULT_DATA_DIR),
    };

    if let Some(data_dir) = &cli.data_dir {
        options.data_dir = data_dir.clone();
    }
    if cli.platform.is_some() {
        options.platform = cli.platform;
    }
    if cli.index_file.is_some() {
        options.index_file = cli.index_file.clone();
    }
    if let Some(quality) = cli.quality {
        options.quality = quality;
    }
    if let Some(key) = &cli.storage_key {
        options.storage_key = key.clone();
    }
    if let Some(prefix) = &cli.file_src_prefix {
        options.file_src_prefix = prefix.clone();
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = load_options(&cli)?;
    let gallery = gallery_core::open_gallery(&options);
    tracing::debug!(?options, "Opened gallery");

    match cli.command {
        Command::Capture { image } => {
            let gallery = gallery.with_camera(Arc::new(FileImportCamera::new(&image)));
            gallery.load_saved().await.context("Failed to load saved photos")?;
            let photo = gallery
                .capture_and_store()
                .await
                .with_context(|| format!("Failed to capture {}", image.display()))?;
            println!("{}", photo.filepath);
            eprintln!(
                "Saved photo ({} total, {} platform)",
                gallery.len().await,
                gallery.platform()
            );
        }
        Command::List => {
            let photos = gallery.load_saved().await.context("Failed to load saved photos")?;
            for (position, photo) in photos.iter().enumerate() {
                let taken = photo
                    .captured_at()
                    .map(|dt| {
                        dt.with_timezone(&chrono::Local)
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string()
                    })
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}\t{}", position, taken, photo.filepath, photo.display_path);
            }
            eprintln!("{} photo(s)", photos.len());
        }
        Command::Delete { filepath, position } => {
            gallery.load_saved().await.context("Failed to load saved photos")?;
            let removed = match position {
                Some(position) => {
                    let photo = gallery
                        .find(&filepath)
                        .await
                        .with_context(|| format!("No photo with filepath {}", filepath))?;
                    gallery.delete_picture_at(&photo, position).await
                }
                None => gallery.delete_picture(&filepath).await,
            }
            .with_context(|| format!("Failed to delete {}", filepath))?;
            eprintln!("Deleted {} ({} remaining)", removed.filepath, gallery.len().await);
        }
        Command::Show { filepath } => {
            gallery.load_saved().await.context("Failed to load saved photos")?;
            let photo = gallery
                .find(&filepath)
                .await
                .with_context(|| format!("No photo with filepath {}", filepath))?;
            println!("{}", photo.display_path);
            if let Some(inline) = &photo.inline_data {
                eprintln!("Inline data: {} bytes", inline.len());
            }
        }
    }

    Ok(())
}
