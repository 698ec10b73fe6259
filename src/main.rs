use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use simplelog::{Config, LevelFilter, WriteLogger};

use flipbook::manifest::load_manifest;
use flipbook::publish::PublishOptions;
use flipbook::settings::Settings;
use flipbook::store::{AssetStore, HttpStore, MemoryStore};

#[derive(Parser)]
#[command(name = "flipbook", about = "Publish paginated documents as page images and read them back")]
struct Cli {
    /// Settings file (YAML). Missing file means defaults.
    #[arg(long, default_value = "flipbook.yaml")]
    config: PathBuf,

    #[arg(long, default_value = "flipbook.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rasterize every page of a document and upload assets plus manifest.
    Publish {
        /// Source document (PDF).
        file: PathBuf,
        /// Document identifier; determines the asset paths.
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        scale: Option<f32>,
        #[arg(long)]
        quality: Option<u8>,
        /// Publish into an in-memory store and only report what would be
        /// written.
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch and print the manifest for a published document.
    Manifest {
        id: String,
    },

    /// Rasterize a page window directly from a remote document via
    /// byte-range fetches, without a manifest.
    FetchPages {
        /// Source document URL.
        url: String,
        #[arg(long, default_value_t = 1)]
        start: u32,
        #[arg(long)]
        end: u32,
        /// Directory receiving page-NNN.jpg files.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WriteLogger::init(
        LevelFilter::Debug,
        Config::default(),
        File::create(&cli.log_file)?,
    )?;

    let settings = Settings::load_or_default(&cli.config);

    match cli.command {
        Commands::Publish {
            file,
            id,
            title,
            scale,
            quality,
            dry_run,
        } => {
            let bytes = fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let opts = PublishOptions {
                collection: settings.collection.clone(),
                scale: scale.unwrap_or(settings.publish_scale),
                quality: quality.unwrap_or(settings.publish_quality),
                retry: settings.retry_policy(),
                ..PublishOptions::default()
            };

            if dry_run {
                let store = MemoryStore::new();
                run_publish(&store, opts, &bytes, &id, &title)?;
                println!("dry run; would write:");
                for path in store.paths() {
                    println!("  {path}");
                }
            } else {
                let store = http_store(&settings)?;
                run_publish(&store, opts, &bytes, &id, &title)?;
            }
        }

        Commands::Manifest { id } => {
            let store = http_store(&settings)?;
            match load_manifest(&store, &settings.collection, &id) {
                Some(manifest) => println!("{}", serde_json::to_string_pretty(&manifest)?),
                None => bail!("no readable manifest for {id}"),
            }
        }

        Commands::FetchPages { url, start, end, out } => {
            fetch_pages(&settings, &url, start, end, &out)?;
        }
    }

    Ok(())
}

fn http_store(settings: &Settings) -> Result<HttpStore> {
    let base_url = settings
        .store_base_url
        .as_deref()
        .context("store_base_url is not configured")?;
    Ok(HttpStore::new(
        base_url,
        settings.store_token.clone(),
        settings.connect_timeout(),
        settings.read_timeout(),
    ))
}

#[cfg(feature = "pdf")]
fn run_publish<S: AssetStore>(
    store: &S,
    opts: PublishOptions,
    bytes: &[u8],
    id: &str,
    title: &str,
) -> Result<()> {
    use flipbook::publish::Publisher;
    use flipbook::resilience::CancelFlag;
    use log::info;

    let engine = flipbook::raster::MupdfEngine;
    let publisher = Publisher::new(store, &engine, opts);

    info!("publishing {id}");
    let manifest = publisher.publish(bytes, id, title, &CancelFlag::new(), &mut |p| {
        println!("{} ({:.0}%)", p.stage, p.fraction * 100.0);
    })?;
    println!(
        "published {} pages; manifest version {}",
        manifest.total_pages, manifest.version
    );
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn run_publish<S: AssetStore>(
    _store: &S,
    _opts: PublishOptions,
    _bytes: &[u8],
    _id: &str,
    _title: &str,
) -> Result<()> {
    bail!("this build has no PDF engine; rebuild with the `pdf` feature")
}

#[cfg(feature = "pdf")]
fn fetch_pages(
    settings: &Settings,
    url: &str,
    start: u32,
    end: u32,
    out: &std::path::Path,
) -> Result<()> {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use flipbook::cache::DocumentCache;
    use flipbook::fetch::RangeFetcher;
    use flipbook::range_reader::{RangeReader, RemoteSource};
    use flipbook::resilience::CancelFlag;

    let fetcher = RangeFetcher::new(
        settings.fetch_chunk_size,
        settings.retry_policy(),
        settings.connect_timeout(),
        settings.read_timeout(),
    );
    let engine = flipbook::raster::MupdfEngine;
    let source = RemoteSource {
        fetcher: &fetcher,
        engine: &engine,
    };
    let cache = DocumentCache::new();
    let reader = RangeReader::new(&cache, settings.reader_scale, settings.reader_quality);

    let window = reader.read_window(&source, url, start, end, &CancelFlag::new(), &mut |f| {
        println!("window {:.0}%", f * 100.0);
    })?;

    fs::create_dir_all(out)?;
    for page in &window.pages {
        let jpeg = page
            .data_uri
            .strip_prefix("data:image/jpeg;base64,")
            .map(|b64| BASE64.decode(b64))
            .transpose()?
            .unwrap_or_default();
        let path = out.join(format!("page-{:03}.jpg", page.page));
        fs::write(&path, jpeg)?;
        if page.placeholder {
            println!("{}: placeholder (page failed to rasterize)", path.display());
        } else {
            println!("{}", path.display());
        }
    }
    println!("document has {} pages in total", window.total_pages);
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn fetch_pages(
    _settings: &Settings,
    _url: &str,
    _start: u32,
    _end: u32,
    _out: &std::path::Path,
) -> Result<()> {
    bail!("this build has no PDF engine; rebuild with the `pdf` feature")
}
