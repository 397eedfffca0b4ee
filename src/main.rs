use clap::{Parser, Subcommand};
use respimg::config::{self, BuildConfig, CONFIG_FILENAME};
use respimg::imaging::RustBackend;
use respimg::naming::BuildDirs;
use respimg::pipeline::{ImagePipeline, PipelineOptions};
use respimg::planner::{BackgroundOptions, BackgroundPosition, BackgroundSize};
use respimg::{markup, output, site};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Shared flags for commands that measure images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Ignore the dimension cache and probe every image again
    #[arg(long)]
    no_cache: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("RESPIMG_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("RESPIMG_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "respimg")]
#[command(about = "Responsive image sets for static sites")]
#[command(long_about = "\
Responsive image sets for static sites

A device table (viewport sizes, pixel densities, rotation) is resolved
against a catalog of rendered image sizes. From that, respimg emits srcset
width descriptors for <img> tags and CSS @media rules picking a background
image per breakpoint, orientation and resolution, and renders every size
those reference.

Output naming, next to where the source is served from:

  img/hero.jpg         source
  img/hero-1280w.jpg   width-constrained (srcset)
  img/hero-1280x800.jpg  box, cover (background)
  img/hero-800h.jpg    height-constrained (background)

Measured source sizes are cached in .respimg-cache.jsonl between builds.

Run 'respimg gen-config' to generate a documented respimg.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Source directory; URIs are resolved against it
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory for resized images
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Config file (default: respimg.toml in the source directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved catalog and breakpoint tables
    Catalog,
    /// Print the srcset for one image and render its variants
    Srcset {
        /// Image URI relative to the source directory
        src: String,
        /// Widest the image is ever displayed, in pixels
        #[arg(long)]
        width: Option<u32>,
        /// Print a complete <img> tag instead of the bare attribute value
        #[arg(long)]
        html: bool,
        #[command(flatten)]
        cache: CacheArgs,
    },
    /// Print CSS background rules for one image and render its variants
    Background {
        /// CSS selector the rules apply to
        selector: String,
        /// Image URI relative to the source directory
        src: String,
        /// background-size: cover, contain, or one/two of auto, N%, length
        #[arg(long, default_value = "cover")]
        size: String,
        /// background-position: one/two of left, center, right, top, bottom, N%, Npx
        #[arg(long, default_value = "center")]
        position: String,
        /// Crop to the exact box and emit rules for both orientations
        #[arg(long)]
        crop: bool,
        /// Wrap the rules in a <style> element
        #[arg(long)]
        html: bool,
        #[command(flatten)]
        cache: CacheArgs,
    },
    /// Plan every image under the source directory and render all variants
    Build(CacheArgs),
    /// Print a stock respimg.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match &cli.command {
        Command::Catalog => {
            let config = load_config(&cli)?;
            output::print_catalog(&config.catalog());
        }
        Command::Srcset {
            src,
            width,
            html,
            cache,
        } => {
            let (mut pipeline, printer) = start_pipeline(&cli, cache)?;
            let srcset = pipeline.srcset(src, *width)?;
            let summary = finish(pipeline, printer)?;
            if *html {
                println!("{}", markup::render_img(src, &srcset, None, "").into_string());
            } else {
                println!("{}", srcset);
            }
            log::info!("cache: {}", summary.cache);
        }
        Command::Background {
            selector,
            src,
            size,
            position,
            crop,
            html,
            cache,
        } => {
            let options = BackgroundOptions {
                size: size.parse::<BackgroundSize>()?,
                position: position.parse::<BackgroundPosition>()?,
                crop: *crop,
            };
            let (mut pipeline, printer) = start_pipeline(&cli, cache)?;
            let rules = pipeline.background(selector, src, &options)?;
            let summary = finish(pipeline, printer)?;
            if *html {
                println!("{}", markup::render_style(&rules).into_string());
            } else {
                print!("{}", rules.css());
            }
            log::info!("cache: {}", summary.cache);
        }
        Command::Build(cache) => {
            println!("==> Planning {}", cli.source.display());
            let (mut pipeline, printer) = start_pipeline(&cli, cache)?;
            let manifest = site::plan_directory(&mut pipeline)?;
            output::print_build_manifest(&manifest);

            println!("==> Resizing into {}", cli.output.display());
            let summary = finish(pipeline, printer)?;
            site::write_outputs(&manifest, &cli.output)?;
            output::print_build_summary(&summary);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<BuildConfig, config::ConfigError> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.source.join(CONFIG_FILENAME));
    config::load_config(&path)
}

/// Open a pipeline whose resize events are printed as they settle.
fn start_pipeline(
    cli: &Cli,
    cache: &CacheArgs,
) -> Result<(ImagePipeline, JoinHandle<()>), Box<dyn Error>> {
    let config = load_config(cli)?;
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_task_event(&event) {
                eprintln!("{}", line);
            }
        }
    });
    let pipeline = ImagePipeline::new(
        &config,
        BuildDirs::new(&cli.source, &cli.output),
        Arc::new(RustBackend::new()),
        PipelineOptions {
            use_cache: !cache.no_cache,
            events: Some(tx),
        },
    )?;
    Ok((pipeline, printer))
}

fn finish(
    pipeline: ImagePipeline,
    printer: JoinHandle<()>,
) -> Result<respimg::pipeline::BuildSummary, Box<dyn Error>> {
    let summary = pipeline.finish();
    printer.join().map_err(|_| "event printer panicked")?;
    Ok(summary?)
}
