use clap::Parser;
use std::path::PathBuf;
use treepress::config::{self, Layout};
use treepress::{output, pipeline};

fn version_string() -> &'static str {
    let revision = env!("TREEPRESS_REVISION");
    if revision.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{}@{revision}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "treepress")]
#[command(about = "Mirror a content tree into a publishable static site")]
#[command(long_about = "\
Mirror a content tree into a publishable static site

Every directory under the source is recreated under the output. Markdown
documents become pages, images are scaled down to fit, scripts are bundled,
and a generated index.html lists every document with complete frontmatter.

Content structure:

  content/
  ├── treepress.toml               # Build config (optional)
  ├── skeleton.html                # Page shell with id=\"content\" (optional)
  ├── post-a/
  │   ├── index.md                 # → post-a/index.html
  │   └── banner.gif               # → post-a/banner.gif, max 600px wide
  ├── notes/
  │   └── hello.md                 # → notes/hello/index.html (or notes/hello.html)
  └── js/
      └── app.js                   # → js/app.js, bundled

Frontmatter (all three needed to appear on the index):

  ---
  title: Cloud pricing
  description: What a small VPS really costs
  date: 2024-02-01
  ---

Run 'treepress --print-config' to see a documented treepress.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content")]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist")]
    output: PathBuf,

    /// Page layout: `flat` or `nested-index` (overrides treepress.toml)
    #[arg(long)]
    layout: Option<Layout>,

    /// Images wider than this are scaled down (overrides treepress.toml)
    #[arg(long)]
    max_image_width: Option<u32>,

    /// Page skeleton HTML file (overrides treepress.toml)
    #[arg(long)]
    skeleton: Option<PathBuf>,

    /// Print a stock treepress.toml with all options documented, then exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut build_config = config::load_config(&cli.source)?;
    if let Some(layout) = cli.layout {
        build_config.layout = layout;
    }
    if let Some(width) = cli.max_image_width {
        build_config.max_image_width = width;
    }
    if let Some(skeleton) = &cli.skeleton {
        build_config.skeleton = Some(std::path::absolute(skeleton)?.to_string_lossy().into_owned());
    }
    build_config.validate()?;

    init_thread_pool(&build_config.processing);

    let paths = pipeline::BuildPaths {
        source_root: cli.source.clone(),
        output_root: cli.output.clone(),
    };

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_build_event(&event);
        }
    });
    let result = pipeline::build(&build_config, &paths, Some(tx));
    printer.join().ok();

    let report = result?;
    output::print_build_summary(&report);
    println!("==> Build complete: {}", cli.output.display());
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores; config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
