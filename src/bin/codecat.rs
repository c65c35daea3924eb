//! Codecat CLI - concatenate project sources for LLM context.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use codecat::builder::Codecat;
use codecat::clipboard::SystemClipboard;
use codecat::config::{Config, OutputFile, DEFAULT_OUTPUT_FILE};
use codecat::errors::{exit_code, CodecatError};
use codecat::output::OutputMode;
use codecat::progress;
use codecat::walker::{subdirectories, WalkOptions};
use codecat::writer::{self, Delivery};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codecat")]
#[command(about = "Concatenate source files into one markdown document, with function outlines")]
#[command(version)]
struct Cli {
    /// Files or directories to process (default: current directory)
    paths: Vec<PathBuf>,

    /// Write output to a file, optionally naming it
    #[arg(short = 'f', long = "file", num_args = 0..=1, default_missing_value = DEFAULT_OUTPUT_FILE, value_name = "NAME")]
    file: Option<PathBuf>,

    /// Print output to stdout instead of the clipboard
    #[arg(long)]
    stdout: bool,

    /// Do not copy output to the clipboard
    #[arg(short = 'n', long)]
    noclipboard: bool,

    /// Include all files: no default excludes, extension filter or ignore files
    #[arg(long)]
    all: bool,

    /// Exclude documentation files (.md)
    #[arg(long)]
    nodocs: bool,

    /// Additional gitignore-style patterns to exclude
    #[arg(long, num_args = 1.., value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Render a tree of directories, files and their functions
    #[arg(long)]
    tree: bool,

    /// Emit outlines as JSON
    #[arg(long, conflicts_with = "tree")]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Write a tree per directory to <dir>.tree.md (default: every subdirectory)
    #[arg(long, num_args = 0.., value_name = "DIR")]
    bydir: Option<Vec<PathBuf>>,

    /// Overwrite existing <dir>.tree.md files
    #[arg(short = 'o', long)]
    overwrite: bool,

    /// Also include local files imported by the selection
    #[arg(long)]
    follow_imports: bool,

    /// Keep private and underscore-prefixed names in outlines
    #[arg(long)]
    include_private: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "codecat", &mut std::io::stdout());
        return;
    }

    init_tracing(cli.debug);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(exit_code(&e));
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("codecat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codecat=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<(), CodecatError> {
    let mut config = Config::load(Path::new("."));
    if let Some(file) = &cli.file {
        config.output_file = OutputFile::Named(file.to_string_lossy().into_owned());
    }
    if cli.noclipboard || cli.stdout {
        config.use_pastebin = false;
    }
    debug!("configuration: {config:?}");

    let walk_options = config.walk_options(cli.all, cli.nodocs, &cli.exclude);

    if let Some(dirs) = &cli.bydir {
        return run_bydir(&cli, dirs, &walk_options);
    }

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.tree {
        OutputMode::Tree
    } else {
        OutputMode::Full
    };

    let collection = builder(&cli, cli.paths.clone(), walk_options)
        .progress(progress::spinner(0, !cli.debug))
        .build()?;
    let content = collection.render(mode)?;

    let delivery = Delivery {
        output_file: config.output_file.path(),
        stdout: cli.stdout,
        clipboard: config.use_pastebin,
        chunk_size: config.chunk_size,
    };
    delivery.deliver(&content, &SystemClipboard)?;
    Ok(())
}

fn builder(cli: &Cli, paths: Vec<PathBuf>, walk_options: WalkOptions) -> Codecat {
    Codecat::new(paths)
        .walk_options(walk_options)
        .follow_imports(cli.follow_imports)
        .include_private(cli.include_private)
}

/// Tree mode per directory, each written to `<dir>.tree.md`.
fn run_bydir(cli: &Cli, dirs: &[PathBuf], walk_options: &WalkOptions) -> Result<(), CodecatError> {
    let dirs = if dirs.is_empty() {
        subdirectories(Path::new("."), walk_options)?
    } else {
        dirs.to_vec()
    };
    if dirs.is_empty() {
        return Err(CodecatError::NoFilesFound(".".to_string()));
    }

    for dir in dirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        let target = PathBuf::from(format!("{name}.tree.md"));
        if target.exists() && !cli.overwrite {
            info!("skipping {} ({} exists, use --overwrite)", dir.display(), target.display());
            continue;
        }

        let collection = match builder(cli, vec![dir.clone()], walk_options.clone()).build() {
            Ok(collection) => collection,
            Err(CodecatError::NoFilesFound(_)) => {
                info!("no matching files in {}", dir.display());
                continue;
            }
            Err(e) => return Err(e),
        };
        let content = collection.render(OutputMode::Tree)?;
        writer::write_file(&target, &content)?;
        info!("wrote {} ({} files)", target.display(), collection.files.len());
    }
    Ok(())
}
