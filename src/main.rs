//! Index a music library and query it from the command line.
//!
//! Run `tunetree scan` once to build the snapshot; later commands load it
//! instead of walking the library again.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use tunetree::app::{
    fs_runtime::spawn_rescan,
    state::{LibraryState, LoadSource},
};
use tunetree::config::LibraryConfig;
use tunetree::core::{
    codec, fs, inspector,
    search,
    sort::{self, SortOrder},
    tree::{LibraryTree, NodeHandle},
};

// ───────────────────────────────────────── CLI ───────────────

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), about = "Music library indexer")]
struct Cli {
    /// Library root (defaults to `library_path` from the config file).
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Snapshot file (defaults to `cache_path` from the config file).
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Sibling order: `library` or `recent`.
    #[arg(long, global = true)]
    sort: Option<SortOrder>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk the whole library and write a fresh snapshot.
    Scan,
    /// Fuzzy-search entry names.
    Search {
        term: String,
        /// Highest distance accepted for non-substring matches.
        #[arg(long)]
        threshold: Option<usize>,
        /// Maximum number of hits to print.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the library as an indented tree.
    Tree,
    /// Print audio file paths in play order, optionally below a subdirectory.
    Queue {
        /// Path relative to the library root.
        subpath: Option<String>,
    },
    /// Show details of one entry (path relative to the library root).
    Info { subpath: String },
    /// Rebuild the library in the background, then replace the snapshot.
    Rescan,
}

// ───────────────────────────────────────── main ──────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing (only when RUST_LOG is set).
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr) // never pollute stdout
        .init();

    let cli = Cli::parse();
    let mut config = LibraryConfig::load();
    if let Some(library) = cli.library {
        config.library_path = library;
    }
    if let Some(cache) = cli.cache {
        config.cache_path = cache;
    }
    if let Some(order) = cli.sort {
        config.sort_order = order;
    }
    let root = config
        .library_path
        .canonicalize()
        .with_context(|| format!("cannot open library {}", config.library_path.display()))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Command::Scan => {
            let outcome = fs::build_tree(&root)?;
            let mut tree = outcome.tree;
            sort::sort_tree(&mut tree, config.sort_order);
            codec::save(tree, &config.cache_path)
                .with_context(|| format!("cannot write {}", config.cache_path.display()))?;
            writeln!(out, "{} entries indexed", outcome.entries)?;
        }
        Command::Search {
            term,
            threshold,
            limit,
        } => {
            let state = open(&root, &config)?;
            let threshold = threshold.unwrap_or(config.search_threshold);
            let limit = limit.unwrap_or(config.max_results);
            let hits = search::ranked(&state.tree, &term, threshold, limit);
            if hits.is_empty() {
                writeln!(out, "no entries found")?;
            }
            for hit in hits {
                let entry = state.tree.get(hit.handle);
                let marker = if entry.is_dir { "/" } else { "" };
                writeln!(
                    out,
                    "{:>5}  {}{marker}",
                    hit.distance,
                    relative(&state.tree, hit.handle)
                )?;
            }
        }
        Command::Tree => {
            let state = open(&root, &config)?;
            print_tree(&state.tree, &mut out)?;
        }
        Command::Queue { subpath } => {
            let state = open(&root, &config)?;
            let start = resolve(&state.tree, subpath.as_deref().unwrap_or(""))?;
            for handle in state.tree.audio_files(start) {
                if let Some(path) = &state.tree.get(handle).full_path {
                    writeln!(out, "{path}")?;
                }
            }
        }
        Command::Info { subpath } => {
            let state = open(&root, &config)?;
            let handle = resolve(&state.tree, &subpath)?;
            for (label, value) in inspector::inspect(state.tree.get(handle)).lines() {
                writeln!(out, "{label:<10}{value}")?;
            }
        }
        Command::Rescan => {
            let mut state = open(&root, &config)?;
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let generation = state.next_generation();
            spawn_rescan(tx, generation, root.clone(), state.sort_order);
            let Some(update) = rx.recv().await else {
                bail!("rescan worker exited without a result");
            };
            match state.apply(update) {
                Some(entries) => {
                    codec::save(state.tree, &config.cache_path)
                        .with_context(|| format!("cannot write {}", config.cache_path.display()))?;
                    writeln!(out, "{entries} entries indexed")?;
                }
                None => writeln!(out, "rescan failed; snapshot left unchanged")?,
            }
        }
    }

    out.flush()?;
    Ok(())
}

// ───────────────────────────────────────── helpers ───────────

fn open(root: &Path, config: &LibraryConfig) -> Result<LibraryState> {
    let (state, source) = LibraryState::open(root, &config.cache_path, config.sort_order)?;
    if source == LoadSource::Scan {
        // Keep the fresh scan for next time; losing it only costs a rescan.
        if let Err(e) = codec::store(&state.tree, &config.cache_path) {
            tracing::warn!("cannot write {}: {e}", config.cache_path.display());
        }
    }
    Ok(state)
}

fn resolve(tree: &LibraryTree, subpath: &str) -> Result<NodeHandle> {
    match tree.find_by_name_path(subpath) {
        Some(handle) => Ok(handle),
        None => bail!("`{subpath}` is not in the library"),
    }
}

/// Path of `handle` relative to the library root.
fn relative(tree: &LibraryTree, handle: NodeHandle) -> String {
    let mut parts = Vec::new();
    let mut current = Some(handle);
    while let Some(h) = current {
        if h == tree.root() {
            break;
        }
        parts.push(tree.get(h).name.as_str());
        current = tree.get(h).parent();
    }
    parts.reverse();
    parts.join("/")
}

fn print_tree<W: Write>(tree: &LibraryTree, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", tree.root_path())?;
    // (handle, depth); children pushed in reverse.
    let mut stack: Vec<(NodeHandle, usize)> = tree.children(tree.root()).map(|h| (h, 1)).collect();
    stack.reverse();
    while let Some((handle, depth)) = stack.pop() {
        let entry = tree.get(handle);
        let suffix = if entry.is_dir { "/" } else { "" };
        writeln!(out, "{}{}{suffix}", "  ".repeat(depth), entry.name)?;
        let children: Vec<NodeHandle> = tree.children(handle).collect();
        stack.extend(children.into_iter().rev().map(|h| (h, depth + 1)));
    }
    Ok(())
}
