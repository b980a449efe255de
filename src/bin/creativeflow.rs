use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use creativeflow::{
    AssetStore as _, BlockId, DirAssetStore, DirKv, Editor, EditorConfig, KeyValueStore as _,
    Size, Slot, load_snapshot,
};

/// Slot files live under `<dir>/slots`, asset bytes under `<dir>/assets`.
const SLOTS_DIR: &str = "slots";
const ASSETS_DIR: &str = "assets";

#[derive(Parser, Debug)]
#[command(name = "creativeflow", version)]
struct Cli {
    /// Editor config JSON overriding the defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print slot and asset statistics of a state directory.
    Inspect(DirArgs),
    /// Load, hydrate and save a state directory once, applying retention.
    Compact(CompactArgs),
    /// Print the view transform that centers a block.
    Center(CenterArgs),
}

#[derive(Parser, Debug)]
struct DirArgs {
    /// State directory.
    #[arg(long)]
    dir: PathBuf,
}

#[derive(Parser, Debug)]
struct CompactArgs {
    /// State directory.
    #[arg(long)]
    dir: PathBuf,

    /// Viewport width used if a default block has to be created.
    #[arg(long, default_value_t = 1280.0)]
    width: f64,
}

#[derive(Parser, Debug)]
struct CenterArgs {
    /// State directory.
    #[arg(long)]
    dir: PathBuf,

    /// Block id.
    #[arg(long)]
    block: String,

    /// Viewport width in pixels.
    #[arg(long)]
    width: f64,

    /// Viewport height in pixels.
    #[arg(long)]
    height: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Compact(args) => cmd_compact(args, config),
        Command::Center(args) => cmd_center(args, config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EditorConfig> {
    match path {
        Some(p) => EditorConfig::from_json_file(p)
            .with_context(|| format!("load config '{}'", p.display())),
        None => Ok(EditorConfig::default()),
    }
}

fn open_state(dir: &Path) -> anyhow::Result<(DirKv, DirAssetStore)> {
    let kv = DirKv::open(dir.join(SLOTS_DIR))
        .with_context(|| format!("open slots under '{}'", dir.display()))?;
    let assets = DirAssetStore::open(dir.join(ASSETS_DIR))
        .with_context(|| format!("open assets under '{}'", dir.display()))?;
    Ok((kv, assets))
}

fn open_editor(
    dir: &Path,
    config: EditorConfig,
    viewport: Size,
) -> anyhow::Result<(Editor<DirAssetStore>, DirKv)> {
    let (kv, assets) = open_state(dir)?;
    let mut editor = Editor::new(config, assets, viewport).context("create editor")?;
    let report = editor.load(&kv);
    for failure in &report.failures {
        eprintln!("warning: {failure}");
    }
    Ok((editor, kv))
}

fn cmd_inspect(args: DirArgs) -> anyhow::Result<()> {
    let (kv, assets) = open_state(&args.dir)?;

    for slot in Slot::ALL {
        match kv.get(slot.key()).with_context(|| format!("read slot '{}'", slot.key()))? {
            Some(raw) => println!("{:<32} {:>10} bytes", slot.key(), raw.len()),
            None => println!("{:<32} {:>10}", slot.key(), "-"),
        }
    }

    let snap = load_snapshot(&kv);
    println!("blocks: {}", snap.blocks.len());
    println!("items: {}", snap.items.len());
    println!("history: {}", snap.history.len());
    println!("credits: {}", snap.credits);
    println!("theme: {}", snap.theme.as_str());

    let stats = assets.stats().context("read asset stats")?;
    println!(
        "assets: {} entries, {} bytes, {} references",
        stats.entries, stats.total_bytes, stats.references
    );
    Ok(())
}

fn cmd_compact(args: CompactArgs, config: EditorConfig) -> anyhow::Result<()> {
    let (mut editor, mut kv) = open_editor(&args.dir, config, Size::new(args.width, 800.0))?;
    let outcome = editor.save(&mut kv);
    for failure in &outcome.failures {
        eprintln!("warning: {failure}");
    }
    println!(
        "wrote {} slots: {} items, {} history entries{}",
        outcome.written.len(),
        outcome.items_saved,
        outcome.history_saved,
        if outcome.degraded { " (degraded)" } else { "" }
    );
    if !outcome.is_clean() {
        anyhow::bail!("compaction finished with {} failures", outcome.failures.len());
    }
    Ok(())
}

fn cmd_center(args: CenterArgs, config: EditorConfig) -> anyhow::Result<()> {
    let viewport = Size::new(args.width, args.height);
    let (mut editor, _kv) = open_editor(&args.dir, config, viewport)?;
    let id = BlockId::from(args.block.as_str());
    if !editor.center_on_block(&id) {
        anyhow::bail!("no block '{}' in '{}'", args.block, args.dir.display());
    }
    let json = serde_json::to_string(editor.transform()).context("serialize transform")?;
    println!("{json}");
    Ok(())
}
