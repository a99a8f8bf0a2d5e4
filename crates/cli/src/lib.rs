use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use haqei_iching::{Action, HexagramTable, LineRef, PathSignature, PathWalker, Step, TransformTable};
use haqei_narrative::{
    BaseTable, ComposedNarrative, ComposerOptions, NarrativeComposer, NarrativeStore,
    ProviderConfig, ProviderStats, ResolvedEntry, ScenarioDbProvider, PLACEHOLDER_TEXT,
};
use haqei_qa::{
    check_bundle_dir, check_coverage, check_duplication, load_line_states,
    render_coverage_report, render_duplication_report, render_style_report,
    render_table_report, verify_transform_table, BundleCoverage, CoverageReport, QaConfig,
    StyleLinter,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "haqei")]
#[command(about = "Walk I Ching line paths, serve narratives and check their coverage", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a three-step path from a starting line
    Walk(WalkArgs),

    /// Compose the base-table narrative for a path
    Compose(ComposeArgs),

    /// Look up curated narratives in the hex-{N}.json bundles
    Scenario(ScenarioArgs),

    /// Report which of the 3072 narrative keys are authored
    Coverage(CoverageArgs),

    /// Flag repeated headlines and stages
    Dupes(DupesArgs),

    /// Lint the line-state text table
    Lint(LintArgs),

    /// Insert placeholder entries for every missing key
    Backfill(BackfillArgs),

    /// Compile the authoring store into per-hexagram bundles
    Bundle(BundleArgs),

    /// Check the transform table against the line patterns
    VerifyTable(VerifyTableArgs),
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Commands::Walk(args) => args.json,
            Commands::Compose(args) => args.json,
            Commands::Scenario(args) => args.json,
            Commands::Coverage(args) => args.json,
            Commands::Dupes(args) => args.json,
            Commands::Lint(args) => args.json,
            Commands::Backfill(args) => args.json,
            Commands::Bundle(args) => args.json,
            Commands::VerifyTable(args) => args.json,
        }
    }
}

/// Starting line and signature shared by `walk` and `compose`
#[derive(Args)]
struct PathArgs {
    /// Hexagram number (1-64, King Wen order)
    #[arg(long = "hexagram", short = 'x')]
    hexagram: u32,

    /// Line position (1 = bottom, 6 = top)
    #[arg(long, short = 'l')]
    line: u32,

    /// Path signature (JJJ, JJH, ... HHH)
    #[arg(long, short = 's')]
    signature: PathSignature,

    /// Transform table JSON (defaults to the built-in table)
    #[arg(long)]
    table: Option<PathBuf>,
}

#[derive(Args)]
struct WalkArgs {
    #[command(flatten)]
    path: PathArgs,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ComposeArgs {
    #[command(flatten)]
    path: PathArgs,

    /// Base table JSON (defaults to the compiled-in table)
    #[arg(long)]
    base: Option<PathBuf>,

    /// Prefer the plain-language summaries
    #[arg(long)]
    plain: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ScenarioArgs {
    /// Hexagram number (1-64)
    #[arg(long = "hexagram", short = 'x')]
    hexagram: u32,

    /// Line position (1-6)
    #[arg(long, short = 'l')]
    line: u32,

    /// Single signature; all eight are listed when omitted
    #[arg(long, short = 's')]
    signature: Option<PathSignature>,

    /// Directory with the standard bundles
    #[arg(long, env = "HAQEI_BUNDLE_DIR", default_value = "public/data/scenario-db")]
    bundle_dir: PathBuf,

    /// Directory tried before the standard bundles
    #[arg(long, env = "HAQEI_EASY_BUNDLE_DIR")]
    easy_bundle_dir: Option<PathBuf>,

    /// Show the plain-language variant when an entry has one
    #[arg(long)]
    easy: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CoverageArgs {
    /// Authoring store (JSON map of narrative keys)
    #[arg(long)]
    store: PathBuf,

    /// Base table JSON (defaults to the compiled-in table)
    #[arg(long)]
    base: Option<PathBuf>,

    /// Also scan a compiled bundle directory
    #[arg(long)]
    bundle_dir: Option<PathBuf>,

    /// QA thresholds (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exit non-zero when any key or bundle item is missing
    #[arg(long)]
    fail_on_gap: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DupesArgs {
    /// Authoring store (JSON map of narrative keys)
    #[arg(long)]
    store: PathBuf,

    /// QA thresholds (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exit non-zero when anything is flagged
    #[arg(long)]
    fail_on_findings: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct LintArgs {
    /// Line-state table (JSON array of {name, text})
    #[arg(long)]
    states: PathBuf,

    /// QA thresholds (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exit non-zero when anything is flagged
    #[arg(long)]
    fail_on_findings: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct BackfillArgs {
    /// Authoring store; created when missing
    #[arg(long)]
    store: PathBuf,

    /// Base table JSON (defaults to the compiled-in table)
    #[arg(long)]
    base: Option<PathBuf>,

    /// Count what would be inserted without writing
    #[arg(long)]
    dry_run: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct BundleArgs {
    /// Authoring store (JSON map of narrative keys)
    #[arg(long)]
    store: PathBuf,

    /// Output directory for hex-{N}.json
    #[arg(long, env = "HAQEI_BUNDLE_DIR")]
    out: PathBuf,

    /// Fill missing keys with placeholders before bundling
    #[arg(long)]
    backfill: bool,

    /// Base table used by --backfill
    #[arg(long)]
    base: Option<PathBuf>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct VerifyTableArgs {
    /// Transform table JSON (defaults to the built-in table)
    #[arg(long)]
    table: Option<PathBuf>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

fn load_base(path: Option<&Path>) -> Result<BaseTable> {
    match path {
        Some(path) => BaseTable::load(path)
            .with_context(|| format!("Failed to load base table {}", path.display())),
        None => BaseTable::builtin().context("Built-in base table is invalid"),
    }
}

fn load_transforms(path: Option<&Path>) -> Result<TransformTable> {
    let Some(path) = path else {
        return Ok(TransformTable::king_wen());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transform table {}", path.display()))?;
    TransformTable::from_json(&raw)
        .with_context(|| format!("Invalid transform table {}", path.display()))
}

fn load_store(path: &Path) -> Result<NarrativeStore> {
    NarrativeStore::load(path)
        .with_context(|| format!("Failed to load narrative store {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<QaConfig> {
    QaConfig::load_or_default(path).context("Failed to load QA config")
}

fn start_line(hexagram: u32, line: u32) -> Result<LineRef> {
    LineRef::from_raw(hexagram, line).context("Invalid starting line")
}

/// Human label such as `乾為天 九五`
fn line_label(table: &HexagramTable, line: LineRef) -> String {
    format!("{} {}", table.name(line.hexagram), line.yao_label(table))
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    if cli.command.json() {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Walk(args) => run_walk(args)?,
        Commands::Compose(args) => run_compose(args)?,
        Commands::Scenario(args) => run_scenario(args).await?,
        Commands::Coverage(args) => run_coverage(args)?,
        Commands::Dupes(args) => run_dupes(args)?,
        Commands::Lint(args) => run_lint(args)?,
        Commands::Backfill(args) => run_backfill(args)?,
        Commands::Bundle(args) => run_bundle(args)?,
        Commands::VerifyTable(args) => run_verify_table(args)?,
    }

    Ok(())
}

#[derive(Serialize)]
struct WalkStep {
    #[serde(flatten)]
    step: Step,
    hexagram_name: &'static str,
    line_name: String,
}

#[derive(Serialize)]
struct WalkOutput {
    start: LineRef,
    signature: PathSignature,
    steps: Vec<WalkStep>,
    destination: LineRef,
}

fn run_walk(args: WalkArgs) -> Result<()> {
    let table = HexagramTable::king_wen();
    let start = start_line(args.path.hexagram, args.path.line)?;
    let walker = PathWalker::new(load_transforms(args.path.table.as_deref())?);
    let signature = args.path.signature;

    let steps: Vec<WalkStep> = walker
        .walk(start, signature)
        .into_iter()
        .map(|step| WalkStep {
            step,
            hexagram_name: table.name(step.hexagram),
            line_name: step.line_ref().yao_label(table),
        })
        .collect();
    let destination = steps[2].step.line_ref();

    if args.json {
        return print_json(&WalkOutput {
            start,
            signature,
            steps,
            destination,
        });
    }

    let mut out = format!("{} --{}-->\n", line_label(table, start), signature);
    for (i, step) in steps.iter().enumerate() {
        let action = match step.step.action {
            Action::Advance => "advance",
            Action::Transform => "transform",
        };
        out.push_str(&format!(
            "  {}. {:<9} {} {} ({})\n",
            i + 1,
            action,
            step.hexagram_name,
            step.line_name,
            step.step.line_ref()
        ));
    }
    print_stdout(out.trim_end())
}

#[derive(Serialize)]
struct ComposeOutput {
    #[serde(flatten)]
    narrative: ComposedNarrative,
    text: String,
}

fn run_compose(args: ComposeArgs) -> Result<()> {
    let start = start_line(args.path.hexagram, args.path.line)?;
    let walker = PathWalker::new(load_transforms(args.path.table.as_deref())?);
    let base = Arc::new(load_base(args.base.as_deref())?);
    let composer = NarrativeComposer::new(
        base,
        walker,
        ComposerOptions {
            prefer_plain: args.plain,
        },
    );

    let narrative = composer.compose_or_placeholder(start, args.path.signature);
    let text = narrative.text();
    if args.json {
        print_json(&ComposeOutput { narrative, text })
    } else {
        print_stdout(&text)
    }
}

#[derive(Serialize)]
struct ScenarioOutput {
    start: LineRef,
    entries: Vec<ResolvedEntry>,
    stats: ProviderStats,
}

async fn run_scenario(args: ScenarioArgs) -> Result<()> {
    let table = HexagramTable::king_wen();
    let start = start_line(args.hexagram, args.line)?;

    let mut config = ProviderConfig::new(&args.bundle_dir).prefer_easy(args.easy);
    if let Some(easy_root) = &args.easy_bundle_dir {
        config = config.with_easy_root(easy_root);
    }
    let provider = ScenarioDbProvider::from_fs(config);

    let entries = match args.signature {
        Some(signature) => provider.get(start, signature).await.into_iter().collect(),
        None => provider.get_all_for_start(start).await,
    };
    if entries.is_empty() {
        log::warn!(
            "No bundle entry for {} under {}",
            line_label(table, start),
            args.bundle_dir.display()
        );
    }

    if args.json {
        return print_json(&ScenarioOutput {
            start,
            entries,
            stats: provider.stats(),
        });
    }

    if entries.is_empty() {
        return print_stdout(PLACEHOLDER_TEXT);
    }
    let mut out = String::new();
    for entry in &entries {
        out.push_str(&format!("[{}] {}\n", entry.key.signature, entry.headline));
        for stage in entry.stages.as_array() {
            out.push_str(&format!("  - {stage}\n"));
        }
    }
    print_stdout(out.trim_end())
}

#[derive(Serialize)]
struct CoverageOutput {
    coverage: CoverageReport,
    bundles: Option<BundleCoverage>,
}

fn run_coverage(args: CoverageArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let base = load_base(args.base.as_deref())?;
    let store = load_store(&args.store)?;

    let coverage = check_coverage(&base, &store, config.coverage.missing_sample);
    let bundles = args
        .bundle_dir
        .as_deref()
        .map(|dir| {
            check_bundle_dir(dir)
                .with_context(|| format!("Failed to scan bundles in {}", dir.display()))
        })
        .transpose()?;
    let gap = coverage.has_gap() || bundles.as_ref().is_some_and(|b| !b.is_complete());

    if args.json {
        print_json(&CoverageOutput { coverage, bundles })?;
    } else {
        print_stdout(render_coverage_report(&coverage, bundles.as_ref()).trim_end())?;
    }

    if gap && args.fail_on_gap {
        std::process::exit(1);
    }
    Ok(())
}

fn run_dupes(args: DupesArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let store = load_store(&args.store)?;
    let report = check_duplication(store.iter(), &config.duplication);

    if args.json {
        print_json(&report)?;
    } else {
        print_stdout(render_duplication_report(&report).trim_end())?;
    }

    if !report.is_clean() && args.fail_on_findings {
        std::process::exit(1);
    }
    Ok(())
}

fn run_lint(args: LintArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let linter = StyleLinter::new(config.style).context("Invalid style config")?;
    let states = load_line_states(&args.states)
        .with_context(|| format!("Failed to load line states {}", args.states.display()))?;
    let report = linter.lint(&states);

    if args.json {
        print_json(&report)?;
    } else {
        print_stdout(render_style_report(&report).trim_end())?;
    }

    if !report.is_clean() && args.fail_on_findings {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Serialize)]
struct BackfillOutput {
    inserted: usize,
    total: usize,
    saved: bool,
}

fn run_backfill(args: BackfillArgs) -> Result<()> {
    let base = load_base(args.base.as_deref())?;
    let mut store = load_store(&args.store)?;
    let inserted = store.backfill_skeletons(&base);

    let saved = !args.dry_run && inserted > 0;
    if saved {
        store
            .save(&args.store)
            .with_context(|| format!("Failed to write {}", args.store.display()))?;
    }

    let output = BackfillOutput {
        inserted,
        total: store.len(),
        saved,
    };
    if args.json {
        print_json(&output)
    } else {
        print_stdout(&format!(
            "Inserted {} placeholders ({} entries total){}",
            output.inserted,
            output.total,
            if args.dry_run { ", dry run" } else { "" }
        ))
    }
}

#[derive(Serialize)]
struct BundleOutput {
    files: usize,
    entries: usize,
    out: PathBuf,
}

fn run_bundle(args: BundleArgs) -> Result<()> {
    let mut store = load_store(&args.store)?;
    if args.backfill {
        let base = load_base(args.base.as_deref())?;
        store.backfill_skeletons(&base);
    }

    let files = store
        .write_bundles(&args.out)
        .with_context(|| format!("Failed to write bundles to {}", args.out.display()))?;
    log::info!("Wrote {files} bundles to {}", args.out.display());

    let output = BundleOutput {
        files,
        entries: store.len(),
        out: args.out,
    };
    if args.json {
        print_json(&output)
    } else {
        print_stdout(&format!(
            "Wrote {} bundles ({} entries) to {}",
            output.files,
            output.entries,
            output.out.display()
        ))
    }
}

fn run_verify_table(args: VerifyTableArgs) -> Result<()> {
    let transforms = load_transforms(args.table.as_deref())?;
    let report = verify_transform_table(&transforms);

    if args.json {
        print_json(&report)?;
    } else {
        print_stdout(render_table_report(&report).trim_end())?;
    }

    if !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}
