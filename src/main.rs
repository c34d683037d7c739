use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use promptpack::batcher::pack;
use promptpack::cache::TokenCostCache;
use promptpack::config::{load_config, TOKEN_LIMIT_MAX, TOKEN_LIMIT_MIN};
use promptpack::ignore_rules::IgnoreRules;
use promptpack::tokenizer::{HeuristicCounter, TokenCounter};
use promptpack::watcher::watch;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "promptpack")]
#[command(version)]
#[command(about = "Token-budgeted prompt batching for LLM context windows")]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Per-batch token limit (clamped to 2000-50000)
    #[arg(long)]
    limit: Option<usize>,

    /// Extra exclusion substrings on top of the configured set
    #[arg(long = "exclude", value_name = "SUBSTR")]
    exclude: Vec<String>,

    /// Explicit files to pack, in order (relative to the root or absolute)
    #[arg(long = "files", num_args = 1.., value_name = "PATH")]
    files: Option<Vec<PathBuf>>,

    /// Pack every cached file with one of these extensions (e.g. --ext rs ts)
    #[arg(long = "ext", num_args = 1.., value_name = "EXT")]
    ext: Option<Vec<String>>,

    /// List cached files with their token costs and exit
    #[arg(long)]
    list: bool,

    /// Print emitted batches to stdout as well
    #[arg(long)]
    stdout: bool,

    /// Keep running and fold filesystem changes into the cache
    #[arg(long)]
    watch: bool,
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb.set_message(msg.to_string());
    pb
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = match cli.root {
        Some(r) => r,
        None => std::env::current_dir().context("Failed to get current dir")?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("Root does not exist: {}", root.display()))?;

    let cfg = load_config(&root);
    let mut batch_cfg = cfg.batch.clone();
    if let Some(limit) = cli.limit {
        batch_cfg.token_limit = limit;
    }
    // The engine takes whatever it is given; the range is this caller's job.
    batch_cfg.token_limit = batch_cfg.token_limit.clamp(TOKEN_LIMIT_MIN, TOKEN_LIMIT_MAX);
    batch_cfg.exclusions.extend(cli.exclude);

    let counter = HeuristicCounter::new(cfg.tokenizer.chars_per_token);
    let rules = IgnoreRules::load(&root);

    let pb = spinner("caching tokens...");
    let cache = TokenCostCache::build(&root, &rules, &counter);
    pb.finish_with_message(format!("cached {} files", cache.len()));

    if cli.list {
        for (path, entry) in cache.files() {
            println!("{} ({} tokens)", path.display(), entry.tokens);
        }
        return Ok(());
    }

    let selected: Vec<PathBuf> = if let Some(files) = cli.files {
        files
            .into_iter()
            .map(|p| if p.is_absolute() { p } else { root.join(p) })
            .collect()
    } else if let Some(exts) = cli.ext {
        cache
            .files()
            .into_iter()
            .filter(|(path, _)| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| exts.iter().any(|x| x == e))
                    .unwrap_or(false)
            })
            .map(|(path, _)| path.to_path_buf())
            .collect()
    } else {
        cache.files().into_iter().map(|(path, _)| path.to_path_buf()).collect()
    };

    let report = pack(&selected, &cache, &counter, &batch_cfg)?;

    let out_dir = root.join(&cfg.output_dir);
    std::fs::create_dir_all(&out_dir)?;
    for (idx, batch) in report.batches.iter().enumerate() {
        std::fs::write(out_dir.join(format!("batch_{:03}.md", idx + 1)), &batch.text)?;
    }

    // Small meta file for UIs.
    let meta_json = json!({
        "tokenLimit": batch_cfg.token_limit,
        "totalTokens": report.total_tokens,
        "filesPacked": report.files_packed,
        "emittedBatches": report.batches.len(),
        "overBudgetBatches": report.over_budget.len(),
    });
    let _ = std::fs::write(
        out_dir.join("batches.meta.json"),
        serde_json::to_vec_pretty(&meta_json)?,
    );

    for batch in &report.over_budget {
        eprintln!(
            "[promptpack] batch of {} file(s) costs {} tokens (limit {}); computed but not emitted",
            batch.file_count, batch.token_count, batch_cfg.token_limit
        );
    }

    if cli.stdout {
        for batch in &report.batches {
            print!("{}", batch.text);
        }
    }
    eprintln!(
        "Wrote {} batch file(s) to {} ({} tokens across {} files)",
        report.batches.len(),
        out_dir.display(),
        report.total_tokens,
        report.files_packed
    );

    if cli.watch {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let shared = cache.into_shared();
            let rules = Arc::new(rules);
            let counter: Arc<dyn TokenCounter> =
                Arc::new(HeuristicCounter::new(cfg.tokenizer.chars_per_token));
            let handle = watch(&root, rules, shared, counter)?;
            eprintln!("[promptpack] watching {} (Ctrl+C to stop)", root.display());
            handle.run_to_completion().await;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
