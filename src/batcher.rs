use crate::cache::{modified_ns_of, TokenCostCache};
use crate::config::BatchConfig;
use crate::language::classify;
use crate::render::render_block;
use crate::tokenizer::TokenCounter;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Batching engine — greedy, single forward pass, order-preserving.
//
// Selected paths are rendered in the given order and appended to the current
// batch; when the running cost would cross the limit the batch is closed and
// a new one starts. A lone file whose own cost exceeds the limit gets its own
// batch. After assembly each batch's true cost (preamble + block boundaries
// included) is recounted; over-limit batches are withheld from emission but
// still reported. Nothing is silently dropped and nothing is split.
//
// The pass is inherently sequential (batch boundaries depend on accumulated
// state) and never mutates the cache it reads.
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PackError {
    /// Cumulative byte size of the selection crossed the hard cap. The whole
    /// operation aborts; no partial batches exist.
    #[error("selected files total {total_bytes} bytes, over the {cap_bytes} byte cap")]
    InputTooLarge { total_bytes: u64, cap_bytes: u64 },
}

/// One self-contained output document.
#[derive(Debug, Clone)]
pub struct Batch {
    pub text: String,
    /// True token cost of `text`, preamble included where applicable.
    pub token_count: usize,
    pub file_count: usize,
}

#[derive(Debug, Default)]
pub struct PackReport {
    /// Batches within budget, in selection order.
    pub batches: Vec<Batch>,
    /// Assembled batches whose true cost exceeds the limit: counted and
    /// surfaced as diagnostics, not emitted.
    pub over_budget: Vec<Batch>,
    /// Sum of per-block costs across every processed file.
    pub total_tokens: usize,
    pub files_packed: usize,
}

pub fn pack(
    selected: &[PathBuf],
    cache: &TokenCostCache,
    counter: &dyn TokenCounter,
    cfg: &BatchConfig,
) -> Result<PackReport, PackError> {
    let mut raw_batches: Vec<(String, usize)> = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0usize;
    let mut current_files = 0usize;
    let mut total_tokens = 0usize;
    let mut total_bytes = 0u64;
    let mut files_packed = 0usize;
    // First-seen order, deduplicated; feeds the preamble.
    let mut languages: Vec<String> = Vec::new();

    for path in selected {
        let label = path.display().to_string();
        if cfg.exclusions.iter().any(|ex| label.contains(ex)) {
            continue;
        }
        // Vanished paths and anything without a regular backing file are
        // silent skips, not errors.
        let meta = match std::fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };

        total_bytes += meta.len();
        if total_bytes > cfg.size_cap_bytes {
            return Err(PackError::InputTooLarge {
                total_bytes,
                cap_bytes: cfg.size_cap_bytes,
            });
        }

        let raw = match std::fs::read(path) {
            Ok(b) => b,
            Err(_) => continue,
        };
        let content =
            String::from_utf8(raw).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).to_string());
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let language = classify(extension);
        if !languages.contains(&language) {
            languages.push(language.clone());
        }
        let block = render_block(&label, &content, &language);

        // Cached cost when the entry still matches the on-disk stat
        // signature; recompute locally otherwise. The cache is never written
        // from here.
        let cost = match cache.get(path) {
            Some(entry) if entry.size == meta.len() && entry.modified_ns == modified_ns_of(&meta) => {
                entry.tokens
            }
            _ => counter.count(&block),
        };
        total_tokens += cost;
        files_packed += 1;

        if current_tokens + cost > cfg.token_limit && !current.is_empty() {
            raw_batches.push((std::mem::take(&mut current), current_files));
            current_tokens = 0;
            current_files = 0;
        }
        current.push_str(&block);
        current_tokens += cost;
        current_files += 1;
    }

    if !current.is_empty() {
        raw_batches.push((current, current_files));
    }

    let mut report = PackReport {
        total_tokens,
        files_packed,
        ..Default::default()
    };
    if raw_batches.is_empty() {
        return Ok(report);
    }

    let preamble = format!(
        "The following are the various {} code files for a project. Each relative file path will be listed, followed by the file contents of that code file in a block:\n\n",
        languages.join(", ")
    );

    for (idx, (text, file_count)) in raw_batches.into_iter().enumerate() {
        let full = if idx == 0 { format!("{preamble}{text}") } else { text };
        let token_count = counter.count(&full);
        let batch = Batch {
            token_count,
            file_count,
            text: full,
        };
        if batch.token_count <= cfg.token_limit {
            report.batches.push(batch);
        } else {
            report.over_budget.push(batch);
        }
    }

    Ok(report)
}
