/// Injected token-costing function. The engine treats it as an opaque black
/// box: deterministic, pure over the input string, non-negative. Nothing else
/// is assumed (in particular, no monotonicity in string length).
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Plain function pointers count too, which keeps test fixtures cheap.
impl TokenCounter for fn(&str) -> usize {
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Default counter: bytes-per-token heuristic (~4 chars/token, bytes used as
/// a proxy for chars). Cheap enough to run over every file on every cache
/// build without a vocabulary download.
#[derive(Debug, Clone)]
pub struct HeuristicCounter {
    chars_per_token: usize,
}

impl HeuristicCounter {
    pub fn new(chars_per_token: usize) -> Self {
        Self { chars_per_token }
    }
}

impl Default for HeuristicCounter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        if self.chars_per_token == 0 {
            return text.len();
        }
        ((text.len() as f64) / (self.chars_per_token as f64)).ceil() as usize
    }
}

/// Real BPE counting (GPT-2-style vocabularies) backed by a HuggingFace
/// `tokenizer.json`. Behind the `bpe` feature so the default build stays
/// dependency-light.
#[cfg(feature = "bpe")]
pub struct BpeCounter {
    inner: tokenizers::Tokenizer,
}

#[cfg(feature = "bpe")]
impl BpeCounter {
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("loading tokenizer {}: {e}", path.display()))?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "bpe")]
impl TokenCounter for BpeCounter {
    fn count(&self, text: &str) -> usize {
        self.inner
            .encode(text, false)
            .map(|enc| enc.get_ids().len())
            .unwrap_or(0)
    }
}
