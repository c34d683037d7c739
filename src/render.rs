use regex::Regex;
use std::sync::OnceLock;

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Block comments (non-greedy, spanning lines) and line comments to
        // end-of-line, in one pass. Applied uniformly regardless of the
        // file's actual language. A deliberate approximation: string
        // literals containing "//" lose their tail too.
        Regex::new(r"(?s:/\*.*?\*/)|//[^\n]*").unwrap()
    })
}

/// Remove every `/* ... */` and `// ...` span in one regex pass.
pub fn strip_comments(source: &str) -> String {
    comment_regex().replace_all(source, "").into_owned()
}

/// Render one file into its fenced, path-annotated block. The format is
/// byte-significant: it feeds the token counter and the output documents.
pub fn render_block(path_label: &str, source: &str, language: &str) -> String {
    format!(
        "\n---\n\n{}\n```{}\n{}\n```\n",
        path_label,
        language,
        strip_comments(source)
    )
}
