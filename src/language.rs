/// Fixed extension → language-name table used both for fenced-block labels
/// and for the preamble's language list.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let name = match ext {
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "py" => "Python",
        "java" => "Java",
        "c" => "C",
        "cpp" => "C++",
        "cs" => "C#",
        "go" => "Go",
        "rb" => "Ruby",
        "php" => "PHP",
        "kt" => "Kotlin",
        "swift" => "Swift",
        "rs" => "Rust",
        "lua" => "Lua",
        "r" => "R",
        "sh" => "Shell",
        "pl" => "Perl",
        "m" => "Objective-C",
        "html" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "json" => "JSON",
        "xml" => "XML",
        "md" => "Markdown",
        "sql" => "SQL",
        "yml" | "yaml" => "YAML",
        _ => return None,
    };
    Some(name)
}

/// Total classification: mapped language name, or the extension itself
/// verbatim for anything unmapped. Never fails.
pub fn classify(ext: &str) -> String {
    language_for_extension(ext)
        .map(str::to_string)
        .unwrap_or_else(|| ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_extensions_resolve_to_language_names() {
        assert_eq!(classify("js"), "JavaScript");
        assert_eq!(classify("rs"), "Rust");
        assert_eq!(classify("cpp"), "C++");
        assert_eq!(classify("yml"), "YAML");
        assert_eq!(classify("yaml"), "YAML");
    }

    #[test]
    fn unknown_extension_falls_back_to_identity() {
        assert_eq!(classify("zig"), "zig");
        assert_eq!(classify("conf"), "conf");
        // Totality: even the empty extension classifies (to the empty string).
        assert_eq!(classify(""), "");
    }
}
