use crate::error::{ChunkerError, Result};
use std::path::Path;

/// A split point in the recursive separator hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// Matched verbatim. The empty literal splits into single characters.
    Literal(&'static str),
    /// Matched as a regular expression
    Pattern(&'static str),
}

impl Separator {
    /// Regex source for this separator
    pub fn regex_source(self) -> String {
        match self {
            Self::Literal(text) => regex::escape(text),
            Self::Pattern(pattern) => pattern.to_string(),
        }
    }

    pub fn is_character_split(self) -> bool {
        matches!(self, Self::Literal(text) if text.is_empty())
    }
}

use Separator::{Literal as L, Pattern as P};

/// Generic prose splitter: paragraph > line > sentence > clause > word > character
const TEXT_SEPARATORS: &[Separator] = &[
    L("\n\n"),
    L("\n"),
    L(". "),
    L("! "),
    L("? "),
    L("; "),
    L(", "),
    L(" "),
    L(""),
];

const PYTHON_SEPARATORS: &[Separator] = &[
    L("\nclass "),
    L("\ndef "),
    L("\n\tdef "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const JS_SEPARATORS: &[Separator] = &[
    L("\nfunction "),
    L("\nconst "),
    L("\nlet "),
    L("\nvar "),
    L("\nclass "),
    L("\nif "),
    L("\nfor "),
    L("\nwhile "),
    L("\nswitch "),
    L("\ncase "),
    L("\ndefault "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const TS_SEPARATORS: &[Separator] = &[
    L("\nenum "),
    L("\ninterface "),
    L("\nnamespace "),
    L("\ntype "),
    L("\nclass "),
    L("\nfunction "),
    L("\nconst "),
    L("\nlet "),
    L("\nvar "),
    L("\nif "),
    L("\nfor "),
    L("\nwhile "),
    L("\nswitch "),
    L("\ncase "),
    L("\ndefault "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const JAVA_SEPARATORS: &[Separator] = &[
    L("\nclass "),
    L("\npublic "),
    L("\nprotected "),
    L("\nprivate "),
    L("\nstatic "),
    L("\nif "),
    L("\nfor "),
    L("\nwhile "),
    L("\nswitch "),
    L("\ncase "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const C_FAMILY_SEPARATORS: &[Separator] = &[
    L("\nclass "),
    L("\nvoid "),
    L("\nint "),
    L("\nfloat "),
    L("\ndouble "),
    L("\nif "),
    L("\nfor "),
    L("\nwhile "),
    L("\nswitch "),
    L("\ncase "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const CSHARP_SEPARATORS: &[Separator] = &[
    L("\ninterface "),
    L("\nenum "),
    L("\nimplements "),
    L("\ndelegate "),
    L("\nevent "),
    L("\nclass "),
    L("\nabstract "),
    L("\npublic "),
    L("\nprotected "),
    L("\nprivate "),
    L("\nstatic "),
    L("\nreturn "),
    L("\nif "),
    L("\ncontinue "),
    L("\nfor "),
    L("\nforeach "),
    L("\nwhile "),
    L("\nswitch "),
    L("\nbreak "),
    L("\ncase "),
    L("\nelse "),
    L("\ntry "),
    L("\nthrow "),
    L("\nfinally "),
    L("\ncatch "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const GO_SEPARATORS: &[Separator] = &[
    L("\nfunc "),
    L("\nvar "),
    L("\nconst "),
    L("\ntype "),
    L("\nif "),
    L("\nfor "),
    L("\nswitch "),
    L("\ncase "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const RUST_SEPARATORS: &[Separator] = &[
    L("\nfn "),
    L("\nconst "),
    L("\nlet "),
    L("\nif "),
    L("\nwhile "),
    L("\nfor "),
    L("\nloop "),
    L("\nmatch "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const RUBY_SEPARATORS: &[Separator] = &[
    L("\ndef "),
    L("\nclass "),
    L("\nif "),
    L("\nunless "),
    L("\nwhile "),
    L("\nfor "),
    L("\ndo "),
    L("\nbegin "),
    L("\nrescue "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const PHP_SEPARATORS: &[Separator] = &[
    L("\nfunction "),
    L("\nclass "),
    L("\nif "),
    L("\nforeach "),
    L("\nwhile "),
    L("\ndo "),
    L("\nswitch "),
    L("\ncase "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const SWIFT_SEPARATORS: &[Separator] = &[
    L("\nfunc "),
    L("\nclass "),
    L("\nstruct "),
    L("\nenum "),
    L("\nif "),
    L("\nfor "),
    L("\nwhile "),
    L("\ndo "),
    L("\nswitch "),
    L("\ncase "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const KOTLIN_SEPARATORS: &[Separator] = &[
    L("\nclass "),
    L("\npublic "),
    L("\nprotected "),
    L("\nprivate "),
    L("\ninternal "),
    L("\ncompanion "),
    L("\nfun "),
    L("\nval "),
    L("\nvar "),
    L("\nif "),
    L("\nfor "),
    L("\nwhile "),
    L("\nwhen "),
    L("\ncase "),
    L("\nelse "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const SCALA_SEPARATORS: &[Separator] = &[
    L("\nclass "),
    L("\nobject "),
    L("\ndef "),
    L("\nval "),
    L("\nvar "),
    L("\nif "),
    L("\nfor "),
    L("\nwhile "),
    L("\nmatch "),
    L("\ncase "),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

const HTML_SEPARATORS: &[Separator] = &[
    L("<body"),
    L("<div"),
    L("<p"),
    L("<br"),
    L("<li"),
    L("<h1"),
    L("<h2"),
    L("<h3"),
    L("<h4"),
    L("<h5"),
    L("<h6"),
    L("<span"),
    L("<table"),
    L("<tr"),
    L("<td"),
    L("<th"),
    L("<ul"),
    L("<ol"),
    L("<header"),
    L("<footer"),
    L("<nav"),
    L("<head"),
    L("<style"),
    L("<script"),
    L("<meta"),
    L("<title"),
    L(""),
];

const MARKDOWN_SEPARATORS: &[Separator] = &[
    P(r"\n#{1,6} "),
    L("```\n"),
    P(r"\n\*\*\*+\n"),
    P(r"\n---+\n"),
    P(r"\n___+\n"),
    L("\n\n"),
    L("\n"),
    L(" "),
    L(""),
];

/// Language registry entry, keyed by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    CSharp,
    Go,
    Rust,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Scala,
    Html,
    Markdown,
    /// Unrecognized extension, handled by the generic text splitter
    Text,
}

impl Language {
    pub const ALL: [Language; 17] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::CSharp,
        Language::Go,
        Language::Rust,
        Language::Ruby,
        Language::Php,
        Language::Swift,
        Language::Kotlin,
        Language::Scala,
        Language::Html,
        Language::Markdown,
        Language::Text,
    ];

    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "py" | "pyw" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            "scala" => Language::Scala,
            "html" | "htm" => Language::Html,
            "md" | "markdown" => Language::Markdown,
            _ => Language::Text,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Text)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::Html => "html",
            Language::Markdown => "markdown",
            Language::Text => "text",
        }
    }

    /// Recursive separator hierarchy, most structural first
    pub fn separators(self) -> &'static [Separator] {
        match self {
            Language::Python => PYTHON_SEPARATORS,
            Language::JavaScript => JS_SEPARATORS,
            Language::TypeScript => TS_SEPARATORS,
            Language::Java => JAVA_SEPARATORS,
            Language::C | Language::Cpp => C_FAMILY_SEPARATORS,
            Language::CSharp => CSHARP_SEPARATORS,
            Language::Go => GO_SEPARATORS,
            Language::Rust => RUST_SEPARATORS,
            Language::Ruby => RUBY_SEPARATORS,
            Language::Php => PHP_SEPARATORS,
            Language::Swift => SWIFT_SEPARATORS,
            Language::Kotlin => KOTLIN_SEPARATORS,
            Language::Scala => SCALA_SEPARATORS,
            Language::Html => HTML_SEPARATORS,
            Language::Markdown => MARKDOWN_SEPARATORS,
            Language::Text => TEXT_SEPARATORS,
        }
    }

    /// Check if this language has a tree-sitter grammar for the enhancement layer
    pub fn supports_ast(self) -> bool {
        matches!(
            self,
            Language::Rust | Language::Python | Language::JavaScript | Language::TypeScript
        )
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Language::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            _ => Err(ChunkerError::unsupported_language(self.as_str())),
        }
    }

    /// Line comment prefix used for synthesized summary lines
    pub fn line_comment(self) -> &'static str {
        match self {
            Language::Python | Language::Ruby => "#",
            Language::Html | Language::Markdown | Language::Text => "",
            _ => "//",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("PY"), Language::Python);
        assert_eq!(Language::from_extension("tsx"), Language::TypeScript);
        assert_eq!(Language::from_extension("jsx"), Language::JavaScript);
        assert_eq!(Language::from_extension("md"), Language::Markdown);
        assert_eq!(Language::from_extension("unknown"), Language::Text);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("src/main.rs"), Language::Rust);
        assert_eq!(Language::from_path("app/models.py"), Language::Python);
        assert_eq!(Language::from_path("Makefile"), Language::Text);
        assert_eq!(Language::from_path("notes.txt"), Language::Text);
    }

    #[test]
    fn test_every_hierarchy_ends_with_character_split() {
        for language in Language::ALL {
            let last = language.separators().last().copied();
            assert_eq!(last, Some(Separator::Literal("")), "{language:?}");
        }
    }

    #[test]
    fn test_only_empty_literal_is_character_split() {
        assert!(Separator::Literal("").is_character_split());
        assert!(!Separator::Literal(" ").is_character_split());
        assert!(!Separator::Pattern("").is_character_split());
    }

    #[test]
    fn test_text_hierarchy_order() {
        let seps = Language::Text.separators();
        assert_eq!(seps[0], Separator::Literal("\n\n"));
        assert_eq!(seps[1], Separator::Literal("\n"));
        assert_eq!(seps[2], Separator::Literal(". "));
    }

    #[test]
    fn test_tree_sitter_language() {
        assert!(Language::Rust.tree_sitter_language().is_ok());
        assert!(Language::Python.tree_sitter_language().is_ok());
        assert!(Language::TypeScript.tree_sitter_language().is_ok());
        assert!(Language::Go.tree_sitter_language().is_err());
        assert!(!Language::Text.supports_ast());
    }
}
