use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::{Chunk, DefinitionKind};
use tree_sitter::{Node, Parser};

/// A top-level definition recognised in a syntax tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub name: String,
    /// Cleaned docstring or doc comment, if any
    pub docstring: Option<String>,
}

impl Definition {
    /// Text that identifies this definition inside a chunk, e.g. `def load`
    pub fn signature(&self, language: Language) -> String {
        let keyword = match (self.kind, language) {
            (DefinitionKind::Function, Language::Python) => "def",
            (DefinitionKind::Function, Language::Rust) => "fn",
            (DefinitionKind::Function, _) => "function",
            (kind, _) => kind.as_str(),
        };
        format!("{keyword} {}", self.name)
    }

    fn summary_line(&self) -> Option<&str> {
        self.docstring
            .as_deref()
            .and_then(|doc| doc.lines().map(str::trim).find(|line| !line.is_empty()))
    }
}

/// AST-based analyzer for the definition enhancement layer
pub struct AstAnalyzer {
    parser: Parser,
    language: Language,
}

impl AstAnalyzer {
    /// Create new AST analyzer for a language
    pub fn new(language: Language) -> Result<Self> {
        if !language.supports_ast() {
            return Err(ChunkerError::unsupported_language(language.as_str()));
        }

        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ChunkerError::parse(language.as_str(), e))?;

        Ok(Self { parser, language })
    }

    /// Parse source and collect its top-level definitions.
    ///
    /// Trees containing syntax errors still yield whatever definitions were recognised.
    pub fn definitions(&mut self, content: &str) -> Result<Vec<Definition>> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| ChunkerError::parse(self.language.as_str(), "parser returned no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            log::debug!(
                "{} source has syntax errors, using recognised definitions only",
                self.language.as_str()
            );
        }

        let mut definitions = Vec::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            let found = match self.language {
                Language::Python => Self::python_definition(content, child),
                Language::Rust => Self::rust_definition(content, child),
                Language::JavaScript | Language::TypeScript => Self::js_definition(content, child),
                _ => None,
            };
            definitions.extend(found);
        }

        Ok(definitions)
    }

    /// Attach definition metadata to the first chunk containing each signature and
    /// prepend a docstring summary when the chunk does not already show it.
    ///
    /// A later definition matching the same chunk overwrites the definition fields.
    pub fn enhance(&self, chunks: &mut [Chunk], definitions: &[Definition]) {
        let originals: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let prefix = self.language.line_comment();

        for definition in definitions {
            let signature = definition.signature(self.language);
            let Some(idx) = originals.iter().position(|text| text.contains(&signature)) else {
                continue;
            };

            let chunk = &mut chunks[idx];
            let meta = &mut chunk.metadata;
            meta.definition_type = Some(definition.kind);
            meta.definition_name = Some(definition.name.clone());
            meta.has_docstring = Some(definition.docstring.is_some());
            if definition.kind.is_function() {
                meta.function_name = Some(definition.name.clone());
            } else {
                meta.class_name = Some(definition.name.clone());
            }

            if let Some(line) = definition.summary_line() {
                if !originals[idx].contains(line) {
                    chunk.text = format!("{prefix} {}: {line}\n\n{}", definition.name, chunk.text);
                }
            }
        }
    }

    fn python_definition(content: &str, node: Node) -> Option<Definition> {
        let node = if node.kind() == "decorated_definition" {
            node.child_by_field_name("definition")?
        } else {
            node
        };

        let kind = match node.kind() {
            "function_definition" => DefinitionKind::Function,
            "class_definition" => DefinitionKind::Class,
            _ => return None,
        };

        let name = node_text(content, node.child_by_field_name("name")?).to_string();
        let docstring = node
            .child_by_field_name("body")
            .and_then(|body| Self::python_docstring(content, body));

        Some(Definition {
            kind,
            name,
            docstring,
        })
    }

    /// First statement of a block, when it is a bare string literal
    fn python_docstring(content: &str, body: Node) -> Option<String> {
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let literal = first.named_child(0)?;
        if literal.kind() != "string" {
            return None;
        }
        let cleaned = clean_docstring(strip_string_quotes(node_text(content, literal)));
        (!cleaned.is_empty()).then_some(cleaned)
    }

    fn rust_definition(content: &str, node: Node) -> Option<Definition> {
        let kind = match node.kind() {
            "function_item" => DefinitionKind::Function,
            "struct_item" => DefinitionKind::Struct,
            "enum_item" => DefinitionKind::Enum,
            "trait_item" => DefinitionKind::Trait,
            _ => return None,
        };

        let name = node_text(content, node.child_by_field_name("name")?).to_string();
        let docstring = doc_comment_above(content, node.start_position().row, Language::Rust);

        Some(Definition {
            kind,
            name,
            docstring,
        })
    }

    fn js_definition(content: &str, node: Node) -> Option<Definition> {
        // Doc comments sit above `export`, so remember the outer row
        let doc_row = node.start_position().row;
        let inner = if node.kind() == "export_statement" {
            node.child_by_field_name("declaration")?
        } else {
            node
        };

        let kind = match inner.kind() {
            "function_declaration" | "generator_function_declaration" => DefinitionKind::Function,
            "class_declaration" | "abstract_class_declaration" => DefinitionKind::Class,
            "interface_declaration" => DefinitionKind::Interface,
            "enum_declaration" => DefinitionKind::Enum,
            _ => return None,
        };

        let name = node_text(content, inner.child_by_field_name("name")?).to_string();
        let docstring = doc_comment_above(content, doc_row, Language::JavaScript);

        Some(Definition {
            kind,
            name,
            docstring,
        })
    }
}

fn node_text<'a>(content: &'a str, node: Node) -> &'a str {
    content.get(node.start_byte()..node.end_byte()).unwrap_or_default()
}

fn strip_string_quotes(literal: &str) -> &str {
    let body = literal.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    body
}

/// Trim the first line, dedent the rest by their common indentation, drop blank edges
fn clean_docstring(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };

    let margin = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned = vec![first.trim().to_string()];
    cleaned.extend(rest.iter().map(|line| {
        line.get(margin..).unwrap_or_else(|| line.trim_start()).trim_end().to_string()
    }));

    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    cleaned.join("\n")
}

/// Collect the doc comment block ending directly above `row`.
///
/// Rust: consecutive `///` lines (attributes may sit in between).
/// JavaScript/TypeScript: a `/** ... */` block.
fn doc_comment_above(content: &str, row: usize, language: Language) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();
    if row == 0 || row > lines.len() {
        return None;
    }

    let mut doc_lines = Vec::new();
    let mut idx = row;
    match language {
        Language::Rust => {
            while idx > 0 {
                idx -= 1;
                let line = lines[idx].trim();
                if let Some(text) = line.strip_prefix("///") {
                    doc_lines.push(text.trim().to_string());
                } else if line.starts_with("#[") {
                    continue;
                } else {
                    break;
                }
            }
        }
        _ => {
            if !lines[row - 1].trim().ends_with("*/") {
                return None;
            }
            loop {
                if idx == 0 {
                    return None;
                }
                idx -= 1;
                let line = lines[idx].trim();
                let opening = line.starts_with("/**");
                if !opening && line.starts_with("/*") {
                    return None;
                }
                let text = line
                    .trim_start_matches("/**")
                    .trim_end_matches("*/")
                    .trim_start_matches('*')
                    .trim();
                doc_lines.push(text.to_string());
                if opening {
                    break;
                }
            }
        }
    }

    doc_lines.reverse();
    let doc = clean_docstring(&doc_lines.join("\n"));
    (!doc.is_empty()).then_some(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use pretty_assertions::assert_eq;

    fn chunk(text: &str) -> Chunk {
        Chunk::new(text.to_string(), ChunkMetadata::default())
    }

    #[test]
    fn test_python_definitions() {
        let code = r#"import os

@cached
def load(path):
    """Load a file.

    Longer description.
    """
    return open(path)

class Store:
    pass
"#;
        let mut analyzer = AstAnalyzer::new(Language::Python).unwrap();
        let defs = analyzer.definitions(code).unwrap();

        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "load");
        assert_eq!(defs[0].kind, DefinitionKind::Function);
        assert_eq!(
            defs[0].docstring.as_deref(),
            Some("Load a file.\n\nLonger description.")
        );
        assert_eq!(defs[1].name, "Store");
        assert_eq!(defs[1].kind, DefinitionKind::Class);
        assert_eq!(defs[1].docstring, None);
    }

    #[test]
    fn test_rust_doc_comments() {
        let code = r#"use std::fmt;

/// Parses a thing.
/// Second line.
#[inline]
pub fn parse() {}

struct Bare;

/// Shape kinds
enum Shape { Circle }
"#;
        let mut analyzer = AstAnalyzer::new(Language::Rust).unwrap();
        let defs = analyzer.definitions(code).unwrap();

        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["parse", "Bare", "Shape"]);
        assert_eq!(
            defs[0].docstring.as_deref(),
            Some("Parses a thing.\nSecond line.")
        );
        assert_eq!(defs[1].docstring, None);
        assert_eq!(defs[2].kind, DefinitionKind::Enum);
        assert_eq!(defs[0].signature(Language::Rust), "fn parse");
    }

    #[test]
    fn test_typescript_exported_declarations() {
        let code = r#"/**
 * Greets someone.
 */
export function greet(name: string) {
  return `hi ${name}`;
}

export interface Options { verbose: boolean }
"#;
        let mut analyzer = AstAnalyzer::new(Language::TypeScript).unwrap();
        let defs = analyzer.definitions(code).unwrap();

        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "greet");
        assert_eq!(defs[0].docstring.as_deref(), Some("Greets someone."));
        assert_eq!(defs[1].kind, DefinitionKind::Interface);
        assert_eq!(defs[1].signature(Language::TypeScript), "interface Options");
    }

    #[test]
    fn test_enhance_prepends_summary_once() {
        let analyzer = AstAnalyzer::new(Language::Python).unwrap();
        let defs = vec![Definition {
            kind: DefinitionKind::Function,
            name: "load".to_string(),
            docstring: Some("Load a file.".to_string()),
        }];

        let mut chunks = vec![chunk("def load(path):\n    return 1"), chunk("def load(x): pass")];
        analyzer.enhance(&mut chunks, &defs);

        assert_eq!(chunks[0].text, "# load: Load a file.\n\ndef load(path):\n    return 1");
        assert_eq!(chunks[0].metadata.function_name.as_deref(), Some("load"));
        assert_eq!(chunks[0].metadata.has_docstring, Some(true));
        // First containing chunk wins
        assert_eq!(chunks[1].metadata.definition_name, None);
    }

    #[test]
    fn test_enhance_skips_summary_already_present() {
        let analyzer = AstAnalyzer::new(Language::Python).unwrap();
        let defs = vec![Definition {
            kind: DefinitionKind::Function,
            name: "load".to_string(),
            docstring: Some("Load a file.".to_string()),
        }];

        let text = "def load(path):\n    \"\"\"Load a file.\"\"\"\n    return 1";
        let mut chunks = vec![chunk(text)];
        analyzer.enhance(&mut chunks, &defs);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_last_definition_wins_on_shared_chunk() {
        let analyzer = AstAnalyzer::new(Language::Python).unwrap();
        let defs = vec![
            Definition {
                kind: DefinitionKind::Class,
                name: "Store".to_string(),
                docstring: None,
            },
            Definition {
                kind: DefinitionKind::Function,
                name: "helper".to_string(),
                docstring: None,
            },
        ];

        let mut chunks = vec![chunk("class Store:\n    pass\n\ndef helper():\n    pass")];
        analyzer.enhance(&mut chunks, &defs);

        let meta = &chunks[0].metadata;
        assert_eq!(meta.definition_name.as_deref(), Some("helper"));
        assert_eq!(meta.definition_type, Some(DefinitionKind::Function));
        assert_eq!(meta.class_name.as_deref(), Some("Store"));
        assert_eq!(meta.has_docstring, Some(false));
    }

    #[test]
    fn test_broken_python_keeps_recognised_definitions() {
        let code = "def ok():\n    return 1\n\ndef broken(:\n";
        let mut analyzer = AstAnalyzer::new(Language::Python).unwrap();
        let defs = analyzer.definitions(code).unwrap();
        assert!(defs.iter().any(|d| d.name == "ok"));
    }

    #[test]
    fn test_unsupported_language() {
        assert!(AstAnalyzer::new(Language::Go).is_err());
    }
}
