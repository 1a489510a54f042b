//! Tree-sitter based C# parser.
//!
//! Wraps a `tree_sitter::Parser` configured for the C# grammar and owns the
//! parsed source so nodes can be read back as text.

use std::path::Path;

use eventgraph_core::LineSpan;
use thiserror::Error;

/// Errors that can occur during parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse source code")]
    ParseFailed,

    #[error("Failed to set parser language: {0}")]
    LanguageError(String),

    #[error("Failed to compile query: {0}")]
    QueryError(String),
}

/// The tree-sitter language for C#.
pub fn language() -> tree_sitter::Language {
    tree_sitter_c_sharp::LANGUAGE.into()
}

/// A parsed source file with its AST.
pub struct ParsedFile {
    /// The tree-sitter syntax tree.
    pub tree: tree_sitter::Tree,
    /// The source code (owned for lifetime management).
    pub source: String,
}

impl ParsedFile {
    /// Get the root node of the syntax tree.
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Get the source code as bytes.
    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// Get text for a node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node_text(node, &self.source)
    }
}

/// Text of `node` within `source`, empty when the range is not valid UTF-8.
pub fn node_text<'s>(node: tree_sitter::Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// 1-based line/column span of a node.
pub fn span(node: tree_sitter::Node) -> LineSpan {
    let start = node.start_position();
    let end = node.end_position();
    LineSpan::new(start.row + 1, start.column + 1, end.row + 1, end.column + 1)
}

/// C# source parser.
pub struct Parser {
    ts_parser: tree_sitter::Parser,
}

impl Parser {
    pub fn new() -> Result<Self, ParseError> {
        let mut ts_parser = tree_sitter::Parser::new();
        ts_parser
            .set_language(&language())
            .map_err(|e| ParseError::LanguageError(e.to_string()))?;
        Ok(Self { ts_parser })
    }

    /// Parse a file from the filesystem.
    pub fn parse_file(&mut self, path: &Path) -> Result<ParsedFile, ParseError> {
        let source = std::fs::read_to_string(path)?;
        self.parse_source(source)
    }

    /// Parse a source string.
    pub fn parse_source(&mut self, source: impl Into<String>) -> Result<ParsedFile, ParseError> {
        let source = source.into();
        let tree = self
            .ts_parser
            .parse(&source, None)
            .ok_or(ParseError::ParseFailed)?;
        Ok(ParsedFile { tree, source })
    }
}
