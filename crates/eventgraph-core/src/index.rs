//! The code index abstraction consumed by the pipeline.
//!
//! A [`CodeIndex`] answers four questions about an indexed codebase: where a
//! type lives, which members it has, who calls a member, and what generic
//! arguments are bound at a call. The pipeline never parses source itself, so
//! any backend (a language front-end, a precomputed snapshot) can drive it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Opaque handle for a type in the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(String);

impl TypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle for a member (method) in the index.
///
/// Handles are owned by the index; the pipeline only passes them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(String);

impl SymbolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A line/column range in a source file.
///
/// Lines and columns are 1-indexed; the end is inclusive for lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl LineSpan {
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// A span covering a single line.
    pub fn line(line: usize) -> Self {
        Self::new(line, 1, line, 1)
    }

    /// Returns true if the span starts and ends on the same line.
    pub fn is_single_line(&self) -> bool {
        self.start_line == self.end_line
    }
}

/// Renders `10` for a single-line span and `10-12` otherwise.
impl fmt::Display for LineSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.end_line <= self.start_line {
            write!(f, "{}", self.start_line)
        } else {
            write!(f, "{}-{}", self.start_line, self.end_line)
        }
    }
}

/// Where a reference occurs.
///
/// `file_path` is `None` when the index cannot attribute the location to a
/// source document (compiled metadata, generated code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub span: LineSpan,
}

impl Location {
    /// A location inside a source document.
    pub fn in_source(file_path: impl Into<String>, span: LineSpan) -> Self {
        Self {
            file_path: Some(file_path.into()),
            span,
        }
    }

    /// A location with no backing source document.
    pub fn outside_source(span: LineSpan) -> Self {
        Self {
            file_path: None,
            span,
        }
    }

    pub fn is_in_source(&self) -> bool {
        self.file_path.is_some()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file_path {
            Some(path) => write!(f, "{}:{}", path, self.span),
            None => write!(f, "<no source>:{}", self.span),
        }
    }
}

/// The member that contains a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallingContext {
    /// Simple name of the containing type.
    pub class_name: String,
    /// Name of the containing member (`.ctor`, `get_Name` and friends included).
    pub method_name: String,
    /// Assembly (project/package) the caller is compiled into.
    pub assembly_name: String,
}

impl CallingContext {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        assembly_name: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            assembly_name: assembly_name.into(),
        }
    }
}

/// One calling member and every location in it that invokes the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerInfo {
    pub context: CallingContext,
    pub locations: Vec<Location>,
}

/// The method actually bound at an invocation, with its generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMethodCall {
    /// Name of the invoked method.
    pub method_name: String,
    /// Names of the type arguments bound at this call, in declaration order.
    #[serde(default)]
    pub type_arguments: Vec<String>,
}

impl ResolvedMethodCall {
    pub fn new(method_name: impl Into<String>, type_arguments: Vec<String>) -> Self {
        Self {
            method_name: method_name.into(),
            type_arguments,
        }
    }
}

/// Size information reported by an index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Backend name for display (`csharp`, `snapshot`).
    pub backend: String,
    pub documents: usize,
    pub types: usize,
}

/// Query capability over an indexed codebase.
///
/// Implementations must tolerate concurrent queries; the collector issues
/// caller lookups for independent symbols at the same time.
#[async_trait]
pub trait CodeIndex: Send + Sync {
    /// Look a type up by its fully qualified name (`Core.Events.EventBus`).
    async fn find_type_by_full_name(&self, full_name: &str) -> Option<TypeId>;

    /// All members of `ty` named `member_name`, overloads included, in
    /// declaration order.
    async fn members_by_name(&self, ty: &TypeId, member_name: &str) -> Vec<SymbolId>;

    /// Every member that invokes `symbol`, with the invoking locations.
    ///
    /// An error here is scoped to this one symbol.
    async fn find_callers_of(&self, symbol: &SymbolId) -> Result<Vec<CallerInfo>, IndexError>;

    /// Re-resolve the invocation at `location` to the method bound there.
    ///
    /// Returns `None` when the location has no document, no invocation, or
    /// no resolvable method.
    async fn resolve_invocation_at(&self, location: &Location) -> Option<ResolvedMethodCall>;

    fn summary(&self) -> IndexSummary;
}

/// Thread-safe shared index handle.
pub type SharedIndex = Arc<dyn CodeIndex>;
