//! eventgraph-csharp: a C# source index for the eventgraph pipeline.
//!
//! Parses C# sources with tree-sitter, extracts declarations and
//! invocations, and binds calls to declared methods by name, reachability
//! and arity. The resulting [`SourceIndex`] implements
//! [`eventgraph_core::CodeIndex`].

pub mod assembly;
pub mod document;
pub mod index;
pub mod loader;
pub mod parser;
pub mod syntax;

pub use assembly::AssemblyResolver;
pub use document::{Document, Invocation, MethodDecl, TypeDecl, Using, UsingDirective};
pub use index::{BACKEND, SourceIndex};
pub use loader::{IGNORE_FILE, LoadOptions, discover_sources, load_documents, relative_path};
pub use parser::{ParseError, ParsedFile, Parser};
