//! Source discovery and document loading.
//!
//! Walks a root directory for C# sources and turns each readable file into a
//! [`Document`]. `.gitignore` and `.eventgraphignore` files apply at every
//! level of the tree, scoped to the directory that holds them. Hidden entries
//! and excluded directory names are never entered. Unreadable or unparsable
//! files are logged and skipped; a root without any document is an error.

use std::path::{Component, Path, PathBuf};

use eventgraph_core::IndexError;
use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::assembly::AssemblyResolver;
use crate::document::Document;
use crate::parser::Parser;

/// Name of the project-specific ignore file, read wherever a `.gitignore` would be.
pub const IGNORE_FILE: &str = ".eventgraphignore";

/// Options controlling what gets indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// File extensions to index, without the dot.
    pub extensions: Vec<String>,
    /// Directory names skipped anywhere in the tree.
    pub exclude_dirs: Vec<String>,
    /// Whether to respect `.gitignore` and `.eventgraphignore`.
    pub respect_gitignore: bool,
    /// Assembly for files outside any `.asmdef`/`.csproj` directory.
    pub default_assembly: String,
    /// Only calls made from this assembly are reported.
    pub project: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["cs".to_string()],
            exclude_dirs: ["Library", "Temp", "Logs", "obj", "bin"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            respect_gitignore: true,
            default_assembly: "Assembly-CSharp".to_string(),
            project: None,
        }
    }
}

impl LoadOptions {
    fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
    }
}

/// Path of `path` relative to `root`, `/`-separated.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Every source file under `root`, sorted by path.
pub fn discover_sources(root: &Path, options: &LoadOptions) -> Result<Vec<PathBuf>, IndexError> {
    if root.is_file() {
        return if options.is_source(root) {
            Ok(vec![root.to_path_buf()])
        } else {
            Err(IndexError::Load {
                path: root.to_path_buf(),
                reason: "not a C# source file".to_string(),
            })
        };
    }
    if !root.is_dir() {
        return Err(IndexError::Load {
            path: root.to_path_buf(),
            reason: "no such directory".to_string(),
        });
    }

    let mut walker = WalkBuilder::new(root);
    walker
        .hidden(true)
        .parents(false)
        .ignore(false)
        .git_ignore(options.respect_gitignore)
        .git_global(false)
        .git_exclude(false)
        .require_git(false);
    if options.respect_gitignore {
        walker.add_custom_ignore_filename(IGNORE_FILE);
    }

    let exclude_dirs = options.exclude_dirs.clone();
    walker.filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        let excluded = entry
            .file_name()
            .to_str()
            .is_some_and(|name| exclude_dirs.iter().any(|x| x == name));
        entry.depth() == 0 || !(is_dir && excluded)
    });

    let mut sources = Vec::new();
    for entry in walker.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable path during discovery");
                continue;
            }
        };
        let is_file = entry.file_type().is_some_and(|t| t.is_file());
        if is_file && options.is_source(entry.path()) {
            sources.push(entry.into_path());
        }
    }
    sources.sort();
    Ok(sources)
}

/// Discover, parse and extract every document under `root`.
pub fn load_documents(root: &Path, options: &LoadOptions) -> Result<Vec<Document>, IndexError> {
    let sources = discover_sources(root, options)?;
    let base = if root.is_file() {
        root.parent().unwrap_or(root)
    } else {
        root
    };

    let mut parser = Parser::new().map_err(|e| IndexError::Load {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut assemblies = AssemblyResolver::new(base, options.default_assembly.clone());
    let mut documents = Vec::with_capacity(sources.len());

    for path in &sources {
        let parsed = match parser.parse_file(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable source file");
                continue;
            }
        };
        if parsed.root_node().has_error() {
            debug!(path = %path.display(), "Source has syntax errors, indexing what parsed");
        }

        let assembly = assemblies.assembly_for(path);
        match Document::extract(relative_path(base, path), assembly, &parsed) {
            Ok(doc) => documents.push(doc),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping source file"),
        }
    }

    if documents.is_empty() {
        return Err(IndexError::NoDocuments(root.to_path_buf()));
    }

    info!(
        root = %root.display(),
        documents = documents.len(),
        "Loaded source documents"
    );
    Ok(documents)
}
