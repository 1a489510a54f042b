//! Assembly attribution for source files.
//!
//! A file belongs to the assembly declared by the nearest enclosing
//! directory that holds a Unity assembly definition (`*.asmdef`, its JSON
//! `name`) or an MSBuild project (`*.csproj`, its file stem). Files with no
//! such ancestor inside the root fall into the default assembly, or its
//! `-Editor` variant under an `Editor` folder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct AssemblyDefinition {
    name: String,
}

/// Resolves and caches the assembly of each directory under a root.
#[derive(Debug)]
pub struct AssemblyResolver {
    root: PathBuf,
    default_assembly: String,
    declared: HashMap<PathBuf, Option<String>>,
}

impl AssemblyResolver {
    pub fn new(root: &Path, default_assembly: impl Into<String>) -> Self {
        Self {
            root: root.to_path_buf(),
            default_assembly: default_assembly.into(),
            declared: HashMap::new(),
        }
    }

    /// Assembly for a file under the root.
    pub fn assembly_for(&mut self, file: &Path) -> String {
        let mut dir = file.parent();
        while let Some(current) = dir {
            if !current.starts_with(&self.root) {
                break;
            }
            if let Some(name) = self.declared_in(current) {
                return name;
            }
            if current == self.root {
                break;
            }
            dir = current.parent();
        }

        let under_editor = file
            .strip_prefix(&self.root)
            .unwrap_or(file)
            .components()
            .any(|c| c.as_os_str() == "Editor");
        if under_editor {
            format!("{}-Editor", self.default_assembly)
        } else {
            self.default_assembly.clone()
        }
    }

    fn declared_in(&mut self, dir: &Path) -> Option<String> {
        if let Some(cached) = self.declared.get(dir) {
            return cached.clone();
        }
        let found = read_declaration(dir);
        self.declared.insert(dir.to_path_buf(), found.clone());
        found
    }
}

fn read_declaration(dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let with_extension = |ext: &str| {
        files
            .iter()
            .find(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)))
            .cloned()
    };

    if let Some(asmdef) = with_extension("asmdef") {
        return Some(asmdef_name(&asmdef));
    }
    with_extension("csproj").and_then(|p| stem(&p))
}

fn asmdef_name(path: &Path) -> String {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| {
            serde_json::from_str::<AssemblyDefinition>(&text).map_err(|e| e.to_string())
        });
    match parsed {
        Ok(def) if !def.name.trim().is_empty() => def.name,
        Ok(_) => stem(path).unwrap_or_default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable assembly definition, using file name");
            stem(path).unwrap_or_default()
        }
    }
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}
