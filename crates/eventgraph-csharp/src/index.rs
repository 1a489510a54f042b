//! [`CodeIndex`] over C# sources.
//!
//! All binding happens at load time: every invocation is matched against
//! the declared methods of the types it could target, and the bound callers
//! and type arguments are stored for lookup. Binding is name-based:
//!
//! - the invoked name must match a declared method name;
//! - the target type must be reachable from the calling document (declared
//!   there, in an enclosing namespace, or brought in by a using directive);
//! - a receiver whose declared type is known must name the target type, and
//!   a receiver written as a type name must name the target type itself;
//! - targets the receiver names exactly are tried before targets that are
//!   merely visible;
//! - the first overload, in declaration order, whose type-parameter count
//!   and parameter count accept the call wins.
//!
//! Type arguments come from the explicit `<...>` list, or are inferred from
//! `new T(...)` arguments passed to parameters typed by a method type
//! parameter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eventgraph_core::{
    CallerInfo, CallingContext, CodeIndex, IndexError, IndexSummary, Location, ResolvedMethodCall,
    SymbolId, TypeId,
};
use tracing::{debug, info};

use crate::document::{Document, Invocation, MethodDecl, Using};
use crate::loader::{LoadOptions, load_documents};
use crate::syntax::{
    is_within_namespace, last_segment, namespace_of, normalize_qualified, simple_type_name,
};

/// Backend name reported in summaries.
pub const BACKEND: &str = "csharp";

#[derive(Debug)]
struct TypeEntry {
    id: TypeId,
    /// Member name and handle, in declaration order.
    members: Vec<(String, SymbolId)>,
}

/// In-memory index over the C# sources of a directory.
#[derive(Debug)]
pub struct SourceIndex {
    root: PathBuf,
    documents: usize,
    assemblies: Vec<String>,
    types: HashMap<String, TypeEntry>,
    methods: HashMap<SymbolId, MethodDecl>,
    callers: HashMap<SymbolId, Vec<CallerInfo>>,
    resolved: HashMap<Location, ResolvedMethodCall>,
}

impl SourceIndex {
    /// Load and bind every C# source under `root`.
    pub fn load(root: &Path, options: &LoadOptions) -> Result<Self, IndexError> {
        let documents = load_documents(root, options)?;
        Self::from_documents(root, documents, options.project.as_deref())
    }

    /// Bind a set of extracted documents.
    ///
    /// With `project`, only calls made from that assembly are kept; an
    /// unknown project is an error.
    pub fn from_documents(
        root: &Path,
        documents: Vec<Document>,
        project: Option<&str>,
    ) -> Result<Self, IndexError> {
        let mut assemblies: Vec<String> = Vec::new();
        for doc in &documents {
            if !assemblies.contains(&doc.assembly) {
                assemblies.push(doc.assembly.clone());
            }
        }
        if let Some(project) = project {
            if !assemblies.iter().any(|a| a == project) {
                return Err(IndexError::ProjectNotFound(project.to_string()));
            }
        }

        let mut index = Self {
            root: root.to_path_buf(),
            documents: documents.len(),
            assemblies,
            types: HashMap::new(),
            methods: HashMap::new(),
            callers: HashMap::new(),
            resolved: HashMap::new(),
        };
        index.declare(&documents);
        index.bind(&documents, project);

        info!(
            root = %index.root.display(),
            documents = index.documents,
            types = index.types.len(),
            bound_calls = index.resolved.len(),
            "Indexed C# sources"
        );
        Ok(index)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Assemblies seen, in first-document order.
    pub fn assemblies(&self) -> &[String] {
        &self.assemblies
    }

    fn declare(&mut self, documents: &[Document]) {
        for doc in documents {
            for decl in &doc.types {
                let entry = self
                    .types
                    .entry(decl.full_name.clone())
                    .or_insert_with(|| TypeEntry {
                        id: TypeId::new(decl.full_name.clone()),
                        members: Vec::new(),
                    });
                for method in &decl.methods {
                    let ordinal = entry.members.len();
                    let id = SymbolId::new(format!("{}.{}#{}", decl.full_name, method.name, ordinal));
                    entry.members.push((method.name.clone(), id.clone()));
                    self.methods.insert(id, method.clone());
                }
            }
        }
    }

    fn bind(&mut self, documents: &[Document], project: Option<&str>) {
        // Type full names by method name, in declaration order.
        let mut targets_by_name: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut type_order: Vec<&str> = Vec::new();
        for doc in documents {
            for decl in &doc.types {
                if type_order.contains(&decl.full_name.as_str()) {
                    continue;
                }
                type_order.push(&decl.full_name);
            }
        }
        for &full_name in &type_order {
            if let Some(entry) = self.types.get(full_name) {
                for (name, _) in &entry.members {
                    let targets = targets_by_name.entry(name.as_str()).or_default();
                    if !targets.contains(&full_name) {
                        targets.push(full_name);
                    }
                }
            }
        }

        let mut global_usings: HashMap<&str, Vec<&Using>> = HashMap::new();
        for doc in documents {
            for directive in doc.usings.iter().filter(|u| u.global) {
                global_usings
                    .entry(doc.assembly.as_str())
                    .or_default()
                    .push(&directive.using);
            }
        }

        let mut known_members: HashMap<&str, Vec<&str>> = HashMap::new();
        for doc in documents {
            for (name, types) in &doc.declared_types {
                let known = known_members.entry(name.as_str()).or_default();
                for type_text in types {
                    if !known.contains(&type_text.as_str()) {
                        known.push(type_text);
                    }
                }
            }
        }

        let mut caller_slots: HashMap<(SymbolId, CallingContext), usize> = HashMap::new();
        let mut new_callers: HashMap<SymbolId, Vec<CallerInfo>> = HashMap::new();
        let mut new_resolved: HashMap<Location, ResolvedMethodCall> = HashMap::new();

        for doc in documents {
            if project.is_some_and(|p| p != doc.assembly) {
                continue;
            }
            let scope = DocumentScope {
                doc,
                global_usings: global_usings
                    .get(doc.assembly.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]),
                known_members: &known_members,
            };

            for invocation in &doc.invocations {
                let Some(candidates) = targets_by_name.get(invocation.name.as_str()) else {
                    continue;
                };
                let reached: Vec<(Reach, &str)> = candidates
                    .iter()
                    .map(|&full_name| (scope.reach(invocation, full_name), full_name))
                    .collect();
                // Exact receiver matches win over visibility, whatever the file order
                let Some((symbol, method)) = [Reach::Exact, Reach::Possible]
                    .into_iter()
                    .find_map(|level| {
                        reached
                            .iter()
                            .filter(|(reach, _)| *reach == level)
                            .find_map(|(_, full_name)| self.overload_for(full_name, invocation))
                    })
                else {
                    continue;
                };

                let location = Location::in_source(doc.path.clone(), invocation.span);
                let context = CallingContext::new(
                    invocation.class_name.clone(),
                    invocation.method_name.clone(),
                    doc.assembly.clone(),
                );

                let callers = new_callers.entry(symbol.clone()).or_default();
                match caller_slots.get(&(symbol.clone(), context.clone())) {
                    Some(&slot) => callers[slot].locations.push(location.clone()),
                    None => {
                        caller_slots.insert((symbol.clone(), context.clone()), callers.len());
                        callers.push(CallerInfo {
                            context,
                            locations: vec![location.clone()],
                        });
                    }
                }

                match bound_type_arguments(method, invocation) {
                    Some(type_arguments) => {
                        new_resolved.insert(
                            location,
                            ResolvedMethodCall::new(method.name.clone(), type_arguments),
                        );
                    }
                    None => debug!(
                        location = %location,
                        method = %method.name,
                        "Could not infer type arguments"
                    ),
                }
            }
        }

        self.callers = new_callers;
        self.resolved = new_resolved;
    }

    /// First overload of `full_name` named like the invocation that accepts it.
    fn overload_for(&self, full_name: &str, invocation: &Invocation) -> Option<(SymbolId, &MethodDecl)> {
        let entry = self.types.get(full_name)?;
        entry
            .members
            .iter()
            .filter(|(name, _)| *name == invocation.name)
            .filter_map(|(_, id)| self.methods.get(id).map(|m| (id, m)))
            .find(|(_, method)| {
                method.accepts(invocation.type_arguments.len(), invocation.arguments.len())
            })
            .map(|(id, method)| (id.clone(), method))
    }
}

/// Type arguments bound at a call, by simple name.
///
/// `None` when the method is generic and some type parameter cannot be
/// inferred from the arguments.
fn bound_type_arguments(method: &MethodDecl, invocation: &Invocation) -> Option<Vec<String>> {
    if !invocation.type_arguments.is_empty() {
        return Some(
            invocation
                .type_arguments
                .iter()
                .map(|t| simple_type_name(t))
                .collect(),
        );
    }

    method
        .type_params
        .iter()
        .map(|type_param| {
            let (position, param) = method
                .params
                .iter()
                .enumerate()
                .find(|(_, p)| p.type_text == *type_param)?;
            let argument = invocation
                .arguments
                .iter()
                .find(|a| a.name.as_deref() == Some(param.name.as_str()))
                .or_else(|| {
                    invocation
                        .arguments
                        .get(position)
                        .filter(|a| a.name.is_none())
                })?;
            argument.created_type.as_deref().map(simple_type_name)
        })
        .collect()
}

/// Name visibility from one document.
struct DocumentScope<'d> {
    doc: &'d Document,
    global_usings: &'d [&'d Using],
    /// Declared types of variables and members across every document.
    known_members: &'d HashMap<&'d str, Vec<&'d str>>,
}

impl DocumentScope<'_> {
    fn usings(&self) -> impl Iterator<Item = &Using> {
        self.doc
            .usings
            .iter()
            .map(|u| &u.using)
            .chain(self.global_usings.iter().copied())
    }

    /// Names under which `full_name` can be written here.
    fn names_for(&self, full_name: &str) -> Vec<String> {
        let mut names = vec![full_name.to_string()];
        if self.is_visible(full_name) {
            names.push(last_segment(full_name).to_string());
        }
        for using in self.usings() {
            if let Using::Alias { alias, target } = using {
                if target == full_name {
                    names.push(alias.clone());
                }
            }
        }
        names
    }

    /// Returns true if the simple name of `full_name` resolves here.
    fn is_visible(&self, full_name: &str) -> bool {
        let namespace = namespace_of(full_name);
        if namespace.is_empty() || self.doc.type_decl(full_name).is_some() {
            return true;
        }
        if self
            .doc
            .namespaces
            .iter()
            .any(|ns| is_within_namespace(ns, namespace))
        {
            return true;
        }
        self.usings().any(|using| match using {
            Using::Namespace(ns) => ns == namespace,
            Using::Static(target) => target == full_name,
            Using::Alias { target, .. } => target == full_name,
        })
    }

    /// How surely `invocation` can target a member of `full_name`.
    fn reach(&self, invocation: &Invocation, full_name: &str) -> Reach {
        let Some(receiver) = invocation.receiver.as_deref() else {
            if invocation.enclosing_type == full_name
                || is_within_namespace(&invocation.enclosing_type, full_name)
            {
                return Reach::Exact;
            }
            let imported = self
                .usings()
                .any(|u| matches!(u, Using::Static(target) if target == full_name));
            return if imported { Reach::Possible } else { Reach::None };
        };

        let receiver = normalize_qualified(receiver);
        if receiver == "this" || receiver == "base" {
            return Reach::from(invocation.enclosing_type == full_name);
        }

        let names = self.names_for(full_name);
        if names.iter().any(|n| *n == receiver) {
            return Reach::Exact;
        }

        let path = receiver.strip_prefix("this.").unwrap_or(&receiver);
        let segments: Vec<&str> = path.split('.').map(|s| s.trim_start_matches('@')).collect();
        let is_name_path = segments
            .iter()
            .all(|s| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_'));
        if !is_name_path {
            // Calls on arbitrary expressions: only visibility can be checked
            return self.visible_reach(full_name);
        }

        // The member read last decides the receiver type when it is known
        let last = segments[segments.len() - 1];
        let declared = self
            .doc
            .declared_types
            .get(last)
            .map(|types| types.iter().map(String::as_str).collect::<Vec<_>>())
            .or_else(|| self.known_members.get(last).cloned());
        if let Some(declared) = declared {
            return self.declared_reach(&declared, full_name, &names);
        }

        // An unknown plain name is a type name, and not this one
        if segments.len() == 1 {
            return Reach::None;
        }

        // `bus.Inner.Publish()` or `EventBus.Instance.Publish()`
        let head = segments[0];
        if self.doc.declared_types.contains_key(head) || names.iter().any(|n| n == head) {
            return self.visible_reach(full_name);
        }
        Reach::None
    }

    fn visible_reach(&self, full_name: &str) -> Reach {
        if self.is_visible(full_name) {
            Reach::Possible
        } else {
            Reach::None
        }
    }

    /// Reach through a variable or member declared with one of `declared` types.
    fn declared_reach(&self, declared: &[&str], full_name: &str, names: &[String]) -> Reach {
        let simple = last_segment(full_name);
        let mut reach = Reach::None;
        for type_text in declared {
            let written = normalize_qualified(type_text);
            let written = written.trim_end_matches('?');
            if written == full_name || names.iter().any(|n| n == written) {
                return Reach::Exact;
            }
            let inferred = written == "var" || written == "dynamic";
            if inferred || simple_type_name(type_text) == simple {
                reach = reach.max(self.visible_reach(full_name));
            }
        }
        reach
    }
}

/// Confidence that an invocation targets a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Reach {
    None,
    /// Allowed by visibility alone.
    Possible,
    /// The receiver names the type or is declared with it.
    Exact,
}

impl From<bool> for Reach {
    fn from(exact: bool) -> Self {
        if exact { Reach::Exact } else { Reach::None }
    }
}

#[async_trait]
impl CodeIndex for SourceIndex {
    async fn find_type_by_full_name(&self, full_name: &str) -> Option<TypeId> {
        self.types.get(full_name).map(|t| t.id.clone())
    }

    async fn members_by_name(&self, ty: &TypeId, member_name: &str) -> Vec<SymbolId> {
        self.types
            .get(ty.as_str())
            .map(|entry| {
                entry
                    .members
                    .iter()
                    .filter(|(name, _)| name == member_name)
                    .map(|(_, id)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn find_callers_of(&self, symbol: &SymbolId) -> Result<Vec<CallerInfo>, IndexError> {
        if !self.methods.contains_key(symbol) {
            return Err(IndexError::Query(format!("unknown symbol {symbol}")));
        }
        Ok(self.callers.get(symbol).cloned().unwrap_or_default())
    }

    async fn resolve_invocation_at(&self, location: &Location) -> Option<ResolvedMethodCall> {
        self.resolved.get(location).cloned()
    }

    fn summary(&self) -> IndexSummary {
        IndexSummary {
            backend: BACKEND.to_string(),
            documents: self.documents,
            types: self.types.len(),
        }
    }
}
