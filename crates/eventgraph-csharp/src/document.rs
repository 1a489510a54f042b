//! Per-document facts extracted from a C# syntax tree.
//!
//! A [`Document`] holds everything the index needs about one source file:
//! declared types and their methods, using directives, every invocation with
//! its calling member, and the declared types of named values (used to rule
//! out receivers that cannot be the bus). The syntax tree is dropped once
//! extraction finishes.

use std::collections::HashMap;
use std::sync::OnceLock;

use eventgraph_core::LineSpan;
use streaming_iterator::StreamingIterator;
use tree_sitter::Node;

use crate::parser::{self, ParseError, ParsedFile, node_text, span};
use crate::syntax::{join_name, normalize_qualified};

/// Class name used for top-level statements.
pub const TOP_LEVEL_CLASS: &str = "Program";
/// Method name used for top-level statements.
pub const TOP_LEVEL_METHOD: &str = "<Main>$";

/// Tree-sitter query for using directives.
const USINGS_QUERY: &str = r#"
(using_directive) @using
"#;

static USINGS: OnceLock<Result<tree_sitter::Query, String>> = OnceLock::new();

fn usings_query() -> Result<&'static tree_sitter::Query, ParseError> {
    USINGS
        .get_or_init(|| {
            tree_sitter::Query::new(&parser::language(), USINGS_QUERY)
                .map_err(|e| format!("Failed to compile usings query: {e}"))
        })
        .as_ref()
        .map_err(|e| ParseError::QueryError(e.clone()))
}

/// What a using directive brings into scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Using {
    /// `using Core.Events;`
    Namespace(String),
    /// `using Bus = Core.Events.EventBus;`
    Alias { alias: String, target: String },
    /// `using static Core.Events.EventBus;`
    Static(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingDirective {
    /// `global using` applies to every document of the assembly.
    pub global: bool,
    pub using: Using,
}

impl UsingDirective {
    /// Parse the text of a using directive.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_end_matches(';').trim();
        let (global, rest) = match text.strip_prefix("global") {
            Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest.trim_start()),
            _ => (false, text),
        };
        let rest = rest.strip_prefix("using")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim_start();

        let using = if let Some(target) = rest
            .strip_prefix("static")
            .filter(|r| r.starts_with(char::is_whitespace))
        {
            Using::Static(normalize_qualified(target))
        } else if let Some((alias, target)) = rest.split_once('=') {
            Using::Alias {
                alias: alias.trim().to_string(),
                target: normalize_qualified(target),
            }
        } else {
            Using::Namespace(normalize_qualified(rest))
        };
        Some(Self { global, using })
    }
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub type_text: String,
    /// Has a default value.
    pub optional: bool,
    /// A `params` array.
    pub variadic: bool,
}

/// A declared method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub params: Vec<ParamDecl>,
}

impl MethodDecl {
    /// Returns true if a call with `type_args` explicit type arguments and
    /// `arg_count` arguments can bind to this method.
    pub fn accepts(&self, type_args: usize, arg_count: usize) -> bool {
        if type_args > 0 && type_args != self.type_params.len() {
            return false;
        }
        let required = self
            .params
            .iter()
            .filter(|p| !p.optional && !p.variadic)
            .count();
        let variadic = self.params.iter().any(|p| p.variadic);
        arg_count >= required && (variadic || arg_count <= self.params.len())
    }
}

/// A declared class, struct, interface or record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    /// Namespace-qualified name, nested types joined with `.`.
    pub full_name: String,
    pub methods: Vec<MethodDecl>,
}

/// One argument at a call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Argument {
    /// `name:` for a named argument.
    pub name: Option<String>,
    /// Type text of a `new T(...)` argument expression.
    pub created_type: Option<String>,
}

/// One invocation expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Span of the invoked name token.
    pub span: LineSpan,
    /// Simple name of the containing type.
    pub class_name: String,
    /// Full name of the containing type.
    pub enclosing_type: String,
    /// Containing member (`.ctor`, `get_Name`, ...).
    pub method_name: String,
    /// Invoked name without type arguments.
    pub name: String,
    /// Receiver expression text, `None` for an unqualified call.
    pub receiver: Option<String>,
    /// Explicit type arguments as written.
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Argument>,
}

/// Facts extracted from one source file.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Path relative to the indexed root, `/`-separated.
    pub path: String,
    pub assembly: String,
    /// Namespaces declared in this document.
    pub namespaces: Vec<String>,
    pub usings: Vec<UsingDirective>,
    pub types: Vec<TypeDecl>,
    pub invocations: Vec<Invocation>,
    /// Declared type texts of fields, properties, parameters and locals by name.
    pub declared_types: HashMap<String, Vec<String>>,
}

impl Document {
    /// Extract facts from a parsed file.
    pub fn extract(
        path: impl Into<String>,
        assembly: impl Into<String>,
        parsed: &ParsedFile,
    ) -> Result<Self, ParseError> {
        let mut extractor = Extractor {
            source: &parsed.source,
            doc: Document {
                path: path.into(),
                assembly: assembly.into(),
                ..Default::default()
            },
            type_slots: HashMap::new(),
        };
        extractor.extract_usings(parsed)?;
        extractor.walk_compilation_unit(parsed.root_node());
        Ok(extractor.doc)
    }

    /// Type declared under `full_name` in this document.
    pub fn type_decl(&self, full_name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.full_name == full_name)
    }
}

#[derive(Debug, Clone, Default)]
struct Scope {
    namespace: Vec<String>,
    types: Vec<String>,
    member: Option<String>,
}

impl Scope {
    fn full_type_name(&self) -> String {
        let parts: Vec<String> = self
            .namespace
            .iter()
            .chain(self.types.iter())
            .cloned()
            .collect();
        join_name(&parts)
    }

    fn with_member(&self, member: impl Into<String>) -> Self {
        Self {
            member: Some(member.into()),
            ..self.clone()
        }
    }
}

struct Extractor<'s> {
    source: &'s str,
    doc: Document,
    type_slots: HashMap<String, usize>,
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Field `field`, falling back to the first named child of kind `kind`.
fn field_or_kind<'t>(node: Node<'t>, field: &str, kind: &str) -> Option<Node<'t>> {
    node.child_by_field_name(field)
        .or_else(|| named_children(node).into_iter().find(|c| c.kind() == kind))
}

fn split_namespace(name: &str) -> Vec<String> {
    normalize_qualified(name)
        .split('.')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl<'s> Extractor<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        node_text(node, self.source)
    }

    fn extract_usings(&mut self, parsed: &ParsedFile) -> Result<(), ParseError> {
        let query = usings_query()?;
        let mut cursor = tree_sitter::QueryCursor::new();
        let mut matches = cursor.matches(query, parsed.root_node(), parsed.source_bytes());

        while let Some(match_) = matches.next() {
            for capture in match_.captures {
                let text = node_text(capture.node, self.source);
                if let Some(directive) = UsingDirective::parse(text) {
                    self.doc.usings.push(directive);
                }
            }
        }
        Ok(())
    }

    fn walk_compilation_unit(&mut self, root: Node<'_>) {
        let mut scope = Scope::default();
        for child in named_children(root) {
            if child.kind() == "file_scoped_namespace_declaration" {
                let name_node = child.child_by_field_name("name");
                if let Some(name) = name_node {
                    scope.namespace = split_namespace(self.text(name));
                    self.doc.namespaces.push(scope.namespace.join("."));
                }
                for inner in named_children(child) {
                    if name_node.is_some_and(|n| n.id() == inner.id()) {
                        continue;
                    }
                    self.walk(inner, &scope);
                }
                continue;
            }
            self.walk(child, &scope);
        }
    }

    fn walk_children(&mut self, node: Node<'_>, scope: &Scope) {
        for child in named_children(node) {
            self.walk(child, scope);
        }
    }

    fn walk(&mut self, node: Node<'_>, scope: &Scope) {
        match node.kind() {
            "namespace_declaration" => self.handle_namespace(node, scope),
            "class_declaration"
            | "struct_declaration"
            | "interface_declaration"
            | "record_declaration"
            | "record_struct_declaration" => self.handle_type(node, scope),
            "enum_declaration" | "delegate_declaration" | "using_directive" => {}
            "method_declaration" => self.handle_method(node, scope),
            "constructor_declaration" => {
                let is_static = children(node)
                    .iter()
                    .any(|c| c.kind() == "modifier" && self.text(*c) == "static");
                let member = if is_static { ".cctor" } else { ".ctor" };
                self.walk_children(node, &scope.with_member(member));
            }
            "destructor_declaration" => self.walk_children(node, &scope.with_member("Finalize")),
            "operator_declaration" | "conversion_operator_declaration" => {
                self.walk_children(node, &scope.with_member("operator"))
            }
            "local_function_statement" => match node.child_by_field_name("name") {
                Some(name) => {
                    let name = self.text(name).to_string();
                    self.walk_children(node, &scope.with_member(name));
                }
                None => self.walk_children(node, scope),
            },
            "property_declaration" => {
                self.record_declared(node);
                match node.child_by_field_name("name") {
                    Some(name) => {
                        let name = self.text(name).to_string();
                        self.handle_property(node, scope, &name);
                    }
                    None => self.walk_children(node, scope),
                }
            }
            "indexer_declaration" => self.handle_property(node, scope, "Item"),
            "event_declaration" => match node.child_by_field_name("name") {
                Some(name) => {
                    let name = self.text(name).to_string();
                    self.handle_property(node, scope, &name);
                }
                None => self.walk_children(node, scope),
            },
            "field_declaration" | "event_field_declaration" => self.handle_field(node, scope),
            "global_statement" => {
                let mut top = scope.with_member(TOP_LEVEL_METHOD);
                if top.types.is_empty() {
                    top.types.push(TOP_LEVEL_CLASS.to_string());
                }
                self.walk_children(node, &top);
            }
            "invocation_expression" => {
                self.record_invocation(node, scope);
                self.walk_children(node, scope);
            }
            "variable_declaration" | "parameter" | "parameter_array" | "declaration_expression"
            | "catch_declaration" => {
                self.record_declared(node);
                self.walk_children(node, scope);
            }
            "foreach_statement" => {
                let ty = node.child_by_field_name("type");
                let left = node.child_by_field_name("left").filter(|n| n.kind() == "identifier");
                if let (Some(ty), Some(left)) = (ty, left) {
                    self.declare_variable(self.text(left), self.text(ty).trim());
                }
                self.walk_children(node, scope);
            }
            "lambda_expression" => {
                // `b => b.Publish(...)`: an implicitly typed parameter
                if let Some(param) = node
                    .child_by_field_name("parameters")
                    .filter(|p| p.kind() == "identifier")
                {
                    self.declare_variable(self.text(param), "var");
                }
                self.walk_children(node, scope);
            }
            _ => self.walk_children(node, scope),
        }
    }

    fn handle_namespace(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(name) = node.child_by_field_name("name") else {
            return self.walk_children(node, scope);
        };
        let mut inner = scope.clone();
        inner.namespace.extend(split_namespace(self.text(name)));
        self.doc.namespaces.push(inner.namespace.join("."));

        if let Some(body) = node.child_by_field_name("body") {
            self.walk_children(body, &inner);
        }
    }

    fn handle_type(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let mut inner = scope.clone();
        inner.types.push(self.text(name).to_string());
        inner.member = None;

        let full_name = inner.full_type_name();
        if !self.type_slots.contains_key(&full_name) {
            self.type_slots
                .insert(full_name.clone(), self.doc.types.len());
            self.doc.types.push(TypeDecl {
                full_name,
                methods: Vec::new(),
            });
        }

        self.walk_children(node, &inner);
    }

    fn handle_method(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(name) = node.child_by_field_name("name") else {
            return self.walk_children(node, scope);
        };
        let name = self.text(name).to_string();

        if !scope.types.is_empty() {
            let decl = self.method_decl(node, &name);
            if let Some(&slot) = self.type_slots.get(&scope.full_type_name()) {
                self.doc.types[slot].methods.push(decl);
            }
        }

        self.walk_children(node, &scope.with_member(name));
    }

    /// Properties, indexers and events: accessors become `get_X`, `set_X`,
    /// `add_X` and `remove_X`; an expression body is a getter.
    fn handle_property(&mut self, node: Node<'_>, scope: &Scope, name: &str) {
        for child in named_children(node) {
            match child.kind() {
                "accessor_list" => {
                    for accessor in named_children(child) {
                        if accessor.kind() != "accessor_declaration" {
                            continue;
                        }
                        let member = match self.accessor_keyword(accessor) {
                            Some("get") => format!("get_{name}"),
                            Some("set") | Some("init") => format!("set_{name}"),
                            Some("add") => format!("add_{name}"),
                            Some("remove") => format!("remove_{name}"),
                            _ => name.to_string(),
                        };
                        self.walk_children(accessor, &scope.with_member(member));
                    }
                }
                "arrow_expression_clause" => {
                    self.walk_children(child, &scope.with_member(format!("get_{name}")));
                }
                _ => self.walk(child, &scope.with_member(name)),
            }
        }
    }

    fn accessor_keyword(&self, accessor: Node<'_>) -> Option<&'static str> {
        const KEYWORDS: [&str; 5] = ["get", "set", "init", "add", "remove"];
        let from_field = accessor
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .and_then(|t| KEYWORDS.iter().copied().find(|k| *k == t));
        from_field.or_else(|| {
            children(accessor)
                .iter()
                .find_map(|c| KEYWORDS.iter().copied().find(|k| *k == c.kind()))
        })
    }

    /// Field initializers are attributed to the field.
    fn handle_field(&mut self, node: Node<'_>, scope: &Scope) {
        for child in named_children(node) {
            if child.kind() != "variable_declaration" {
                self.walk(child, scope);
                continue;
            }
            self.record_declared(child);
            for declarator in named_children(child) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let Some(name) = self.declarator_name(declarator) else {
                    continue;
                };
                let name = name.to_string();
                self.walk_children(declarator, &scope.with_member(name));
            }
        }
    }

    fn declarator_name(&self, declarator: Node<'_>) -> Option<&'s str> {
        field_or_kind(declarator, "name", "identifier").map(|n| self.text(n))
    }

    fn record_declared(&mut self, node: Node<'_>) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let type_text = self.text(type_node).trim();
        // `var` is kept: the name is still a variable, of an inferred type
        if type_text.is_empty() {
            return;
        }

        let names: Vec<&str> = match node.kind() {
            "variable_declaration" => named_children(node)
                .into_iter()
                .filter(|c| c.kind() == "variable_declarator")
                .filter_map(|d| self.declarator_name(d))
                .collect(),
            _ => node
                .child_by_field_name("name")
                .map(|n| vec![self.text(n)])
                .unwrap_or_default(),
        };
        for name in names {
            self.declare_variable(name, type_text);
        }
    }

    fn declare_variable(&mut self, name: &str, type_text: &str) {
        let types = self.doc.declared_types.entry(name.to_string()).or_default();
        if !types.iter().any(|t| t == type_text) {
            types.push(type_text.to_string());
        }
    }

    fn method_decl(&self, node: Node<'_>, name: &str) -> MethodDecl {
        let type_params = field_or_kind(node, "type_parameters", "type_parameter_list")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .filter(|c| c.kind() == "type_parameter")
                    .map(|tp| {
                        tp.child_by_field_name("name")
                            .map(|n| self.text(n))
                            .unwrap_or_else(|| self.text(tp))
                            .trim()
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default();

        let params = field_or_kind(node, "parameters", "parameter_list")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .filter(|c| matches!(c.kind(), "parameter" | "parameter_array"))
                    .map(|p| self.param_decl(p))
                    .collect()
            })
            .unwrap_or_default();

        MethodDecl {
            name: name.to_string(),
            type_params,
            params,
        }
    }

    fn param_decl(&self, node: Node<'_>) -> ParamDecl {
        let all = children(node);
        let optional = all
            .iter()
            .any(|c| matches!(c.kind(), "equals_value_clause" | "="));
        let variadic = node.kind() == "parameter_array"
            || all
                .iter()
                .any(|c| c.kind() == "params" || self.text(*c) == "params");
        ParamDecl {
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            type_text: node
                .child_by_field_name("type")
                .map(|n| self.text(n).trim().to_string())
                .unwrap_or_default(),
            optional,
            variadic,
        }
    }

    fn record_invocation(&mut self, node: Node<'_>, scope: &Scope) {
        let (Some(class_name), Some(method_name)) = (scope.types.last(), scope.member.as_ref())
        else {
            return;
        };
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let Some(target) = self.call_target(node, function) else {
            return;
        };
        let arguments = field_or_kind(node, "arguments", "argument_list")
            .map(|list| self.arguments(list))
            .unwrap_or_default();

        self.doc.invocations.push(Invocation {
            span: span(target.name_node),
            class_name: class_name.clone(),
            enclosing_type: scope.full_type_name(),
            method_name: method_name.clone(),
            name: target.name,
            receiver: target.receiver,
            type_arguments: target.type_arguments,
            arguments,
        });
    }

    fn call_target<'t>(&self, invocation: Node<'t>, function: Node<'t>) -> Option<CallTarget<'t>> {
        match function.kind() {
            "identifier" | "generic_name" => self.name_target(function, None),
            "member_access_expression" => {
                let name = function.child_by_field_name("name")?;
                let receiver = function
                    .child_by_field_name("expression")
                    .map(|e| self.text(e).trim().to_string());
                self.name_target(name, receiver)
            }
            "member_binding_expression" => {
                // `a?.B()`: the receiver is the enclosing conditional access.
                let name = function.child_by_field_name("name")?;
                let receiver = invocation
                    .parent()
                    .filter(|p| p.kind() == "conditional_access_expression")
                    .and_then(|p| {
                        p.child_by_field_name("condition")
                            .or_else(|| p.named_child(0))
                    })
                    .map(|c| self.text(c).trim().to_string());
                self.name_target(name, receiver)
            }
            "conditional_access_expression" => {
                let binding = named_children(function)
                    .into_iter()
                    .rev()
                    .find(|c| c.kind() == "member_binding_expression")?;
                let name = binding.child_by_field_name("name")?;
                let receiver = function
                    .child_by_field_name("condition")
                    .or_else(|| function.named_child(0))
                    .map(|c| self.text(c).trim().to_string());
                self.name_target(name, receiver)
            }
            _ => None,
        }
    }

    fn name_target<'t>(&self, name: Node<'t>, receiver: Option<String>) -> Option<CallTarget<'t>> {
        match name.kind() {
            "identifier" => Some(CallTarget {
                name_node: name,
                name: self.text(name).to_string(),
                receiver,
                type_arguments: Vec::new(),
            }),
            "generic_name" => {
                let parts = named_children(name);
                let identifier = parts.iter().find(|c| c.kind() == "identifier")?;
                let type_arguments = parts
                    .iter()
                    .find(|c| c.kind() == "type_argument_list")
                    .map(|list| {
                        named_children(*list)
                            .into_iter()
                            .map(|t| self.text(t).trim().to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                Some(CallTarget {
                    name_node: *identifier,
                    name: self.text(*identifier).to_string(),
                    receiver,
                    type_arguments,
                })
            }
            _ => None,
        }
    }

    fn arguments(&self, list: Node<'_>) -> Vec<Argument> {
        named_children(list)
            .into_iter()
            .filter(|c| c.kind() == "argument")
            .map(|arg| {
                let parts = named_children(arg);
                let name_field = arg.child_by_field_name("name");
                let name = match name_field {
                    Some(field) => Some(self.text(field).trim().to_string()),
                    None => parts.iter().find(|c| c.kind() == "name_colon").map(|nc| {
                        match named_children(*nc).into_iter().next() {
                            Some(id) => self.text(id).trim().to_string(),
                            None => self.text(*nc).trim_end_matches(':').trim().to_string(),
                        }
                    }),
                };
                let created_type = parts
                    .iter()
                    .filter(|c| name_field.is_none_or(|f| f.id() != c.id()))
                    .find(|c| c.kind() != "name_colon")
                    .filter(|e| e.kind() == "object_creation_expression")
                    .and_then(|e| e.child_by_field_name("type"))
                    .map(|t| self.text(t).trim().to_string());
                Argument { name, created_type }
            })
            .collect()
    }
}

struct CallTarget<'t> {
    name_node: Node<'t>,
    name: String,
    receiver: Option<String>,
    type_arguments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn extract(source: &str) -> Document {
        let mut parser = Parser::new().unwrap();
        let parsed = parser.parse_source(source).unwrap();
        Document::extract("Test.cs", "Assembly-CSharp", &parsed).unwrap()
    }

    const BUS: &str = r#"
namespace Core.Events
{
    public class EventBus
    {
        public void Publish<T>(T evt) where T : IEvent { }
        public void Publish<T>(T evt, float delay, params object[] extra) { }
        public void Subscribe<T>(System.Action<T> handler, int priority = 0) { }
    }
}
"#;

    #[test]
    fn test_using_directive_parse() {
        assert_eq!(
            UsingDirective::parse("using Core.Events;"),
            Some(UsingDirective {
                global: false,
                using: Using::Namespace("Core.Events".into())
            })
        );
        assert_eq!(
            UsingDirective::parse("global using Core.Events;"),
            Some(UsingDirective {
                global: true,
                using: Using::Namespace("Core.Events".into())
            })
        );
        assert_eq!(
            UsingDirective::parse("using Bus = Core.Events.EventBus;").map(|u| u.using),
            Some(Using::Alias {
                alias: "Bus".into(),
                target: "Core.Events.EventBus".into()
            })
        );
        assert_eq!(
            UsingDirective::parse("using static Core.Events.EventBus;").map(|u| u.using),
            Some(Using::Static("Core.Events.EventBus".into()))
        );
        assert_eq!(UsingDirective::parse("usingCore;"), None);
    }

    #[test]
    fn test_extracts_types_and_methods() {
        let doc = extract(BUS);

        assert_eq!(doc.namespaces, vec!["Core.Events"]);
        let bus = doc.type_decl("Core.Events.EventBus").unwrap();
        assert_eq!(bus.methods.len(), 3);

        let publish = &bus.methods[0];
        assert_eq!(publish.name, "Publish");
        assert_eq!(publish.type_params, vec!["T"]);
        assert_eq!(publish.params.len(), 1);
        assert_eq!(publish.params[0].type_text, "T");

        let delayed = &bus.methods[1];
        assert!(delayed.params[2].variadic);

        let subscribe = &bus.methods[2];
        assert!(!subscribe.params[0].optional);
        assert!(subscribe.params[1].optional);
    }

    #[test]
    fn test_method_accepts_arity() {
        let doc = extract(BUS);
        let bus = doc.type_decl("Core.Events.EventBus").unwrap();

        assert!(bus.methods[0].accepts(1, 1));
        assert!(bus.methods[0].accepts(0, 1));
        assert!(!bus.methods[0].accepts(2, 1));
        assert!(!bus.methods[0].accepts(1, 2));

        assert!(bus.methods[1].accepts(1, 2));
        assert!(bus.methods[1].accepts(1, 5));
        assert!(!bus.methods[1].accepts(1, 1));

        assert!(bus.methods[2].accepts(1, 1));
        assert!(bus.methods[2].accepts(1, 2));
        assert!(!bus.methods[2].accepts(1, 3));
    }

    #[test]
    fn test_invocation_contexts() {
        let doc = extract(
            r#"
using Core.Events;

namespace Shop
{
    public class Checkout
    {
        private EventBus bus = Locate();
        private readonly int ready = Init();

        public Checkout() { bus.Subscribe<Started>(OnStarted); }

        public int Count
        {
            get { return Measure(); }
            set { Store(value); }
        }

        public string Label => Render();

        public void Complete()
        {
            bus.Publish<OrderCreated>(new OrderCreated());
            void Local() { bus.Publish(new OrderShipped()); }
            System.Action a = () => bus?.Publish<Tick>(new Tick());
        }
    }
}
"#,
        );

        let contexts: Vec<(&str, &str)> = doc
            .invocations
            .iter()
            .map(|i| (i.method_name.as_str(), i.name.as_str()))
            .collect();
        assert!(contexts.contains(&("bus", "Locate")));
        assert!(contexts.contains(&("ready", "Init")));
        assert!(contexts.contains(&(".ctor", "Subscribe")));
        assert!(contexts.contains(&("get_Count", "Measure")));
        assert!(contexts.contains(&("set_Count", "Store")));
        assert!(contexts.contains(&("get_Label", "Render")));
        assert!(contexts.contains(&("Complete", "Publish")));
        assert!(contexts.contains(&("Local", "Publish")));

        assert!(doc.invocations.iter().all(|i| i.class_name == "Checkout"));
        assert!(doc.invocations.iter().all(|i| i.enclosing_type == "Shop.Checkout"));

        let explicit = doc
            .invocations
            .iter()
            .find(|i| i.name == "Publish" && i.type_arguments == vec!["OrderCreated"])
            .unwrap();
        assert_eq!(explicit.receiver.as_deref(), Some("bus"));
        assert_eq!(explicit.arguments.len(), 1);
        assert_eq!(
            explicit.arguments[0].created_type.as_deref(),
            Some("OrderCreated")
        );
        assert_eq!(explicit.span.start_line, 23);
        assert!(explicit.span.is_single_line());

        let inferred = doc
            .invocations
            .iter()
            .find(|i| i.method_name == "Local")
            .unwrap();
        assert!(inferred.type_arguments.is_empty());
        assert_eq!(
            inferred.arguments[0].created_type.as_deref(),
            Some("OrderShipped")
        );

        assert_eq!(doc.declared_types.get("bus").unwrap(), &vec!["EventBus".to_string()]);
    }

    #[test]
    fn test_file_scoped_namespace_and_nested_types() {
        let doc = extract(
            r#"
namespace Game.Player;

public class Controller
{
    public class Input
    {
        void Poll() { Read(); }
    }
}
"#,
        );

        assert_eq!(doc.namespaces, vec!["Game.Player"]);
        assert!(doc.type_decl("Game.Player.Controller").is_some());
        assert!(doc.type_decl("Game.Player.Controller.Input").is_some());

        let call = &doc.invocations[0];
        assert_eq!(call.class_name, "Input");
        assert_eq!(call.method_name, "Poll");
    }

    #[test]
    fn test_top_level_statements() {
        let doc = extract("using Core.Events;\n\nvar bus = new EventBus();\nbus.Publish(new Booted());\n");

        let call = doc.invocations.iter().find(|i| i.name == "Publish").unwrap();
        assert_eq!(call.class_name, TOP_LEVEL_CLASS);
        assert_eq!(call.method_name, TOP_LEVEL_METHOD);
        assert_eq!(call.span.start_line, 4);
    }

    #[test]
    fn test_implicitly_typed_variables_are_declared() {
        let doc = extract(
            r#"
class Relay
{
    void Run(EventBus[] buses)
    {
        var first = buses[0];
        foreach (EventBus each in buses) { }
        buses.ToList().ForEach(b => b.Publish<Tick>(new Tick()));
        if (TryGet(out var found)) { }
    }
}
"#,
        );
        let declared = |name: &str| doc.declared_types.get(name).cloned().unwrap_or_default();
        assert_eq!(declared("first"), vec!["var"]);
        assert_eq!(declared("each"), vec!["EventBus"]);
        assert_eq!(declared("b"), vec!["var"]);
        assert_eq!(declared("found"), vec!["var"]);
        assert_eq!(declared("buses"), vec!["EventBus[]"]);
    }

    #[test]
    fn test_named_argument() {
        let doc = extract(
            "class A { void Run() { Bus.Publish(evt: new Spawned(), delay: 2f); } }",
        );
        let call = &doc.invocations[0];
        assert_eq!(call.arguments[0].name.as_deref(), Some("evt"));
        assert_eq!(call.arguments[0].created_type.as_deref(), Some("Spawned"));
        assert_eq!(call.arguments[1].name.as_deref(), Some("delay"));
        assert_eq!(call.receiver.as_deref(), Some("Bus"));
    }
}
