//! Name handling for C# type and namespace text.

/// Simple name of a type as written: namespace, alias qualifier, generic
/// arguments, nullability and array ranks are dropped.
///
/// `global::Shop.Events.OrderCreated` -> `OrderCreated`,
/// `List<Order>` -> `List`, `Tick?` -> `Tick`.
pub fn simple_type_name(text: &str) -> String {
    let text = text.trim();
    let text = text.rsplit("::").next().unwrap_or(text);
    let without_generics = strip_generic_arguments(text);
    let without_suffix = without_generics
        .trim_end_matches(|c: char| c == '?' || c == '[' || c == ']' || c == ',' || c.is_whitespace());
    last_segment(without_suffix).trim().to_string()
}

/// Drop the first `<...>` group and everything after it.
pub fn strip_generic_arguments(text: &str) -> &str {
    match text.find('<') {
        Some(i) => &text[..i],
        None => text,
    }
}

/// Last `.`-separated segment.
pub fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Namespace part of a dotted full name, empty for a global type.
pub fn namespace_of(full_name: &str) -> &str {
    match full_name.rfind('.') {
        Some(i) => &full_name[..i],
        None => "",
    }
}

/// Returns true if `namespace` is `parent` or nested inside it.
pub fn is_within_namespace(namespace: &str, parent: &str) -> bool {
    if parent.is_empty() {
        return true;
    }
    namespace == parent
        || namespace
            .strip_prefix(parent)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Normalize a qualified name as written: whitespace and `global::` removed.
pub fn normalize_qualified(text: &str) -> String {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .strip_prefix("global::")
        .map(str::to_string)
        .unwrap_or(compact)
}

/// Join non-empty namespace and type-name parts with `.`.
pub fn join_name(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(".")
}
