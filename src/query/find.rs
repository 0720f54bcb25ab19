use anyhow::Result;
use regex::RegexBuilder;

use crate::flatten::FlattenedSourceGraph;
use crate::graph::node::DeclarationKind;

/// A single matching node returned by `find_declarations`.
#[derive(Debug, Clone)]
pub struct FindResult {
    pub qualified_name: String,
    /// `None` for opaque stubs.
    pub kind: Option<DeclarationKind>,
    pub file_path: Option<String>,
    pub is_exported: bool,
    pub is_abstract: bool,
}

/// Lowercase kind label used in output and filtering.
pub fn kind_to_str(kind: Option<DeclarationKind>) -> &'static str {
    match kind {
        Some(DeclarationKind::Class) => "class",
        Some(DeclarationKind::Interface) => "interface",
        Some(DeclarationKind::TypeAlias) => "type",
        Some(DeclarationKind::Variable) => "variable",
        None => "opaque",
    }
}

/// Find nodes whose qualified name matches the regex `pattern`.
///
/// - `case_insensitive`: enable case-insensitive regex matching
/// - `kind_filter`: if non-empty, only include nodes whose kind label is in this list
///   (`opaque` selects stubs)
///
/// Returns results sorted by qualified name.
pub fn find_declarations(
    flat: &FlattenedSourceGraph,
    pattern: &str,
    case_insensitive: bool,
    kind_filter: &[String],
) -> Result<Vec<FindResult>> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| anyhow::anyhow!("invalid name pattern '{}': {}", pattern, e))?;

    let mut results: Vec<FindResult> = flat
        .declared()
        .chain(flat.opaque.values())
        .filter(|node| re.is_match(&node.qualified_name))
        .filter(|node| {
            kind_filter.is_empty()
                || kind_filter
                    .iter()
                    .any(|k| normalize_kind(k) == kind_to_str(node.kind()))
        })
        .map(|node| FindResult {
            qualified_name: node.qualified_name.clone(),
            kind: node.kind(),
            file_path: node.declaration.as_ref().and_then(|d| d.file_path.clone()),
            is_exported: node.declaration.as_ref().is_some_and(|d| d.is_exported),
            is_abstract: node.declaration.as_ref().is_some_and(|d| d.is_abstract),
        })
        .collect();

    results.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
    Ok(results)
}

fn normalize_kind(kind: &str) -> &str {
    match DeclarationKind::parse(kind) {
        Some(k) => kind_to_str(Some(k)),
        None => kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SourceGraph;
    use crate::graph::node::Declaration;

    fn flat() -> FlattenedSourceGraph {
        let mut g = SourceGraph::new();
        g.upsert_declaration(Declaration::interface("pkg/UserService"));
        g.upsert_declaration(Declaration::class("pkg/UserServiceImpl").in_file("src/user.ts"));
        g.upsert_declaration(Declaration::type_alias("pkg/UserId"));
        g.add_stub("ext/UserBase");
        FlattenedSourceGraph::build(&g)
    }

    #[test]
    fn test_regex_match_sorted() {
        let results = find_declarations(&flat(), "User.*Service", false, &[]).unwrap();
        let names: Vec<_> = results.iter().map(|r| r.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["pkg/UserService", "pkg/UserServiceImpl"]);
        assert_eq!(results[1].file_path.as_deref(), Some("src/user.ts"));
    }

    #[test]
    fn test_kind_filter_accepts_aliases() {
        let results =
            find_declarations(&flat(), "user", true, &["typeAlias".to_string()]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].qualified_name, "pkg/UserId");

        let stubs = find_declarations(&flat(), "User", false, &["opaque".to_string()]).unwrap();
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].kind, None);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(find_declarations(&flat(), "(", false, &[]).is_err());
    }
}
