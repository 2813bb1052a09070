//! IRI resolution shared across the prologue (`PREFIX`/`BASE`), and
//! reusable by `kg-sql`'s `GRAPH_TABLE` without depending on
//! the whole SPARQL parser.

/// Resolves a possibly-relative IRI reference against `base` using the
/// simplified RFC-3986 scheme: absolute IRIs pass through
/// unchanged; a fragment-only reference (`#frag`) appends to `base`; an
/// absolute-path reference (starting with `/`) replaces `base`'s path; any
/// other relative reference strips `base`'s last path segment and appends.
pub fn resolve_iri(base: Option<&str>, iri: &str) -> String {
    if is_absolute(iri) {
        return iri.to_string();
    }
    let Some(base) = base else {
        return iri.to_string();
    };
    if let Some(frag) = iri.strip_prefix('#') {
        let trimmed = base.split('#').next().unwrap_or(base);
        return format!("{trimmed}#{frag}");
    }
    if iri.is_empty() {
        return base.to_string();
    }
    if let Some(rest) = iri.strip_prefix('/') {
        if let Some(scheme_end) = base.find("://") {
            let authority_start = scheme_end + 3;
            let authority_end = base[authority_start..]
                .find('/')
                .map(|i| authority_start + i)
                .unwrap_or(base.len());
            return format!("{}/{}", &base[..authority_end], rest);
        }
        return format!("/{rest}");
    }
    match base.rfind('/') {
        Some(idx) => format!("{}{}", &base[..=idx], iri),
        None => iri.to_string(),
    }
}

fn is_absolute(iri: &str) -> bool {
    // A minimal `scheme:` sniff: ASCII letter followed by alnum/+/-/. then ':'.
    let mut chars = iri.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for (i, c) in chars {
        if c == ':' {
            return i > 0;
        }
        if !(c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_iri_passes_through() {
        assert_eq!(resolve_iri(Some("http://base/x/"), "http://other/y"), "http://other/y");
    }

    #[test]
    fn fragment_only_appends_to_base() {
        assert_eq!(resolve_iri(Some("http://base/x"), "#frag"), "http://base/x#frag");
    }

    #[test]
    fn absolute_path_replaces_base_path() {
        assert_eq!(resolve_iri(Some("http://base.example/a/b"), "/c"), "http://base.example/c");
    }

    #[test]
    fn relative_path_strips_last_segment() {
        assert_eq!(resolve_iri(Some("http://base.example/a/b"), "c"), "http://base.example/a/c");
    }

    #[test]
    fn no_base_returns_iri_unchanged() {
        assert_eq!(resolve_iri(None, "rel"), "rel");
    }
}
