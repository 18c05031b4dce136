//! URL resolution and normalization for discovered links.

use url::Url;

/// Query parameter carrying the story or docs id on Storybook URLs.
const STORY_PATH_PARAM: &str = "path";

/// Canonical form of a docs URL, used as the component identity.
///
/// Drops the fragment, a trailing slash on non-root paths, empty query
/// parameters (`args=`, `globals=`), and a trailing slash on the `path=` story
/// id, so `/?path=/docs/button--docs/&args=#top` and `/?path=/docs/button--docs`
/// name the same component. Parameter values are kept exactly as encoded.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let path = normalized.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        normalized.set_path(&trimmed);
    }

    let query = normalized.query().map(canonical_query);
    match query {
        Some(q) if !q.is_empty() => normalized.set_query(Some(&q)),
        _ => normalized.set_query(None),
    }
    normalized.into()
}

fn canonical_query(query: &str) -> String {
    query
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key.is_empty() || value.is_empty() {
                return None;
            }
            if key == STORY_PATH_PARAM && value.len() > 1 {
                return Some(format!("{key}={}", value.trim_end_matches('/')));
            }
            Some(pair.to_string())
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Resolve `href` against `base` and normalize it.
///
/// Returns `None` for empty hrefs, fragment-only hrefs, `javascript:`/`mailto:`
/// links, and anything that does not resolve to an http(s) URL.
pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
    {
        return None;
    }

    let resolved = match Url::parse(href) {
        Ok(absolute) => absolute,
        Err(_) => Url::parse(base).ok()?.join(href).ok()?,
    };

    match resolved.scheme() {
        "http" | "https" => Some(normalize_url(&resolved)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_fragment_and_trailing_slash() {
        let url = Url::parse("https://docs.example.com/guide/intro/#section-1").unwrap();
        assert_eq!(normalize_url(&url), "https://docs.example.com/guide/intro");

        let root = Url::parse("https://docs.example.com/").unwrap();
        assert_eq!(normalize_url(&root), "https://docs.example.com/");
    }

    #[test]
    fn story_urls_share_one_canonical_form() {
        let canonical = "http://localhost:6006/?path=/docs/inputs-button--docs";
        for variant in [
            "http://localhost:6006/?path=/docs/inputs-button--docs",
            "http://localhost:6006/?path=/docs/inputs-button--docs/",
            "http://localhost:6006/?path=/docs/inputs-button--docs&args=",
            "http://localhost:6006/?path=/docs/inputs-button--docs&globals=&args=#story",
        ] {
            assert_eq!(normalize_url(&Url::parse(variant).unwrap()), canonical, "{variant}");
        }

        let with_args = Url::parse("http://localhost:6006/?path=/story/button--primary&args=size:large").unwrap();
        assert_eq!(
            normalize_url(&with_args),
            "http://localhost:6006/?path=/story/button--primary&args=size:large"
        );
        let bare = Url::parse("http://localhost:6006/iframe.html?").unwrap();
        assert_eq!(normalize_url(&bare), "http://localhost:6006/iframe.html");
    }

    #[test]
    fn resolve_relative_and_query_hrefs() {
        let base = "http://localhost:6006/?path=/docs/intro--docs";
        assert_eq!(
            resolve_href(base, "/?path=/docs/inputs-button--docs").as_deref(),
            Some("http://localhost:6006/?path=/docs/inputs-button--docs")
        );
        assert_eq!(
            resolve_href(base, "?path=/story/inputs-button--primary").as_deref(),
            Some("http://localhost:6006/?path=/story/inputs-button--primary")
        );
        assert_eq!(
            resolve_href(base, "https://other.example.com/x#y").as_deref(),
            Some("https://other.example.com/x")
        );
    }

    #[test]
    fn resolve_discards_unusable_hrefs() {
        let base = "http://localhost:6006/";
        assert_eq!(resolve_href(base, ""), None);
        assert_eq!(resolve_href(base, "   "), None);
        assert_eq!(resolve_href(base, "#docs"), None);
        assert_eq!(resolve_href(base, "javascript:void(0)"), None);
        assert_eq!(resolve_href(base, "mailto:team@example.com"), None);
        assert_eq!(resolve_href("not a url", "/relative"), None);
    }
}
