use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Extracted indexable fields for one Markdown document (SPEC_FULL.md §3
/// addendum), grounded on
/// `mak-kirkland-chronicler::parser::{extract_frontmatter, extract_wikilinks,
/// extract_tags_from_frontmatter}` and the inline-tag / block-ref stripping
/// rules named in spec.md's GLOSSARY.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentMetadata {
    pub title: String,
    pub tags: BTreeSet<String>,
    pub wikilinks: BTreeSet<String>,
}

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]\|#]+)(?:#([^\[\]\|]+))?(?:\|([^\[\]]+))?\]\]").unwrap());

static INLINE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([\w/-]+)").unwrap());

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```|`[^`]*`").unwrap());

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());

/// Parses one document's raw content into title/tags/wikilinks. `file_stem`
/// is used as the title fallback when no `#` heading is present.
pub fn extract(content: &str, file_stem: &str) -> DocumentMetadata {
    let (frontmatter_str, body) = split_frontmatter(content);
    let frontmatter = parse_frontmatter(frontmatter_str);

    let mut tags = frontmatter_tags(&frontmatter);
    tags.extend(inline_tags(body));

    let wikilinks = extract_wikilinks(body);
    let title = extract_title(body, file_stem);

    DocumentMetadata { title, tags, wikilinks }
}

/// Splits `---\n ... \n---` frontmatter from the body. Unicode-safe: slices
/// only at byte offsets returned by `str::find`, which only ever land on
/// character boundaries.
fn split_frontmatter(content: &str) -> (&str, &str) {
    let Some(after_opening) = content.strip_prefix("---\n") else {
        return ("", content);
    };

    let Some(closing_pos) = after_opening.find("\n---") else {
        return ("", content);
    };

    let frontmatter = &after_opening[..closing_pos];
    let body_start = &after_opening[closing_pos..];
    let body_start = body_start.strip_prefix("\n---").unwrap_or(body_start);

    if body_start.is_empty() || body_start.starts_with('\n') {
        let body = body_start.strip_prefix('\n').unwrap_or(body_start);
        return (frontmatter, body);
    }

    ("", content)
}

fn parse_frontmatter(raw: &str) -> serde_json::Value {
    if raw.is_empty() {
        return serde_json::Value::Null;
    }
    serde_yaml::from_str(raw).unwrap_or(serde_json::Value::Null)
}

/// `tags:` may be a sequence of strings or a single bare string; both are
/// accepted (SPEC_FULL.md §3 addendum).
fn frontmatter_tags(frontmatter: &serde_json::Value) -> BTreeSet<String> {
    let Some(tags_value) = frontmatter.get("tags") else {
        return BTreeSet::new();
    };

    if let Some(array) = tags_value.as_array() {
        array.iter().filter_map(|v| v.as_str()).map(String::from).collect()
    } else if let Some(single) = tags_value.as_str() {
        BTreeSet::from([single.to_string()])
    } else {
        BTreeSet::new()
    }
}

/// Inline `#tag` / `#a/b/c` occurrences outside code fences. Purely numeric
/// tags (`#123`) are excluded, matching Obsidian's own rule.
fn inline_tags(body: &str) -> BTreeSet<String> {
    let stripped = CODE_FENCE_RE.replace_all(body, "");
    INLINE_TAG_RE
        .captures_iter(&stripped)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .filter(|tag| !tag.chars().all(|c| c.is_ascii_digit()))
        .collect()
}

/// `[[Target]]`, `[[Target#Heading]]`, `[[Target#^blockref]]`,
/// `[[Target|Alias]]`. Block references (`#^id`) are stripped entirely;
/// any other `#section` is preserved; `|alias` is discarded after being
/// recognized (GLOSSARY: "Wikilink").
fn extract_wikilinks(body: &str) -> BTreeSet<String> {
    WIKILINK_RE
        .captures_iter(body)
        .map(|cap| {
            let target = cap.get(1).unwrap().as_str().trim();
            match cap.get(2) {
                Some(section) if section.as_str().starts_with('^') => target.to_string(),
                Some(section) => format!("{target}#{}", section.as_str()),
                None => target.to_string(),
            }
        })
        .collect()
}

/// Title is the text of the first `#`-level heading if present, else the
/// file stem. No other source (frontmatter included) takes precedence.
fn extract_title(body: &str, file_stem: &str) -> String {
    if let Some(cap) = HEADING_RE.captures(body) {
        return cap[1].trim().to_string();
    }
    file_stem.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_first_heading_over_filename() {
        let doc = extract("# My Note\n\nbody text", "fallback");
        assert_eq!(doc.title, "My Note");
    }

    #[test]
    fn title_falls_back_to_filename() {
        let doc = extract("no heading here", "fallback");
        assert_eq!(doc.title, "fallback");
    }

    #[test]
    fn heading_wins_over_frontmatter_title() {
        let doc = extract("---\ntitle: From Frontmatter\n---\n# Heading Title\n\nbody", "fallback");
        assert_eq!(doc.title, "Heading Title");
    }

    #[test]
    fn frontmatter_sequence_and_scalar_tags_both_accepted() {
        let seq = extract("---\ntags:\n  - a\n  - b\n---\nbody", "x");
        assert_eq!(seq.tags, BTreeSet::from(["a".to_string(), "b".to_string()]));

        let scalar = extract("---\ntags: solo\n---\nbody", "x");
        assert_eq!(scalar.tags, BTreeSet::from(["solo".to_string()]));
    }

    #[test]
    fn inline_tags_are_unioned_with_frontmatter_and_nesting_preserved() {
        let doc = extract("---\ntags: [fm]\n---\nbody with #inline and #a/b/c tag", "x");
        assert!(doc.tags.contains("fm"));
        assert!(doc.tags.contains("inline"));
        assert!(doc.tags.contains("a/b/c"));
    }

    #[test]
    fn numeric_only_inline_tags_are_excluded() {
        let doc = extract("see issue #123 for details", "x");
        assert!(!doc.tags.contains("123"));
    }

    #[test]
    fn tags_inside_code_fences_are_ignored() {
        let doc = extract("```\n#notatag\n```\nreal #tag", "x");
        assert!(!doc.tags.contains("notatag"));
        assert!(doc.tags.contains("tag"));
    }

    #[test]
    fn wikilink_variants() {
        let doc = extract(
            "[[Plain]] [[Target#Heading]] [[Target#^blockref]] [[Target|Alias]]",
            "x",
        );
        assert!(doc.wikilinks.contains("Plain"));
        assert!(doc.wikilinks.contains("Target#Heading"));
        assert!(doc.wikilinks.contains("Target"));
        assert_eq!(doc.wikilinks.len(), 3);
    }

    #[test]
    fn frontmatter_without_delimiters_is_treated_as_body() {
        let doc = extract("tags: not-frontmatter\nbody", "x");
        assert!(doc.tags.is_empty());
    }
}
