// src/ingest/text.rs
//! Text cleanup shared by the adapters and the normalizer.

use once_cell::sync::OnceCell;
use regex::Regex;

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn re_count_suffix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s*[(\[]\s*\d+\s*[)\]]\s*$").expect("static regex"))
}

fn re_slug() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"))
}

/// Normalize scraped text: decode entities, strip tags, fold NBSP and
/// whitespace runs, trim. Capped at 1500 chars.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    out = re_tags().replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (\s covers NBSP)
    out = re_ws().replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// `clean_text` that maps blank results to `None`.
pub fn clean_opt(s: Option<&str>) -> Option<String> {
    s.map(clean_text).filter(|t| !t.is_empty())
}

/// Canonical form of a UI label for comparison: dash glyph variants become
/// `-`, spacing around dashes is fixed, a trailing result count like `(12)`
/// is dropped, case is folded.
pub fn normalize_label(s: &str) -> String {
    let folded: String = clean_text(s)
        .chars()
        .map(|c| match c {
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}'
            | '\u{2212}' | '\u{FE58}' | '\u{FE63}' | '\u{FF0D}' => '-',
            other => other,
        })
        .collect();
    let no_count = re_count_suffix().replace(&folded, "");
    let spaced = no_count
        .split('-')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" - ");
    re_ws().replace_all(&spaced, " ").trim().to_lowercase()
}

/// Lowercase ASCII slug: runs of anything but `[a-z0-9]` become one `-`.
pub fn slug(s: &str) -> String {
    let lower = s.replace('\u{00A0}', " ").trim().to_lowercase();
    re_slug()
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Truncate to at most `max` chars (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_tags_and_entities() {
        let s = "  <b>Registered&nbsp;Nurse</b>\n\t &ldquo;Nights&rdquo; ";
        assert_eq!(clean_text(s), r#"Registered Nurse "Nights""#);
    }

    #[test]
    fn clean_opt_maps_blank_to_none() {
        assert_eq!(clean_opt(Some("  \u{00A0} ")), None);
        assert_eq!(clean_opt(None), None);
        assert_eq!(clean_opt(Some(" x ")), Some("x".to_string()));
    }

    #[test]
    fn label_normalization_handles_dash_variants_and_counts() {
        let want = "hsc - amarillo";
        assert_eq!(normalize_label("HSC - Amarillo"), want);
        assert_eq!(normalize_label("HSC – Amarillo"), want);
        assert_eq!(normalize_label("HSC—Amarillo (14)"), want);
        assert_eq!(normalize_label("  hsc \u{2212} AMARILLO [3]"), want);
        assert_ne!(normalize_label("HSC - Lubbock (2)"), want);
    }

    #[test]
    fn slug_is_ascii_kebab() {
        assert_eq!(slug("Panhandle Region-Teller II"), "panhandle-region-teller-ii");
        assert_eq!(slug("  --Hello,  World!-- "), "hello-world");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }
}
