//! Default-safe field selection shared by every normalizer.

use serde::Deserialize;
use serde_with::{DefaultOnError, DisplayFromStr, PickFirst, Same};

/// Title used when the upstream has none in any script.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Image used when the upstream has no cover at any size.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/460x650?text=No+Image";

/// Character budget for descriptions in list views.
pub const LIST_DESCRIPTION_CHARS: usize = 150;

/// Number that may arrive as an integer, a float or a numeric string.
/// Anything else reads as absent.
pub type LenientNumber = DefaultOnError<Option<PickFirst<(Same, DisplayFromStr)>>>;

/// AniList `title` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

/// AniList `coverImage` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoverImage {
    pub extra_large: Option<String>,
    pub large: Option<String>,
    pub medium: Option<String>,
}

/// First candidate that is present and not blank.
pub fn first_present<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Romanized, then English, then native, then [`DEFAULT_TITLE`].
pub fn pick_title(title: Option<&MediaTitle>) -> String {
    let Some(t) = title else {
        return DEFAULT_TITLE.to_string();
    };
    first_present([
        t.romaji.as_deref(),
        t.english.as_deref(),
        t.native.as_deref(),
    ])
    .unwrap_or(DEFAULT_TITLE)
    .to_string()
}

/// Extra-large, then large, then medium, then [`PLACEHOLDER_IMAGE`].
pub fn pick_image(cover: Option<&CoverImage>) -> String {
    let Some(c) = cover else {
        return PLACEHOLDER_IMAGE.to_string();
    };
    first_present([
        c.extra_large.as_deref(),
        c.large.as_deref(),
        c.medium.as_deref(),
    ])
    .unwrap_or(PLACEHOLDER_IMAGE)
    .to_string()
}

/// Strip the HTML AniList leaves in descriptions and collapse whitespace.
pub fn clean_description(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let with_breaks = raw
        .replace("<br>", " ")
        .replace("<br/>", " ")
        .replace("<br />", " ");

    // A `<` opens a tag only when a name (or `/`, `!`) follows and a `>` closes it.
    let mut out = String::with_capacity(with_breaks.len());
    let mut rest = with_breaks.as_str();
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let opens_tag = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');
        match after.find('>') {
            Some(end) if opens_tag => rest = &after[end + 1..],
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Round a count or duration to a whole number; negative or non-finite is 0.
pub fn whole(value: Option<f64>) -> u64 {
    value
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round() as u64)
        .unwrap_or(0)
}

/// Cut `text` to at most `max_chars` characters, marking the cut with "...".
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
