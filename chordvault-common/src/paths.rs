//! Resolution path normalization
//!
//! Every tier keys its data by the same normalized "artist" or
//! "artist/title" slug: no leading/trailing slash, no empty segments,
//! lowercase.

/// Normalize an artist or chord-sheet path
///
/// `normalize_path(p + "/") == normalize_path(p)` for every `p`.
pub fn normalize_path(raw: &str) -> String {
    raw.trim()
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the chord-sheet key for an artist/title slug pair
pub fn sheet_path(artist_slug: &str, title_slug: &str) -> String {
    normalize_path(&format!("{}/{}", artist_slug, title_slug))
}

/// Number of segments in a normalized path
pub fn segment_count(path: &str) -> usize {
    normalize_path(path).split('/').filter(|s| !s.is_empty()).count()
}

/// Turn a display name into a path segment ("Ed Sheeran" -> "ed-sheeran")
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
