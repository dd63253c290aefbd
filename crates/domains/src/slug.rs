//! Slug derivation for advert URLs.
//!
//! Slugs are lowercase ASCII letters, digits and single hyphens, with no
//! leading or trailing hyphen, and never longer than [`MAX_LENGTH`].

/// Width of the `advert.slug` column.
pub const MAX_LENGTH: usize = 191;

/// Cuts an ASCII slug down to `max` bytes without leaving a trailing hyphen.
fn truncate(slug: &str, max: usize) -> &str {
    slug[..slug.len().min(max)].trim_end_matches('-')
}

/// Derives a slug from a title: accents are folded to ASCII and every run of
/// other characters becomes one hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        let folded = fold(ch);
        if folded.is_empty() {
            pending_dash = true;
            continue;
        }
        for c in folded.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
    }

    if slug.is_empty() {
        slug.push_str("n-a");
    }
    let kept = truncate(&slug, MAX_LENGTH).len();
    slug.truncate(kept);
    slug
}

/// The `attempt`-th candidate for `base`: `base`, `base-1`, `base-2`, ...
/// The base is shortened when the suffix would overflow [`MAX_LENGTH`].
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        truncate(base, MAX_LENGTH).to_string()
    } else {
        let suffix = format!("-{attempt}");
        let base = truncate(base, MAX_LENGTH - suffix.len());
        format!("{base}{suffix}")
    }
}

fn fold(ch: char) -> &'static str {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'æ' | 'Æ' => "ae",
        'ç' | 'Ç' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ñ' | 'Ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'œ' | 'Œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        'ß' => "ss",
        c if c.is_ascii_alphanumeric() => ascii(c),
        _ => "",
    }
}

// Maps an ASCII alphanumeric to a static str so `fold` can stay allocation free.
fn ascii(c: char) -> &'static str {
    const TABLE: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    match TABLE.find(c) {
        Some(i) => &TABLE[i..i + 1],
        None => "",
    }
}
