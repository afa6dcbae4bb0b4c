//! URL slug generation

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}-]").expect("valid slug regex"));
static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid hyphen regex"));

/// Derive a URL slug from arbitrary text.
///
/// Lowercases, turns spaces into hyphens, drops everything that is not a
/// letter, digit or hyphen (letters from any script are kept), collapses
/// hyphen runs and trims hyphens from both ends. Applying it twice gives
/// the same result as applying it once.
///
/// ```
/// use inkpress::services::slug::generate_slug;
///
/// assert_eq!(generate_slug("Hello, World!"), "hello-world");
/// assert_eq!(generate_slug("日本語 タイトル"), "日本語-タイトル");
/// ```
pub fn generate_slug(text: &str) -> String {
    let lowered = text.to_lowercase().replace(' ', "-");
    let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
    let collapsed = HYPHEN_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}
