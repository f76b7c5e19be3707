//! URL detection and placeholder substitution.
//!
//! Messages often carry URLs broken up by line wrapping (`bit . ly / x`).
//! `clean_urls` rejoins the pieces, finds every URL-like token and replaces
//! it with the literal `url` placeholder.

use once_cell::sync::Lazy;
use regex::Regex;

/// Token that replaces every detected URL.
pub const URL_PLACEHOLDER: &str = "url";

static FRAGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*([.:/])\s*").unwrap());
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[^\s"'<>`{}|\\^]+"#).unwrap());
static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*://").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const LEADING_TRIM: &[char] = &['(', '[', '{', '*', ',', ';', '!', '?'];
const TRAILING_TRIM: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '*'];

/// Remove whitespace around `.`, `:` and `/` so wrapped URLs become one token.
pub fn defragment(text: &str) -> String {
    FRAGMENT_RE.replace_all(text, "$1").into_owned()
}

/// Extract URL-like substrings, in order of first appearance, without
/// duplicates. E-mail addresses are not URLs.
pub fn find_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in TOKEN_RE.find_iter(text) {
        if let Some(url) = url_in_token(m.as_str()) {
            if !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
    }
    urls
}

/// Replace each URL with the placeholder, collapse whitespace and trim.
///
/// Replacement is literal and runs in extraction order, so a URL that is a
/// substring of a later one rewrites part of it first.
pub fn clean_urls(text: &str) -> String {
    let repaired = defragment(text);
    let urls = find_urls(&repaired);

    let mut replaced = repaired;
    for url in &urls {
        replaced = replaced.replace(url.as_str(), URL_PLACEHOLDER);
    }

    WHITESPACE_RE.replace_all(&replaced, " ").trim().to_string()
}

/// Find the URL inside a whitespace-free token, if any.
fn url_in_token(token: &str) -> Option<&str> {
    let candidate = token
        .trim_start_matches(LEADING_TRIM)
        .trim_end_matches(TRAILING_TRIM);
    if candidate.is_empty() {
        return None;
    }

    if is_url(candidate) {
        return Some(candidate);
    }

    // "Visit:example.com" after defragmentation: retry past the colon.
    match candidate.find(':') {
        Some(pos) if !SCHEME_RE.is_match(candidate) => url_in_token(&candidate[pos + 1..]),
        _ => None,
    }
}

fn is_url(candidate: &str) -> bool {
    let (has_scheme, rest) = match SCHEME_RE.find(candidate) {
        Some(m) => (true, &candidate[m.end()..]),
        None => (false, candidate),
    };

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let mut authority = &rest[..authority_end];

    if let Some(at) = authority.rfind('@') {
        if !has_scheme {
            return false;
        }
        authority = &authority[at + 1..];
    }

    let host = match authority.split_once(':') {
        Some((host, port)) => {
            if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
                return false;
            }
            host
        }
        None => authority,
    };

    let host = host.trim_end_matches('.').to_lowercase();
    if has_scheme && host.parse::<std::net::Ipv4Addr>().is_ok() {
        return true;
    }
    if !valid_hostname(&host) {
        return false;
    }

    psl::domain(host.as_bytes()).is_some_and(|d| d.suffix().typ().is_some())
}

fn valid_hostname(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}
