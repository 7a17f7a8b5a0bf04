//! Cookie header formatting and cookie-jar import parsers.

use crate::CookieItem;

pub const DEFAULT_COOKIE_DOMAIN: &str = ".google.com";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Joins `name=value` pairs with `"; "` in jar order.
pub fn cookie_header(cookie_jar: &[CookieItem]) -> String {
    cookie_jar
        .iter()
        .map(|cookie| format!("{}={}", cookie.name, cookie.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parses a Netscape/curl cookie-jar file.
///
/// Each record is `domain, include_subdomains, path, secure, expiry, name, value`
/// separated by tabs. Records flagged `#HttpOnly_` are kept; other comments and
/// malformed lines are skipped.
pub fn parse_netscape_cookie_file(raw: &str) -> Vec<CookieItem> {
    let mut cookies = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = if let Some(stripped) = trimmed.strip_prefix(HTTP_ONLY_PREFIX) {
            stripped
        } else if trimmed.starts_with('#') {
            continue;
        } else {
            trimmed
        };

        let fields = record.split('\t').collect::<Vec<_>>();
        let [domain, _include_subdomains, path, secure, _expiry, name, value] = fields.as_slice()
        else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        cookies.push(CookieItem {
            name: (*name).to_string(),
            value: (*value).to_string(),
            domain: Some((*domain).to_string()),
            path: Some((*path).to_string()),
            secure: Some(secure.eq_ignore_ascii_case("TRUE")),
        });
    }
    cookies
}

/// Parses a browser `Cookie:` header value such as `SID=abc; HSID=def`.
pub fn parse_cookie_string(raw: &str, domain: &str) -> Vec<CookieItem> {
    raw.split(';')
        .filter_map(|segment| {
            let (name, value) = segment.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(CookieItem {
                name: name.to_string(),
                value: value.trim().to_string(),
                domain: Some(domain.to_string()),
                path: Some("/".to_string()),
                secure: Some(true),
            })
        })
        .collect()
}

/// Loads a cookie jar from a JSON array, a Netscape file, or a header string.
pub fn load_cookie_jar(raw: &str) -> Result<Vec<CookieItem>, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed);
    }
    if trimmed.lines().any(|line| line.contains('\t')) {
        return Ok(parse_netscape_cookie_file(trimmed));
    }
    Ok(parse_cookie_string(trimmed, DEFAULT_COOKIE_DOMAIN))
}
