//! Derived-field formatting and header ordering: Accept-Language synthesis,
//! sec-fetch blocks, pascalisation, and per-browser header order, all kept
//! as compile-time tables per SPEC_FULL.md §9 REDESIGN rather than loaded
//! data.

use std::collections::HashMap;
use std::collections::HashSet;

use super::request::HttpVersion;

/// Synthesize an `Accept-Language` value from an ordered locale list,
/// per SPEC_FULL.md §6. Caps at 10 locales; emits `en-US,en;q=0.9` if empty.
pub fn accept_language(locales: &[String]) -> String {
    if locales.is_empty() {
        return "en-US,en;q=0.9".to_string();
    }
    let capped: Vec<&String> = locales.iter().take(10).collect();
    let mut parts = vec![capped[0].clone()];
    let mut q = 0.9;
    for locale in &capped[1..] {
        parts.push(format!("{locale};q={q:.1}"));
        q = (q - 0.1_f64).max(0.1);
    }
    parts.join(",")
}

/// The four sec-fetch headers, cased for the given HTTP version.
pub fn sec_fetch_block(http_version: HttpVersion) -> [(&'static str, &'static str); 4] {
    match http_version {
        HttpVersion::Http1 => [
            ("Sec-Fetch-Dest", "document"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Sec-Fetch-Site", "none"),
            ("Sec-Fetch-User", "?1"),
        ],
        HttpVersion::Http2 => [
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-user", "?1"),
        ],
    }
}

/// Pascalise a header key: split on `-`, uppercase each segment's first
/// character. `dnt`/`rtt`/`ect` are emitted fully uppercased; `:`-prefixed
/// pseudo-headers and `sec-ch-ua`-prefixed keys pass through verbatim.
pub fn pascalise(key: &str) -> String {
    let lower = key.to_lowercase();
    if key.starts_with(':') || lower.starts_with("sec-ch-ua") {
        return key.to_string();
    }
    lower
        .split('-')
        .map(|segment| match segment {
            "dnt" | "rtt" | "ect" => segment.to_uppercase(),
            _ => {
                let mut chars = segment.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn header_order_for(browser_name: &str) -> &'static [&'static str] {
    match browser_name {
        "chrome" | "edge" => &[
            "Host",
            "Connection",
            "sec-ch-ua",
            "sec-ch-ua-mobile",
            "sec-ch-ua-platform",
            "Upgrade-Insecure-Requests",
            "User-Agent",
            "Accept",
            "Sec-Fetch-Site",
            "Sec-Fetch-Mode",
            "Sec-Fetch-User",
            "Sec-Fetch-Dest",
            "Accept-Encoding",
            "Accept-Language",
        ],
        "firefox" => &[
            "Host",
            "User-Agent",
            "Accept",
            "Accept-Language",
            "Accept-Encoding",
            "DNT",
            "Connection",
            "Upgrade-Insecure-Requests",
            "Sec-Fetch-Dest",
            "Sec-Fetch-Mode",
            "Sec-Fetch-Site",
            "Sec-Fetch-User",
        ],
        "safari" => &["Host", "Accept", "User-Agent", "Accept-Language", "Accept-Encoding", "Connection"],
        _ => &["Host", "User-Agent", "Accept", "Accept-Language", "Accept-Encoding", "Connection"],
    }
}

fn detect_browser_name(user_agent: &str) -> &'static str {
    let lower = user_agent.to_lowercase();
    if lower.contains("firefox") {
        "firefox"
    } else if lower.contains("edg/") {
        "edge"
    } else if lower.contains("chrome") {
        "chrome"
    } else if lower.contains("safari") {
        "safari"
    } else {
        "chrome"
    }
}

/// Reorder `headers` per the detected browser's order table, appending any
/// keys the table doesn't mention at the end, in their current order.
pub fn order_headers(headers: &HashMap<String, String>, user_agent: &str) -> Vec<(String, String)> {
    let order = header_order_for(detect_browser_name(user_agent));
    let mut seen = HashSet::with_capacity(headers.len());
    let mut ordered = Vec::with_capacity(headers.len());
    for key in order {
        if let Some(value) = headers.get(*key) {
            ordered.push((key.to_string(), value.clone()));
            seen.insert(*key);
        }
    }
    for (key, value) in headers {
        if !seen.contains(key.as_str()) {
            ordered.push((key.clone(), value.clone()));
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_language_empty_list_falls_back() {
        assert_eq!(accept_language(&[]), "en-US,en;q=0.9");
    }

    #[test]
    fn accept_language_synthesizes_descending_q_values() {
        let locales = vec!["en-US".to_string(), "fr".to_string(), "de".to_string()];
        assert_eq!(accept_language(&locales), "en-US,fr;q=0.9,de;q=0.8");
    }

    #[test]
    fn accept_language_clamps_q_at_one_tenth() {
        let locales: Vec<String> = (0..12).map(|i| format!("l{i}")).collect();
        let result = accept_language(&locales);
        let tail: Vec<&str> = result.split(',').collect();
        assert_eq!(tail.len(), 10);
        assert!(tail.last().unwrap().ends_with("q=0.1"));
    }

    #[test]
    fn pascalise_is_idempotent() {
        for key in ["user-agent", "dnt", "sec-ch-ua-platform", ":authority", "accept-encoding"] {
            let once = pascalise(key);
            assert_eq!(pascalise(&once), once);
        }
    }

    #[test]
    fn pascalise_handles_exceptions() {
        assert_eq!(pascalise("dnt"), "DNT");
        assert_eq!(pascalise("rtt"), "RTT");
        assert_eq!(pascalise("ect"), "ECT");
        assert_eq!(pascalise(":authority"), ":authority");
        assert_eq!(pascalise("sec-ch-ua-mobile"), "sec-ch-ua-mobile");
        assert_eq!(pascalise("user-agent"), "User-Agent");
        assert_eq!(pascalise("accept-language"), "Accept-Language");
    }

    #[test]
    fn order_headers_follows_browser_table_then_appends_rest() {
        let mut headers = HashMap::new();
        headers.insert("Accept-Language".to_string(), "en-US".to_string());
        headers.insert("User-Agent".to_string(), "Mozilla/5.0 Chrome/120".to_string());
        headers.insert("X-Custom".to_string(), "value".to_string());
        let ordered = order_headers(&headers, "Mozilla/5.0 Chrome/120");
        let keys: Vec<&str> = ordered.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.iter().position(|k| *k == "User-Agent").unwrap() < keys.iter().position(|k| *k == "Accept-Language").unwrap());
        assert_eq!(keys.last(), Some(&"X-Custom"));
    }
}
