//! Browser-identifier grammar (`name/dottedVersion|httpVersion`) and the
//! compile-time catalogue of known browser/HTTP-version strings.
//!
//! The catalogue is a constant table rather than loaded data (REDESIGN,
//! SPEC_FULL.md §9): unlike the reference loader, which ships it as a JSON
//! sidecar, this implementation bakes it in alongside the header-order and
//! sec-fetch tables in this module tree.

use super::request::BrowserSpec;
use super::request::HttpVersion;

const MISSING_BROWSER_HTTP: &str = "*MISSING_VALUE*|";

/// A parsed `*BROWSER_HTTP` value.
#[derive(Debug, Clone)]
pub struct BrowserHttpInfo {
    pub name: String,
    pub version: Vec<u32>,
    pub http_version: String,
    pub complete_string: String,
}

impl BrowserHttpInfo {
    pub fn parse(value: &str) -> Option<Self> {
        if value == MISSING_BROWSER_HTTP || value == super::MISSING_VALUE {
            return None;
        }
        let (browser, http_version) = value.split_once('|')?;
        let (name, dotted_version) = browser.split_once('/')?;
        let version = dotted_version.split('.').map(|segment| segment.parse().unwrap_or(0)).collect();
        Some(BrowserHttpInfo { name: name.to_string(), version, http_version: http_version.to_string(), complete_string: value.to_string() })
    }

    pub fn major_version(&self) -> u32 {
        self.version.first().copied().unwrap_or(0)
    }
}

/// Browser/HTTP-version identifier strings this build recognizes.
const KNOWN_BROWSER_HTTP_STRINGS: &[&str] = &[
    "chrome/108.0.0.0|1",
    "chrome/108.0.0.0|2",
    "chrome/120.0.6099.71|1",
    "chrome/120.0.6099.71|2",
    "chrome/131.0.6778.85|2",
    "firefox/90.0|1",
    "firefox/90.0|2",
    "firefox/102.0|2",
    "firefox/115.0|2",
    "edge/79.0.309.43|1",
    "edge/79.0.309.43|2",
    "edge/108.0.1462.54|2",
    "edge/120.0.2210.61|2",
    "safari/15.0|1",
    "safari/15.0|2",
    "safari/16.0|2",
    "safari/17.0|2",
];

pub fn known_browsers() -> Vec<BrowserHttpInfo> {
    KNOWN_BROWSER_HTTP_STRINGS.iter().filter_map(|s| BrowserHttpInfo::parse(s)).collect()
}

/// Qualifying browser versions for sec-fetch injection, per SPEC_FULL.md §6.
pub fn qualifies_for_sec_fetch(info: &BrowserHttpInfo) -> bool {
    match info.name.to_lowercase().as_str() {
        "chrome" => info.major_version() >= 76,
        "firefox" => info.major_version() >= 90,
        "edge" => info.major_version() >= 79,
        _ => false,
    }
}

/// Expand caller browser specs into matching `*BROWSER_HTTP` identifier
/// strings from the known-browser catalogue. An empty `specs` list expands
/// to every known string (SPEC_FULL.md §4.4.1 step 1).
pub fn expand_browser_specs(specs: &[BrowserSpec]) -> Vec<String> {
    let catalogue = known_browsers();
    if specs.is_empty() {
        return catalogue.into_iter().map(|b| b.complete_string).collect();
    }
    specs
        .iter()
        .flat_map(|spec| {
            catalogue.iter().filter(move |b| {
                b.name.eq_ignore_ascii_case(&spec.name)
                    && spec.min_version.is_none_or(|min| b.major_version() >= min)
                    && spec.max_version.is_none_or(|max| b.major_version() <= max)
                    && spec.http_version.is_none_or(|http: HttpVersion| http.as_str() == b.http_version)
            }).map(|b| b.complete_string.clone())
        })
        .collect()
}
