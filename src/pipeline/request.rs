//! Caller-facing request types for header and fingerprint generation.
//! Ground: donutbrowser's `FingerprintOptions`/`ScreenConstraints` shape,
//! restated as the spec's request fields rather than that crate's schema.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http1,
    Http2,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http1 => "1",
            HttpVersion::Http2 => "2",
        }
    }
}

/// One entry in a caller's browser whitelist: a name plus optional major
/// version range and HTTP version, per SPEC_FULL.md §4.4.1 step 1.
#[derive(Debug, Clone)]
pub struct BrowserSpec {
    pub name: String,
    pub min_version: Option<u32>,
    pub max_version: Option<u32>,
    pub http_version: Option<HttpVersion>,
}

impl BrowserSpec {
    pub fn named(name: impl Into<String>) -> Self {
        BrowserSpec { name: name.into(), min_version: None, max_version: None, http_version: None }
    }
}

#[derive(Debug, Clone)]
pub struct HeaderRequest {
    pub browsers: Vec<BrowserSpec>,
    pub operating_systems: Vec<String>,
    pub devices: Vec<String>,
    pub locales: Vec<String>,
    pub http_version: HttpVersion,
    pub strict: bool,
    pub user_agent_whitelist: Option<Vec<String>>,
    pub request_dependent_headers: HashMap<String, String>,
}

impl Default for HeaderRequest {
    fn default() -> Self {
        HeaderRequest {
            browsers: Vec::new(),
            operating_systems: Vec::new(),
            devices: Vec::new(),
            locales: Vec::new(),
            http_version: HttpVersion::Http2,
            strict: false,
            user_agent_whitelist: None,
            request_dependent_headers: HashMap::new(),
        }
    }
}

/// A screen width/height range; `None` bounds are unconstrained.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenConstraints {
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
}

impl ScreenConstraints {
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.min_width.is_none_or(|min| width >= min)
            && self.max_width.is_none_or(|max| width <= max)
            && self.min_height.is_none_or(|min| height >= min)
            && self.max_height.is_none_or(|max| height <= max)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FingerprintRequest {
    pub headers: HeaderRequest,
    pub screen: Option<ScreenConstraints>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_constraints_match_within_bounds() {
        let constraints = ScreenConstraints { min_width: Some(1900), max_width: Some(1920), min_height: None, max_height: None };
        assert!(constraints.matches(1920, 1080));
        assert!(!constraints.matches(1280, 720));
    }

    #[test]
    fn unconstrained_screen_matches_everything() {
        let constraints = ScreenConstraints::default();
        assert!(constraints.matches(1, 1));
    }
}
