//! The two-network pipeline: header generation (§4.4.1) and fingerprint
//! generation (§4.4.2), built on [`crate::network::Network`]'s sampling and
//! propagation primitives. Ground: donutbrowser's
//! `FingerprintGenerator::{get_fingerprint,build_constraints,filter_screen_values,
//! transform_sample,order_headers}`, restructured around this crate's
//! `Network`/explicit request-relaxation state machine instead of that
//! crate's three-network, retry-loop implementation.

use std::collections::HashMap;
use std::collections::HashSet;

use rand::Rng;

use super::BROWSER_HTTP_NODE;
use super::BROWSER_NAME_NODE;
use super::DEFAULT_BROWSER_NAMES;
use super::DEFAULT_DEVICES;
use super::DEFAULT_LOCALES;
use super::DEFAULT_OPERATING_SYSTEMS;
use super::DEVICE_NODE;
use super::FINGERPRINT_USER_AGENT_NODE;
use super::MISSING_VALUE;
use super::OPERATING_SYSTEM_NODE;
use super::SCREEN_NODE;
use super::STRINGIFIED_PREFIX;
use super::STUB_USER_AGENT;
use super::USER_AGENT_HTTP1_NODE;
use super::USER_AGENT_HTTP2_NODE;
use super::browser::BrowserHttpInfo;
use super::browser::expand_browser_specs;
use super::browser::qualifies_for_sec_fetch;
use super::headers::accept_language;
use super::headers::order_headers;
use super::headers::pascalise;
use super::headers::sec_fetch_block;
use super::request::FingerprintRequest;
use super::request::HeaderRequest;
use super::request::HttpVersion;
use crate::error::PipelineError;
use crate::network::Constraints;
use crate::network::Network;
use crate::network::Sample;

/// Composes an input-selector network with a value network to produce
/// mutually consistent header sets and fingerprints.
pub struct Pipeline {
    input: Network,
    value: Network,
}

impl Pipeline {
    pub fn new(input: Network, value: Network) -> Self {
        Pipeline { input, value }
    }

    /// Generate one HTTP request's worth of headers, in the given order and
    /// casing. See SPEC_FULL.md §4.4.1.
    pub fn generate_headers(&self, request: &HeaderRequest, rng: &mut impl Rng) -> Result<Vec<(String, String)>, PipelineError> {
        let (headers, _sample) = self.generate_headers_with_sample(request, None, rng)?;
        Ok(headers)
    }

    /// Generate a fingerprint sample plus the headers it's consistent with.
    /// See SPEC_FULL.md §4.4.2.
    pub fn generate_fingerprint(&self, request: &FingerprintRequest, rng: &mut impl Rng) -> Result<(Sample, Vec<(String, String)>), PipelineError> {
        let screen_whitelist = request.screen.as_ref().and_then(|constraints| self.filter_screen_values(constraints));

        let (headers, i_sample) = self.generate_headers_with_sample(&request.headers, screen_whitelist.as_ref(), rng)?;

        let user_agent_key = if request.headers.http_version == HttpVersion::Http2 { USER_AGENT_HTTP2_NODE } else { USER_AGENT_HTTP1_NODE };
        let user_agent = i_sample.get(user_agent_key).or_else(|| headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(user_agent_key)).map(|(_, v)| v));
        let user_agent = user_agent.cloned().unwrap_or_else(|| headers.iter().find(|(k, _)| k.eq_ignore_ascii_case("user-agent")).map(|(_, v)| v.clone()).unwrap_or_default());

        let mut pin: Constraints = HashMap::new();
        pin.insert(FINGERPRINT_USER_AGENT_NODE.to_string(), HashSet::from([user_agent]));
        if let Some(whitelist) = &screen_whitelist {
            pin.insert(SCREEN_NODE.to_string(), whitelist.clone());
        }

        let fingerprint_sample = self
            .value
            .sample_consistent(&pin, rng)
            .or_else(|| {
                if request.headers.strict {
                    None
                } else {
                    pin.remove(SCREEN_NODE);
                    self.value.sample_consistent(&pin, rng)
                }
            })
            .ok_or(PipelineError::UnsatisfiableConstraints)?;

        let mut post_processed = postprocess_sample(&fingerprint_sample);
        derive_missing_from_platform(&mut post_processed);

        Ok((post_processed, headers))
    }

    fn filter_screen_values(&self, constraints: &super::ScreenConstraints) -> Option<HashSet<String>> {
        let candidates = self.input.possible_values_of(SCREEN_NODE)?;
        let filtered: HashSet<String> = candidates
            .iter()
            .filter(|candidate| match candidate.strip_prefix(STRINGIFIED_PREFIX) {
                Some(json) => match serde_json::from_str::<serde_json::Value>(json) {
                    Ok(parsed) => {
                        let width = parsed.get("width").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                        let height = parsed.get("height").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                        constraints.matches(width, height)
                    }
                    Err(_) => true,
                },
                None => true,
            })
            .cloned()
            .collect();
        if filtered.is_empty() { None } else { Some(filtered) }
    }

    fn generate_headers_with_sample(
        &self,
        request: &HeaderRequest,
        screen_whitelist: Option<&HashSet<String>>,
        rng: &mut impl Rng,
    ) -> Result<(Vec<(String, String)>, Sample), PipelineError> {
        let mut request = request.clone();
        let mut relaxed_locales = false;
        let mut relaxed_devices = false;
        let mut relaxed_os = false;
        let mut relaxed_browsers = false;

        loop {
            let constraints = self.build_constraints(&request, screen_whitelist)?;
            let i_sample = self.input.sample_consistent(&constraints, rng);

            let Some(i_sample) = i_sample else {
                if request.http_version == HttpVersion::Http1 {
                    log::info!("http/1 constraints unsatisfiable, retrying once at http/2");
                    request.http_version = HttpVersion::Http2;
                    continue;
                }
                if !relaxed_locales && request.locales.len() > 1 {
                    log::info!("relaxing locales to the default-supported set");
                    request.locales = DEFAULT_LOCALES.iter().map(|s| s.to_string()).collect();
                    relaxed_locales = true;
                    continue;
                }
                if !relaxed_devices && request.devices.len() > 1 {
                    log::info!("relaxing devices to the default-supported set");
                    request.devices = DEFAULT_DEVICES.iter().map(|s| s.to_string()).collect();
                    relaxed_devices = true;
                    continue;
                }
                if !relaxed_os && request.operating_systems.len() > 1 {
                    log::info!("relaxing operating systems to the default-supported set");
                    request.operating_systems = DEFAULT_OPERATING_SYSTEMS.iter().map(|s| s.to_string()).collect();
                    relaxed_os = true;
                    continue;
                }
                if !relaxed_browsers && request.browsers.len() > 1 {
                    log::info!("relaxing browsers to the default-supported set");
                    request.browsers = DEFAULT_BROWSER_NAMES.iter().map(|name| super::BrowserSpec::named(*name)).collect();
                    relaxed_browsers = true;
                    continue;
                }
                if request.strict {
                    return Err(PipelineError::UnsatisfiableConstraints);
                }
                log::warn!("no consistent sample after full relaxation, falling back to stub user-agent");
                return Ok((stub_headers(request.http_version), stub_sample(request.http_version)));
            };

            let v_sample = self.value.sample(&i_sample, rng);
            let mut merged = i_sample.clone();
            merged.extend(v_sample);

            let browser_http = merged.get(BROWSER_HTTP_NODE).and_then(|value| BrowserHttpInfo::parse(value));
            let accept_language_key = if request.http_version == HttpVersion::Http2 { "accept-language" } else { "Accept-Language" };
            merged.insert(accept_language_key.to_string(), accept_language(&request.locales));

            if let Some(info) = &browser_http {
                if qualifies_for_sec_fetch(info) {
                    for (key, value) in sec_fetch_block(request.http_version) {
                        merged.insert(key.to_string(), value.to_string());
                    }
                }
            }

            let mut filtered: HashMap<String, String> = merged
                .iter()
                .filter(|(key, value)| {
                    !key.starts_with('*') && value.as_str() != MISSING_VALUE && !value.is_empty() && !(key.eq_ignore_ascii_case("connection") && value.eq_ignore_ascii_case("close"))
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

            for (key, value) in &request.request_dependent_headers {
                filtered.insert(key.clone(), value.clone());
            }

            let user_agent_key = if request.http_version == HttpVersion::Http2 { USER_AGENT_HTTP2_NODE } else { USER_AGENT_HTTP1_NODE };
            let user_agent = filtered.get(user_agent_key).cloned().ok_or(PipelineError::MissingUserAgent)?;

            let ordered = order_headers(&filtered, &user_agent);
            let final_headers = if request.http_version == HttpVersion::Http2 {
                ordered.into_iter().map(|(key, value)| (pascalise(&key), value)).collect()
            } else {
                ordered
            };

            return Ok((final_headers, merged));
        }
    }

    fn build_constraints(&self, request: &HeaderRequest, screen_whitelist: Option<&HashSet<String>>) -> Result<Constraints, PipelineError> {
        let mut constraints: Constraints = HashMap::new();

        let browser_whitelist: HashSet<String> = expand_browser_specs(&request.browsers).into_iter().collect();
        constraints.insert(BROWSER_HTTP_NODE.to_string(), browser_whitelist);

        if !request.operating_systems.is_empty() {
            constraints.insert(OPERATING_SYSTEM_NODE.to_string(), request.operating_systems.iter().cloned().collect());
        }
        if !request.devices.is_empty() {
            constraints.insert(DEVICE_NODE.to_string(), request.devices.iter().cloned().collect());
        }
        if let Some(whitelist) = screen_whitelist {
            constraints.insert(SCREEN_NODE.to_string(), whitelist.clone());
        }

        if let Some(user_agent_whitelist) = &request.user_agent_whitelist {
            self.restrict_browser_http_by_user_agent(&mut constraints, user_agent_whitelist);
        }

        for (name, allowed) in &constraints {
            if allowed.is_empty() {
                return Err(PipelineError::EmptyConstraint(name.clone()));
            }
        }

        Ok(constraints)
    }

    /// Filter rule from SPEC_FULL.md §4.4.1 step 2: `"x|1"` survives if the
    /// HTTP/1 user-agent domain doesn't bind `*BROWSER_HTTP`'s implied
    /// browser name, or does and the surviving set contains `x` exactly
    /// (symmetric for `"x|2"`). Set membership, not substring match — a
    /// `*BROWSER` value of `chromium` must not count as a `chrome` survivor.
    fn restrict_browser_http_by_user_agent(&self, constraints: &mut Constraints, user_agent_whitelist: &[String]) {
        let Some(browser_http) = constraints.get(BROWSER_HTTP_NODE).cloned() else { return };
        let whitelist: HashSet<String> = user_agent_whitelist.iter().cloned().collect();

        let http1_domain = self.value.possible_values(&Constraints::from([(USER_AGENT_HTTP1_NODE.to_string(), whitelist.clone())]));
        let http2_domain = self.value.possible_values(&Constraints::from([(USER_AGENT_HTTP2_NODE.to_string(), whitelist.clone())]));

        let survives = |value: &str| -> bool {
            let Some(info) = BrowserHttpInfo::parse(value) else { return true };
            let domain = match info.http_version.as_str() {
                "1" => &http1_domain,
                "2" => &http2_domain,
                _ => return true,
            };
            domain.as_ref().and_then(|d| d.get(BROWSER_NAME_NODE)).is_none_or(|surviving| surviving.contains(&info.name))
        };

        let filtered: HashSet<String> = browser_http.into_iter().filter(|v| survives(v)).collect();
        constraints.insert(BROWSER_HTTP_NODE.to_string(), filtered);
    }
}

fn stub_headers(http_version: HttpVersion) -> Vec<(String, String)> {
    let key = if http_version == HttpVersion::Http2 { "user-agent" } else { "User-Agent" };
    vec![(key.to_string(), STUB_USER_AGENT.to_string())]
}

fn stub_sample(http_version: HttpVersion) -> Sample {
    let key = if http_version == HttpVersion::Http2 { USER_AGENT_HTTP2_NODE } else { USER_AGENT_HTTP1_NODE };
    Sample::from([(key.to_string(), STUB_USER_AGENT.to_string())])
}

/// Drop `*MISSING_VALUE*` entries and unwrap `*STRINGIFIED*` payloads.
fn postprocess_sample(sample: &Sample) -> Sample {
    sample
        .iter()
        .filter(|(_, value)| value.as_str() != MISSING_VALUE)
        .map(|(key, value)| {
            let unwrapped = match value.strip_prefix(STRINGIFIED_PREFIX) {
                Some(payload) if serde_json::from_str::<serde_json::Value>(payload).is_ok() => payload.to_string(),
                _ => value.clone(),
            };
            (key.clone(), unwrapped)
        })
        .collect()
}

/// Derive battery/multimedia-device/font fields from `platform` when the
/// sample doesn't already carry them.
fn derive_missing_from_platform(sample: &mut Sample) {
    let platform = sample.get("platform").cloned().unwrap_or_default();
    sample.entry("battery".to_string()).or_insert_with(|| default_battery_for(&platform));
    sample.entry("multimediaDevices".to_string()).or_insert_with(|| default_multimedia_devices_for(&platform));
    sample.entry("fonts".to_string()).or_insert_with(|| default_fonts_for(&platform));
}

fn default_battery_for(platform: &str) -> String {
    if platform.to_lowercase().contains("win") || platform.to_lowercase().contains("mac") {
        r#"{"charging":true,"level":1.0}"#.to_string()
    } else {
        r#"{"charging":false,"level":0.87}"#.to_string()
    }
}

fn default_multimedia_devices_for(_platform: &str) -> String {
    r#"{"speakers":1,"micros":1,"webcams":1}"#.to_string()
}

fn default_fonts_for(platform: &str) -> String {
    if platform.to_lowercase().contains("win") {
        r#"["Arial","Calibri","Segoe UI","Times New Roman"]"#.to_string()
    } else if platform.to_lowercase().contains("mac") {
        r#"["Helvetica","San Francisco","Times"]"#.to_string()
    } else {
        r#"["DejaVu Sans","Liberation Sans"]"#.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpt::CptTree;
    use crate::node::Node;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn leaf_node(name: &str, value: &str) -> Node {
        Node {
            name: name.to_string(),
            parent_names: vec![],
            possible_values: vec![value.to_string()],
            conditional_probabilities: CptTree::Leaf { distribution: HashMap::from([(value.to_string(), 1.0)]) },
        }
    }

    fn single_node_network(name: &str, value: &str) -> Network {
        Network::new(vec![leaf_node(name, value)]).unwrap()
    }

    const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/108.0.0.0 Safari/537.36";

    fn value_network_bound_to(user_agent: &str) -> Network {
        Network::new(vec![leaf_node(USER_AGENT_HTTP1_NODE, user_agent), leaf_node(USER_AGENT_HTTP2_NODE, user_agent)]).unwrap()
    }

    fn s4_pipeline() -> Pipeline {
        let input = single_node_network(BROWSER_HTTP_NODE, "chrome/108.0.0.0|2");
        let value = value_network_bound_to(CHROME_UA);
        Pipeline::new(input, value)
    }

    /// An input network whose only `*BROWSER_HTTP` value matches no known
    /// browser catalogue entry, so no relaxation step can ever succeed and
    /// the pipeline is forced through every relaxation step to the stub.
    fn unsatisfiable_pipeline() -> Pipeline {
        let input = single_node_network(BROWSER_HTTP_NODE, "opera/76.0|2");
        let value = value_network_bound_to(CHROME_UA);
        Pipeline::new(input, value)
    }

    #[test]
    fn s4_header_generation_happy_path() {
        let pipeline = s4_pipeline();
        let mut rng = SmallRng::seed_from_u64(1);
        let request = HeaderRequest {
            browsers: vec![BrowserSpec::named("chrome")],
            locales: vec!["en-US".to_string(), "en".to_string()],
            http_version: HttpVersion::Http2,
            ..HeaderRequest::default()
        };
        let headers = pipeline.generate_headers(&request, &mut rng).unwrap();
        let map: HashMap<_, _> = headers.into_iter().collect();
        assert_eq!(map.get("User-Agent").unwrap(), "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/108.0.0.0 Safari/537.36");
        assert_eq!(map.get("Accept-Language").unwrap(), "en-US,en;q=0.9");
        assert_eq!(map.get("Sec-Fetch-Dest").unwrap(), "document");
        assert_eq!(map.get("Sec-Fetch-Mode").unwrap(), "navigate");
        assert_eq!(map.get("Sec-Fetch-Site").unwrap(), "none");
        assert_eq!(map.get("Sec-Fetch-User").unwrap(), "?1");
    }

    #[test]
    fn s5_strict_failure_surfaces_unsatisfiable_constraints() {
        let pipeline = s4_pipeline();
        let mut rng = SmallRng::seed_from_u64(2);
        let request = HeaderRequest { browsers: vec![BrowserSpec::named("firefox")], strict: true, ..HeaderRequest::default() };
        let result = pipeline.generate_headers(&request, &mut rng);
        assert!(matches!(result, Err(PipelineError::UnsatisfiableConstraints)));
    }

    #[test]
    fn s6_relaxation_eventually_falls_back_to_stub() {
        let pipeline = unsatisfiable_pipeline();
        let mut rng = SmallRng::seed_from_u64(3);
        let request = HeaderRequest {
            browsers: vec![BrowserSpec::named("firefox"), BrowserSpec::named("safari")],
            strict: false,
            locales: vec!["en-US".to_string(), "fr".to_string(), "de".to_string()],
            http_version: HttpVersion::Http2,
            ..HeaderRequest::default()
        };
        let headers = pipeline.generate_headers(&request, &mut rng).unwrap();
        let map: HashMap<_, _> = headers.into_iter().collect();
        assert_eq!(map.get("user-agent").unwrap(), STUB_USER_AGENT);
    }

    #[test]
    fn pascalisation_applied_only_for_http2() {
        let pipeline = s4_pipeline();
        let mut rng = SmallRng::seed_from_u64(4);
        let request = HeaderRequest { browsers: vec![BrowserSpec::named("firefox"), BrowserSpec::named("safari")], http_version: HttpVersion::Http1, ..HeaderRequest::default() };
        let headers = pipeline.generate_headers(&request, &mut rng).unwrap();
        assert!(headers.iter().any(|(k, _)| k == "User-Agent" || k == "user-agent"));
    }

    /// A value network whose only surviving `*BROWSER` value is `chromium`,
    /// a distinct browser from `chrome`: the user-agent-whitelist filter
    /// must not let `chrome/…|2` survive just because `"chromium"` contains
    /// `"chrome"` as a substring.
    fn chromium_value_network() -> Network {
        let browser = Node {
            name: BROWSER_NAME_NODE.to_string(),
            parent_names: vec![],
            possible_values: vec!["chromium".to_string()],
            conditional_probabilities: CptTree::Leaf { distribution: HashMap::from([("chromium".to_string(), 1.0)]) },
        };
        let user_agent = Node {
            name: USER_AGENT_HTTP2_NODE.to_string(),
            parent_names: vec![BROWSER_NAME_NODE.to_string()],
            possible_values: vec!["Chromium/120.0".to_string()],
            conditional_probabilities: CptTree::Branch {
                deeper: HashMap::from([(
                    "chromium".to_string(),
                    CptTree::Leaf { distribution: HashMap::from([("Chromium/120.0".to_string(), 1.0)]) },
                )]),
                skip: None,
            },
        };
        Network::new(vec![browser, user_agent]).unwrap()
    }

    #[test]
    fn user_agent_whitelist_restriction_uses_exact_browser_name_match() {
        let input = single_node_network(BROWSER_HTTP_NODE, "chrome/108.0.0.0|2");
        let value = chromium_value_network();
        let pipeline = Pipeline::new(input, value);

        let mut constraints: Constraints = HashMap::new();
        constraints.insert(BROWSER_HTTP_NODE.to_string(), HashSet::from(["chrome/108.0.0.0|2".to_string()]));
        pipeline.restrict_browser_http_by_user_agent(&mut constraints, &["Chromium/120.0".to_string()]);

        assert!(constraints[BROWSER_HTTP_NODE].is_empty(), "`chrome` must not survive a `chromium`-only induced domain");
    }
}
