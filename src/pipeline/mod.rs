//! Composition of the input-selector network and the value network into a
//! single request/response pipeline: relaxation, derived-field injection,
//! filtering, and ordering. See SPEC_FULL.md §4.4.

pub mod browser;
pub mod generator;
pub mod headers;
pub mod request;

pub use browser::BrowserHttpInfo;
pub use generator::Pipeline;
pub use request::BrowserSpec;
pub use request::FingerprintRequest;
pub use request::HeaderRequest;
pub use request::HttpVersion;
pub use request::ScreenConstraints;

/// Dataset sentinel: a sampled value equal to this is dropped from output.
pub const MISSING_VALUE: &str = "*MISSING_VALUE*";

/// Prefix marking a value as a JSON payload encoded as a string.
pub const STRINGIFIED_PREFIX: &str = "*STRINGIFIED*";

pub(crate) const BROWSER_HTTP_NODE: &str = "*BROWSER_HTTP";
pub(crate) const BROWSER_NAME_NODE: &str = "*BROWSER";
pub(crate) const OPERATING_SYSTEM_NODE: &str = "*OPERATING_SYSTEM";
pub(crate) const DEVICE_NODE: &str = "*DEVICE";
pub(crate) const SCREEN_NODE: &str = "screen";
pub(crate) const USER_AGENT_HTTP1_NODE: &str = "User-Agent";
pub(crate) const USER_AGENT_HTTP2_NODE: &str = "user-agent";
pub(crate) const FINGERPRINT_USER_AGENT_NODE: &str = "userAgent";
pub(crate) const STUB_USER_AGENT: &str = "Mozilla/5.0";

/// Default locale list a relaxation step resets `locales` to.
pub const DEFAULT_LOCALES: &[&str] = &["en-US"];
/// Default device whitelist a relaxation step resets `devices` to.
pub const DEFAULT_DEVICES: &[&str] = &["desktop", "mobile"];
/// Default OS whitelist a relaxation step resets `operating_systems` to.
pub const DEFAULT_OPERATING_SYSTEMS: &[&str] = &["Windows", "macOS", "Linux", "Android", "iOS"];
/// Default browser names a relaxation step resets `browsers` to.
pub const DEFAULT_BROWSER_NAMES: &[&str] = &["chrome", "firefox", "edge", "safari"];
