//! Workspace-wide constants.

/// SDK version reported in diagnostics.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Storage key holding the anonymous identifier.
pub const ANONYMOUS_ID_KEY: &str = "pulse.anonymous_id";

/// Storage key holding the serialized session metadata.
pub const SESSION_KEY: &str = "pulse.session";

/// Header carrying the project/tenant id in primary transport mode.
pub const TENANT_HEADER: &str = "X-Tenant-Id";

/// Attribute that opts an element (and its subtree) out of click capture.
pub const IGNORE_ATTRIBUTE: &str = "data-pulse-ignore";

/// Maximum number of characters of element text kept on click events.
pub const MAX_ELEMENT_TEXT_CHARS: usize = 100;

/// Maximum number of ancestors walked when building a selector path.
pub const MAX_SELECTOR_DEPTH: usize = 5;

/// Response code the endpoint uses for a fully successful request.
pub const SUCCESS_CODE: i64 = 200;
