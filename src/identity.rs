//! Client identity rotation for upstream calls.
//!
//! Upstream acceptance of an API call depends on which client identity
//! headers accompany it, and the native identity of the hosting page is not
//! always the one upstream honors. The rotator tries a fixed priority list
//! of profiles, strictly sequentially, swallowing per-profile failures.

use crate::error::FetchError;
use std::future::Future;
use tracing::debug;

/// A device/client profile presented to upstream endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentityProfile {
    pub name: &'static str,
    /// Value of the numeric client-name header.
    pub client_header_id: &'static str,
    /// Version string sent in the request context.
    pub client_version: &'static str,
}

/// Fixed priority order: the page's native web client first, then the
/// alternates upstream is known to accept when the web identity is refused.
pub const PROFILES: &[ClientIdentityProfile] = &[
    ClientIdentityProfile {
        name: "WEB",
        client_header_id: "1",
        client_version: "2.20240101.00.00",
    },
    ClientIdentityProfile {
        name: "ANDROID",
        client_header_id: "3",
        client_version: "19.09.37",
    },
    ClientIdentityProfile {
        name: "WEB_EMBEDDED_PLAYER",
        client_header_id: "56",
        client_version: "1.20240101.00.00",
    },
];

/// Run `op` once per profile in fixed order; the first call yielding a
/// value wins. Network errors, non-2xx statuses, and unparseable bodies are
/// logged and swallowed; if every profile fails the result is `None`,
/// never an error.
pub async fn rotate<T, F, Fut>(mut op: F) -> Option<T>
where
    F: FnMut(&'static ClientIdentityProfile) -> Fut,
    Fut: Future<Output = Result<Option<T>, FetchError>>,
{
    for profile in PROFILES {
        match op(profile).await {
            Ok(Some(value)) => {
                debug!(profile = profile.name, "client profile accepted");
                return Some(value);
            }
            Ok(None) => {
                debug!(profile = profile.name, "client profile yielded nothing");
            }
            Err(err) => {
                debug!(profile = profile.name, error = %err, "client profile call failed");
            }
        }
    }
    None
}
