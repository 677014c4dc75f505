//! Storage key constants and builders for ParkApp
//!
//! Every key written by an adapter is prefixed with the application
//! namespace so several apps can share one store without collisions.
//!
//! # Key Patterns
//!
//! - `{namespace}:user` - Logged-in user identity (JSON)
//! - `{namespace}:lot:occupied` - Ids of sessions parked in the lot (JSON array)
//!
//! # Example
//!
//! ```
//! use park_cache::keys;
//!
//! assert_eq!(keys::namespaced("parkapp", keys::USER_KEY), "parkapp:user");
//! ```

/// Default application namespace
pub const DEFAULT_NAMESPACE: &str = "parkapp";

/// Key of the logged-in user identity
pub const USER_KEY: &str = "user";

/// Key of the occupied-spaces ledger
pub const OCCUPIED_KEY: &str = "lot:occupied";

/// Build a namespaced storage key
///
/// # Arguments
///
/// * `namespace` - Application prefix (e.g., "parkapp")
/// * `key` - Logical key (e.g., "user")
///
/// # Returns
///
/// A string in the format `{namespace}:{key}`, or `key` unchanged when the
/// namespace is empty
pub fn namespaced(namespace: &str, key: &str) -> String {
    if namespace.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", namespace, key)
    }
}
