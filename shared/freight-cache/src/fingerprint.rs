//! UUIDv5 cache-key fingerprinting.
//!
//! Keys are derived from the concatenation of a carrier tag (or a
//! request-level tag for product envelopes), the request parameters in
//! canonical order, and the filter parameters — including `none`
//! placeholders so two requests that differ only in an absent filter never
//! collide.

use uuid::Uuid;

/// Build the UUIDv5 fingerprint for a cache key.
///
/// `tag` identifies the carrier (or "product" for the aggregator's own
/// envelope cache); `params` and `filters` are canonical `key=value` pairs
/// already rendered to strings by the caller, in a stable order.
pub fn fingerprint(tag: &str, params: &[(&str, String)], filters: &[(&str, Option<String>)]) -> Uuid {
    let mut source = String::from(tag);
    for (key, value) in params {
        source.push('|');
        source.push_str(key);
        source.push('=');
        source.push_str(value);
    }
    for (key, value) in filters {
        source.push('|');
        source.push_str(key);
        source.push('=');
        source.push_str(value.as_deref().unwrap_or("none"));
    }
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, source.as_bytes())
}
