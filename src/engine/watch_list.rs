//! Encoding of the comma-joined lists kept in the store.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref KEY_PATH: Regex =
        Regex::new(r"^(/[\w\-\.]+)+$").expect("key path pattern is valid");
}

/// True for absolute keys made of word characters, dashes and dots.
pub fn is_valid_key(key: &str) -> bool {
    KEY_PATH.is_match(key)
}

/// A key may be added to the watch list only if it is well formed and lies
/// under `watch_base`.
pub fn is_watchable_key(
    key: &str,
    watch_base: &str,
) -> bool {
    key.starts_with(watch_base) && is_valid_key(key)
}

/// Decodes a watch list value.
///
/// Entries are trimmed; empty entries and repeated keys are dropped, keeping
/// the first occurrence.
pub fn decode_watch_list(value: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in value.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

pub fn encode_watch_list(keys: &[String]) -> String {
    keys.join(",")
}

/// Decodes the webhook endpoint list. An empty value yields no endpoints.
pub fn decode_endpoints(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}
