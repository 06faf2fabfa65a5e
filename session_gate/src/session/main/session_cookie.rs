use crate::session::errors::SessionError;
use crate::session::types::Session;
use crate::utils::{base64url_decode, base64url_encode};

use super::cookie::{CookieEntry, CookieOptions, CookieStore};

/// Largest value stored in a single cookie before splitting into chunks.
/// Keeps name, value and attributes below the 4096 byte per-cookie limit.
pub(crate) const MAX_CHUNK_SIZE: usize = 3180;

const BASE64_PREFIX: &str = "base64-";

pub(super) fn encode_session(session: &Session) -> Result<String, SessionError> {
    let json = serde_json::to_string(session)
        .map_err(|e| SessionError::Cookie(format!("Failed to serialize session: {e}")))?;
    Ok(format!("{BASE64_PREFIX}{}", base64url_encode(json.as_bytes())))
}

pub(super) fn decode_session(raw: &str) -> Result<Session, SessionError> {
    let json = match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = base64url_decode(encoded)?;
            String::from_utf8(bytes)
                .map_err(|e| SessionError::Cookie(format!("Session cookie is not UTF-8: {e}")))?
        }
        None => raw.to_string(),
    };
    serde_json::from_str(&json)
        .map_err(|e| SessionError::Cookie(format!("Failed to deserialize session: {e}")))
}

fn chunk_name(name: &str, index: usize) -> String {
    format!("{name}.{index}")
}

fn is_chunk_of(candidate: &str, name: &str) -> bool {
    candidate
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

fn existing_chunk_names(store: &CookieStore, name: &str) -> Vec<String> {
    let mut names: Vec<String> = store
        .read_all()
        .iter()
        .filter(|(n, _)| is_chunk_of(n, name))
        .map(|(n, _)| n.clone())
        .collect();
    names.dedup();
    names
}

/// Read a possibly chunked cookie value: `name`, or `name.0`, `name.1`, ...
pub(super) fn read_chunked(store: &CookieStore, name: &str) -> Option<String> {
    if let Some(value) = store.get(name) {
        return Some(value.to_string());
    }

    let mut combined = String::new();
    let mut index = 0;
    while let Some(chunk) = store.get(&chunk_name(name, index)) {
        combined.push_str(chunk);
        index += 1;
    }

    (index > 0).then_some(combined)
}

/// Entries that store `value` under `name`, expiring whatever representation
/// the request currently carries that the new one does not overwrite.
pub(super) fn chunk_entries(
    store: &CookieStore,
    name: &str,
    value: &str,
    options: &CookieOptions,
) -> Vec<CookieEntry> {
    let chunks: Vec<&str> = value
        .as_bytes()
        .chunks(MAX_CHUNK_SIZE)
        .map(|c| std::str::from_utf8(c).unwrap_or_default())
        .collect();

    let mut entries = Vec::new();

    if chunks.len() <= 1 {
        entries.push(CookieEntry::new(name, value, options.clone()));
        for stale in existing_chunk_names(store, name) {
            entries.push(CookieEntry::removal(stale, options));
        }
        return entries;
    }

    let written: Vec<String> = (0..chunks.len()).map(|i| chunk_name(name, i)).collect();
    for (written_name, chunk) in written.iter().zip(chunks) {
        entries.push(CookieEntry::new(written_name.clone(), chunk, options.clone()));
    }
    if store.get(name).is_some() {
        entries.push(CookieEntry::removal(name, options));
    }
    for stale in existing_chunk_names(store, name) {
        if !written.contains(&stale) {
            entries.push(CookieEntry::removal(stale, options));
        }
    }
    entries
}

/// Entries expiring every representation of `name` present in the request
pub(super) fn removal_entries(
    store: &CookieStore,
    name: &str,
    options: &CookieOptions,
) -> Vec<CookieEntry> {
    let mut entries = Vec::new();
    if store.get(name).is_some() {
        entries.push(CookieEntry::removal(name, options));
    }
    for chunk in existing_chunk_names(store, name) {
        entries.push(CookieEntry::removal(chunk, options));
    }
    entries
}
