//! Canonical form of wire values
//!
//! Provides a deterministic string representation of attribute values that
//! ignores map key order and set member order. Used for comparison, key
//! indexing, and change detection before writes.

use crate::codec::{format_number, parse_number};
use crate::types::*;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;

/// Canonicalize a wire value
pub fn canonicalize(v: &AttributeValue) -> String {
    let mut buf = String::new();
    write_canon(&mut buf, v);
    buf
}

/// Canonicalize an item (attribute names are already ordered)
pub fn canonicalize_item(item: &Item) -> String {
    let mut buf = String::new();
    write_canon_map(&mut buf, item);
    buf
}

/// Check if two wire values carry the same data
pub fn equal_wire(a: &AttributeValue, b: &AttributeValue) -> bool {
    canonicalize(a) == canonicalize(b)
}

/// SHA-256 of the canonical form (first 16 hex chars)
pub fn fingerprint(v: &AttributeValue) -> String {
    hash_canonical(&canonicalize(v))
}

/// SHA-256 of an item's canonical form (first 16 hex chars)
pub fn fingerprint_item(item: &Item) -> String {
    hash_canonical(&canonicalize_item(item))
}

fn hash_canonical(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

// ============================================================
// Internal canonicalization
// ============================================================

fn write_canon(buf: &mut String, v: &AttributeValue) {
    match v {
        AttributeValue::S(s) => {
            buf.push_str("S:");
            buf.push_str(&quote_string(s));
        }
        AttributeValue::N(n) => {
            buf.push_str("N:");
            buf.push_str(&canon_number(n));
        }
        AttributeValue::Ss(strs) => {
            let mut sorted: Vec<_> = strs.iter().collect();
            sorted.sort();
            buf.push_str("SS:");
            write_canon_seq(buf, sorted.iter().map(|s| quote_string(s)));
        }
        AttributeValue::Ns(nums) => {
            let mut sorted: Vec<f64> = nums.iter().map(|n| parse_number(n)).collect();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            buf.push_str("NS:");
            write_canon_seq(buf, sorted.into_iter().map(format_number));
        }
        AttributeValue::Bool(b) => buf.push_str(if *b { "BOOL:t" } else { "BOOL:f" }),
        AttributeValue::Null(_) => buf.push_str("NULL"),
        AttributeValue::L(items) => {
            buf.push_str("L:[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(' ');
                }
                write_canon(buf, item);
            }
            buf.push(']');
        }
        AttributeValue::M(map) => {
            buf.push_str("M:");
            write_canon_map(buf, map);
        }
    }
}

fn write_canon_seq(buf: &mut String, members: impl Iterator<Item = String>) {
    buf.push('[');
    for (i, member) in members.enumerate() {
        if i > 0 {
            buf.push(' ');
        }
        buf.push_str(&member);
    }
    buf.push(']');
}

fn write_canon_map(buf: &mut String, map: &Item) {
    buf.push('{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            buf.push(' ');
        }
        buf.push_str(&quote_string(key));
        buf.push('=');
        write_canon(buf, value);
    }
    buf.push('}');
}

/// "1.0", "1" and "1e0" all denote the same number
fn canon_number(n: &str) -> String {
    format_number(parse_number(n))
}

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

mod hex {
    pub fn encode(data: &[u8]) -> String {
        data.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
