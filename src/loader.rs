//! Loading a line-oriented prefix file into (ip, len, fib_index) tuples
//! ready for [`crate::multiway::Builder`].
//!
//! Not one of the hard engineering parts of this crate, but still its
//! public ingestion surface, so it gets the same error handling and
//! logging treatment as the core: malformed lines are logged and
//! skipped rather than aborting the whole load.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::warn;

use crate::error::PoptrieError;

/// One parsed line: an address, its prefix length, and the fib index
/// assigned to its next-hop token (dense, first-seen order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixEntry {
    pub ip: u32,
    pub prefix_len: u8,
    pub fib_index: u32,
}

/// The result of loading a file: the parsed entries plus the next-hop
/// tokens in the order their fib indices were assigned, so a driver can
/// map a fib index back to the token it names.
pub struct PrefixFile {
    pub entries: Vec<PrefixEntry>,
    pub next_hops: Vec<String>,
}

/// Loads and parses a prefix file at `path` (format: `A.B.C.D/len
/// next_hop` per line, one prefix per line, trailing whitespace
/// permitted). Malformed lines are logged at `warn!` and skipped; only
/// an I/O failure on the file itself is returned as an error.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<PrefixFile, PoptrieError> {
    let text = fs::read_to_string(path)?;
    Ok(load_str(&text))
}

/// Parses prefix-file contents already held in memory. Useful for tests
/// and for callers that already have the data in hand.
pub fn load_str(text: &str) -> PrefixFile {
    let mut next_hop_index: HashMap<String, u32> = HashMap::new();
    let mut next_hops: Vec<String> = Vec::new();
    let mut entries = Vec::new();

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok((ip, prefix_len, next_hop)) => {
                let fib_index = *next_hop_index.entry(next_hop.to_string()).or_insert_with(|| {
                    let idx = next_hops.len() as u32;
                    next_hops.push(next_hop.to_string());
                    idx
                });
                entries.push(PrefixEntry {
                    ip,
                    prefix_len,
                    fib_index,
                });
            }
            Err(reason) => {
                warn!("skipping malformed line {}: {reason}", lineno + 1);
            }
        }
    }

    PrefixFile { entries, next_hops }
}

fn parse_line(line: &str) -> Result<(u32, u8, &str), String> {
    let mut fields = line.splitn(2, ' ');
    let prefix = fields.next().ok_or("missing prefix field")?;
    let next_hop = fields.next().ok_or("missing next-hop field")?.trim();
    if next_hop.is_empty() {
        return Err("empty next-hop field".to_string());
    }

    let (addr, len) = prefix
        .split_once('/')
        .ok_or_else(|| format!("prefix {prefix:?} missing '/'"))?;
    let ip = parse_ipv4(addr)?;
    let prefix_len: u8 = len
        .parse()
        .map_err(|_| format!("prefix length {len:?} is not a number"))?;
    if prefix_len > 32 {
        return Err(format!("prefix length {prefix_len} exceeds 32"));
    }

    Ok((ip, prefix_len, next_hop))
}

fn parse_ipv4(addr: &str) -> Result<u32, String> {
    let mut octets = [0u8; 4];
    let mut parts = addr.split('.');
    for octet in octets.iter_mut() {
        let part = parts
            .next()
            .ok_or_else(|| format!("address {addr:?} has fewer than 4 octets"))?;
        *octet = part
            .parse()
            .map_err(|_| format!("octet {part:?} out of range 0-255"))?;
    }
    if parts.next().is_some() {
        return Err(format!("address {addr:?} has more than 4 octets"));
    }
    Ok(u32::from_be_bytes(octets))
}
