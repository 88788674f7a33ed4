//! Address pool entries and bulk import.

use std::fmt;
use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;

/// Region label used when an imported entry carries none.
pub const UNKNOWN_REGION: &str = "未知地区";

static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]{1,61}[a-zA-Z0-9](?:\.[a-zA-Z]{2,})+$")
        .expect("DOMAIN_PATTERN: hardcoded regex is invalid")
});

/// A pool entry split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub host: String,
    pub port: Option<u16>,
    pub region: Option<String>,
}

impl PoolEntry {
    /// Split a raw entry (`IP:PORT#REGION`, `IP#REGION`, `IP:PORT` or `IP`).
    ///
    /// Never fails: an unparseable port is dropped and the host is taken
    /// verbatim.
    pub fn parse(entry: &str) -> Self {
        let (head, region) = match entry.split_once('#') {
            Some((head, region)) => (head, Some(region.trim().to_string())),
            None => (entry, None),
        };
        let (host, port) = match head.split_once(':') {
            Some((host, port)) => (host, port.trim().parse::<u16>().ok()),
            None => (head, None),
        };
        Self {
            host: host.trim().to_string(),
            port,
            region: region.filter(|r| !r.is_empty()),
        }
    }

    /// Whether the host is an IPv4 literal or a plausible domain name.
    pub fn has_valid_host(&self) -> bool {
        is_valid_host(&self.host)
    }
}

impl fmt::Display for PoolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(ref region) = self.region {
            write!(f, "#{}", region)?;
        }
        Ok(())
    }
}

fn is_valid_host(host: &str) -> bool {
    host.parse::<Ipv4Addr>().is_ok() || DOMAIN_PATTERN.is_match(host)
}

/// Normalize bulk pool input into canonical entries.
///
/// One entry per line, in any of these shapes:
/// `IP:PORT#REGION`, `IP#REGION`, `IP,PORT,REGION` (port and region optional),
/// `IP:PORT`, `IP`. Lines with an invalid host or port are dropped. Entries
/// without a region get [`UNKNOWN_REGION`]. Duplicates are removed, first
/// occurrence wins.
pub fn import_pool(text: &str) -> Vec<String> {
    let mut entries = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(entry) = import_line(line) {
            let entry = entry.to_string();
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
    }
    entries
}

fn import_line(line: &str) -> Option<PoolEntry> {
    let (host, port, region) = if let Some((head, region)) = line.split_once('#') {
        let region = region.split('#').next().unwrap_or_default();
        match head.split_once(':') {
            Some((host, port)) => (host, Some(port), region),
            None => (head, None, region),
        }
    } else if line.contains(',') {
        let mut parts = line.split(',');
        let host = parts.next().unwrap_or_default();
        let port = parts.next().filter(|p| !p.trim().is_empty());
        let region = parts.next().unwrap_or_default();
        (host, port, region)
    } else {
        match line.split_once(':') {
            Some((host, port)) => (host, Some(port), ""),
            None => (line, None, ""),
        }
    };

    let host = host.trim();
    if !is_valid_host(host) {
        return None;
    }
    let port = match port {
        Some(port) => Some(port.trim().parse::<u16>().ok()?),
        None => None,
    };
    let region = match region.trim() {
        "" => UNKNOWN_REGION.to_string(),
        region => region.to_string(),
    };

    Some(PoolEntry {
        host: host.to_string(),
        port,
        region: Some(region),
    })
}

/// Append `new` entries to `pool`, skipping ones already present.
/// Returns how many were added.
pub fn merge_pool(pool: &mut Vec<String>, new: impl IntoIterator<Item = String>) -> usize {
    let mut added = 0;
    for entry in new {
        if !pool.contains(&entry) {
            pool.push(entry);
            added += 1;
        }
    }
    added
}
