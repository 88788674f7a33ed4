use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ProfileErrorKind, Result, SubError};

/// Composite timing token written by subconverter-style profiles:
/// `interval[,timeout[,tolerance]]`, e.g. `300,,50`.
static TIMING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+),(\d*)(?:,(\d*))?$").expect("TIMING_PATTERN: hardcoded regex is invalid")
});

/// Default health-check interval in seconds
pub const DEFAULT_INTERVAL: u32 = 300;

/// Default url-test tolerance in milliseconds
pub const DEFAULT_TOLERANCE: u32 = 50;

const RULESET_PREFIX: &str = "ruleset=";
const GROUP_PREFIX: &str = "custom_proxy_group=";

/// A `ruleset=` line: traffic matching `url` goes to `group`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub group: String,
    /// `[]GEOIP,CN`, `[]FINAL` or an external rule-list URL
    pub url: String,
}

/// A `custom_proxy_group=` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    /// select, url-test, fallback, load-balance, ...
    pub group_type: String,
    /// Member tokens: literal names, `.*`, `[]Group` or `(regex)`
    pub proxies: Vec<String>,
    /// Health-check URL
    pub url: Option<String>,
    pub interval: u32,
    pub tolerance: u32,
    /// Load-balance strategy
    pub strategy: Option<String>,
}

impl GroupSpec {
    fn new(name: &str, group_type: &str) -> Self {
        Self {
            name: name.to_string(),
            group_type: group_type.to_string(),
            proxies: Vec::new(),
            url: None,
            interval: DEFAULT_INTERVAL,
            tolerance: DEFAULT_TOLERANCE,
            strategy: None,
        }
    }
}

/// Parsed routing profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    pub rulesets: Vec<RuleSet>,
    pub proxy_groups: Vec<GroupSpec>,
    /// Every other `key=value` line, uninterpreted
    pub settings: HashMap<String, String>,
}

/// Shape of one backtick-separated group field.
#[derive(Debug, PartialEq, Eq)]
enum GroupField<'a> {
    Url(&'a str),
    Integer(u32),
    Timing { interval: u32, tolerance: Option<u32> },
    Strategy(&'a str),
    Member(&'a str),
    Empty,
}

/// Parse an all-digit string, clamping overflow to `u32::MAX`.
fn saturating_u32(digits: &str) -> u32 {
    digits.parse().unwrap_or(u32::MAX)
}

fn classify_field(part: &str) -> GroupField<'_> {
    if part.is_empty() {
        return GroupField::Empty;
    }
    if part.starts_with("http://") || part.starts_with("https://") {
        return GroupField::Url(part);
    }
    if part.bytes().all(|b| b.is_ascii_digit()) {
        return GroupField::Integer(saturating_u32(part));
    }
    if let Some(caps) = TIMING_PATTERN.captures(part) {
        let interval = caps.get(1).map(|m| saturating_u32(m.as_str()));
        let tolerance = caps
            .get(3)
            .filter(|m| !m.as_str().is_empty())
            .map(|m| saturating_u32(m.as_str()));
        if let Some(interval) = interval {
            return GroupField::Timing { interval, tolerance };
        }
    }
    if part.contains("consistent-hashing") || part.contains("round-robin") {
        return GroupField::Strategy(part);
    }
    GroupField::Member(part)
}

/// Parse a routing profile.
///
/// Returns `None` only for empty input. Malformed lines are dropped one by
/// one; parsing itself never fails.
pub fn parse_profile(text: &str) -> Option<ProfileConfig> {
    if text.trim().is_empty() {
        return None;
    }

    let mut config = ProfileConfig::default();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix(RULESET_PREFIX) {
            match parse_ruleset(rest) {
                Some(ruleset) => config.rulesets.push(ruleset),
                None => log::debug!("profile line {}: dropped ruleset {:?}", line_num + 1, line),
            }
        } else if let Some(rest) = line.strip_prefix(GROUP_PREFIX) {
            match parse_group(rest) {
                Some(group) => config.proxy_groups.push(group),
                None => log::debug!("profile line {}: dropped group {:?}", line_num + 1, line),
            }
        } else if let Some((key, value)) = line.split_once('=') {
            let (key, value) = (key.trim(), value.trim());
            if !key.is_empty() && !value.is_empty() {
                config.settings.insert(key.to_string(), value.to_string());
            }
        }
    }

    Some(config)
}

fn parse_ruleset(rest: &str) -> Option<RuleSet> {
    let (group, url) = rest.split_once(',')?;
    let (group, url) = (group.trim(), url.trim());
    if group.is_empty() || url.is_empty() {
        return None;
    }
    Some(RuleSet {
        group: group.to_string(),
        url: url.to_string(),
    })
}

fn parse_group(rest: &str) -> Option<GroupSpec> {
    let parts: Vec<&str> = rest.split('`').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }

    let mut group = GroupSpec::new(parts[0], parts[1]);

    // Fields are classified by shape because their positions shift with
    // the optional ones present. A bare integer is the interval until a URL
    // has been seen, the tolerance afterwards.
    for part in &parts[2..] {
        match classify_field(part) {
            GroupField::Url(url) => group.url = Some(url.to_string()),
            GroupField::Integer(n) => {
                if group.url.is_none() {
                    group.interval = n;
                } else {
                    group.tolerance = n;
                }
            }
            GroupField::Timing {
                interval,
                tolerance,
            } => {
                group.interval = interval;
                if let Some(tolerance) = tolerance {
                    group.tolerance = tolerance;
                }
            }
            GroupField::Strategy(strategy) => group.strategy = Some(strategy.to_string()),
            GroupField::Member(member) => group.proxies.push(member.to_string()),
            GroupField::Empty => {}
        }
    }

    Some(group)
}

/// Parse a profile and check that it can drive a Clash config: at least one
/// proxy group, one of which works as the main selector (its name contains
/// `节点选择` or `PROXY`, or it is a `select` group).
pub fn validate_profile(text: &str) -> Result<ProfileConfig> {
    let config = parse_profile(text).ok_or_else(|| SubError::InvalidProfile {
        kind: ProfileErrorKind::Empty,
        message: "profile is empty".to_string(),
    })?;

    if config.proxy_groups.is_empty() {
        return Err(SubError::InvalidProfile {
            kind: ProfileErrorKind::NoProxyGroups,
            message: "no custom_proxy_group declared".to_string(),
        });
    }

    let has_main_group = config.proxy_groups.iter().any(|g| {
        g.name.contains("节点选择") || g.name.contains("PROXY") || g.group_type == "select"
    });
    if !has_main_group {
        return Err(SubError::InvalidProfile {
            kind: ProfileErrorKind::MissingMainGroup,
            message: "missing main selector group".to_string(),
        });
    }

    Ok(config)
}
