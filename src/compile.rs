use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::parser::{GroupSpec, ProfileConfig, RuleSet};

/// Sentinel member that keeps a group from being empty
pub const DIRECT: &str = "DIRECT";

/// Member token expanding to every node name
const ALL_NODES: &str = ".*";

/// Prefix of group back-references and built-in rule directives
const BUILTIN_PREFIX: &str = "[]";

/// Local and private-network bypass rules placed before profile rules
pub const BYPASS_RULES: [&str; 7] = [
    "DOMAIN-SUFFIX,local,DIRECT",
    "IP-CIDR,127.0.0.0/8,DIRECT",
    "IP-CIDR,172.16.0.0/12,DIRECT",
    "IP-CIDR,192.168.0.0/16,DIRECT",
    "IP-CIDR,10.0.0.0/8,DIRECT",
    "IP-CIDR,17.0.0.0/8,DIRECT",
    "IP-CIDR,100.64.0.0/10,DIRECT",
];

/// A Clash proxy group ready for output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClashGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub proxies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

/// Clash `proxy-groups` and `rules` compiled from a profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledRouting {
    pub proxy_groups: Vec<ClashGroup>,
    /// Empty when the profile declares no rulesets
    pub rules: Vec<String>,
}

impl CompiledRouting {
    /// First group with the given name
    pub fn group(&self, name: &str) -> Option<&ClashGroup> {
        self.proxy_groups.iter().find(|g| g.name == name)
    }

    /// Get the number of groups
    pub fn group_count(&self) -> usize {
        self.proxy_groups.len()
    }

    /// Get the number of rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// Compile a profile against the names of the nodes actually emitted.
pub fn compile_profile(profile: &ProfileConfig, node_names: &[String]) -> CompiledRouting {
    let proxy_groups = profile
        .proxy_groups
        .iter()
        .map(|group| compile_group(group, node_names))
        .collect();

    let rules = if profile.rulesets.is_empty() {
        Vec::new()
    } else {
        BYPASS_RULES
            .iter()
            .map(|r| r.to_string())
            .chain(profile.rulesets.iter().map(compile_rule))
            .collect()
    };

    CompiledRouting {
        proxy_groups,
        rules,
    }
}

/// Apply a profile to a Clash document.
///
/// Replaces `proxy-groups` when the profile declares groups and `rules` when
/// it declares rulesets; every other key is left as is.
pub fn apply_profile(
    mut doc: Map<String, Value>,
    profile: &ProfileConfig,
    node_names: &[String],
) -> Result<Map<String, Value>> {
    let compiled = compile_profile(profile, node_names);

    if !compiled.proxy_groups.is_empty() {
        doc.insert(
            "proxy-groups".to_string(),
            serde_json::to_value(&compiled.proxy_groups)?,
        );
    }
    if !compiled.rules.is_empty() {
        doc.insert("rules".to_string(), serde_json::to_value(&compiled.rules)?);
    }

    Ok(doc)
}

/// Compile a single group
fn compile_group(group: &GroupSpec, node_names: &[String]) -> ClashGroup {
    let mut proxies = Vec::new();
    for member in &group.proxies {
        expand_member(member, node_names, &mut proxies);
    }
    if proxies.is_empty() {
        proxies.push(DIRECT.to_string());
    }

    let mut compiled = ClashGroup {
        name: group.name.clone(),
        group_type: group.group_type.clone(),
        proxies,
        url: None,
        interval: None,
        tolerance: None,
        strategy: None,
    };

    // Health-check settings only mean something for automatic groups
    if let Some(ref url) = group.url {
        match group.group_type.as_str() {
            "url-test" | "fallback" | "load-balance" => {
                compiled.url = Some(url.clone());
                compiled.interval = Some(group.interval);
                if group.group_type == "url-test" && group.tolerance > 0 {
                    compiled.tolerance = Some(group.tolerance);
                }
                if group.group_type == "load-balance" {
                    compiled.strategy = group.strategy.clone();
                }
            }
            _ => {}
        }
    }

    compiled
}

/// Expand one member token into concrete proxy or group names
fn expand_member(member: &str, node_names: &[String], out: &mut Vec<String>) {
    if member == ALL_NODES {
        out.extend(node_names.iter().cloned());
        return;
    }

    // Reference to another group by name, not expanded
    if let Some(group_name) = member.strip_prefix(BUILTIN_PREFIX) {
        out.push(group_name.to_string());
        return;
    }

    if member.len() >= 2 && member.starts_with('(') && member.ends_with(')') {
        let pattern = &member[1..member.len() - 1];
        match build_filter(pattern) {
            Ok(regex) => out.extend(node_names.iter().filter(|n| regex.is_match(n)).cloned()),
            Err(e) => log::warn!("ignoring group member {:?}: {}", member, e),
        }
        return;
    }

    out.push(member.to_string());
}

fn build_filter(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// Compile a single ruleset into a rule line
fn compile_rule(ruleset: &RuleSet) -> String {
    match ruleset.url.strip_prefix(BUILTIN_PREFIX) {
        Some("FINAL") => format!("MATCH,{}", ruleset.group),
        Some(rule) => format!("{},{}", rule, ruleset.group),
        // External rule lists are not fetched
        None => format!("# Rules from {} -> {}", ruleset.url, ruleset.group),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_profile;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_wildcard_expands_all_nodes() {
        let profile = parse_profile("custom_proxy_group=G`select`.*").unwrap();
        let compiled = compile_profile(&profile, &names(&["A", "B"]));
        assert_eq!(compiled.group("G").unwrap().proxies, vec!["A", "B"]);
    }

    #[test]
    fn test_back_reference_is_not_expanded() {
        let profile = parse_profile("custom_proxy_group=G`select`[]H`.*").unwrap();
        let compiled = compile_profile(&profile, &names(&["N1"]));
        assert_eq!(compiled.group("G").unwrap().proxies, vec!["H", "N1"]);
    }

    #[test]
    fn test_regex_member_case_insensitive() {
        let profile = parse_profile("custom_proxy_group=HK`select`(hk|香港)").unwrap();
        let compiled = compile_profile(&profile, &names(&["HK-01", "US-01", "香港 02", "hk-03"]));
        assert_eq!(compiled.group("HK").unwrap().proxies, vec!["HK-01", "香港 02", "hk-03"]);
    }

    #[test]
    fn test_empty_group_gets_direct() {
        let profile = parse_profile("custom_proxy_group=JP`select`(Japan)").unwrap();
        let compiled = compile_profile(&profile, &names(&["HK-01"]));
        assert_eq!(compiled.group("JP").unwrap().proxies, vec!["DIRECT"]);
    }

    #[test]
    fn test_invalid_regex_matches_nothing() {
        let profile = parse_profile("custom_proxy_group=Bad`select`(unclosed[)").unwrap();
        let compiled = compile_profile(&profile, &names(&["A"]));
        assert_eq!(compiled.group("Bad").unwrap().proxies, vec!["DIRECT"]);
    }

    #[test]
    fn test_literal_members_pass_through() {
        let profile = parse_profile("custom_proxy_group=G`select`DIRECT`REJECT").unwrap();
        let compiled = compile_profile(&profile, &names(&["A"]));
        assert_eq!(compiled.group("G").unwrap().proxies, vec!["DIRECT", "REJECT"]);
    }

    #[test]
    fn test_health_check_fields() {
        let text = r#"
custom_proxy_group=Auto`url-test`.*`http://www.gstatic.com/generate_204`300,,50
custom_proxy_group=Fallback`fallback`.*`http://www.gstatic.com/generate_204`120
custom_proxy_group=LB`load-balance`.*`http://www.gstatic.com/generate_204`round-robin
custom_proxy_group=Sel`select`.*`http://www.gstatic.com/generate_204`
"#;
        let profile = parse_profile(text).unwrap();
        let compiled = compile_profile(&profile, &names(&["A"]));

        let auto = compiled.group("Auto").unwrap();
        assert_eq!(auto.url.as_deref(), Some("http://www.gstatic.com/generate_204"));
        assert_eq!(auto.interval, Some(300));
        assert_eq!(auto.tolerance, Some(50));
        assert!(auto.strategy.is_none());

        let fallback = compiled.group("Fallback").unwrap();
        assert_eq!(fallback.interval, Some(300));
        assert!(fallback.tolerance.is_none());

        let lb = compiled.group("LB").unwrap();
        assert_eq!(lb.strategy.as_deref(), Some("round-robin"));
        assert!(lb.tolerance.is_none());

        // select groups never carry health-check settings
        let sel = compiled.group("Sel").unwrap();
        assert!(sel.url.is_none());
        assert!(sel.interval.is_none());
    }

    #[test]
    fn test_rules_compile_in_order() {
        let text = r#"
ruleset=Direct,https://example.com/LocalAreaNetwork.list
ruleset=Direct,[]GEOIP,CN
ruleset=Final,[]FINAL
"#;
        let profile = parse_profile(text).unwrap();
        let compiled = compile_profile(&profile, &[]);
        assert_eq!(compiled.rule_count(), BYPASS_RULES.len() + 3);
        assert_eq!(&compiled.rules[..BYPASS_RULES.len()], &BYPASS_RULES[..]);
        let tail = &compiled.rules[BYPASS_RULES.len()..];
        assert_eq!(
            tail,
            &[
                "# Rules from https://example.com/LocalAreaNetwork.list -> Direct",
                "GEOIP,CN,Direct",
                "MATCH,Final",
            ]
        );
    }

    #[test]
    fn test_no_rulesets_no_rules() {
        let profile = parse_profile("custom_proxy_group=G`select`.*").unwrap();
        assert!(compile_profile(&profile, &[]).rules.is_empty());
    }

    #[test]
    fn test_apply_replaces_only_routing_keys() {
        let doc = json!({
            "port": 7890,
            "proxies": [{ "name": "A" }],
            "proxy-groups": [{ "name": "Old", "type": "select", "proxies": ["A"] }],
            "rules": ["MATCH,Old"]
        });
        let Value::Object(doc) = doc else { unreachable!() };

        let profile = parse_profile("ruleset=G,[]FINAL\ncustom_proxy_group=G`select`.*").unwrap();
        let applied = apply_profile(doc, &profile, &names(&["A"])).unwrap();

        assert_eq!(applied["port"], json!(7890));
        assert_eq!(applied["proxies"], json!([{ "name": "A" }]));
        assert_eq!(
            applied["proxy-groups"],
            json!([{ "name": "G", "type": "select", "proxies": ["A"] }])
        );
        let rules = applied["rules"].as_array().unwrap();
        assert_eq!(rules.last().unwrap(), "MATCH,G");
        // Key order is unchanged
        let keys: Vec<&str> = applied.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["port", "proxies", "proxy-groups", "rules"]);
    }

    #[test]
    fn test_apply_keeps_rules_without_rulesets() {
        let doc = json!({ "proxy-groups": [], "rules": ["MATCH,DIRECT"] });
        let Value::Object(doc) = doc else { unreachable!() };
        let profile = parse_profile("custom_proxy_group=G`select`.*").unwrap();
        let applied = apply_profile(doc, &profile, &[]).unwrap();
        assert_eq!(applied["rules"], json!(["MATCH,DIRECT"]));
        assert_eq!(applied["proxy-groups"][0]["proxies"], json!(["DIRECT"]));
    }
}
