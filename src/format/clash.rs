use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{endpoints, Converter, Endpoint, TEST_URL};
use crate::compile::{apply_profile, ClashGroup, BYPASS_RULES, DIRECT};
use crate::config::SubscriptionConfig;
use crate::error::Result;
use crate::parser::DEFAULT_INTERVAL;
use crate::resolver::PoolSelector;
use crate::types::{NodeType, OutputFormat};
use crate::yaml::to_yaml;

const MAIN_GROUP: &str = "🚀 节点选择";
const AUTO_GROUP: &str = "♻️ 自动选择";
const FALLBACK_GROUP: &str = "🔯 故障转移";
const BALANCE_GROUP: &str = "🔮 负载均衡";
const DIRECT_GROUP: &str = "🎯 全球直连";

/// Keys a template can never override
const RESERVED_KEYS: [&str; 3] = ["proxies", "proxy-groups", "rules"];

/// Clash (mihomo) YAML profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clash;

impl Converter for Clash {
    fn format(&self) -> OutputFormat {
        OutputFormat::Clash
    }

    fn convert(&self, config: &SubscriptionConfig, selector: &dyn PoolSelector) -> Result<String> {
        let doc = document(config, selector)?;
        Ok(to_yaml(&Value::Object(doc)))
    }
}

#[derive(Debug, Serialize)]
struct ClashProxy<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    server: &'a str,
    port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<&'a str>,
    #[serde(rename = "alterId", skip_serializing_if = "Option::is_none")]
    alter_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cipher: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tls: Option<bool>,
    #[serde(rename = "skip-cert-verify", skip_serializing_if = "Option::is_none")]
    skip_cert_verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    servername: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sni: Option<&'a str>,
    #[serde(rename = "ws-opts", skip_serializing_if = "Option::is_none")]
    ws_opts: Option<WsOpts<'a>>,
    #[serde(rename = "grpc-opts", skip_serializing_if = "Option::is_none")]
    grpc_opts: Option<GrpcOpts<'a>>,
}

impl<'a> ClashProxy<'a> {
    fn new(ep: &'a Endpoint<'a>, kind: &'static str) -> Self {
        Self {
            name: &ep.name,
            kind,
            server: &ep.server,
            port: ep.node.port,
            uuid: None,
            alter_id: None,
            cipher: None,
            password: None,
            network: None,
            tls: None,
            skip_cert_verify: None,
            servername: None,
            sni: None,
            ws_opts: None,
            grpc_opts: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct WsOpts<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<HostHeader<'a>>,
}

#[derive(Debug, Serialize)]
struct HostHeader<'a> {
    #[serde(rename = "Host")]
    host: &'a str,
}

#[derive(Debug, Serialize)]
struct GrpcOpts<'a> {
    #[serde(rename = "grpc-service-name")]
    service_name: &'a str,
}

fn clash_proxy<'a>(ep: &'a Endpoint<'a>) -> ClashProxy<'a> {
    let node = ep.node;
    match ep.node_type {
        NodeType::Vmess | NodeType::Vless => {
            let is_vmess = ep.node_type == NodeType::Vmess;
            let mut proxy = ClashProxy::new(ep, ep.node_type.as_str());
            proxy.uuid = node.uuid();
            if is_vmess {
                proxy.alter_id = Some(node.alter_id());
                proxy.cipher = Some("auto");
            }
            proxy.network = Some(node.network());
            proxy.tls = Some(node.is_tls());
            proxy.skip_cert_verify = Some(true);
            proxy.servername = node.sni();
            if node.is_ws() && (node.path().is_some() || node.host().is_some()) {
                proxy.ws_opts = Some(WsOpts {
                    path: node.path(),
                    headers: node.host().map(|host| HostHeader { host }),
                });
            }
            if node.is_grpc() {
                proxy.grpc_opts = node.path().map(|service_name| GrpcOpts { service_name });
            }
            proxy
        }
        NodeType::Trojan => {
            let mut proxy = ClashProxy::new(ep, "trojan");
            proxy.password = node.password();
            proxy.skip_cert_verify = Some(true);
            proxy.sni = node.sni();
            proxy
        }
        NodeType::Shadowsocks => {
            let mut proxy = ClashProxy::new(ep, "ss");
            proxy.cipher = node.method();
            proxy.password = node.password();
            proxy
        }
    }
}

fn health_checked(name: &str, group_type: &str, names: &[String]) -> ClashGroup {
    ClashGroup {
        name: name.to_string(),
        group_type: group_type.to_string(),
        proxies: names.to_vec(),
        url: Some(TEST_URL.to_string()),
        interval: Some(DEFAULT_INTERVAL),
        tolerance: None,
        strategy: None,
    }
}

fn default_groups(names: &[String]) -> Vec<ClashGroup> {
    let mut main_members: Vec<String> = [AUTO_GROUP, FALLBACK_GROUP, BALANCE_GROUP, DIRECT_GROUP]
        .iter()
        .map(|g| g.to_string())
        .collect();
    main_members.extend(names.iter().cloned());

    vec![
        ClashGroup {
            name: MAIN_GROUP.to_string(),
            group_type: "select".to_string(),
            proxies: main_members,
            url: None,
            interval: None,
            tolerance: None,
            strategy: None,
        },
        health_checked(AUTO_GROUP, "url-test", names),
        health_checked(FALLBACK_GROUP, "fallback", names),
        health_checked(BALANCE_GROUP, "load-balance", names),
        ClashGroup {
            name: DIRECT_GROUP.to_string(),
            group_type: "select".to_string(),
            proxies: vec![DIRECT.to_string()],
            url: None,
            interval: None,
            tolerance: None,
            strategy: None,
        },
    ]
}

fn default_rules() -> Vec<String> {
    BYPASS_RULES
        .iter()
        .map(|r| r.to_string())
        .chain([
            "GEOIP,CN,DIRECT".to_string(),
            format!("MATCH,{}", MAIN_GROUP),
        ])
        .collect()
}

/// Build the Clash document as an ordered map.
fn document(config: &SubscriptionConfig, selector: &dyn PoolSelector) -> Result<Map<String, Value>> {
    let eps = endpoints(config, selector);
    let names: Vec<String> = eps.iter().map(|ep| ep.name.clone()).collect();
    let proxies = eps
        .iter()
        .map(|ep| serde_json::to_value(clash_proxy(ep)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut doc = Map::new();
    doc.insert("port".to_string(), json!(7890));
    doc.insert("socks-port".to_string(), json!(7891));
    doc.insert("allow-lan".to_string(), json!(false));
    doc.insert("mode".to_string(), json!("rule"));
    doc.insert("log-level".to_string(), json!("info"));
    doc.insert("external-controller".to_string(), json!("127.0.0.1:9090"));
    doc.insert(
        "dns".to_string(),
        json!({
            "enable": true,
            "ipv6": false,
            "default-nameserver": ["223.5.5.5", "119.29.29.29"],
            "enhanced-mode": "fake-ip",
            "fake-ip-range": "198.18.0.1/16",
            "nameserver": ["https://doh.pub/dns-query", "https://dns.alidns.com/dns-query"]
        }),
    );
    doc.insert("proxies".to_string(), Value::Array(proxies));
    doc.insert(
        "proxy-groups".to_string(),
        serde_json::to_value(default_groups(&names))?,
    );
    doc.insert("rules".to_string(), serde_json::to_value(default_rules())?);

    if let Some(profile) = config.profile() {
        doc = apply_profile(doc, &profile, &names)?;
    }

    if let Some(template) = config.clash_template.as_deref() {
        if !template.trim().is_empty() {
            merge_template(&mut doc, template);
        }
    }

    Ok(doc)
}

/// Shallow-merge a JSON object template into the top-level keys.
/// Invalid templates are logged and ignored.
fn merge_template(doc: &mut Map<String, Value>, template: &str) {
    let overrides = match serde_json::from_str::<Value>(template) {
        Ok(Value::Object(overrides)) => overrides,
        Ok(_) => {
            log::warn!("Clash template is not a JSON object, ignored");
            return;
        }
        Err(e) => {
            log::warn!("Invalid Clash template, ignored: {}", e);
            return;
        }
    };

    for (key, value) in overrides {
        if RESERVED_KEYS.contains(&key.as_str()) {
            log::debug!("Clash template key {:?} is reserved, skipped", key);
            continue;
        }
        doc.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::*;
    use crate::resolver::FixedSelector;
    use crate::types::Node;

    fn doc(config: &SubscriptionConfig) -> Map<String, Value> {
        document(config, &FixedSelector::default()).unwrap()
    }

    #[test]
    fn test_boilerplate_key_order() {
        let doc = doc(&config(vec![ss()]));
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "port",
                "socks-port",
                "allow-lan",
                "mode",
                "log-level",
                "external-controller",
                "dns",
                "proxies",
                "proxy-groups",
                "rules"
            ]
        );
        assert_eq!(doc["dns"]["enhanced-mode"], "fake-ip");
    }

    #[test]
    fn test_vmess_ws_tls_proxy() {
        let mut node = vmess_ws_tls();
        node.sni = Some("sni.example.com".to_string());
        let doc = doc(&config(vec![node]));
        let proxy = &doc["proxies"][0];
        assert_eq!(proxy["type"], "vmess");
        assert_eq!(proxy["server"], "origin.example.com");
        assert_eq!(proxy["alterId"], 0);
        assert_eq!(proxy["cipher"], "auto");
        assert_eq!(proxy["network"], "ws");
        assert_eq!(proxy["tls"], true);
        assert_eq!(proxy["skip-cert-verify"], true);
        assert_eq!(proxy["servername"], "sni.example.com");
        assert_eq!(proxy["ws-opts"]["path"], "/p");
        assert_eq!(proxy["ws-opts"]["headers"]["Host"], "h.com");
        assert!(proxy.get("grpc-opts").is_none());
    }

    #[test]
    fn test_ws_opts_only_with_fields() {
        let node = Node::new("vless", "v.example.com", 443)
            .with_uuid("u")
            .with_network("ws");
        let doc = doc(&config(vec![node]));
        let proxy = &doc["proxies"][0];
        assert!(proxy.get("ws-opts").is_none());
        assert!(proxy.get("alterId").is_none());
        assert!(proxy.get("cipher").is_none());
        assert_eq!(proxy["tls"], false);
    }

    #[test]
    fn test_grpc_opts() {
        let node = Node::new("vless", "v.example.com", 443)
            .with_uuid("u")
            .with_network("grpc")
            .with_path("svc");
        let doc = doc(&config(vec![node]));
        assert_eq!(doc["proxies"][0]["grpc-opts"]["grpc-service-name"], "svc");
        assert!(doc["proxies"][0].get("ws-opts").is_none());
    }

    #[test]
    fn test_trojan_and_ss_proxies() {
        let doc = doc(&config(vec![trojan(), ss()]));
        let trojan = &doc["proxies"][0];
        assert_eq!(trojan["password"], "pw");
        assert_eq!(trojan["sni"], "sni.example.com");
        assert!(trojan.get("tls").is_none());

        let ss = &doc["proxies"][1];
        assert_eq!(ss["type"], "ss");
        assert_eq!(ss["cipher"], "aes-256-gcm");
        assert_eq!(ss["password"], "secret");
    }

    #[test]
    fn test_missing_required_field_omitted() {
        let doc = doc(&config(vec![Node::new("trojan", "t.example.com", 443)]));
        assert!(doc["proxies"][0].get("password").is_none());
        assert_eq!(doc["proxies"][0]["name"], "t.example.com:443");
    }

    #[test]
    fn test_default_groups_and_rules() {
        let doc = doc(&config(vec![vmess_ws_tls(), ss()]));
        let groups = doc["proxy-groups"].as_array().unwrap();
        assert_eq!(groups.len(), 5);
        assert_eq!(groups[0]["name"], MAIN_GROUP);
        assert_eq!(
            groups[0]["proxies"],
            json!([AUTO_GROUP, FALLBACK_GROUP, BALANCE_GROUP, DIRECT_GROUP, "HK", "S"])
        );
        for group in &groups[1..4] {
            assert_eq!(group["proxies"], json!(["HK", "S"]));
            assert_eq!(group["url"], TEST_URL);
            assert_eq!(group["interval"], 300);
        }
        assert_eq!(groups[4]["proxies"], json!(["DIRECT"]));

        let rules = doc["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 9);
        assert_eq!(rules[7], "GEOIP,CN,DIRECT");
        assert_eq!(rules[8], "MATCH,🚀 节点选择");
    }

    #[test]
    fn test_profile_replaces_groups() {
        let mut node = ss();
        node.name = Some("N1".to_string());
        let config = config(vec![node]).with_profile("custom_proxy_group=G`select`[]H`.*");
        let doc = doc(&config);
        let groups = doc["proxy-groups"].as_array().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["name"], "G");
        assert_eq!(groups[0]["proxies"], json!(["H", "N1"]));
        // No rulesets, default rules stay
        assert_eq!(doc["rules"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn test_template_merge_respects_reserved_keys() {
        let config = config(vec![ss()]).with_clash_template(
            r#"{"port": 1234, "mixed-port": 7893, "proxies": [], "rules": ["MATCH,DIRECT"]}"#,
        );
        let doc = doc(&config);
        assert_eq!(doc["port"], 1234);
        assert_eq!(doc["mixed-port"], 7893);
        assert_eq!(doc["proxies"].as_array().unwrap().len(), 1);
        assert_eq!(doc["rules"].as_array().unwrap().len(), 9);
        // Overridden keys keep their position
        assert_eq!(doc.keys().next().map(String::as_str), Some("port"));
        assert_eq!(doc.keys().last().map(String::as_str), Some("mixed-port"));
    }

    #[test]
    fn test_invalid_template_ignored() {
        let plain = doc(&config(vec![ss()]));
        for template in ["{broken", "[1, 2]", "   "] {
            let with_bad = doc(&config(vec![ss()]).with_clash_template(template));
            assert_eq!(with_bad, plain);
        }
    }

    #[test]
    fn test_yaml_output() {
        let yaml = Clash
            .convert(&config(vec![vmess_ws_tls()]), &FixedSelector::default())
            .unwrap();
        assert!(yaml.starts_with("port: 7890\nsocks-port: 7891\n"));
        assert!(yaml.contains("proxies:\n  - name: HK\n    type: vmess\n"));
        assert!(yaml.contains("    ws-opts:\n      path: /p\n      headers:\n        Host: h.com\n"));
        assert!(yaml.ends_with("  - GEOIP,CN,DIRECT\n  - MATCH,🚀 节点选择\n"));
    }

    #[test]
    fn test_hash_prefixed_name_stays_in_group() {
        let mut node = ss();
        node.name = Some("#1 HK".to_string());
        let config = config(vec![node]).with_profile("custom_proxy_group=G`select`.*");
        let yaml = Clash.convert(&config, &FixedSelector::default()).unwrap();
        assert!(yaml.contains("  - name: \"#1 HK\"\n    type: ss\n"));
        assert!(yaml.contains("  - name: G\n    type: select\n    proxies:\n      - \"#1 HK\"\n"));
    }

    #[test]
    fn test_multiline_name_quoted() {
        let mut node = ss();
        node.name = Some("a\nb".to_string());
        let yaml = Clash.convert(&config(vec![node]), &FixedSelector::default()).unwrap();
        assert!(yaml.contains("proxies:\n  - name: \"a\\nb\"\n    type: ss\n"));
    }
}
