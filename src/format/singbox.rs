use serde::Serialize;
use serde_json::{json, Value};

use super::{endpoints, Converter, Endpoint};
use crate::config::SubscriptionConfig;
use crate::error::Result;
use crate::resolver::PoolSelector;
use crate::types::{NodeType, OutputFormat};

const AUTO_TAG: &str = "auto";
const PROXY_TAG: &str = "proxy";
const DIRECT_TAG: &str = "direct";
const BLOCK_TAG: &str = "block";
const DNS_TAG: &str = "dns-out";

/// sing-box JSON configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingBox;

impl Converter for SingBox {
    fn format(&self) -> OutputFormat {
        OutputFormat::SingBox
    }

    fn convert(&self, config: &SubscriptionConfig, selector: &dyn PoolSelector) -> Result<String> {
        let eps = endpoints(config, selector);
        let doc = SingBoxDocument {
            log: json!({ "level": "info", "timestamp": true }),
            dns: dns_section(),
            inbounds: json!([{
                "type": "mixed",
                "listen": "127.0.0.1",
                "listen_port": 2080,
                "sniff": true,
                "sniff_override_destination": true
            }]),
            outbounds: outbounds(&eps),
            route: route_section(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}

#[derive(Serialize)]
struct SingBoxDocument<'a> {
    log: Value,
    dns: Value,
    inbounds: Value,
    outbounds: Vec<Outbound<'a>>,
    route: Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Outbound<'a> {
    Urltest {
        tag: &'static str,
        outbounds: Vec<&'a str>,
        url: &'static str,
        interval: &'static str,
        tolerance: u32,
    },
    Selector {
        tag: &'static str,
        outbounds: Vec<&'a str>,
    },
    Direct {
        tag: &'static str,
    },
    Block {
        tag: &'static str,
    },
    Dns {
        tag: &'static str,
    },
    Vmess {
        tag: &'a str,
        server: &'a str,
        server_port: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<&'a str>,
        alter_id: u32,
        security: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        transport: Option<Transport<'a>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tls: Option<Tls<'a>>,
    },
    Vless {
        tag: &'a str,
        server: &'a str,
        server_port: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        transport: Option<Transport<'a>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tls: Option<Tls<'a>>,
    },
    Trojan {
        tag: &'a str,
        server: &'a str,
        server_port: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<&'a str>,
        tls: Tls<'a>,
    },
    Shadowsocks {
        tag: &'a str,
        server: &'a str,
        server_port: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        method: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<&'a str>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Transport<'a> {
    Ws {
        path: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        headers: Option<HostHeader<'a>>,
    },
    Grpc {
        #[serde(skip_serializing_if = "Option::is_none")]
        service_name: Option<&'a str>,
    },
}

#[derive(Debug, Serialize)]
struct HostHeader<'a> {
    #[serde(rename = "Host")]
    host: &'a str,
}

#[derive(Debug, Serialize)]
struct Tls<'a> {
    enabled: bool,
    insecure: bool,
    server_name: &'a str,
}

/// Selector groups and sentinels first, then one outbound per node.
fn outbounds<'a>(eps: &'a [Endpoint<'a>]) -> Vec<Outbound<'a>> {
    let tags: Vec<&str> = eps.iter().map(|ep| ep.name.as_str()).collect();

    let mut selector_members = Vec::with_capacity(tags.len() + 2);
    selector_members.push(AUTO_TAG);
    selector_members.extend(tags.iter().copied());
    selector_members.push(DIRECT_TAG);

    let mut outbounds = vec![
        Outbound::Urltest {
            tag: AUTO_TAG,
            outbounds: tags,
            url: "https://www.gstatic.com/generate_204",
            interval: "5m",
            tolerance: 50,
        },
        Outbound::Selector {
            tag: PROXY_TAG,
            outbounds: selector_members,
        },
        Outbound::Direct { tag: DIRECT_TAG },
        Outbound::Block { tag: BLOCK_TAG },
        Outbound::Dns { tag: DNS_TAG },
    ];
    outbounds.extend(eps.iter().map(node_outbound));
    outbounds
}

fn node_outbound<'a>(ep: &'a Endpoint<'a>) -> Outbound<'a> {
    let node = ep.node;
    match ep.node_type {
        NodeType::Vmess => Outbound::Vmess {
            tag: &ep.name,
            server: &ep.server,
            server_port: node.port,
            uuid: node.uuid(),
            alter_id: node.alter_id(),
            security: "auto",
            transport: transport(ep),
            tls: node.is_tls().then(|| tls(ep, true)),
        },
        NodeType::Vless => Outbound::Vless {
            tag: &ep.name,
            server: &ep.server,
            server_port: node.port,
            uuid: node.uuid(),
            transport: transport(ep),
            tls: node.is_tls().then(|| tls(ep, true)),
        },
        NodeType::Trojan => Outbound::Trojan {
            tag: &ep.name,
            server: &ep.server,
            server_port: node.port,
            password: node.password(),
            tls: tls(ep, false),
        },
        NodeType::Shadowsocks => Outbound::Shadowsocks {
            tag: &ep.name,
            server: &ep.server,
            server_port: node.port,
            method: node.method(),
            password: node.password(),
        },
    }
}

fn transport<'a>(ep: &'a Endpoint<'a>) -> Option<Transport<'a>> {
    let node = ep.node;
    if node.is_ws() {
        Some(Transport::Ws {
            path: node.path().unwrap_or("/"),
            headers: node.host().map(|host| HostHeader { host }),
        })
    } else if node.is_grpc() {
        Some(Transport::Grpc {
            service_name: node.path(),
        })
    } else {
        None
    }
}

/// TLS block; the server name falls back to the ws host only when
/// `use_host` is set, then to the front address.
fn tls<'a>(ep: &'a Endpoint<'a>, use_host: bool) -> Tls<'a> {
    let node = ep.node;
    let server_name = node
        .sni()
        .or_else(|| if use_host { node.host() } else { None })
        .unwrap_or(&ep.server);
    Tls {
        enabled: true,
        insecure: true,
        server_name,
    }
}

fn dns_section() -> Value {
    json!({
        "servers": [
            { "tag": "google", "address": "tls://8.8.8.8", "strategy": "prefer_ipv4" },
            { "tag": "local", "address": "223.5.5.5", "strategy": "prefer_ipv4", "detour": DIRECT_TAG }
        ],
        "rules": [
            { "geosite": "cn", "server": "local" }
        ],
        "final": "google",
        "strategy": "prefer_ipv4"
    })
}

fn route_section() -> Value {
    json!({
        "geoip": {
            "download_url": "https://github.com/SagerNet/sing-geoip/releases/latest/download/geoip.db",
            "download_detour": PROXY_TAG
        },
        "geosite": {
            "download_url": "https://github.com/SagerNet/sing-geosite/releases/latest/download/geosite.db",
            "download_detour": PROXY_TAG
        },
        "rules": [
            { "protocol": "dns", "outbound": DNS_TAG },
            { "geosite": "cn", "geoip": "cn", "outbound": DIRECT_TAG },
            { "geosite": "geolocation-!cn", "outbound": PROXY_TAG }
        ],
        "final": PROXY_TAG,
        "auto_detect_interface": true
    })
}
