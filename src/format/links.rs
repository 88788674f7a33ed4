use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use super::{endpoints, Converter, Endpoint};
use crate::config::SubscriptionConfig;
use crate::error::Result;
use crate::resolver::PoolSelector;
use crate::types::{non_empty, NodeType, OutputFormat};

/// Share-link list, base64 encoded as a whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64;

impl Converter for Base64 {
    fn format(&self) -> OutputFormat {
        OutputFormat::Base64
    }

    fn convert(&self, config: &SubscriptionConfig, selector: &dyn PoolSelector) -> Result<String> {
        let links = endpoints(config, selector)
            .iter()
            .map(share_link)
            .collect::<Result<Vec<_>>>()?;
        Ok(STANDARD.encode(links.join("\n")))
    }
}

/// `vmess://` payload, field order is what clients expect
#[derive(Serialize)]
struct VmessShare<'a> {
    v: &'static str,
    ps: &'a str,
    add: &'a str,
    port: u16,
    id: &'a str,
    aid: u32,
    net: &'a str,
    #[serde(rename = "type")]
    header_type: &'static str,
    host: &'a str,
    path: &'a str,
    tls: &'a str,
    sni: &'a str,
}

fn share_link(ep: &Endpoint<'_>) -> Result<String> {
    let node = ep.node;
    let link = match ep.node_type {
        NodeType::Vmess => {
            let share = VmessShare {
                v: "2",
                ps: &ep.name,
                add: &ep.server,
                port: node.port,
                id: node.uuid().unwrap_or_default(),
                aid: node.alter_id(),
                net: node.network(),
                header_type: "none",
                host: node.host().unwrap_or_default(),
                path: node.path().unwrap_or_default(),
                tls: non_empty(&node.tls).unwrap_or_default(),
                sni: node.sni().unwrap_or_default(),
            };
            format!("vmess://{}", STANDARD.encode(serde_json::to_string(&share)?))
        }
        NodeType::Vless => {
            let security = non_empty(&node.tls).unwrap_or("none");
            let mut params = vec![("type", node.network()), ("security", security)];
            params.extend(transport_params(ep));
            format!(
                "vless://{}@{}:{}?{}#{}",
                node.uuid().unwrap_or_default(),
                ep.server,
                node.port,
                query_string(&params),
                urlencoding::encode(&ep.name)
            )
        }
        NodeType::Trojan => {
            let mut params = vec![("type", node.network())];
            params.extend(transport_params(ep));
            format!(
                "trojan://{}@{}:{}?{}#{}",
                node.password().unwrap_or_default(),
                ep.server,
                node.port,
                query_string(&params),
                urlencoding::encode(&ep.name)
            )
        }
        NodeType::Shadowsocks => {
            let userinfo = format!(
                "{}:{}",
                node.method().unwrap_or_default(),
                node.password().unwrap_or_default()
            );
            format!(
                "ss://{}@{}:{}#{}",
                STANDARD.encode(userinfo),
                ep.server,
                node.port,
                urlencoding::encode(&ep.name)
            )
        }
    };
    Ok(link)
}

/// Optional `host`, `path` and `sni` params, only when set
fn transport_params<'a>(ep: &Endpoint<'a>) -> Vec<(&'static str, &'a str)> {
    let node = ep.node;
    [("host", node.host()), ("path", node.path()), ("sni", node.sni())]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
}

fn query_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
