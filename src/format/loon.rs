use std::fmt::Write;

use super::{endpoints, Converter, Endpoint, TEST_URL};
use crate::config::SubscriptionConfig;
use crate::error::Result;
use crate::resolver::PoolSelector;
use crate::types::{NodeType, OutputFormat};

const GENERAL: &str = "\
[General]
ipv6 = false
dns-server = 223.5.5.5, 119.29.29.29
allow-wifi-access = false
wifi-access-http-port = 7222
wifi-access-socks5-port = 7221
proxy-test-url = http://www.gstatic.com/generate_204
test-timeout = 3

[Host]
";

const TRAILER: &str = "\
[Rule]
GEOIP,CN,DIRECT
FINAL,PROXY

[Remote Rule]

[URL Rewrite]

[Remote Rewrite]

[Script]

[Remote Script]

[Plugin]

[Mitm]
hostname =
ca-p12 =
ca-passphrase =
skip-server-cert-verify = true";

/// Loon profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Loon;

impl Converter for Loon {
    fn format(&self) -> OutputFormat {
        OutputFormat::Loon
    }

    fn convert(&self, config: &SubscriptionConfig, selector: &dyn PoolSelector) -> Result<String> {
        let eps = endpoints(config, selector);
        let lines: Vec<String> = eps.iter().map(proxy_line).collect();
        let names = eps
            .iter()
            .map(|ep| ep.name.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut out = String::from(GENERAL);
        let _ = write!(
            out,
            "\n[Proxy]\n{}\n\n[Remote Proxy]\n\n[Proxy Group]\n",
            lines.join("\n")
        );
        let _ = writeln!(out, "PROXY = select,{}", names);
        let _ = writeln!(
            out,
            "AUTO = url-test,{},url = {},interval = 600",
            names, TEST_URL
        );
        out.push('\n');
        out.push_str(TRAILER);
        Ok(out)
    }
}

/// `name = type,host,port,...` with positional credentials first.
fn proxy_line(ep: &Endpoint<'_>) -> String {
    let node = ep.node;
    let head = format!("{} = {},{},{}", ep.name, type_name(ep.node_type), ep.server, node.port);
    match ep.node_type {
        NodeType::Vmess => format!(
            "{},{},\"{}\",{}",
            head,
            node.uuid().unwrap_or_default(),
            node.method().unwrap_or("auto"),
            transport_params(ep).join(",")
        ),
        NodeType::Vless => format!(
            "{},{},{}",
            head,
            node.uuid().unwrap_or_default(),
            transport_params(ep).join(",")
        ),
        NodeType::Trojan => {
            let mut line = format!("{},{}", head, node.password().unwrap_or_default());
            if let Some(sni) = node.sni() {
                let _ = write!(line, ",tls-name={}", sni);
            }
            line
        }
        NodeType::Shadowsocks => format!(
            "{},{},{}",
            head,
            node.method().unwrap_or_default(),
            node.password().unwrap_or_default()
        ),
    }
}

fn type_name(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Shadowsocks => "shadowsocks",
        other => other.as_str(),
    }
}

fn transport_params(ep: &Endpoint<'_>) -> Vec<String> {
    let node = ep.node;
    let mut params = vec![format!("transport={}", node.network())];
    if let Some(host) = node.host() {
        params.push(format!("host={}", host));
    }
    if let Some(path) = node.path() {
        params.push(format!("path={}", path));
    }
    if node.is_tls() {
        params.push("over-tls=true".to_string());
    }
    if let Some(sni) = node.sni() {
        params.push(format!("tls-name={}", sni));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::*;
    use crate::resolver::FixedSelector;
    use crate::types::Node;

    fn render(config: &SubscriptionConfig) -> String {
        Loon.convert(config, &FixedSelector::default()).unwrap()
    }

    fn section<'a>(text: &'a str, name: &str) -> Vec<&'a str> {
        let header = format!("[{}]", name);
        text.lines()
            .skip_while(|l| *l != header)
            .skip(1)
            .take_while(|l| !l.starts_with('['))
            .filter(|l| !l.is_empty())
            .collect()
    }

    #[test]
    fn test_proxy_lines() {
        let text = render(&config(vec![vmess_ws_tls(), vless(), trojan(), ss()]));
        assert_eq!(
            section(&text, "Proxy"),
            vec![
                "HK = vmess,origin.example.com,443,u-1,\"auto\",transport=ws,host=h.com,path=/p,over-tls=true",
                "V = vless,v.example.com,443,u-2,transport=tcp,over-tls=true",
                "T = trojan,t.example.com,443,pw,tls-name=sni.example.com",
                "S = shadowsocks,s.example.com,8388,aes-256-gcm,secret",
            ]
        );
    }

    #[test]
    fn test_trojan_without_sni_has_no_trailing_comma() {
        let node = Node::new("trojan", "t.example.com", 443).with_name("T").with_password("pw");
        let text = render(&config(vec![node]));
        assert_eq!(section(&text, "Proxy"), vec!["T = trojan,t.example.com,443,pw"]);
    }

    #[test]
    fn test_groups_and_rules() {
        let text = render(&config(vec![vmess_ws_tls(), ss()]));
        assert_eq!(
            section(&text, "Proxy Group"),
            vec![
                "PROXY = select,HK,S",
                "AUTO = url-test,HK,S,url = http://www.gstatic.com/generate_204,interval = 600",
            ]
        );
        assert_eq!(section(&text, "Rule"), vec!["GEOIP,CN,DIRECT", "FINAL,PROXY"]);
    }

    #[test]
    fn test_sections_in_order() {
        let text = render(&config(vec![ss()]));
        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with('[')).collect();
        assert_eq!(
            headers,
            vec![
                "[General]",
                "[Host]",
                "[Proxy]",
                "[Remote Proxy]",
                "[Proxy Group]",
                "[Rule]",
                "[Remote Rule]",
                "[URL Rewrite]",
                "[Remote Rewrite]",
                "[Script]",
                "[Remote Script]",
                "[Plugin]",
                "[Mitm]",
            ]
        );
        assert!(text.ends_with("skip-server-cert-verify = true"));
    }

    #[test]
    fn test_front_address_used() {
        let mut config = config(vec![ss()]);
        config.proxy_ips = vec!["9.9.9.9#US".to_string()];
        let text = render(&config);
        assert!(text.contains("S = shadowsocks,9.9.9.9,8388,"));
    }
}
