use std::fmt::Write;

use super::{endpoints, Converter, Endpoint, TEST_URL};
use crate::config::SubscriptionConfig;
use crate::error::Result;
use crate::resolver::PoolSelector;
use crate::types::{NodeType, OutputFormat};

const HEADER: &str = "\
#!MANAGED-CONFIG https://example.com/surge.conf

[General]
loglevel = notify
internet-test-url = http://www.gstatic.com/generate_204
proxy-test-url = http://www.gstatic.com/generate_204
test-timeout = 3
dns-server = 223.5.5.5, 119.29.29.29
wifi-assist = true
ipv6 = false

[Replica]
hide-apple-request = true
hide-crash-reporter-request = true
use-keyword-filter = false
";

const TRAILER: &str = "\
[Rule]
RULE-SET,https://raw.githubusercontent.com/DivineEngine/Profiles/master/Surge/Ruleset/Guard/Advertising.list,REJECT
RULE-SET,https://raw.githubusercontent.com/DivineEngine/Profiles/master/Surge/Ruleset/Guard/Hijacking.list,REJECT
RULE-SET,https://raw.githubusercontent.com/DivineEngine/Profiles/master/Surge/Ruleset/Guard/Privacy.list,REJECT
RULE-SET,https://raw.githubusercontent.com/DivineEngine/Profiles/master/Surge/Ruleset/China.list,DIRECT
GEOIP,CN,DIRECT
FINAL,PROXY,dns-failed

[Host]
*.taobao.com = server:223.5.5.5
*.tmall.com = server:223.5.5.5
*.alipay.com = server:223.5.5.5
*.alicdn.com = server:223.5.5.5
*.aliyun.com = server:223.5.5.5
*.jd.com = server:119.28.28.28
*.qq.com = server:119.28.28.28
*.tencent.com = server:119.28.28.28
*.weixin.com = server:119.28.28.28
*.bilibili.com = server:119.29.29.29
hdslb.com = server:119.29.29.29

[URL Rewrite]
^https?://(www.)?g.cn https://www.google.com 302
^https?://(www.)?google.cn https://www.google.com 302

[MITM]
skip-server-cert-verify = true
hostname = *.google.cn, *.google.com.hk";

/// Surge profile. VLESS nodes are dropped, Surge has no VLESS support.
#[derive(Debug, Clone, Copy, Default)]
pub struct Surge;

impl Converter for Surge {
    fn format(&self) -> OutputFormat {
        OutputFormat::Surge
    }

    fn convert(&self, config: &SubscriptionConfig, selector: &dyn PoolSelector) -> Result<String> {
        let mut lines = Vec::new();
        let mut names = Vec::new();
        for ep in endpoints(config, selector) {
            match proxy_line(&ep) {
                Some(line) => {
                    lines.push(line);
                    names.push(ep.name);
                }
                None => {
                    log::debug!(
                        "surge: dropping unsupported {} node {:?}",
                        ep.node_type.as_str(),
                        ep.name
                    );
                }
            }
        }
        let names = names.join(", ");

        let mut out = String::from(HEADER);
        let _ = write!(out, "\n[Proxy]\n{}\n\n[Proxy Group]\n", lines.join("\n"));
        let _ = writeln!(out, "PROXY = select, {}", names);
        let _ = writeln!(
            out,
            "AUTO = url-test, {}, url = {}, interval = 600, tolerance = 100",
            names, TEST_URL
        );
        out.push('\n');
        out.push_str(TRAILER);
        Ok(out)
    }
}

/// `name = type, host, port, key=value, ...`, or `None` for VLESS.
fn proxy_line(ep: &Endpoint<'_>) -> Option<String> {
    let node = ep.node;
    let mut params = Vec::new();
    let kind = match ep.node_type {
        NodeType::Vless => return None,
        NodeType::Vmess => {
            params.push(format!("username={}", node.uuid().unwrap_or_default()));
            if node.is_ws() {
                params.push("ws=true".to_string());
                if let Some(path) = node.path() {
                    params.push(format!("ws-path={}", path));
                }
                if let Some(host) = node.host() {
                    params.push(format!("ws-headers=Host:{}", host));
                }
            }
            if node.is_tls() {
                params.push("tls=true".to_string());
                if let Some(sni) = node.sni() {
                    params.push(format!("sni={}", sni));
                }
            }
            params.push("vmess-aead=true".to_string());
            "vmess"
        }
        NodeType::Trojan => {
            params.push(format!("password={}", node.password().unwrap_or_default()));
            if let Some(sni) = node.sni() {
                params.push(format!("sni={}", sni));
            }
            params.push("tls=true".to_string());
            "trojan"
        }
        NodeType::Shadowsocks => {
            params.push(format!("encrypt-method={}", node.method().unwrap_or_default()));
            params.push(format!("password={}", node.password().unwrap_or_default()));
            "ss"
        }
    };
    Some(format!(
        "{} = {}, {}, {}, {}",
        ep.name,
        kind,
        ep.server,
        node.port,
        params.join(", ")
    ))
}
