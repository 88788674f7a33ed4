use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SubError;

/// Canonical proxy protocol of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Vmess,
    Vless,
    Trojan,
    Shadowsocks,
}

impl NodeType {
    /// Canonicalize a raw type name (case-insensitive, `ss` and
    /// `shadowsocks` are the same protocol).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vmess" => Some(NodeType::Vmess),
            "vless" => Some(NodeType::Vless),
            "trojan" => Some(NodeType::Trojan),
            "ss" | "shadowsocks" => Some(NodeType::Shadowsocks),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Vmess => "vmess",
            NodeType::Vless => "vless",
            NodeType::Trojan => "trojan",
            NodeType::Shadowsocks => "ss",
        }
    }
}

/// One upstream proxy endpoint as stored in a subscription config.
///
/// Protocol-specific fields are optional; which ones matter depends on the
/// node type. Empty strings are treated the same as absent fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Node {
    /// Raw protocol name (`vmess`, `VLESS`, `ss`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Display label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Connection target before front-address substitution
    pub server: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alter_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Shadowsocks cipher (also the vmess security for Loon)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Transport: tcp, ws or grpc
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// `"tls"` when the transport is wrapped in TLS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
}

impl Node {
    /// Create a node with just a type and a connection target
    pub fn new(kind: impl Into<String>, server: impl Into<String>, port: u16) -> Self {
        Self {
            kind: kind.into(),
            server: server.into(),
            port,
            ..Default::default()
        }
    }

    /// Canonical type, `None` for protocols no serializer understands
    pub fn node_type(&self) -> Option<NodeType> {
        NodeType::parse(&self.kind)
    }

    /// Label used in every output format: `name`, or `server:port`
    pub fn display_name(&self) -> String {
        match non_empty(&self.name) {
            Some(name) => name.to_string(),
            None => format!("{}:{}", self.server, self.port),
        }
    }

    /// Transport name, `tcp` when unset
    pub fn network(&self) -> &str {
        non_empty(&self.network).unwrap_or("tcp")
    }

    pub fn is_ws(&self) -> bool {
        self.network().eq_ignore_ascii_case("ws")
    }

    pub fn is_grpc(&self) -> bool {
        self.network().eq_ignore_ascii_case("grpc")
    }

    pub fn is_tls(&self) -> bool {
        non_empty(&self.tls).is_some_and(|t| t.eq_ignore_ascii_case("tls"))
    }

    pub fn alter_id(&self) -> u32 {
        self.alter_id.unwrap_or(0)
    }

    pub fn uuid(&self) -> Option<&str> {
        non_empty(&self.uuid)
    }

    pub fn password(&self) -> Option<&str> {
        non_empty(&self.password)
    }

    pub fn method(&self) -> Option<&str> {
        non_empty(&self.method)
    }

    pub fn path(&self) -> Option<&str> {
        non_empty(&self.path)
    }

    pub fn host(&self) -> Option<&str> {
        non_empty(&self.host)
    }

    pub fn sni(&self) -> Option<&str> {
        non_empty(&self.sni)
    }

    /// Builder helpers, mostly for tests and the default config
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_ws(mut self, path: impl Into<String>, host: impl Into<String>) -> Self {
        self.network = Some("ws".to_string());
        self.path = Some(path.into());
        self.host = Some(host.into());
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_tls(mut self) -> Self {
        self.tls = Some("tls".to_string());
        self
    }

    pub fn with_sni(mut self, sni: impl Into<String>) -> Self {
        self.sni = Some(sni.into());
        self
    }
}

/// Treat `Some("")` like `None`.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Target client format of a generated subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Base64,
    Clash,
    SingBox,
    Loon,
    Surge,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Base64,
        OutputFormat::Clash,
        OutputFormat::SingBox,
        OutputFormat::Loon,
        OutputFormat::Surge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Base64 => "base64",
            OutputFormat::Clash => "clash",
            OutputFormat::SingBox => "singbox",
            OutputFormat::Loon => "loon",
            OutputFormat::Surge => "surge",
        }
    }

    /// HTTP content type for the generated document
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Clash => "application/x-yaml; charset=utf-8",
            OutputFormat::SingBox => "application/json; charset=utf-8",
            OutputFormat::Base64 | OutputFormat::Loon | OutputFormat::Surge => {
                "text/plain; charset=utf-8"
            }
        }
    }

    /// Suggested download file name
    pub fn file_name(&self) -> &'static str {
        match self {
            OutputFormat::Base64 => "subscription.txt",
            OutputFormat::Clash => "clash.yaml",
            OutputFormat::SingBox => "singbox.json",
            OutputFormat::Loon => "loon.conf",
            OutputFormat::Surge => "surge.conf",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = SubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(OutputFormat::Base64),
            "clash" => Ok(OutputFormat::Clash),
            "singbox" | "sing-box" => Ok(OutputFormat::SingBox),
            "loon" => Ok(OutputFormat::Loon),
            "surge" => Ok(OutputFormat::Surge),
            _ => Err(SubError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_case_insensitive() {
        assert_eq!(NodeType::parse("VMess"), Some(NodeType::Vmess));
        assert_eq!(NodeType::parse("VLESS"), Some(NodeType::Vless));
        assert_eq!(NodeType::parse("trojan"), Some(NodeType::Trojan));
        assert_eq!(NodeType::parse("ss"), Some(NodeType::Shadowsocks));
        assert_eq!(NodeType::parse("Shadowsocks"), Some(NodeType::Shadowsocks));
        assert_eq!(NodeType::parse("hysteria2"), None);
    }

    #[test]
    fn test_display_name_fallback() {
        let node = Node::new("vmess", "1.2.3.4", 443);
        assert_eq!(node.display_name(), "1.2.3.4:443");

        let node = node.with_name("HK-01");
        assert_eq!(node.display_name(), "HK-01");

        // Empty name behaves like a missing one
        let mut node = Node::new("vmess", "example.com", 8443);
        node.name = Some(String::new());
        assert_eq!(node.display_name(), "example.com:8443");
    }

    #[test]
    fn test_node_defaults() {
        let node = Node::new("vmess", "1.2.3.4", 443);
        assert_eq!(node.network(), "tcp");
        assert_eq!(node.alter_id(), 0);
        assert!(!node.is_tls());
        assert!(!node.is_ws());
        assert!(node.uuid().is_none());
    }

    #[test]
    fn test_node_deserialize_camel_case() {
        let json = r#"{
            "type": "VMESS",
            "server": "1.2.3.4",
            "port": 443,
            "uuid": "abc",
            "alterId": 2,
            "network": "ws",
            "path": "/p",
            "host": "h.com",
            "tls": "tls"
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.node_type(), Some(NodeType::Vmess));
        assert_eq!(node.alter_id(), 2);
        assert!(node.is_ws());
        assert!(node.is_tls());
        assert_eq!(node.path(), Some("/p"));
        assert!(node.name.is_none());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("CLASH".parse::<OutputFormat>().unwrap(), OutputFormat::Clash);
        assert_eq!("singbox".parse::<OutputFormat>().unwrap(), OutputFormat::SingBox);
        assert_eq!("Surge".parse::<OutputFormat>().unwrap(), OutputFormat::Surge);
        assert!("quanx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_metadata() {
        assert_eq!(OutputFormat::Clash.content_type(), "application/x-yaml; charset=utf-8");
        assert_eq!(OutputFormat::SingBox.content_type(), "application/json; charset=utf-8");
        assert_eq!(OutputFormat::Base64.content_type(), "text/plain; charset=utf-8");
        assert_eq!(OutputFormat::Loon.file_name(), "loon.conf");
        for format in OutputFormat::ALL {
            assert_eq!(format.as_str().parse::<OutputFormat>().unwrap(), format);
        }
    }
}
