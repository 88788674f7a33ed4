//! Subscription serializers, one per client format.
//!
//! - `Base64`: share links (`vmess://`, `vless://`, `trojan://`, `ss://`), base64 blob
//! - `Clash`: YAML document with proxy groups and rules
//! - `SingBox`: JSON document with outbounds
//! - `Loon`: INI-style sections with positional proxy lines
//! - `Surge`: INI-style sections with named proxy parameters

use crate::config::SubscriptionConfig;
use crate::error::Result;
use crate::resolver::{FrontResolver, PoolSelector};
use crate::types::{Node, NodeType, OutputFormat};

mod clash;
mod links;
mod loon;
mod singbox;
mod surge;

pub use clash::Clash;
pub use links::Base64;
pub use loon::Loon;
pub use singbox::SingBox;
pub use surge::Surge;

/// Health-check URL shared by the generated test groups
pub const TEST_URL: &str = "http://www.gstatic.com/generate_204";

/// A subscription serializer.
pub trait Converter: Send + Sync {
    /// Format this converter produces
    fn format(&self) -> OutputFormat;

    /// Render the whole subscription document.
    ///
    /// Front addresses are drawn from `config.proxy_ips` through `selector`,
    /// one fresh pick per node.
    fn convert(&self, config: &SubscriptionConfig, selector: &dyn PoolSelector) -> Result<String>;
}

/// Converter for `format`
pub fn converter_for(format: OutputFormat) -> &'static dyn Converter {
    match format {
        OutputFormat::Base64 => &Base64,
        OutputFormat::Clash => &Clash,
        OutputFormat::SingBox => &SingBox,
        OutputFormat::Loon => &Loon,
        OutputFormat::Surge => &Surge,
    }
}

/// Generate a subscription document in `format`.
pub fn generate(
    format: OutputFormat,
    config: &SubscriptionConfig,
    selector: &dyn PoolSelector,
) -> Result<String> {
    let output = converter_for(format).convert(config, selector)?;
    log::debug!(
        "generated {} subscription: {} nodes, {} bytes",
        format,
        config.nodes.len(),
        output.len()
    );
    Ok(output)
}

/// A node ready for serialization.
pub(crate) struct Endpoint<'a> {
    pub node: &'a Node,
    pub node_type: NodeType,
    /// Label shared by the proxy entry and the groups referencing it
    pub name: String,
    /// Front address, or the node's own server
    pub server: String,
}

/// Resolve every node with a known type, in input order.
pub(crate) fn endpoints<'a>(
    config: &'a SubscriptionConfig,
    selector: &dyn PoolSelector,
) -> Vec<Endpoint<'a>> {
    let resolver = FrontResolver::new(&config.proxy_ips, selector);
    config
        .nodes
        .iter()
        .filter_map(|node| {
            let Some(node_type) = node.node_type() else {
                log::debug!("skipping node {:?}: unknown type {:?}", node.display_name(), node.kind);
                return None;
            };
            Some(Endpoint {
                node,
                node_type,
                name: node.display_name(),
                server: resolver.server_for(node),
            })
        })
        .collect()
}
