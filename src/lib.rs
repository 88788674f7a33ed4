//! Subscription Engine - proxy subscription generation for Rust
//!
//! This library turns one stored subscription (a list of upstream proxy
//! nodes plus a pool of front addresses) into client configurations:
//! - Base64 share-link lists (`vmess://`, `vless://`, `trojan://`, `ss://`)
//! - Clash YAML, optionally routed by an INI profile
//! - sing-box JSON
//! - Loon and Surge profiles
//!
//! # Example
//!
//! ```rust
//! use sub_engine_r::{generate, FixedSelector, Node, OutputFormat, SubscriptionConfig};
//!
//! let node = Node::new("trojan", "t.example.com", 443)
//!     .with_name("T")
//!     .with_password("pw");
//!
//! // Every node is served through a front address picked from the pool
//! let config = SubscriptionConfig::new(vec![node], vec!["1.2.3.4:443#US".to_string()]);
//!
//! let surge = generate(OutputFormat::Surge, &config, &FixedSelector::default()).unwrap();
//! assert!(surge.contains("T = trojan, 1.2.3.4, 443, password=pw, tls=true"));
//! ```
//!
//! # Profile Syntax
//!
//! Clash routing can be driven by an ACL4SSR-style INI profile:
//! ```text
//! ruleset=<group>,<rule-list URL | []GEOIP,CN | []FINAL>
//! custom_proxy_group=<name>`<type>`<member>`...[`<url>`<interval>`<tolerance>]
//! ```
//!
//! ## Group Members
//!
//! | Member | Example | Expands to |
//! |--------|---------|------------|
//! | All | `.*` | Every node name |
//! | Group | `[]🚀 节点选择` | The literal group (or `DIRECT`/`REJECT`) |
//! | Regex | `(HK\|SG)` | Node names matching, case-insensitive |
//! | Literal | `HK-01` | Itself |
//!
//! A group whose members expand to nothing falls back to `DIRECT`.

pub mod compile;
pub mod config;
pub mod error;
pub mod format;
pub mod parser;
pub mod resolver;
pub mod types;
pub mod yaml;

// Re-export commonly used items
pub use compile::{apply_profile, compile_profile, ClashGroup, CompiledRouting};
pub use config::{SubscriptionConfig, DEFAULT_PROFILE};
pub use error::{ProfileErrorKind, Result, SubError};
pub use parser::{parse_profile, validate_profile, GroupSpec, ProfileConfig, RuleSet};
pub use types::{Node, NodeType, OutputFormat};
pub use yaml::to_yaml;

// Re-export format types
pub use format::{converter_for, generate, Base64, Clash, Converter, Loon, SingBox, Surge};

// Re-export resolver types
pub use resolver::{
    extract_host, import_pool, merge_pool, resolve, FixedSelector, FrontResolver, PoolEntry,
    PoolSelector, RandomSelector, SeededSelector,
};
