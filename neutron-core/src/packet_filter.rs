//! Packet filter resource models and validation

use crate::error::{NeutronError, Result};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Singular resource name
pub const RESOURCE: &str = "packet_filter";

/// Default priority for new filters
pub const DEFAULT_PRIORITY: &str = "30000";

/// Value that clears a nullable field on update
pub const CLEAR_VALUE: &str = "action=clear";

/// Filter action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Allow,
    Drop,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Drop => "drop",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = NeutronError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(Action::Allow),
            "drop" => Ok(Action::Drop),
            _ => Err(NeutronError::InvalidInput(format!(
                "action {} should be either allow or drop",
                s
            ))),
        }
    }
}

/// Packet filter as returned by the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketFilter {
    pub id: String,
    pub name: Option<String>,
    pub network_id: String,
    pub tenant_id: Option<String>,
    pub action: Option<String>,
    pub priority: Option<Value>,
    pub admin_state_up: Option<bool>,
    pub status: Option<String>,
    pub in_port: Option<String>,
    pub eth_type: Option<Value>,
    pub protocol: Option<String>,
    pub src_mac: Option<String>,
    pub dst_mac: Option<String>,
    pub src_cidr: Option<String>,
    pub dst_cidr: Option<String>,
    pub src_port: Option<Value>,
    pub dst_port: Option<Value>,
}

fn display_value(value: &Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

impl PacketFilter {
    /// Multi-line match summary shown in list output
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let mut proto_eth_type = Vec::new();
        if let Some(protocol) = non_empty(&self.protocol) {
            proto_eth_type.push(format!("protocol: {}", protocol.to_uppercase()));
        }
        if let Some(eth_type) = display_value(&self.eth_type) {
            proto_eth_type.push(format!("eth_type: {}", eth_type));
        }
        if !proto_eth_type.is_empty() {
            lines.push(proto_eth_type.join(", "));
        }

        lines.push(format!("network: {}", self.network_id));

        if let Some(in_port) = non_empty(&self.in_port) {
            lines.push(format!("in_port: {}", in_port));
        }

        let source: Vec<String> = [
            non_empty(&self.src_mac),
            non_empty(&self.src_cidr),
            display_value(&self.src_port),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !source.is_empty() {
            lines.push(format!("source: {}", source.join(" ")));
        }

        let dest: Vec<String> = [
            non_empty(&self.dst_mac),
            non_empty(&self.dst_cidr),
            display_value(&self.dst_port),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !dest.is_empty() {
            lines.push(format!("destination: {}", dest.join(" ")));
        }

        lines.join("\n")
    }

    pub fn priority_display(&self) -> String {
        display_value(&self.priority).unwrap_or_default()
    }
}

/// Match fields shared by create and update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFields {
    pub eth_type: Option<String>,
    pub protocol: Option<String>,
    pub src_mac: Option<String>,
    pub dst_mac: Option<String>,
    pub src_cidr: Option<String>,
    pub dst_cidr: Option<String>,
    pub src_port: Option<String>,
    pub dst_port: Option<String>,
}

impl MatchFields {
    fn entries(&self) -> [(&'static str, &Option<String>); 8] {
        [
            ("eth_type", &self.eth_type),
            ("protocol", &self.protocol),
            ("src_mac", &self.src_mac),
            ("dst_mac", &self.dst_mac),
            ("src_cidr", &self.src_cidr),
            ("dst_cidr", &self.dst_cidr),
            ("src_port", &self.src_port),
            ("dst_port", &self.dst_port),
        ]
    }

    /// Validate protocol, ports and CIDRs
    pub fn validate(&self) -> Result<()> {
        validate_protocol(self.protocol.as_deref())?;
        validate_int_range("src_port", self.src_port.as_deref(), 0, 0xffff)?;
        validate_int_range("dst_port", self.dst_port.as_deref(), 0, 0xffff)?;
        validate_cidr("src_cidr", self.src_cidr.as_deref())?;
        validate_cidr("dst_cidr", self.dst_cidr.as_deref())?;
        Ok(())
    }
}

/// Fields of a new packet filter, with network and port already resolved to IDs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePacketFilter {
    pub network_id: String,
    pub in_port: Option<String>,
    pub name: Option<String>,
    pub admin_state_up: bool,
    pub action: Action,
    pub priority: String,
    pub fields: MatchFields,
}

impl CreatePacketFilter {
    pub fn new(network_id: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            in_port: None,
            name: None,
            admin_state_up: true,
            action: Action::Allow,
            priority: DEFAULT_PRIORITY.to_string(),
            fields: MatchFields::default(),
        }
    }
}

/// Changes to an existing packet filter
///
/// A match field set to `""` or `action=clear` is sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePacketFilter {
    pub name: Option<String>,
    pub admin_state_up: Option<bool>,
    pub action: Option<Action>,
    pub priority: Option<String>,
    pub fields: MatchFields,
}

/// A packet filter write, one variant per operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketFilterRequest {
    Create(CreatePacketFilter),
    Update(UpdatePacketFilter),
}

impl PacketFilterRequest {
    /// Validate every user-supplied field
    pub fn validate(&self) -> Result<()> {
        let (fields, priority) = match self {
            PacketFilterRequest::Create(req) => (&req.fields, Some(req.priority.as_str())),
            PacketFilterRequest::Update(req) => (&req.fields, req.priority.as_deref()),
        };
        validate_int_range("priority", priority, 0, 0xffff)?;
        fields.validate()
    }

    /// Validate and build the inner resource body
    pub fn to_body(&self) -> Result<Map<String, Value>> {
        self.validate()?;
        let mut body = Map::new();

        match self {
            PacketFilterRequest::Create(req) => {
                body.insert("network_id".into(), Value::String(req.network_id.clone()));
                body.insert("admin_state_up".into(), Value::Bool(req.admin_state_up));
                if let Some(in_port) = &req.in_port {
                    body.insert("in_port".into(), Value::String(in_port.clone()));
                }
                body.insert("action".into(), Value::String(req.action.to_string()));
                body.insert("priority".into(), Value::String(req.priority.clone()));
                if let Some(name) = &req.name {
                    body.insert("name".into(), Value::String(name.clone()));
                }
                for (key, value) in req.fields.entries() {
                    if let Some(value) = non_empty(value) {
                        body.insert(key.into(), Value::String(value));
                    }
                }
            }
            PacketFilterRequest::Update(req) => {
                if let Some(admin_state_up) = req.admin_state_up {
                    body.insert("admin_state_up".into(), Value::Bool(admin_state_up));
                }
                for (key, value) in req.fields.entries() {
                    match value.as_deref() {
                        None => {}
                        Some("") | Some(CLEAR_VALUE) => {
                            body.insert(key.into(), Value::Null);
                        }
                        Some(v) => {
                            body.insert(key.into(), Value::String(v.to_string()));
                        }
                    }
                }
                if let Some(action) = req.action {
                    body.insert("action".into(), Value::String(action.to_string()));
                }
                if let Some(priority) = &req.priority {
                    body.insert("priority".into(), Value::String(priority.clone()));
                }
                if let Some(name) = &req.name {
                    body.insert("name".into(), Value::String(name.clone()));
                }
            }
        }

        Ok(body)
    }
}

/// Parse an integer in decimal or with a `0x`/`0o`/`0b` prefix
pub fn parse_int_auto(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let lower = digits.to_ascii_lowercase();
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        // ambiguous legacy octal
        None
    } else {
        lower.parse::<i64>().ok()
    }?;
    Some(if negative { -parsed } else { parsed })
}

/// Protocol is a name (checked server-side) or an integer in `[0:255]`
pub fn validate_protocol(protocol: Option<&str>) -> Result<()> {
    let protocol = match protocol {
        None | Some("") | Some(CLEAR_VALUE) => return Ok(()),
        Some(p) => p,
    };
    match parse_int_auto(protocol) {
        Some(n) if (0..=255).contains(&n) => Ok(()),
        // anything that is not an integer is a protocol name
        None => Ok(()),
        Some(_) => Err(NeutronError::InvalidInput(format!(
            "protocol {} should be either of name (tcp, udp, icmp, arp; case insensitive) \
             or integer [0:255] (decimal or hex).",
            protocol
        ))),
    }
}

/// Validate an optional integer field against an inclusive range
pub fn validate_int_range(name: &str, value: Option<&str>, min: i64, max: i64) -> Result<()> {
    let value = match value {
        None | Some("") => return Ok(()),
        Some(v) => v,
    };
    match parse_int_auto(value) {
        Some(n) if (min..=max).contains(&n) => Ok(()),
        _ => Err(NeutronError::InvalidInput(format!(
            "{} {} should be an integer [{}:{}].",
            name.replace('_', "-"),
            value,
            min,
            max
        ))),
    }
}

/// Validate an optional IP address or CIDR field
pub fn validate_cidr(name: &str, value: Option<&str>) -> Result<()> {
    let value = match value {
        None | Some("") | Some(CLEAR_VALUE) => return Ok(()),
        Some(v) => v,
    };
    if value.parse::<IpNet>().is_ok() || value.parse::<IpAddr>().is_ok() {
        Ok(())
    } else {
        Err(NeutronError::InvalidInput(format!(
            "{} {} is not a valid CIDR",
            name.replace('_', "-"),
            value
        )))
    }
}
