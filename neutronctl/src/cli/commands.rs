//! CLI command and subcommand definitions

use clap::{Args, Parser, Subcommand};
use neutron_core::packet_filter::{Action, MatchFields};
use neutron_core::ClientParams;
use std::path::PathBuf;

/// Neutron networking CLI
#[derive(Parser, Debug)]
#[command(name = "neutron")]
#[command(version, about = "Command-line client for the Neutron networking API", long_about = None)]
pub struct Cli {
    /// Output format (overrides config file)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging (overrides config file)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Don't load the CLI config file
    #[arg(long, global = true)]
    pub no_config: bool,

    /// CLI config file path (default: ~/.config/neutron/cli.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub auth: AuthArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection and credential options, each backed by its `OS_*` variable
#[derive(Args, Debug, Clone, Default)]
pub struct AuthArgs {
    /// Authentication username
    #[arg(long, env = "OS_USERNAME", global = true)]
    pub os_username: Option<String>,

    /// Authentication user ID
    #[arg(long, env = "OS_USER_ID", global = true)]
    pub os_user_id: Option<String>,

    /// Authentication password
    #[arg(long, env = "OS_PASSWORD", hide_env_values = true, global = true)]
    pub os_password: Option<String>,

    /// Project name to scope to
    #[arg(long, alias = "os-tenant-name", env = "OS_PROJECT_NAME", global = true)]
    pub os_project_name: Option<String>,

    /// Project ID to scope to
    #[arg(long, alias = "os-tenant-id", env = "OS_PROJECT_ID", global = true)]
    pub os_project_id: Option<String>,

    /// Domain name of the user
    #[arg(long, env = "OS_USER_DOMAIN_NAME", global = true)]
    pub os_user_domain_name: Option<String>,

    /// Domain ID of the user
    #[arg(long, env = "OS_USER_DOMAIN_ID", global = true)]
    pub os_user_domain_id: Option<String>,

    /// Domain name of the project
    #[arg(long, env = "OS_PROJECT_DOMAIN_NAME", global = true)]
    pub os_project_domain_name: Option<String>,

    /// Domain ID of the project
    #[arg(long, env = "OS_PROJECT_DOMAIN_ID", global = true)]
    pub os_project_domain_id: Option<String>,

    /// Identity service URL
    #[arg(long, env = "OS_AUTH_URL", global = true)]
    pub os_auth_url: Option<String>,

    /// Region to pick endpoints from
    #[arg(long, env = "OS_REGION_NAME", global = true)]
    pub os_region_name: Option<String>,

    /// Pre-issued token; with --os-url the identity service is bypassed
    #[arg(long, env = "OS_TOKEN", hide_env_values = true, global = true)]
    pub os_token: Option<String>,

    /// Networking endpoint URL, skipping catalog lookup
    #[arg(long, env = "OS_URL", global = true)]
    pub os_url: Option<String>,

    /// Skip server certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// CA bundle to verify server certificates with
    #[arg(long, env = "OS_CACERT", global = true)]
    pub os_cacert: Option<PathBuf>,

    /// Client certificate (PEM)
    #[arg(long, env = "OS_CERT", global = true)]
    pub os_cert: Option<PathBuf>,

    /// Client private key (PEM)
    #[arg(long, env = "OS_KEY", global = true)]
    pub os_key: Option<PathBuf>,

    /// Endpoint interface: public, internal or admin
    #[arg(long, alias = "os-endpoint-type", env = "OS_INTERFACE", global = true)]
    pub os_interface: Option<String>,

    /// Service type in the catalog (default: network)
    #[arg(long, env = "OS_NETWORK_SERVICE_TYPE", global = true)]
    pub os_service_type: Option<String>,

    /// Service name in the catalog
    #[arg(long, env = "OS_NETWORK_SERVICE_NAME", global = true)]
    pub os_service_name: Option<String>,

    /// Auth strategy: keystone or noauth
    #[arg(long, env = "OS_AUTH_STRATEGY", global = true)]
    pub os_auth_strategy: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub http_timeout: Option<u64>,

    /// Networking API version
    #[arg(long, env = "OS_NETWORK_API_VERSION", global = true)]
    pub os_network_api_version: Option<String>,

    /// Cloud profile from the clouds file
    #[arg(long, env = "OS_CLOUD", global = true)]
    pub os_cloud: Option<String>,
}

impl AuthArgs {
    /// Construction parameters given on the command line or in `OS_*` variables
    pub fn to_params(&self) -> ClientParams {
        ClientParams {
            username: self.os_username.clone(),
            user_id: self.os_user_id.clone(),
            password: self.os_password.clone(),
            project_name: self
                .os_project_name
                .clone()
                .or_else(|| env_var("OS_TENANT_NAME")),
            project_id: self.os_project_id.clone().or_else(|| env_var("OS_TENANT_ID")),
            user_domain_name: self.os_user_domain_name.clone(),
            user_domain_id: self.os_user_domain_id.clone(),
            project_domain_name: self.os_project_domain_name.clone(),
            project_domain_id: self.os_project_domain_id.clone(),
            auth_url: self.os_auth_url.clone(),
            region_name: self.os_region_name.clone(),
            token: self.os_token.clone(),
            endpoint_url: self.os_url.clone(),
            insecure: self.insecure.then_some(true),
            ca_cert: self.os_cacert.clone(),
            cert: self.os_cert.clone(),
            key: self.os_key.clone(),
            interface: self
                .os_interface
                .clone()
                .or_else(|| env_var("OS_ENDPOINT_TYPE")),
            service_type: self.os_service_type.clone(),
            service_name: self.os_service_name.clone(),
            auth_strategy: self.os_auth_strategy.clone(),
            timeout: self.http_timeout,
            api_version: self.os_network_api_version.clone(),
            cloud: self.os_cloud.clone(),
            ..Default::default()
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the token, endpoint and identity in use
    AuthInfo,

    /// Packet filter commands
    PacketFilter {
        #[command(subcommand)]
        command: PacketFilterCommands,
    },

    /// Show or manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ActionArg {
    Allow,
    Drop,
}

impl From<ActionArg> for Action {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Allow => Action::Allow,
            ActionArg::Drop => Action::Drop,
        }
    }
}

/// Match fields shared by create and update
#[derive(Args, Debug, Clone, Default)]
pub struct MatchArgs {
    /// Source MAC address
    #[arg(long)]
    pub src_mac: Option<String>,

    /// Destination MAC address
    #[arg(long)]
    pub dst_mac: Option<String>,

    /// Ether type, integer [0:65535] (hex or decimal), e.g. 0x0800 (IPv4)
    #[arg(long)]
    pub eth_type: Option<String>,

    /// IP protocol: name (icmp, tcp, udp, arp) or integer [0:255] (decimal or hex)
    #[arg(long)]
    pub protocol: Option<String>,

    /// Source IP address CIDR
    #[arg(long)]
    pub src_cidr: Option<String>,

    /// Destination IP address CIDR
    #[arg(long)]
    pub dst_cidr: Option<String>,

    /// Source port
    #[arg(long)]
    pub src_port: Option<String>,

    /// Destination port
    #[arg(long)]
    pub dst_port: Option<String>,
}

impl From<MatchArgs> for MatchFields {
    fn from(args: MatchArgs) -> Self {
        MatchFields {
            eth_type: args.eth_type,
            protocol: args.protocol,
            src_mac: args.src_mac,
            dst_mac: args.dst_mac,
            src_cidr: args.src_cidr,
            dst_cidr: args.dst_cidr,
            src_port: args.src_port,
            dst_port: args.dst_port,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum PacketFilterCommands {
    /// List packet filters
    List {
        /// Filter as key=value; may be repeated
        #[arg(short = 'F', long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,
    },

    /// Show a packet filter
    Show {
        /// Packet filter name or ID
        packet_filter: String,
    },

    /// Create a packet filter
    Create {
        /// Network name or ID the filter applies to
        network: String,

        /// Name of this packet filter
        #[arg(long)]
        name: Option<String>,

        /// Set admin state up to false
        #[arg(long)]
        admin_state_down: bool,

        /// Name or ID of the input port
        #[arg(long, value_name = "PORT")]
        in_port: Option<String>,

        #[command(flatten)]
        matches: MatchArgs,

        /// Priority of the filter, integer [0:65535]
        #[arg(long, default_value = "30000")]
        priority: String,

        /// Action of the filter
        #[arg(long, value_enum, default_value = "allow")]
        action: ActionArg,
    },

    /// Update a packet filter; pass "" or action=clear to unset a match field
    Update {
        /// Packet filter name or ID
        packet_filter: String,

        /// Name of this packet filter
        #[arg(long)]
        name: Option<String>,

        /// Set admin state up
        #[arg(long, value_parser = ["True", "False"])]
        admin_state: Option<String>,

        #[command(flatten)]
        matches: MatchArgs,

        /// Priority of the filter, integer [0:65535]
        #[arg(long)]
        priority: Option<String>,

        /// Action of the filter
        #[arg(long, value_enum)]
        action: Option<ActionArg>,
    },

    /// Delete a packet filter
    Delete {
        /// Packet filter name or ID
        packet_filter: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective CLI configuration
    Show,

    /// Write the effective CLI configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid filter '{}', expected key=value", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("name=web").unwrap(),
            ("name".to_string(), "web".to_string())
        );
        assert_eq!(
            parse_key_val("description=a=b").unwrap(),
            ("description".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("name").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "neutron",
            "packet-filter",
            "create",
            "private",
            "--protocol",
            "tcp",
            "--dst-port",
            "80",
            "--action",
            "drop",
            "--admin-state-down",
        ])
        .unwrap();

        match cli.command {
            Commands::PacketFilter {
                command:
                    PacketFilterCommands::Create {
                        network,
                        priority,
                        action,
                        admin_state_down,
                        matches,
                        ..
                    },
            } => {
                assert_eq!(network, "private");
                assert_eq!(priority, "30000");
                assert!(matches!(action, ActionArg::Drop));
                assert!(admin_state_down);
                assert_eq!(matches.protocol.as_deref(), Some("tcp"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_auth_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "neutron",
            "auth-info",
            "--os-token",
            "t",
            "--os-url",
            "http://neutron:9696",
            "--insecure",
        ])
        .unwrap();

        let params = cli.auth.to_params();
        assert_eq!(params.token.as_deref(), Some("t"));
        assert_eq!(params.endpoint_url.as_deref(), Some("http://neutron:9696"));
        assert_eq!(params.insecure, Some(true));
    }

    #[test]
    fn test_update_admin_state_values() {
        assert!(Cli::try_parse_from([
            "neutron",
            "packet-filter",
            "update",
            "pf-1",
            "--admin-state",
            "yes"
        ])
        .is_err());
    }
}
