//! Command execution handlers

use anyhow::{Context, Result};
use neutron_core::packet_filter::{
    CreatePacketFilter, PacketFilterRequest, UpdatePacketFilter, RESOURCE,
};
use std::path::Path;

use crate::client::NeutronClient;
use crate::config::CliConfig;
use crate::format::{
    format_auth_info, format_cli_config, format_packet_filter, format_packet_filters,
    format_success,
};

use super::commands::*;

/// Handle auth-info command
pub async fn handle_auth_info(client: &NeutronClient, format: &OutputFormat) -> Result<()> {
    let info = client.auth_info().await?;
    println!("{}", format_auth_info(&info, &format.into())?);
    Ok(())
}

/// Handle packet filter commands
pub async fn handle_packet_filter(
    client: &NeutronClient,
    command: PacketFilterCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        PacketFilterCommands::List { filters } => {
            let query: Vec<(&str, &str)> = filters
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let filters = client.list_packet_filters(&query).await?;
            println!("{}", format_packet_filters(&filters, &format.into())?);
        }
        PacketFilterCommands::Show { packet_filter } => {
            let filter = client.show_packet_filter(&packet_filter).await?;
            println!("{}", format_packet_filter(&filter, &format.into())?);
        }
        PacketFilterCommands::Create {
            network,
            name,
            admin_state_down,
            in_port,
            matches,
            priority,
            action,
        } => {
            let mut request = CreatePacketFilter::new(network);
            request.name = name;
            request.admin_state_up = !admin_state_down;
            request.priority = priority;
            request.action = action.into();
            request.fields = matches.into();

            // Reject bad fields before resolving names on the server
            PacketFilterRequest::Create(request.clone()).validate()?;

            request.network_id = client
                .find_resource_id_by_name_or_id("network", &request.network_id)
                .await?;
            if let Some(port) = in_port {
                request.in_port = Some(client.find_resource_id_by_name_or_id("port", &port).await?);
            }

            let filter = client.create_packet_filter(request).await?;
            if matches!(format, OutputFormat::Table) {
                println!("Created a new {}:", RESOURCE);
            }
            println!("{}", format_packet_filter(&filter, &format.into())?);
        }
        PacketFilterCommands::Update {
            packet_filter,
            name,
            admin_state,
            matches,
            priority,
            action,
        } => {
            let request = UpdatePacketFilter {
                name,
                admin_state_up: admin_state.map(|s| s == "True"),
                action: action.map(Into::into),
                priority,
                fields: matches.into(),
            };
            let filter = client.update_packet_filter(&packet_filter, request).await?;
            println!(
                "{}",
                format_success(&format!("Updated {}: {}", RESOURCE, filter.id))
            );
        }
        PacketFilterCommands::Delete { packet_filter } => {
            client.delete_packet_filter(&packet_filter).await?;
            println!(
                "{}",
                format_success(&format!("Deleted {}: {}", RESOURCE, packet_filter))
            );
        }
    }

    Ok(())
}

/// Handle config commands
pub fn handle_config(
    command: ConfigCommands,
    config: &CliConfig,
    path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("{}", format_cli_config(config, path, &format.into())?);
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file {} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            config
                .save(path)
                .with_context(|| format!("Failed to initialize {}", path.display()))?;
            println!(
                "{}",
                format_success(&format!("Wrote CLI configuration to {}", path.display()))
            );
        }
    }

    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockServer;
    use neutron_core::{ClientParams, Configuration};
    use serde_json::json;

    async fn client() -> (MockServer, NeutronClient) {
        let (server, url) = MockServer::new().start().await.unwrap();
        let config = Configuration::resolve(ClientParams {
            username: Some("demo".to_string()),
            password: Some("secret".to_string()),
            project_name: Some("demo".to_string()),
            auth_url: Some(url),
            ..Default::default()
        })
        .unwrap();
        (server, NeutronClient::from_config(&config).unwrap())
    }

    fn create_command(network: &str, in_port: Option<&str>) -> PacketFilterCommands {
        PacketFilterCommands::Create {
            network: network.to_string(),
            name: Some("web".to_string()),
            admin_state_down: false,
            in_port: in_port.map(str::to_string),
            matches: MatchArgs {
                protocol: Some("tcp".to_string()),
                ..Default::default()
            },
            priority: "30000".to_string(),
            action: ActionArg::Allow,
        }
    }

    #[tokio::test]
    async fn test_create_resolves_network_and_port_names() {
        let (server, client) = client().await;

        handle_packet_filter(&client, create_command("private", Some("web")), &OutputFormat::Json)
            .await
            .unwrap();

        let filters = server.state().packet_filters.lock().unwrap();
        let stored = filters.values().next().unwrap();
        assert_eq!(stored["network_id"], "net-1");
        assert_eq!(stored["in_port"], "port-1");
        assert_eq!(stored["priority"], "30000");
        assert_eq!(stored["admin_state_up"], true);
    }

    #[tokio::test]
    async fn test_create_validates_before_lookup() {
        let (server, client) = client().await;
        let mut command = create_command("no-such-network", None);
        if let PacketFilterCommands::Create { priority, .. } = &mut command {
            *priority = "70000".to_string();
        }

        let err = handle_packet_filter(&client, command, &OutputFormat::Table)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: priority 70000 should be an integer [0:65535]."
        );
        assert_eq!(server.state().auth_requests(), 0);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_name() {
        let (server, client) = client().await;
        let id = server.state().add_packet_filter(json!({
            "name": "db",
            "network_id": "net-1",
            "protocol": "tcp"
        }));

        let command = PacketFilterCommands::Update {
            packet_filter: "db".to_string(),
            name: None,
            admin_state: Some("False".to_string()),
            matches: MatchArgs {
                protocol: Some(String::new()),
                ..Default::default()
            },
            priority: None,
            action: None,
        };
        handle_packet_filter(&client, command, &OutputFormat::Table)
            .await
            .unwrap();
        {
            let filters = server.state().packet_filters.lock().unwrap();
            assert_eq!(filters[&id]["admin_state_up"], false);
            assert!(filters[&id]["protocol"].is_null());
        }

        handle_packet_filter(
            &client,
            PacketFilterCommands::Delete {
                packet_filter: "db".to_string(),
            },
            &OutputFormat::Table,
        )
        .await
        .unwrap();
        assert!(server.state().packet_filters.lock().unwrap().is_empty());
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");
        let config = CliConfig::default();

        handle_config(ConfigCommands::Init { force: false }, &config, &path, &OutputFormat::Table)
            .unwrap();
        assert!(path.exists());
        assert!(handle_config(
            ConfigCommands::Init { force: false },
            &config,
            &path,
            &OutputFormat::Table
        )
        .is_err());
        assert!(handle_config(
            ConfigCommands::Init { force: true },
            &config,
            &path,
            &OutputFormat::Table
        )
        .is_ok());
    }
}
