//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use neutron_core::packet_filter::PacketFilter;
use serde_json::Value;

use crate::config::CliConfig;
use crate::dispatch::AuthInfo;

use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn field_table(rows: Vec<FieldRow>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Format a packet filter list
pub fn format_packet_filters(filters: &[PacketFilter], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(filters)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct FilterRow {
                #[tabled(rename = "id")]
                id: String,
                #[tabled(rename = "name")]
                name: String,
                #[tabled(rename = "action")]
                action: String,
                #[tabled(rename = "priority")]
                priority: String,
                #[tabled(rename = "summary")]
                summary: String,
            }

            let rows: Vec<FilterRow> = filters
                .iter()
                .map(|f| {
                    let action = f.action.clone().unwrap_or_default();
                    FilterRow {
                        id: f.id.cyan().to_string(),
                        name: f.name.clone().unwrap_or_default(),
                        action: match action.as_str() {
                            "allow" => action.green().to_string(),
                            "drop" => action.red().to_string(),
                            _ => action,
                        },
                        priority: f.priority_display(),
                        summary: f.summary(),
                    }
                })
                .collect();

            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
    }
}

/// Format a single packet filter as a field/value table
pub fn format_packet_filter(filter: &PacketFilter, format: &OutputFormat) -> Result<String> {
    let value = serde_json::to_value(filter)?;
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&value)?),
        OutputFormat::Table => {
            let rows: Vec<FieldRow> = value
                .as_object()
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(field, value)| FieldRow {
                            field: field.clone(),
                            value: display(value),
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok(field_table(rows))
        }
    }
}

/// Format token, endpoint and identity of the current credentials
pub fn format_auth_info(info: &AuthInfo, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(info)?),
        OutputFormat::Table => {
            let or_dash =
                |v: &Option<String>| v.clone().unwrap_or_else(|| "-".dimmed().to_string());
            let rows = vec![
                FieldRow {
                    field: "endpoint_url".to_string(),
                    value: info.endpoint_url.cyan().to_string(),
                },
                FieldRow {
                    field: "auth_token".to_string(),
                    value: or_dash(&info.auth_token),
                },
                FieldRow {
                    field: "auth_tenant_id".to_string(),
                    value: or_dash(&info.auth_tenant_id),
                },
                FieldRow {
                    field: "auth_user_id".to_string(),
                    value: or_dash(&info.auth_user_id),
                },
            ];
            Ok(format!("{}\n{}", "Authentication:".bold(), field_table(rows)))
        }
    }
}

/// Format CLI preferences
pub fn format_cli_config(
    config: &CliConfig,
    path: &std::path::Path,
    format: &OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
        OutputFormat::Table => {
            let mut output = String::new();
            output.push_str(&"CLI Configuration".bold().to_string());
            output.push('\n');
            output.push_str(&format!("File: {}", path.display().to_string().cyan()));
            output.push('\n');
            output.push_str(&format!("Output format: {}", config.output_format.yellow()));
            output.push('\n');
            output.push_str(&format!("Verbose: {}", config.verbose));
            output.push('\n');
            output.push_str(&format!(
                "Timeout: {}",
                config
                    .timeout
                    .map(|t| format!("{} seconds", t))
                    .unwrap_or_else(|| "none".to_string())
            ));
            Ok(output)
        }
    }
}

/// Format success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}
