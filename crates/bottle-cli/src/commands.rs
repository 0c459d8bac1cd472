//! Command handlers for the Bottle CLI

use tokio::time::timeout;
use tracing::{info, warn};

use bottle_core::{Incoming, Lookup};
use bottle_ws::{send_data, Connection, Connector, PortClient, PortConnection, WsConnector};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::{CliError, Result};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        let connector = WsConnector::new(config.client.stream_buffer);
        let client = PortClient::new(connector, config.client.clone())?;

        match cli.command {
            Commands::Query { port_name } => Self::handle_query(&client, &config, &port_name).await,
            Commands::Stream {
                port_name,
                count,
                headers,
            } => Self::handle_stream(&client, &config, &port_name, count, headers).await,
            Commands::Send { url, words, reply } => {
                Self::handle_send(&client, &config, &url, &Cli::command_text(&words), reply).await
            }
            Commands::Config => Self::handle_config(&config),
        }
    }

    /// Handle the query command
    async fn handle_query(
        client: &PortClient<WsConnector>,
        config: &AppConfig,
        port_name: &str,
    ) -> Result<()> {
        let lookup = client
            .lookup_at(&config.client.nameserver_host, config.client.nameserver_port, port_name)
            .await?;

        if config.output.json {
            println!("{}", serde_json::to_string(&lookup)?);
        }
        match lookup {
            Lookup::Found(address) => {
                if !config.output.json {
                    println!("{} {}", port_name, address);
                }
                Ok(())
            }
            Lookup::NotFound => Err(CliError::PortNotFound(port_name.to_string())),
            Lookup::Incomplete { ip, .. } => Err(incomplete(port_name, ip.is_none())),
        }
    }

    /// Handle the stream command
    async fn handle_stream(
        client: &PortClient<WsConnector>,
        config: &AppConfig,
        port_name: &str,
        count: Option<usize>,
        headers: bool,
    ) -> Result<()> {
        let outcome = client
            .open_port_stream_at(&config.client.nameserver_host, config.client.nameserver_port, port_name)
            .await?;

        let mut stream = match outcome {
            PortConnection::Streaming(stream) => stream,
            PortConnection::NotFound => return Err(CliError::PortNotFound(port_name.to_string())),
            PortConnection::Incomplete { ip, .. } => return Err(incomplete(port_name, ip.is_none())),
        };
        info!("Streaming {} from {}", port_name, stream.address());

        let show_headers = headers || config.output.show_headers;
        let mut printed = 0;
        loop {
            let message = tokio::select! {
                message = stream.next() => message,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            };
            let Some(message) = message else {
                warn!("Port {} closed the stream", port_name);
                break;
            };

            if matches!(message, Incoming::Header(_)) && !show_headers {
                continue;
            }
            print_incoming(&message, config.output.json)?;

            printed += 1;
            if count.is_some_and(|limit| printed >= limit) {
                break;
            }
        }
        Ok(())
    }

    /// Handle the send command
    async fn handle_send(
        client: &PortClient<WsConnector>,
        config: &AppConfig,
        url: &str,
        text: &str,
        reply: bool,
    ) -> Result<()> {
        let connection = client.connector().open(url).await?;
        let mut replies = connection.subscribe();
        let readiness = &config.client.readiness;

        send_data(connection.as_ref(), text, readiness).await?;
        info!("Sent \"{}\" to {}", text, connection.url());

        if reply {
            let budget = readiness.budget();
            match timeout(budget, replies.recv()).await {
                Ok(Some(bytes)) => print_incoming(&Incoming::classify(&bytes), config.output.json)?,
                Ok(None) => warn!("{} closed without replying", url),
                Err(_) => return Err(CliError::NoReply(budget.as_millis())),
            }
        }
        Ok(())
    }

    /// Handle the config command
    fn handle_config(config: &AppConfig) -> Result<()> {
        print!("{}", config.to_toml()?);
        Ok(())
    }
}

fn print_incoming(message: &Incoming, json: bool) -> Result<()> {
    match message {
        Incoming::Bottle(value) if json => println!("{}", serde_json::to_string(value)?),
        other => println!("{}", other),
    }
    Ok(())
}

fn incomplete(port_name: &str, missing_ip: bool) -> CliError {
    CliError::PortIncomplete {
        port_name: port_name.to_string(),
        missing: if missing_ip { "ip" } else { "port_number" }.to_string(),
    }
}
