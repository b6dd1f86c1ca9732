//! Admiral CLI - Command line interface for the Admiral control plane.

mod config;
mod output;

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use admiral_client::{AdmiralClient, HttpClient, NewHost, TrackMode, Tracking};

use crate::config::{Config, TOKEN_ENV, URL_ENV};
use crate::output::{write_json, Output};

type CliResult = Result<(), Box<dyn Error>>;

/// Admiral CLI - Container management tool
#[derive(Parser)]
#[command(name = "admiral")]
#[command(about = "CLI for the Admiral container management control plane", long_about = None)]
struct Cli {
    /// Control plane URL
    #[arg(long, global = true, env = URL_ENV)]
    url: Option<String>,

    /// Auth token
    #[arg(long, global = true, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,

    /// Give up waiting on tasks after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage containers
    Container {
        #[command(subcommand)]
        command: ContainerCommand,
    },

    /// Manage applications
    App {
        #[command(subcommand)]
        command: AppCommand,
    },

    /// Manage container hosts
    Host {
        #[command(subcommand)]
        command: HostCommand,
    },

    /// Manage networks
    Network {
        #[command(subcommand)]
        command: NetworkCommand,
    },

    /// Wait for a submitted task to finish
    Wait {
        /// Task ID
        task: String,
    },

    /// Show the current status of a task
    Status {
        /// Task ID
        task: String,
    },

    /// Log in and store the auth token
    Login {
        /// User name
        #[arg(short, long)]
        user: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Log out and forget the stored auth token
    Logout,

    /// Show or change the CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Flag shared by every operation that submits a task.
#[derive(Args, Clone, Copy)]
struct TrackArgs {
    /// Return as soon as the task is submitted
    #[arg(long = "async")]
    async_task: bool,
}

impl TrackArgs {
    fn mode(self) -> TrackMode {
        TrackMode::from_async(self.async_task)
    }
}

#[derive(Subcommand)]
enum ContainerCommand {
    /// List containers
    Ls {
        /// Only containers matching this text
        #[arg(short, long)]
        query: Option<String>,

        /// Include system containers
        #[arg(short, long)]
        all: bool,
    },

    /// Show container details
    Inspect {
        /// Container ID
        id: String,
    },

    /// Start containers
    Start {
        /// Container IDs
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        track: TrackArgs,
    },

    /// Stop containers
    Stop {
        /// Container IDs
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        track: TrackArgs,
    },

    /// Remove containers
    Rm {
        /// Container IDs
        #[arg(required_unless_present = "query")]
        ids: Vec<String>,

        /// Remove every container matching this text
        #[arg(short, long, conflicts_with = "ids")]
        query: Option<String>,

        #[command(flatten)]
        track: TrackArgs,
    },

    /// Scale the cluster of a container
    Scale {
        /// Container ID
        id: String,

        /// Desired number of instances
        #[arg(short, long)]
        count: u32,

        #[command(flatten)]
        track: TrackArgs,
    },

    /// Run a command inside a container
    Exec {
        /// Container ID
        id: String,

        /// Command to run
        #[arg(long)]
        cmd: String,
    },
}

#[derive(Subcommand)]
enum AppCommand {
    /// List applications
    Ls,

    /// Show application details
    Inspect {
        /// Application ID
        id: String,
    },

    /// Start applications
    Start {
        /// Application IDs
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        track: TrackArgs,
    },

    /// Stop applications
    Stop {
        /// Application IDs
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        track: TrackArgs,
    },

    /// Remove applications
    Rm {
        /// Application IDs
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        track: TrackArgs,
    },

    /// Provision an application from a template
    Run {
        /// Template ID
        template: String,

        /// Project the application belongs to
        #[arg(long)]
        project: Option<String>,

        #[command(flatten)]
        track: TrackArgs,
    },
}

#[derive(Subcommand)]
enum HostCommand {
    /// List hosts
    Ls {
        /// Only hosts matching this text
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Add a host
    Add {
        /// Docker API address
        #[arg(long)]
        address: String,

        /// Placement zone ID
        #[arg(long)]
        placement_zone: Option<String>,

        /// Credentials ID
        #[arg(long)]
        credentials: Option<String>,

        /// Trust the host certificate without asking
        #[arg(long)]
        accept_cert: bool,
    },

    /// Remove a host
    Rm {
        /// Host ID
        id: String,

        #[command(flatten)]
        track: TrackArgs,
    },

    /// Stop placing containers on a host
    Disable {
        /// Host ID
        id: String,
    },

    /// Resume placing containers on a host
    Enable {
        /// Host ID
        id: String,
    },
}

#[derive(Subcommand)]
enum NetworkCommand {
    /// List networks
    Ls,

    /// Create a network
    Create {
        /// Network name
        name: String,

        /// Network driver
        #[arg(short, long)]
        driver: Option<String>,

        #[command(flatten)]
        track: TrackArgs,
    },

    /// Remove networks
    Rm {
        /// Network IDs
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        track: TrackArgs,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Persist a configuration value
    Set {
        /// Setting to change
        key: ConfigKey,

        /// New value
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigKey {
    /// Control plane URL
    Url,
    /// Seconds between task status polls
    PollInterval,
    /// Task wait timeout in seconds, 0 to wait forever
    Timeout,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) -> CliResult {
    let directive = if verbose { "admiral=debug" } else { "admiral=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(io::stderr)
        .init();
    Ok(())
}

async fn run(cli: Cli) -> CliResult {
    init_tracing(cli.verbose)?;

    let dir = config::config_dir()?;
    let output = Output::new(cli.json);

    let config = Config::load(&dir)?.with_overrides(cli.url, cli.timeout);
    let token = config::resolve_token(cli.token, config::load_token(&dir)?);
    debug!(url = %config.url, authenticated = token.is_some(), "Using control plane");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted");
            interrupt.cancel();
        }
    });

    let http = HttpClient::new(&config.url).with_token(token);
    let tracking =
        Tracking::new(config.poll_policy(), cancel.clone()).with_notifier(output.task_notifier());
    let client = AdmiralClient::new(http, tracking);

    tokio::select! {
        biased;
        result = dispatch(&client, &dir, &config, cli.command, output) => result,
        _ = cancel.cancelled() => Err("interrupted".into()),
    }
}

async fn dispatch(
    client: &AdmiralClient,
    dir: &Path,
    effective: &Config,
    command: Commands,
    output: Output,
) -> CliResult {
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Container { command } => {
            container_command(client, command, output, &mut stdout).await
        }
        Commands::App { command } => {
            app_command(client, command, output, &mut stdout).await
        }
        Commands::Host { command } => {
            host_command(client, command, output, &mut stdout).await
        }
        Commands::Network { command } => {
            network_command(client, command, output, &mut stdout).await
        }
        Commands::Wait { task } => {
            let ids = client.requests.wait(&task).await?;
            output.write_outcome(&mut stdout, TrackMode::Wait, "Task finished", "", &ids)?;
            Ok(())
        }
        Commands::Status { task } => {
            let status = client.requests.status(&task).await?;
            output.write(&mut stdout, &status, Utc::now())?;
            Ok(())
        }
        Commands::Login { user, password } => {
            let token = client.http().login(&user, &password).await?;
            config::save_token(dir, &token)?;
            writeln!(stdout, "Login successful.")?;
            Ok(())
        }
        Commands::Logout => {
            if let Err(e) = client.http().logout().await {
                warn!(error = %e, "Server-side logout failed");
            }
            config::remove_token(dir)?;
            writeln!(stdout, "Logged out.")?;
            Ok(())
        }
        Commands::Config { command } => {
            config_command(dir, effective, command, output, &mut stdout)
        }
    }
}

async fn container_command(
    client: &AdmiralClient,
    command: ContainerCommand,
    output: Output,
    out: &mut impl Write,
) -> CliResult {
    let containers = &client.containers;
    match command {
        ContainerCommand::Ls { query, all } => {
            let list = containers.list(query.as_deref(), all).await?;
            output.write(out, list.as_slice(), Utc::now())?;
        }
        ContainerCommand::Inspect { id } => {
            write_json(out, &containers.inspect(&id).await?)?;
        }
        ContainerCommand::Start { ids, track } => {
            let ids = containers.start(&ids, track.mode()).await?;
            output.write_outcome(
                out,
                track.mode(),
                "Container(s) started",
                "Container(s) are being started",
                &ids,
            )?;
        }
        ContainerCommand::Stop { ids, track } => {
            let ids = containers.stop(&ids, track.mode()).await?;
            output.write_outcome(
                out,
                track.mode(),
                "Container(s) stopped",
                "Container(s) are being stopped",
                &ids,
            )?;
        }
        ContainerCommand::Rm { ids, query, track } => {
            let ids = match query {
                Some(query) => containers.remove_matching(&query, track.mode()).await?,
                None => containers.remove(&ids, track.mode()).await?,
            };
            output.write_outcome(
                out,
                track.mode(),
                "Container(s) removed",
                "Container(s) are being removed",
                &ids,
            )?;
        }
        ContainerCommand::Scale { id, count, track } => {
            let ids = containers.scale(&id, count, track.mode()).await?;
            output.write_outcome(
                out,
                track.mode(),
                "Container scaled",
                "Container is being scaled",
                &ids,
            )?;
        }
        ContainerCommand::Exec { id, cmd } => {
            let result = containers.exec(&id, &cmd).await?;
            write!(out, "{}", result)?;
        }
    }
    Ok(())
}

async fn app_command(
    client: &AdmiralClient,
    command: AppCommand,
    output: Output,
    out: &mut impl Write,
) -> CliResult {
    let apps = &client.apps;
    match command {
        AppCommand::Ls => {
            let list = apps.list().await?;
            output.write(out, list.as_slice(), Utc::now())?;
        }
        AppCommand::Inspect { id } => {
            write_json(out, &apps.inspect(&id).await?)?;
        }
        AppCommand::Start { ids, track } => {
            let ids = apps.start(&ids, track.mode()).await?;
            output.write_outcome(
                out,
                track.mode(),
                "App(s) started",
                "App(s) are being started",
                &ids,
            )?;
        }
        AppCommand::Stop { ids, track } => {
            let ids = apps.stop(&ids, track.mode()).await?;
            output.write_outcome(
                out,
                track.mode(),
                "App(s) stopped",
                "App(s) are being stopped",
                &ids,
            )?;
        }
        AppCommand::Rm { ids, track } => {
            let ids = apps.remove(&ids, track.mode()).await?;
            output.write_outcome(
                out,
                track.mode(),
                "App(s) removed",
                "App(s) are being removed",
                &ids,
            )?;
        }
        AppCommand::Run {
            template,
            project,
            track,
        } => {
            let ids = apps.run(&template, project.as_deref(), track.mode()).await?;
            output.write_outcome(
                out,
                track.mode(),
                "App provisioned",
                "App is being provisioned",
                &ids,
            )?;
        }
    }
    Ok(())
}

async fn host_command(
    client: &AdmiralClient,
    command: HostCommand,
    output: Output,
    out: &mut impl Write,
) -> CliResult {
    let hosts = &client.hosts;
    match command {
        HostCommand::Ls { query } => {
            let list = hosts.list(query.as_deref()).await?;
            output.write(out, list.as_slice(), Utc::now())?;
        }
        HostCommand::Add {
            address,
            placement_zone,
            credentials,
            accept_cert,
        } => {
            let host = NewHost {
                address,
                placement_zone,
                credentials,
                accept_certificate: accept_cert,
            };
            let id = hosts.add(&host).await?;
            output.write_outcome(out, TrackMode::Wait, "Host added", "", &[id])?;
        }
        HostCommand::Rm { id, track } => {
            let ids = hosts.remove(&id, track.mode()).await?;
            output.write_outcome(
                out,
                track.mode(),
                "Host removed",
                "Host is being removed",
                &ids,
            )?;
        }
        HostCommand::Disable { id } => {
            let id = hosts.disable(&id).await?;
            output.write_outcome(out, TrackMode::Wait, "Host disabled", "", &[id])?;
        }
        HostCommand::Enable { id } => {
            let id = hosts.enable(&id).await?;
            output.write_outcome(out, TrackMode::Wait, "Host enabled", "", &[id])?;
        }
    }
    Ok(())
}

async fn network_command(
    client: &AdmiralClient,
    command: NetworkCommand,
    output: Output,
    out: &mut impl Write,
) -> CliResult {
    let networks = &client.networks;
    match command {
        NetworkCommand::Ls => {
            let list = networks.list().await?;
            output.write(out, list.as_slice(), Utc::now())?;
        }
        NetworkCommand::Create {
            name,
            driver,
            track,
        } => {
            let ids = networks
                .create(&name, driver.as_deref(), track.mode())
                .await?;
            output.write_outcome(
                out,
                track.mode(),
                "Network created",
                "Network is being created",
                &ids,
            )?;
        }
        NetworkCommand::Rm { ids, track } => {
            let ids = networks.remove(&ids, track.mode()).await?;
            output.write_outcome(
                out,
                track.mode(),
                "Network(s) removed",
                "Network(s) are being removed",
                &ids,
            )?;
        }
    }
    Ok(())
}

fn config_command(
    dir: &Path,
    effective: &Config,
    command: ConfigCommand,
    output: Output,
    out: &mut impl Write,
) -> CliResult {
    match command {
        ConfigCommand::Show => {
            let config = effective;
            if output.is_json() {
                write_json(out, config)?;
            } else {
                writeln!(out, "  URL:            {}", config.url)?;
                writeln!(out, "  Poll interval:  {}s", config.poll_interval_secs)?;
                match config.task_timeout_secs {
                    Some(secs) => writeln!(out, "  Task timeout:   {}s", secs)?,
                    None => writeln!(out, "  Task timeout:   none")?,
                }
            }
        }
        ConfigCommand::Set { key, value } => {
            let mut config = Config::load(dir)?;
            match key {
                ConfigKey::Url => config.url = value,
                ConfigKey::PollInterval => config.poll_interval_secs = value.parse::<u64>()?.max(1),
                ConfigKey::Timeout => {
                    config.task_timeout_secs = Some(value.parse::<u64>()?).filter(|s| *s > 0)
                }
            }
            config.save(dir)?;
            writeln!(out, "Configuration saved.")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_async_flag() {
        let cli = Cli::try_parse_from(["admiral", "container", "start", "c1", "c2", "--async"])
            .unwrap();
        match cli.command {
            Commands::Container {
                command: ContainerCommand::Start { ids, track },
            } => {
                assert_eq!(ids, vec!["c1", "c2"]);
                assert_eq!(track.mode(), TrackMode::Detach);
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_parse_rm_by_query() {
        let cli = Cli::try_parse_from(["admiral", "container", "rm", "--query", "web"]).unwrap();
        match cli.command {
            Commands::Container {
                command: ContainerCommand::Rm { ids, query, track },
            } => {
                assert!(ids.is_empty());
                assert_eq!(query.as_deref(), Some("web"));
                assert_eq!(track.mode(), TrackMode::Wait);
            }
            _ => panic!("unexpected command"),
        }

        assert!(Cli::try_parse_from(["admiral", "container", "rm"]).is_err());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "admiral", "wait", "abc", "--url", "http://10.0.0.1:8282", "--timeout", "30", "--json",
        ])
        .unwrap();
        assert_eq!(cli.url.as_deref(), Some("http://10.0.0.1:8282"));
        assert_eq!(cli.timeout, Some(30));
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Wait { task } if task == "abc"));
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::try_parse_from(["admiral", "config", "set", "poll-interval", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommand::Set {
                    key: ConfigKey::PollInterval,
                    ..
                }
            }
        ));
        assert!(Cli::try_parse_from(["admiral", "config", "set", "colour", "red"]).is_err());
    }

    #[test]
    fn test_parse_host_add() {
        let cli = Cli::try_parse_from([
            "admiral",
            "host",
            "add",
            "--address",
            "https://10.0.0.5:2376",
            "--placement-zone",
            "pz1",
            "--accept-cert",
        ])
        .unwrap();
        match cli.command {
            Commands::Host {
                command:
                    HostCommand::Add {
                        address,
                        placement_zone,
                        credentials,
                        accept_cert,
                    },
            } => {
                assert_eq!(address, "https://10.0.0.5:2376");
                assert_eq!(placement_zone.as_deref(), Some("pz1"));
                assert!(credentials.is_none());
                assert!(accept_cert);
            }
            _ => panic!("unexpected command"),
        }
    }
}
