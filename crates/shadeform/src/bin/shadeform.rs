//! Shadeform CLI - launch and manage GPU instances and volumes.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shadeform::{
    ConfiguredProvider, InstancePlan, InstanceTypeQuery, ProviderConfig, ResourceHandle,
    ShadeformProvider, VolumePlan,
};

/// Shadeform CLI - Provision GPU instances across clouds.
#[derive(Parser)]
#[command(name = "shadeform", version)]
#[command(about = "Provision and manage Shadeform GPU instances and volumes")]
struct Cli {
    /// Shadeform API key (or set `SHADEFORM_API_KEY` env var).
    #[arg(long, env = "SHADEFORM_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// API base URL (or set `SHADEFORM_API_URL` env var).
    #[arg(long, env = "SHADEFORM_API_URL", default_value = "https://api.shadeform.ai/v1")]
    api_url: String,

    /// Seconds between status checks while waiting for an instance.
    #[arg(long, default_value = "15")]
    poll_interval: u64,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List instance types, optionally filtered.
    Types(TypesArgs),

    /// Manage instances.
    #[command(subcommand)]
    Instance(InstanceCommand),

    /// Manage volumes.
    #[command(subcommand)]
    Volume(VolumeCommand),
}

#[derive(Args)]
struct TypesArgs {
    #[arg(long)]
    cloud: Option<String>,

    #[arg(long)]
    region: Option<String>,

    /// Number of GPUs, e.g. `8`.
    #[arg(long)]
    num_gpus: Option<String>,

    /// GPU model, e.g. `H100`.
    #[arg(long)]
    gpu_type: Option<String>,

    #[arg(long)]
    shade_instance_type: Option<String>,

    /// Only types currently available somewhere.
    #[arg(long)]
    available: Option<bool>,

    /// Sort order, e.g. `price`.
    #[arg(long)]
    sort: Option<String>,
}

#[derive(Subcommand)]
enum InstanceCommand {
    /// Launch an instance and wait until it is active.
    Create {
        #[arg(long)]
        cloud: String,

        #[arg(long)]
        region: String,

        /// Shadeform instance type (from `types`).
        #[arg(long)]
        shade_instance_type: String,

        /// Instance name.
        #[arg(long)]
        name: String,

        /// Deploy through a linked cloud account instead of Shade Cloud.
        #[arg(long, default_value = "false")]
        own_account: bool,

        #[arg(long)]
        os: Option<String>,

        #[arg(long)]
        ssh_key_id: Option<String>,

        #[arg(long)]
        template_id: Option<String>,

        /// Volume IDs to mount (comma-separated).
        #[arg(long, value_delimiter = ',')]
        volume_ids: Vec<String>,

        /// Create timeout in seconds.
        #[arg(long, default_value = "3600")]
        timeout: u64,
    },

    /// Show an instance.
    Get {
        #[arg(long)]
        id: String,
    },

    /// Rename an instance.
    Update {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,
    },

    /// Delete an instance.
    Delete {
        #[arg(long)]
        id: String,

        /// Skip confirmation prompt.
        #[arg(long, short = 'y', default_value = "false")]
        yes: bool,
    },

    /// Wait for an existing instance to become active.
    Wait {
        #[arg(long)]
        id: String,

        /// Timeout in seconds.
        #[arg(long, default_value = "600")]
        timeout: u64,
    },
}

#[derive(Subcommand)]
enum VolumeCommand {
    /// Create a volume.
    Create {
        #[arg(long)]
        cloud: String,

        #[arg(long)]
        region: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        size_in_gb: i64,
    },

    /// Show a volume.
    Get {
        #[arg(long)]
        id: String,
    },

    /// Delete a volume that is not mounted.
    Delete {
        #[arg(long)]
        id: String,

        /// Skip confirmation prompt.
        #[arg(long, short = 'y', default_value = "false")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ProviderConfig::default()
        .with_base_url(cli.api_url.trim())
        .with_poll_interval(Duration::from_secs(cli.poll_interval));
    if !cli.api_key.trim().is_empty() {
        config = config.with_api_key(cli.api_key.trim());
    }

    let provider = ShadeformProvider::default()
        .configure(config)
        .context("Failed to configure Shadeform provider")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Commands::Types(args) => {
            let query = InstanceTypeQuery {
                cloud: args.cloud,
                region: args.region,
                num_gpus: args.num_gpus,
                gpu_type: args.gpu_type,
                shade_instance_type: args.shade_instance_type,
                available: args.available,
                sort: args.sort,
            };
            let types = provider
                .instance_types()
                .read(&query)
                .await
                .context("Failed to list instance types")?;
            print_json(&types)?;
        }

        Commands::Instance(command) => run_instance(&provider, command, &cancel).await?,

        Commands::Volume(command) => run_volume(&provider, command).await?,
    }

    Ok(())
}

async fn run_instance(
    provider: &ConfiguredProvider,
    command: InstanceCommand,
    cancel: &CancellationToken,
) -> Result<()> {
    let instances = provider.instances();

    match command {
        InstanceCommand::Create {
            cloud,
            region,
            shade_instance_type,
            name,
            own_account,
            os,
            ssh_key_id,
            template_id,
            volume_ids,
            timeout,
        } => {
            let plan = InstancePlan {
                cloud,
                region,
                shade_instance_type,
                shade_cloud: !own_account,
                name,
                os,
                ssh_key_id,
                template_id,
                volume_ids: Some(volume_ids),
                create_timeout: Some(Duration::from_secs(timeout)),
            };
            info!(name = %plan.name, instance_type = %plan.shade_instance_type, "Creating instance");

            let state = instances
                .create(&plan, cancel)
                .await
                .context("Instance creation failed")?;
            print_json(&state)?;
        }

        InstanceCommand::Get { id } => {
            let state = instances
                .import(&id)
                .await
                .with_context(|| format!("Failed to get instance {id}"))?;
            print_json(&state)?;
        }

        InstanceCommand::Update { id, name } => {
            let prior = instances
                .import(&id)
                .await
                .with_context(|| format!("Failed to get instance {id}"))?;
            let plan = InstancePlan {
                cloud: prior.cloud.clone(),
                region: prior.region.clone(),
                shade_instance_type: prior.shade_instance_type.clone(),
                shade_cloud: prior.shade_cloud,
                name,
                ..InstancePlan::default()
            };
            let state = instances
                .update(&prior, &plan)
                .await
                .with_context(|| format!("Failed to update instance {id}"))?;
            print_json(&state)?;
        }

        InstanceCommand::Delete { id, yes } => {
            if !yes {
                println!("Are you sure you want to delete instance {id}?");
                println!("Use --yes to skip this prompt.");
                return Ok(());
            }
            instances
                .delete(&id)
                .await
                .with_context(|| format!("Failed to delete instance {id}"))?;
            println!("Instance {id} deleted");
        }

        InstanceCommand::Wait { id, timeout } => {
            let handle = ResourceHandle::new(&id, &id);
            let outcome = instances
                .wait_active(&handle, Duration::from_secs(timeout), cancel)
                .await;
            if outcome.is_ready() {
                let state = instances.import(&id).await?;
                print_json(&state)?;
            } else {
                outcome
                    .into_result()
                    .with_context(|| format!("Instance {id} did not become active"))?;
            }
        }
    }

    Ok(())
}

async fn run_volume(provider: &ConfiguredProvider, command: VolumeCommand) -> Result<()> {
    let volumes = provider.volumes();

    match command {
        VolumeCommand::Create {
            cloud,
            region,
            name,
            size_in_gb,
        } => {
            let plan = VolumePlan {
                cloud,
                region,
                name,
                size_in_gb,
            };
            let state = volumes
                .create(&plan)
                .await
                .context("Volume creation failed")?;
            print_json(&state)?;
        }

        VolumeCommand::Get { id } => {
            let state = volumes
                .import(&id)
                .await
                .with_context(|| format!("Failed to get volume {id}"))?;
            print_json(&state)?;
        }

        VolumeCommand::Delete { id, yes } => {
            if !yes {
                println!("Are you sure you want to delete volume {id}?");
                println!("Use --yes to skip this prompt.");
                return Ok(());
            }
            volumes
                .delete(&id)
                .await
                .with_context(|| format!("Failed to delete volume {id}"))?;
            println!("Volume {id} deleted");
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
