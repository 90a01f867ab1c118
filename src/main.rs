//! nixpool - Main entry point

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use nixpool::cli::{Cli, Commands};
use nixpool::collaborators::Lsblk;
use nixpool::disks::{list_block_devices, resolve_by_id};
use nixpool::pool_config::PoolConfigGenerator;
use nixpool::{sanity, Provisioner, SystemConfig};

/// Initialize logging; RUST_LOG overrides the default `info` level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logger();
    debug!("nixpool starting up");

    let cli = Cli::parse_args();

    let (operation, result) = match cli.command {
        Commands::Configure {
            config,
            assets,
            machine_id,
            root,
            skip_sanity,
        } => (
            "configure",
            run_configure(&config, assets, &machine_id, &root, skip_sanity),
        ),
        Commands::Disks { json, by_id_dir } => ("disks", run_disks(json, &by_id_dir)),
        Commands::Validate { config } => ("validate", run_validate(&config)),
    };

    if let Err(e) = result {
        debug!("{} failed: {:?}", operation, e);
        eprintln!("✗ {} failed: {:#}", operation, e);
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<SystemConfig> {
    info!("Loading configuration from: {:?}", path);
    let config = SystemConfig::load_from_file(path)?;
    config.validate()?;
    Ok(config)
}

fn run_configure(
    config_path: &Path,
    assets: Option<PathBuf>,
    machine_id: &Path,
    root: &Path,
    skip_sanity: bool,
) -> Result<()> {
    if skip_sanity {
        info!("Skipping pre-flight checks");
    } else {
        let check = sanity::verify_environment();
        if !check.is_ok() {
            for problem in check.problems() {
                eprintln!("✗ {}", problem);
            }
            anyhow::bail!("pre-flight checks failed");
        }
    }

    let config = load_config(config_path)?;

    let asset_root = assets
        .unwrap_or_else(|| PoolConfigGenerator::from_env().asset_root().to_path_buf());
    debug!("Template assets: {}", asset_root.display());

    Provisioner::host(root, asset_root, machine_id)
        .configure(&config)
        .context("NixOS configuration was not completed")?;

    println!(
        "✓ NixOS configuration written to {}",
        config.nixos.path.display()
    );
    Ok(())
}

fn run_disks(json: bool, by_id_dir: &Path) -> Result<()> {
    let disks = resolve_by_id(list_block_devices(&Lsblk)?, by_id_dir);

    if json {
        println!("{}", serde_json::to_string_pretty(&disks)?);
        return Ok(());
    }

    for disk in &disks {
        println!("{}", disk);
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    println!(
        "✓ Configuration file is valid: {} disk(s) ({}), swap {}",
        config.pool.disks.len(),
        if config.is_mirrored() { "mirror" } else { "single" },
        if config.swap_enabled() { "on" } else { "off" }
    );
    Ok(())
}
