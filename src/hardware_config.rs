//! Pool-aware hardware configuration.
//!
//! `nixos-generate-config` knows nothing about ZFS mount semantics. The
//! generated hardware file is copied under a new name with mount options
//! added to every ZFS and vfat filesystem. When swap partitions exist the
//! generic `swapDevices` declaration is removed; the pool config declares
//! randomly encrypted swap instead.

use tracing::info;

use crate::config_file::SystemConfig;
use crate::error::Result;
use crate::rewrite::rewrite_lines;

/// Marker of the swap declaration in both generated and templated files.
pub const SWAP_MARKER: &str = "swapDevices";

const ZFS_FS_TYPE: &str = r#"fsType = "zfs";"#;
const ZFS_OPTIONS: &str = r#"options = [ "zfsutil" "X-mount.mkdir" ];"#;

const VFAT_FS_TYPE: &str = r#"fsType = "vfat";"#;
const VFAT_OPTIONS: &str =
    r#"options = [ "x-systemd.idle-timeout=1min" "x-systemd.automount" "noauto" ];"#;

const OPTION_INDENT: &str = "\n      ";

/// Transform one hardware file line.
///
/// Both filesystem checks run on every line. Returns `None` when the line
/// carries the swap marker and swap is enabled.
pub fn hardware_line(line: &str, swap_enabled: bool) -> Option<String> {
    if swap_enabled && line.contains(SWAP_MARKER) {
        return None;
    }

    let line = line.replace(
        ZFS_FS_TYPE,
        &format!("{ZFS_FS_TYPE}{OPTION_INDENT}{ZFS_OPTIONS}"),
    );
    let line = line.replace(
        VFAT_FS_TYPE,
        &format!("{VFAT_FS_TYPE}{OPTION_INDENT}{VFAT_OPTIONS}"),
    );
    Some(line)
}

/// Write the adapted hardware file. The generated file is left in place.
pub fn adapt_hardware_config(config: &SystemConfig) -> Result<()> {
    let source = config.nixos.old_hardware_file();
    let target = config.nixos.hardware_file();
    let swap = config.swap_enabled();

    rewrite_lines(&source, &target, |line| hardware_line(line, swap))?;
    info!(
        "Adapted {} -> {} (swap {})",
        source.display(),
        target.display(),
        if swap { "stripped" } else { "kept" }
    );
    Ok(())
}
