//! Remove the generated boot loader settings.
//!
//! `nixos-generate-config` enables systemd-boot and EFI variable access.
//! The pool config installs its own mirrored GRUB setup, so every
//! `boot.loader` line in the main configuration has to go.

use tracing::info;

use crate::config_file::SystemConfig;
use crate::error::Result;
use crate::rewrite::rewrite_in_place;

const BOOT_LOADER_MARKER: &str = "boot.loader";

/// Keep `line` unless it references the boot loader.
pub fn boot_loader_line(line: &str) -> Option<String> {
    (!line.contains(BOOT_LOADER_MARKER)).then(|| line.to_string())
}

/// Drop every `boot.loader` line from the main configuration.
pub fn strip_boot_loader_refs(config: &SystemConfig) -> Result<()> {
    let path = config.nixos.config_file();
    let mut dropped = 0usize;
    rewrite_in_place(&path, |line| {
        let kept = boot_loader_line(line);
        if kept.is_none() {
            dropped += 1;
        }
        kept
    })?;
    info!("Removed {} boot loader line(s) from {}", dropped, path.display());
    Ok(())
}
