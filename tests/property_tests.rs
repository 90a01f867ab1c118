//! Property-based tests for nixpool
//!
//! These tests verify the line-transform invariants:
//! - Hardware adaptation expands and strips exactly the marked lines
//! - Boot loader stripping only ever removes lines
//! - Import rewiring touches only lines carrying the old import
//! - Pool rendering emits one swap declaration per disk
//! - Host ids are bounded prefixes of the machine id
//! - Enumeration never yields anything but disks

use std::path::PathBuf;

use proptest::prelude::*;

use nixpool::bootloader::boot_loader_line;
use nixpool::config_file::{NixosPaths, PartitionInfo, PoolInfo};
use nixpool::disks::parse_block_devices;
use nixpool::hardware_config::{hardware_line, SWAP_MARKER};
use nixpool::identity::host_identifier;
use nixpool::imports::rewire_line;
use nixpool::pool_config::{pool_line, PoolSubstitutions, SWAP_DEVICES};
use nixpool::rewrite::transform_text;
use nixpool::{MachineIdSource, SystemConfig};

// =============================================================================
// Strategies
// =============================================================================

/// Lines that look like NixOS config but carry none of the markers
fn plain_line() -> impl Strategy<Value = String> {
    "[ a-z{}=;\"./]{0,40}".prop_filter("no markers", |l| {
        !l.contains("fsType") && !l.contains("swap") && !l.contains("boot.loader")
    })
}

/// A mix of plain and marked lines
fn config_line() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => plain_line(),
        1 => Just(r#"      fsType = "zfs";"#.to_string()),
        1 => Just(r#"      fsType = "vfat";"#.to_string()),
        1 => Just("  swapDevices = [ ];".to_string()),
        1 => Just("  boot.loader.systemd-boot.enable = true;".to_string()),
        1 => Just("      ./hardware-configuration.nix".to_string()),
    ]
}

fn disk_list() -> impl Strategy<Value = Vec<PathBuf>> {
    prop::collection::vec("[a-z]{3}[0-9]{0,2}", 1..6).prop_map(|names| {
        names
            .into_iter()
            .map(|n| PathBuf::from(format!("/dev/disk/by-id/{n}")))
            .collect()
    })
}

fn pool_config(swap: &str, disks: Vec<PathBuf>) -> SystemConfig {
    SystemConfig {
        nixos: NixosPaths::default(),
        partition: PartitionInfo {
            swap: swap.to_string(),
        },
        pool: PoolInfo {
            primary_disk: disks[0].clone(),
            disks,
        },
    }
}

/// Join lines into file text, each terminated by a newline
fn as_file(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

struct FixedId(String);

impl MachineIdSource for FixedId {
    fn read_machine_id(&self) -> nixpool::Result<String> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// Hardware Config Adapter
// =============================================================================

proptest! {
    /// Without swap, output has one extra line per fsType marker and nothing is lost
    #[test]
    fn hardware_expansion_counts(lines in prop::collection::vec(config_line(), 0..30)) {
        let text = as_file(&lines);
        let markers = lines.iter().filter(|l| l.contains("fsType = \"zfs\";") || l.contains("fsType = \"vfat\";")).count();

        let out = transform_text(&text, |l| hardware_line(l, false));
        prop_assert_eq!(out.lines().count(), lines.len() + markers);
    }

    /// With swap, marked lines vanish and every other line survives
    #[test]
    fn hardware_swap_stripping(lines in prop::collection::vec(config_line(), 0..30)) {
        let text = as_file(&lines);
        let swap_lines = lines.iter().filter(|l| l.contains(SWAP_MARKER)).count();
        let markers = lines.iter().filter(|l| l.contains("fsType")).count();

        let out = transform_text(&text, |l| hardware_line(l, true));
        prop_assert!(!out.contains(SWAP_MARKER));
        prop_assert_eq!(out.lines().count(), lines.len() - swap_lines + markers);
    }

    /// The options line always directly follows the zfs line
    #[test]
    fn zfs_options_follow_fs_type(indent in " {0,8}") {
        let line = format!("{indent}fsType = \"zfs\";");
        let out = hardware_line(&line, false).expect("kept");
        let lines: Vec<&str> = out.lines().collect();
        prop_assert_eq!(lines.len(), 2);
        prop_assert_eq!(lines[0], line.as_str());
        prop_assert_eq!(lines[1].trim(), "options = [ \"zfsutil\" \"X-mount.mkdir\" ];");
    }
}

// =============================================================================
// Boot-Loader Sanitizer and Import Rewriter
// =============================================================================

proptest! {
    /// Output is the input minus boot.loader lines, order preserved
    #[test]
    fn boot_loader_strip_is_filter(lines in prop::collection::vec(config_line(), 0..30)) {
        let text = as_file(&lines);
        let out = transform_text(&text, boot_loader_line);

        let expected: Vec<&str> = lines
            .iter()
            .map(String::as_str)
            .filter(|l| !l.contains("boot.loader"))
            .collect();
        prop_assert_eq!(out.lines().collect::<Vec<_>>(), expected);
    }

    /// Only lines with the old import change, and they lose the old token
    #[test]
    fn import_rewire_is_local(lines in prop::collection::vec(config_line(), 0..30)) {
        let old = "./hardware-configuration.nix";
        let new = "./hardware-configuration-zfs.nix ./zfs.nix";
        let mut count = 0;

        for line in &lines {
            let out = rewire_line(line, old, new, &mut count);
            if line.contains(old) {
                prop_assert!(!out.contains(old));
                prop_assert!(out.contains("./hardware-configuration-zfs.nix"));
                prop_assert!(out.contains("./zfs.nix"));
            } else {
                prop_assert_eq!(&out, line);
            }
        }
        prop_assert_eq!(count, lines.iter().filter(|l| l.contains(old)).count());
    }
}

// =============================================================================
// Pool Config Generator
// =============================================================================

proptest! {
    /// One encrypted swap declaration per disk, each on partition 4
    #[test]
    fn pool_swap_one_per_disk(disks in disk_list()) {
        let config = pool_config("8G", disks.clone());
        let subs = PoolSubstitutions::new(&config, "deadbeef", "$6$x$y").expect("subs");

        let out = pool_line("  swapDevices = [SWAP_DEVICES];", &subs).expect("kept");
        prop_assert!(!out.contains(SWAP_DEVICES));
        prop_assert_eq!(out.matches("randomEncryption.enable = true").count(), disks.len());
        for disk in &disks {
            let part = format!("\"{}-part4\"", disk.display());
            prop_assert!(out.contains(&part));
        }
    }

    /// Without swap, no swap marker or placeholder survives
    #[test]
    fn pool_without_swap(disks in disk_list(), swap in prop_oneof![Just(""), Just("0")]) {
        let config = pool_config(swap, disks);
        let subs = PoolSubstitutions::new(&config, "deadbeef", "$6$x$y").expect("subs");
        let template = "  networking.hostId = \"HOST_ID\";\n  swapDevices = [SWAP_DEVICES];\n";

        let out = transform_text(template, |l| pool_line(l, &subs));
        prop_assert!(!out.contains(SWAP_MARKER));
        prop_assert!(!out.contains(SWAP_DEVICES));
        prop_assert_eq!(out, "  networking.hostId = \"deadbeef\";\n");
    }
}

// =============================================================================
// Identity and Enumeration
// =============================================================================

proptest! {
    /// Host id is the first (at most) 8 characters of the first line
    #[test]
    fn host_id_is_bounded_prefix(id in "[0-9a-f]{1,32}", rest in "[0-9a-f\n]{0,10}") {
        let host = host_identifier(&FixedId(format!("{id}\n{rest}"))).expect("host id");
        prop_assert_eq!(host.len(), id.len().min(8));
        prop_assert!(id.starts_with(&host));
    }

    /// Whatever the enumerator reports, only disks come back
    #[test]
    fn enumeration_keeps_disks_only(
        types in prop::collection::vec(prop_oneof![Just("disk"), Just("part"), Just("loop"), Just("rom")], 0..10)
    ) {
        let entries: Vec<String> = types
            .iter()
            .enumerate()
            .map(|(i, t)| format!(r#"{{"name":"dev{i}","kname":"dev{i}","path":"/dev/dev{i}","model":null,"serial":null,"size":"1G","type":"{t}"}}"#))
            .collect();
        let payload = format!(r#"{{"blockdevices":[{}]}}"#, entries.join(","));

        let disks = parse_block_devices(&payload).expect("parse");
        prop_assert!(disks.iter().all(|d| d.device_type == "disk"));
        prop_assert_eq!(disks.len(), types.iter().filter(|t| **t == "disk").count());
    }
}
