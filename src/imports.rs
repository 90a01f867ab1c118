//! Point the main configuration at the new hardware and pool files.

use tracing::{info, warn};

use crate::config_file::SystemConfig;
use crate::error::Result;
use crate::rewrite::rewrite_in_place;

/// Replace every occurrence of `old` in `line`, counting the replacements.
pub fn rewire_line(line: &str, old: &str, new: &str, count: &mut usize) -> String {
    let hits = line.matches(old).count();
    if hits == 0 {
        return line.to_string();
    }
    *count += hits;
    line.replace(old, new)
}

/// Swap `./<hw_old>` for `./<hw> ./<zfs>` in the main configuration.
///
/// Returns the number of replacements. Zero means the generated file did
/// not contain the expected import and is logged as a warning.
pub fn rewire_imports(config: &SystemConfig) -> Result<usize> {
    let path = config.nixos.config_file();
    let old = format!("./{}", config.nixos.hw_old);
    let new = format!("./{} ./{}", config.nixos.hw, config.nixos.zfs);

    let mut count = 0;
    rewrite_in_place(&path, |line| Some(rewire_line(line, &old, &new, &mut count)))?;

    if count == 0 {
        warn!("No import of {} found in {}", old, path.display());
    } else {
        info!("Rewired {} import(s) in {}", count, path.display());
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OLD: &str = "./hardware-configuration.nix";
    const NEW: &str = "./hardware-configuration-zfs.nix ./zfs.nix";

    #[test]
    fn test_import_line_rewired() {
        let mut count = 0;
        let out = rewire_line(
            "      ./hardware-configuration.nix",
            OLD,
            NEW,
            &mut count,
        );
        assert!(out.contains("./hardware-configuration-zfs.nix"));
        assert!(out.contains("./zfs.nix"));
        assert!(!out.contains(OLD));
        assert_eq!(count, 1);
    }

    #[test]
    fn test_unrelated_line_unchanged() {
        let mut count = 0;
        let line = "  networking.hostName = \"nixos\";";
        assert_eq!(rewire_line(line, OLD, NEW, &mut count), line);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let mut count = 0;
        let line = "./Hardware-Configuration.nix";
        assert_eq!(rewire_line(line, OLD, NEW, &mut count), line);
        assert_eq!(count, 0);
    }
}
