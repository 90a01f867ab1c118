//! Line-oriented file rewriting.
//!
//! All edits to NixOS files funnel through `rewrite_lines`. A transform sees
//! one line at a time, without its terminator, and returns either the
//! replacement text (which may span several lines) or `None` to drop the
//! line. The result is written to a temporary file next to the target and
//! renamed over it, so readers never observe a half-written file.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ProvisionError, Result};

/// Apply `transform` to every line of `text`, preserving order and line endings.
pub fn transform_text<F>(text: &str, mut transform: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    for chunk in text.split_inclusive('\n') {
        let (line, newline) = match chunk.strip_suffix('\n') {
            Some(line) => (line, true),
            None => (chunk, false),
        };
        if let Some(replacement) = transform(line) {
            out.push_str(&replacement);
            if newline {
                out.push('\n');
            }
        }
    }
    out
}

/// Read `source`, transform each line, and atomically write the result to `target`.
///
/// `source` and `target` may be the same path. `source` is never touched
/// when they differ. Returns the number of bytes written.
pub fn rewrite_lines<F>(source: &Path, target: &Path, transform: F) -> Result<usize>
where
    F: FnMut(&str) -> Option<String>,
{
    let text = fs::read_to_string(source).map_err(|e| ProvisionError::io(source, e))?;
    let rewritten = transform_text(&text, transform);
    write_atomic(target, &rewritten, source)?;
    debug!(
        "Rewrote {} -> {} ({} bytes)",
        source.display(),
        target.display(),
        rewritten.len()
    );
    Ok(rewritten.len())
}

/// Transform the lines of `path` in place.
pub fn rewrite_in_place<F>(path: &Path, transform: F) -> Result<usize>
where
    F: FnMut(&str) -> Option<String>,
{
    rewrite_lines(path, path, transform)
}

fn write_atomic(target: &Path, contents: &str, permissions_from: &Path) -> Result<()> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ProvisionError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ProvisionError::io(tmp.path(), e))?;

    // Keep the mode of the file being replaced, or of the source for new files
    let reference = if target.exists() {
        target
    } else {
        permissions_from
    };
    if let Ok(meta) = fs::metadata(reference) {
        fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| ProvisionError::io(tmp.path(), e))?;
    }

    tmp.persist(target)
        .map_err(|e| ProvisionError::io(target, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_transform_preserves_order_and_endings() {
        let out = transform_text("a\nb\nc", |l| Some(l.to_uppercase()));
        assert_eq!(out, "A\nB\nC");

        let out = transform_text("a\nb\n", |l| Some(l.to_string()));
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn test_transform_drops_lines() {
        let out = transform_text("keep\ndrop\nkeep too\n", |l| {
            (!l.starts_with("drop")).then(|| l.to_string())
        });
        assert_eq!(out, "keep\nkeep too\n");
    }

    #[test]
    fn test_transform_expands_lines() {
        let out = transform_text("x\ny\n", |l| {
            if l == "x" {
                Some("x\n  x2".to_string())
            } else {
                Some(l.to_string())
            }
        });
        assert_eq!(out, "x\n  x2\ny\n");
    }

    #[test]
    fn test_transform_empty_input() {
        assert_eq!(transform_text("", |l| Some(l.to_string())), "");
    }

    #[test]
    fn test_rewrite_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configuration.nix");
        fs::write(&path, "one\ntwo\n").unwrap();

        rewrite_in_place(&path, |l| Some(format!("{l}!"))).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one!\ntwo!\n");
    }

    #[test]
    fn test_rewrite_to_new_target_leaves_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("old.nix");
        let target = dir.path().join("new.nix");
        fs::write(&source, "one\n").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o640)).unwrap();

        rewrite_lines(&source, &target, |l| Some(l.replace("one", "uno"))).unwrap();

        assert_eq!(fs::read_to_string(&source).unwrap(), "one\n");
        assert_eq!(fs::read_to_string(&target).unwrap(), "uno\n");
        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_rewrite_missing_source_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("new.nix");
        let err = rewrite_lines(&dir.path().join("absent.nix"), &target, |l| {
            Some(l.to_string())
        })
        .unwrap_err();

        assert!(matches!(err, ProvisionError::Io { .. }));
        assert!(!target.exists());
    }
}
