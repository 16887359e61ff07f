use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Refuse to write a declaration over the configuration it came from.
pub fn ensure_output_not_input(output: &Path, input: &Path) -> Result<()> {
    let out_norm = comparable(output)
        .with_context(|| format!("failed to resolve output path {}", output.display()))?;
    let in_norm = comparable(input)
        .with_context(|| format!("failed to resolve input path {}", input.display()))?;
    if out_norm == in_norm {
        bail!(
            "refusing to overwrite input: output {} is the same file as {}",
            output.display(),
            input.display()
        );
    }
    Ok(())
}

fn comparable(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return path
            .canonicalize()
            .with_context(|| format!("canonicalize {}", path.display()));
    }

    // Not on disk yet: anchor at the working directory. `..` stays unresolved.
    let base = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().context("current_dir")?
    };
    Ok(base.join(path))
}
