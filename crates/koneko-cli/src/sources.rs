use anyhow::{Context, Result};
use koneko_config::SourceConfig;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Expands the command-line paths into the list of source files to check.
///
/// Files named explicitly are always taken. Directories are walked
/// recursively and only files `config` accepts are kept, in sorted order.
pub fn collect(paths: &[PathBuf], config: &SourceConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let metadata =
            fs::metadata(path).with_context(|| format!("Cannot access '{}'", path.display()))?;
        if metadata.is_dir() {
            walk(path, config, &mut files)?;
        } else {
            files.push(path.clone());
        }
    }
    debug!("collected {} source files", files.len());
    Ok(files)
}

fn walk(dir: &Path, config: &SourceConfig, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Cannot list directory '{}'", dir.display()))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, config, files)?;
        } else if config.accepts(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Reads every file into `(display name, contents)` pairs.
pub fn read_all(files: &[PathBuf]) -> Result<Vec<(String, String)>> {
    files
        .iter()
        .map(|path| {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            Ok((path.display().to_string(), source))
        })
        .collect()
}
