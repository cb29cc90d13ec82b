//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from `start`
///
/// Walks up parent directories until finding `config_name`.
/// Returns the absolute path to the config file if found.
///
/// ```text
/// /home/user/site/posts/    ← start
/// /home/user/site/hay.toml  ← found!
/// ```
pub fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None, // Reached filesystem root
        }
    }
}

/// Normalize an extension list: strip leading dots, drop empties.
pub fn normalize_extensions(exts: &mut Vec<String>) {
    for ext in exts.iter_mut() {
        *ext = ext.trim().trim_start_matches('.').to_string();
    }
    exts.retain(|e| !e.is_empty());
}
