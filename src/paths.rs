use std::path::{Path, PathBuf};

/// Expand a leading `~` or `~/` to the current user's home directory.
///
/// `~user` forms are returned unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
