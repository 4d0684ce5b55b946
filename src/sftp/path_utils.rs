//! Remote path utilities
//!
//! Remote SFTP paths always use `/` as separator, whatever the local or
//! remote OS. Root is `/` for absolute paths and `.` for paths relative to
//! the login directory.

/// Check if a remote SFTP path is absolute.
pub fn is_absolute_remote_path(path: &str) -> bool {
    path.starts_with('/')
}

/// Whether `path` is a root (`/`, `.`, or empty)
pub fn is_root(path: &str) -> bool {
    let trimmed = path.trim_end_matches('/');
    trimmed.is_empty() || trimmed == "."
}

/// Canonical spelling of a remote path: no trailing slash, root as `/` or `.`
pub fn normalize_remote_path(path: &str) -> String {
    if path.starts_with('/') {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            ".".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Join remote SFTP path components using `/` separator.
pub fn join_remote_path(base: &str, component: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// Directory containing `path`, or `None` when `path` is already a root.
pub fn parent_remote_path(path: &str) -> Option<String> {
    if is_root(path) {
        return None;
    }

    let normalized = normalize_remote_path(path);
    match normalized.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(normalized[..idx].to_string()),
        None => Some(".".to_string()),
    }
}

/// Last path component
pub fn remote_file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
