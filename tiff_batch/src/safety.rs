//! Safety Module
//!
//! In-place mode rewrites every TIFF under the input root. These checks keep
//! it from being pointed at a system directory or a home directory root.

use crate::errors::ConfigError;
use std::path::Path;

const DANGEROUS_DIRS: &[&str] = &[
    "/",
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/etc",
    "/var",
    "/private",
    "/Library",
    "/Applications",
    "/Users",
    "/home",
    "/root",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/tmp",
    "/opt",
];

/// `path` should already be absolute and cleaned.
pub fn check_dangerous_directory(path: &Path) -> Result<(), ConfigError> {
    if DANGEROUS_DIRS.iter().any(|d| path == Path::new(d)) {
        return Err(ConfigError::DangerousDirectory(format!(
            "'{}' is a protected system directory",
            path.display()
        )));
    }

    // `/home/alice` itself, but not `/home/alice/scans`.
    let depth = path.components().count();
    if depth <= 3 && (path.starts_with("/Users") || path.starts_with("/home")) {
        return Err(ConfigError::DangerousDirectory(format!(
            "'{}' is too close to a home directory root",
            path.display()
        )));
    }

    Ok(())
}

/// Runs the in-place checks. Mirror mode never writes under the input root.
pub fn check_input_root(path: &Path, in_place: bool) -> Result<(), ConfigError> {
    if in_place {
        check_dangerous_directory(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_dirs_blocked() {
        for dir in ["/", "/usr", "/etc", "/tmp", "/home"] {
            let err = check_dangerous_directory(Path::new(dir)).unwrap_err();
            assert!(matches!(err, ConfigError::DangerousDirectory(_)), "{}", dir);
        }
    }

    #[test]
    fn test_home_root_blocked() {
        assert!(check_dangerous_directory(Path::new("/home/alice")).is_err());
        assert!(check_dangerous_directory(Path::new("/Users/bob")).is_err());
    }

    #[test]
    fn test_subdirectories_allowed() {
        assert!(check_dangerous_directory(Path::new("/home/alice/scans")).is_ok());
        assert!(check_dangerous_directory(Path::new("/data/archive")).is_ok());
        assert!(check_dangerous_directory(Path::new("/usr/local/share/tiffs")).is_ok());
    }

    #[test]
    fn test_mirror_mode_skips_check() {
        assert!(check_input_root(Path::new("/usr"), false).is_ok());
        assert!(check_input_root(Path::new("/usr"), true).is_err());
    }
}
