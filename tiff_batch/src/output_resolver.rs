//! Output Path Resolution
//!
//! Maps each source file to the path its recompressed bytes are published to.
//! - in-place: the output path is the source path
//! - mirror: `<outdir>/<basename(root)>/<path relative to root>`
//!
//! The no-recursive-output rule is enforced once, in [`OutputResolver::new`],
//! before the tree is scanned.

use crate::errors::{ConfigError, FileError};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path: drops `.`, folds `..` into its parent.
/// Symlinks are not resolved.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

pub fn absolute_clean(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(clean_path(&absolute))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLayout {
    InPlace,
    Mirror { output_root: PathBuf },
}

#[derive(Debug, Clone)]
pub struct OutputResolver {
    root: PathBuf,
    layout: OutputLayout,
}

impl OutputResolver {
    /// `out_dir` of `None` (or an empty path) selects in-place mode.
    pub fn new(root: &Path, out_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let root = absolute_clean(root).map_err(|source| ConfigError::InvalidInputDir {
            path: root.to_path_buf(),
            source,
        })?;

        let out_dir = match out_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => {
                return Ok(Self {
                    root,
                    layout: OutputLayout::InPlace,
                })
            }
        };

        let output_dir =
            absolute_clean(out_dir).map_err(|source| ConfigError::InvalidOutputDir {
                path: out_dir.to_path_buf(),
                source,
            })?;

        // Component-wise: /data/scans2 is not under /data/scans.
        if output_dir.starts_with(&root) {
            return Err(ConfigError::OutputInsideInput {
                output: output_dir,
                input: root,
            });
        }

        let output_root = match root.file_name() {
            Some(base) => output_dir.join(base),
            None => output_dir,
        };
        if output_root == root {
            return Err(ConfigError::OutputRootIsInput(output_root));
        }

        Ok(Self {
            root,
            layout: OutputLayout::Mirror { output_root },
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn is_in_place(&self) -> bool {
        self.layout == OutputLayout::InPlace
    }

    pub fn resolve(&self, source: &Path) -> Result<PathBuf, FileError> {
        match &self.layout {
            OutputLayout::InPlace => Ok(source.to_path_buf()),
            OutputLayout::Mirror { output_root } => {
                let relative = source
                    .strip_prefix(&self.root)
                    .map_err(|_| FileError::RelativePath(source.to_path_buf()))?;
                Ok(output_root.join(relative))
            }
        }
    }
}
