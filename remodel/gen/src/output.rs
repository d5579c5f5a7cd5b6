//! Validation, formatting and atomic writing of generated files.
//!
//! ## Safety Guarantees
//!
//! - **Validation**: All generated code is validated with `syn` before writing
//! - **Formatting**: Output is formatted with `prettyplease` for consistent style
//! - **Atomic writes**: Every file of a version is staged as a temp file next to
//!   its target; targets are replaced only after all temp files were written,
//!   and replaced targets are rolled back if a later rename fails
//! - **Change detection**: Files whose content hash is unchanged are not rewritten

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use proc_macro2::TokenStream;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use xxhash_rust::xxh64::xxh64;

use crate::errors::RemodelError;

/// Notice prepended to every generated Rust file.
pub const GENERATED_NOTICE: &str = "// This file was automatically generated by remodel. Type names may be \
changed by hand and are kept on regeneration; other edits are overwritten.";

/// Computes the xxHash (64-bit) of `content`.
///
/// ```
/// use remodel_gen::output::content_hash;
///
/// assert_eq!(content_hash("pub struct A;"), content_hash("pub struct A;"));
/// assert_ne!(content_hash("pub struct A;"), content_hash("pub struct B;"));
/// ```
pub fn content_hash(content: &str) -> u64 {
    xxh64(content.as_bytes(), 0)
}

/// Validates generated code by parsing it as a complete Rust file.
///
/// ## Errors
///
/// Returns [`RemodelError::MergeConsistency`] if the tokens do not parse.
pub fn validate_code(api: &str, tokens: &TokenStream) -> Result<syn::File, RemodelError> {
    syn::parse2(tokens.clone())
        .map_err(|e| RemodelError::consistency(api, format!("generated code is invalid: {e}")))
}

/// Formats a parsed file with `prettyplease`, prepending [`GENERATED_NOTICE`].
pub fn format_code(file: &syn::File) -> String {
    format!("{GENERATED_NOTICE}\n\n{}", prettyplease::unparse(file))
}

/// One file to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: PathBuf,
    pub content: String,
}

impl FileWrite {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    Unchanged,
}

/// Result of writing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub status: WriteStatus,
    pub hash: u64,
}

fn write_error(path: &Path, source: std::io::Error) -> RemodelError {
    RemodelError::Write {
        path: path.display().to_string(),
        source,
    }
}

fn existing_hash(path: &Path) -> Option<u64> {
    fs::read_to_string(path).ok().map(|content| content_hash(&content))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Stages `content` in a temp file in `path`'s directory.
fn stage(path: &Path, content: &str) -> Result<NamedTempFile, RemodelError> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
    let mut temp = NamedTempFile::new_in(parent).map_err(|e| write_error(parent, e))?;
    temp.write_all(content.as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| write_error(temp.path(), e))?;
    Ok(temp)
}

/// Contents a target had before it was replaced.
enum Previous {
    /// The target did not exist.
    Missing,
    Content(Vec<u8>),
    /// The target could not be read, so it cannot be restored.
    Unknown,
}

impl Previous {
    fn capture(path: &Path) -> Self {
        match fs::read(path) {
            Ok(content) => Self::Content(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::Missing,
            Err(_) => Self::Unknown,
        }
    }

    fn restore(self, path: &Path) -> Result<(), std::io::Error> {
        match self {
            Self::Missing => fs::remove_file(path),
            Self::Content(content) => {
                let mut temp = NamedTempFile::new_in(parent_dir(path))?;
                temp.write_all(&content)?;
                temp.as_file().sync_all()?;
                temp.persist(path).map(drop).map_err(|e| e.error)
            }
            Self::Unknown => Ok(()),
        }
    }
}

/// Writes a set of files as one unit.
///
/// Files with unchanged content are skipped. The rest are first staged as
/// temp files; if staging any of them fails, nothing is replaced and the temp
/// files are removed. Only then are the temp files renamed over their targets.
///
/// If a rename fails, the targets already replaced are put back: their
/// previous content is restored and files that did not exist are removed.
/// The rollback is best effort; a target that could not be read beforehand,
/// or whose restore fails, is left with the new content and logged.
///
/// ## Errors
///
/// Returns [`RemodelError::Write`] naming the path that could not be written.
pub fn write_files_atomic(files: &[FileWrite]) -> Result<Vec<WrittenFile>, RemodelError> {
    let mut results = Vec::with_capacity(files.len());
    let mut staged = Vec::new();

    for file in files {
        let hash = content_hash(&file.content);
        if existing_hash(&file.path) == Some(hash) {
            debug!(path = %file.path.display(), "unchanged, skipping");
            results.push(WrittenFile {
                path: file.path.clone(),
                status: WriteStatus::Unchanged,
                hash,
            });
            continue;
        }
        staged.push((stage(&file.path, &file.content)?, &file.path));
        results.push(WrittenFile {
            path: file.path.clone(),
            status: WriteStatus::Written,
            hash,
        });
    }

    let staged: Vec<_> = staged
        .into_iter()
        .map(|(temp, path)| (temp, path, Previous::capture(path)))
        .collect();
    let mut replaced = Vec::with_capacity(staged.len());
    for (temp, path, previous) in staged {
        if let Err(e) = temp.persist(path) {
            roll_back(replaced);
            return Err(write_error(path, e.error));
        }
        info!(path = %path.display(), "wrote file");
        replaced.push((path, previous));
    }

    Ok(results)
}

fn roll_back(replaced: Vec<(&PathBuf, Previous)>) {
    for (path, previous) in replaced.into_iter().rev() {
        match previous.restore(path) {
            Ok(()) => info!(path = %path.display(), "restored previous content"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not restore previous content"),
        }
    }
}

/// Writes a single file atomically using temp file + rename.
pub fn write_atomic(path: &Path, content: &str) -> Result<WrittenFile, RemodelError> {
    let mut written = write_files_atomic(&[FileWrite::new(path, content)])?;
    written
        .pop()
        .ok_or_else(|| write_error(path, std::io::Error::other("nothing was written")))
}
