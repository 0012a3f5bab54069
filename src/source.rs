//! Source aggregation.
//!
//! Turns a file or a directory tree into a [`SourceBundle`]: an ordered list
//! of files plus the single prompt-ready text the LLM sees.

use crate::{log_debug, log_warn};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Marker placed on both sides of each file header in a directory bundle
const HEADER_RULE: &str = "====================";

/// Errors raised while collecting source files
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source path not found: '{}'", .0.display())]
    NotFound(PathBuf),
    #[error("No supported source files with content found in '{}'", .0.display())]
    EmptySource(PathBuf),
    #[error("Source path '{}' is neither a file nor a directory", .0.display())]
    NotAFileOrDirectory(PathBuf),
    #[error("Could not read '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Filters applied when walking a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    /// Lower-case extensions (without the dot) or whole file names that count as source
    pub extensions: Vec<String>,
    /// Directory names never descended into
    pub excluded_dirs: Vec<String>,
    /// Honour `.gitignore` files when the tree is a git checkout
    pub respect_gitignore: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        let extensions = [
            "py", "java", "js", "ts", "go", "rb", "php", "cpp", "c", "h", "hpp", "cs", "rs",
            "swift", "kt", "scala", "pl", "pm", "sh", "bash", "html", "htm", "css", "scss",
            "less", "sql", "md", "txt", "json", "yaml", "yml", "xml", "ini", "toml",
            "dockerfile", "tf",
        ];
        let excluded_dirs = [
            "__pycache__",
            "node_modules",
            "target",
            "build",
            "dist",
            ".git",
            ".svn",
            ".hg",
        ];
        Self {
            extensions: extensions.iter().map(ToString::to_string).collect(),
            excluded_dirs: excluded_dirs.iter().map(ToString::to_string).collect(),
            respect_gitignore: true,
        }
    }
}

impl SourceOptions {
    /// Whether a file name passes the extension allow-list
    pub fn is_supported(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        let extension = Path::new(&lower)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        self.extensions.iter().any(|allowed| {
            let allowed = allowed.trim_start_matches('.').to_lowercase();
            allowed == extension || allowed == lower
        })
    }

    fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|excluded| excluded == name)
    }
}

/// One file of a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// Path relative to the bundle root (just the file name for single-file bundles)
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleKind {
    File,
    Directory,
}

/// Ordered, non-empty collection of source files
#[derive(Debug, Clone, Serialize)]
pub struct SourceBundle {
    root: PathBuf,
    kind: BundleKind,
    files: Vec<SourceFile>,
    text: String,
}

impl SourceBundle {
    fn single(root: PathBuf, file: SourceFile) -> Self {
        let text = file.content.clone();
        Self {
            root,
            kind: BundleKind::File,
            files: vec![file],
            text,
        }
    }

    fn directory(root: PathBuf) -> Self {
        Self {
            root,
            kind: BundleKind::Directory,
            files: Vec::new(),
            text: String::new(),
        }
    }

    fn push(&mut self, file: SourceFile) {
        let _ = write!(
            self.text,
            "\n\n{HEADER_RULE} Content from: {} {HEADER_RULE}\n\n{}",
            file.path.display(),
            file.content
        );
        self.files.push(file);
    }

    /// Absolute path the bundle was read from
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind(&self) -> BundleKind {
        self.kind
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false for a bundle returned by [`aggregate`]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The concatenated text handed to the LLM
    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// Relative paths of every file, in bundle order
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }
}

/// Read a single file or walk a directory into a bundle
pub fn aggregate(path: &Path, options: &SourceOptions) -> Result<SourceBundle, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    let root = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let bundle = if root.is_file() {
        read_single_file(root)?
    } else if root.is_dir() {
        walk_directory(root, options)?
    } else {
        return Err(SourceError::NotAFileOrDirectory(root));
    };

    if bundle.files.iter().all(|f| f.content.trim().is_empty()) {
        return Err(SourceError::EmptySource(bundle.root));
    }

    log_debug!(
        "Aggregated {} file(s), {} characters from {}",
        bundle.len(),
        bundle.text.len(),
        bundle.root.display()
    );
    Ok(bundle)
}

fn read_text(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_single_file(root: PathBuf) -> Result<SourceBundle, SourceError> {
    let content = read_text(&root).map_err(|source| SourceError::Unreadable {
        path: root.clone(),
        source,
    })?;
    let name = root
        .file_name()
        .map_or_else(|| root.clone(), PathBuf::from);

    Ok(SourceBundle::single(
        root,
        SourceFile {
            path: name,
            content,
        },
    ))
}

/// Sub-directories first, then files; lexical within each group
fn directory_first(a: &Path, b: &Path) -> Ordering {
    match (a.is_dir(), b.is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.file_name().cmp(&b.file_name()),
    }
}

fn walk_directory(root: PathBuf, options: &SourceOptions) -> Result<SourceBundle, SourceError> {
    let filter = options.clone();
    let mut walker = WalkBuilder::new(&root);
    walker
        .hidden(true)
        .parents(false)
        .ignore(false)
        .git_global(false)
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .sort_by_file_path(directory_first)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir
                && entry.depth() > 0
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| filter.is_excluded_dir(name)))
        });

    let mut bundle = SourceBundle::directory(root.clone());
    for entry in walker.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log_warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if !options.is_supported(file_name) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&root)
            .unwrap_or(entry.path())
            .to_path_buf();
        match read_text(entry.path()) {
            Ok(content) => {
                log_debug!("Read {}", relative.display());
                bundle.push(SourceFile {
                    path: relative,
                    content,
                });
            }
            Err(e) => log_warn!("Could not read {}: {}", entry.path().display(), e),
        }
    }

    if bundle.is_empty() {
        return Err(SourceError::EmptySource(root));
    }
    Ok(bundle)
}
