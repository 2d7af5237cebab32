use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// One matched filesystem entry, as produced by the Walker.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub atime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
    pub is_directory: bool,
    pub is_symlink: bool,
}

/// Package bundle extensions never descended into by default (macOS
/// application bundles whose internals aren't independently cleanable
/// candidates).
const PACKAGE_EXTENSIONS: &[&str] = &["app", "bundle", "framework"];

#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub max_depth: usize,
    pub excluded_prefixes: Vec<PathBuf>,
    pub include_hidden: bool,
    pub concurrency: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        WalkerConfig {
            max_depth: 32,
            excluded_prefixes: Vec::new(),
            include_hidden: false,
            concurrency: num_cpus::get(),
        }
    }
}

/// Bounded-parallel recursive directory walker emitting entries matching a
/// glob against a root. Never follows symlinks outside the root; hidden
/// files and package-bundle descendants are skipped unless configured
/// otherwise. Per-entry errors (permission denied, stale link) are logged
/// and skipped — the walk itself never fails for an individual entry.
pub struct Walker {
    root: PathBuf,
    glob: CompiledGlob,
    config: WalkerConfig,
}

impl Walker {
    pub fn new(root: PathBuf, glob: &str, config: WalkerConfig) -> Self {
        Walker {
            root,
            glob: CompiledGlob::compile(glob),
            config,
        }
    }

    /// Runs the walk to completion, honoring `token` at directory
    /// boundaries. Directory listing happens on the calling thread (so
    /// subtree-skip decisions — package bundles, matched directory globs —
    /// can be made as the walk proceeds); the heavier per-entry stat/size
    /// work is dispatched across a rayon pool sized to `config.concurrency`.
    pub fn walk(&self, token: &CancellationToken) -> Vec<FileRecord> {
        if !self.root.exists() {
            return Vec::new();
        }

        let matches_dir = self.glob.matches_directory_name();
        let canonical_root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());

        let mut candidates: Vec<walkdir::DirEntry> = Vec::new();
        let mut walk = WalkDir::new(&self.root)
            .max_depth(self.config.max_depth)
            .follow_links(false)
            .into_iter();

        while let Some(entry) = walk.next() {
            if token.is_cancelled() {
                return Vec::new();
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::debug!("walker: skipping entry in {}: {}", self.root.display(), err);
                    continue;
                }
            };
            let path = entry.path();
            if path == self.root {
                continue;
            }

            if !self.config.include_hidden && is_hidden(path) {
                if entry.file_type().is_dir() {
                    walk.skip_current_dir();
                }
                continue;
            }
            if self
                .config
                .excluded_prefixes
                .iter()
                .any(|excluded| path.starts_with(excluded))
            {
                if entry.file_type().is_dir() {
                    walk.skip_current_dir();
                }
                continue;
            }
            if entry.file_type().is_dir() && is_package_bundle(path) {
                walk.skip_current_dir();
                continue;
            }
            if entry.file_type().is_symlink() {
                if let Ok(resolved) = path.canonicalize() {
                    if !resolved.starts_with(&canonical_root) {
                        continue;
                    }
                }
            }

            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().to_string(),
                None => continue,
            };
            let is_dir = entry.file_type().is_dir();
            let matched = if is_dir {
                matches_dir && self.glob.matches_name(&name)
            } else {
                !matches_dir && self.glob.matches_name(&name)
            };

            if matched {
                candidates.push(entry);
                if is_dir {
                    // A matched directory is reported as one item; its
                    // contents aren't independently interesting here.
                    walk.skip_current_dir();
                }
            }
        }

        let processed = AtomicUsize::new(0);
        let stat = |entry: &walkdir::DirEntry| -> Option<FileRecord> {
            if processed.fetch_add(1, Ordering::Relaxed) % 64 == 0 && token.is_cancelled() {
                return None;
            }
            self.to_record(entry)
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency.max(1))
            .build();
        match pool {
            Ok(pool) => pool.install(|| candidates.par_iter().filter_map(stat).collect()),
            Err(err) => {
                log::warn!("walker: failed to build worker pool, falling back to current thread: {err}");
                candidates.iter().filter_map(stat).collect()
            }
        }
    }

    fn to_record(&self, entry: &walkdir::DirEntry) -> Option<FileRecord> {
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();
        let is_symlink = entry.file_type().is_symlink();

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                log::debug!("walker: skipping unreadable entry {}: {}", path.display(), err);
                return None;
            }
        };

        let size = if is_dir {
            directory_size(path)
        } else {
            metadata.len()
        };

        Some(FileRecord {
            path: path.to_path_buf(),
            size,
            mtime: system_time_to_utc(metadata.modified()),
            atime: system_time_to_utc(metadata.accessed()),
            ctime: created_or_modified(&metadata),
            is_directory: is_dir,
            is_symlink,
        })
    }
}

/// Recursive size of regular files under `path`; symlinks are not followed.
fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_package_bundle(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| PACKAGE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn system_time_to_utc(time: std::io::Result<std::time::SystemTime>) -> DateTime<Utc> {
    time.map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now())
}

#[cfg(unix)]
fn created_or_modified(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    use std::os::unix::fs::MetadataExt;
    let secs = metadata.ctime();
    let nanos = metadata.ctime_nsec() as u32;
    DateTime::from_timestamp(secs, nanos).unwrap_or_else(Utc::now)
}

#[cfg(not(unix))]
fn created_or_modified(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    system_time_to_utc(metadata.created())
}

/// The supported glob dialect: `*` accepts all; `*.ext` matches by
/// extension; a trailing `/` matches directory names; anything else falls
/// back to a literal regex translation (`.` → literal, `*` → `.*`,
/// `?` → `.`).
enum CompiledGlob {
    All,
    Extension(String),
    DirectoryName(String),
    Regex(Regex),
}

impl CompiledGlob {
    fn compile(glob: &str) -> Self {
        if glob == "*" {
            return CompiledGlob::All;
        }
        if let Some(dir_name) = glob.strip_suffix('/') {
            return CompiledGlob::DirectoryName(dir_name.to_lowercase());
        }
        if let Some(ext) = glob.strip_prefix("*.") {
            if !ext.contains(['*', '?']) {
                return CompiledGlob::Extension(ext.to_lowercase());
            }
        }
        let mut pattern = String::from("(?i)^");
        for ch in glob.chars() {
            match ch {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                '.' => pattern.push_str("\\."),
                special @ ('^' | '$' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\') => {
                    pattern.push('\\');
                    pattern.push(special);
                }
                other => pattern.push(other),
            }
        }
        pattern.push('$');
        CompiledGlob::Regex(Regex::new(&pattern).unwrap_or_else(|_| Regex::new("$^").unwrap()))
    }

    fn matches_directory_name(&self) -> bool {
        matches!(self, CompiledGlob::DirectoryName(_))
    }

    fn matches_name(&self, name: &str) -> bool {
        match self {
            CompiledGlob::All => true,
            CompiledGlob::Extension(ext) => name
                .rsplit_once('.')
                .map(|(_, found)| found.eq_ignore_ascii_case(ext))
                .unwrap_or(false),
            CompiledGlob::DirectoryName(dir) => name.eq_ignore_ascii_case(dir),
            CompiledGlob::Regex(re) => re.is_match(name),
        }
    }
}
