use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{CleanableItem, DuplicateGroup};

/// Read in chunks so cancellation can be observed mid-hash on large files.
const HASH_CHUNK_BYTES: usize = 256 * 1024;

/// The detector's own default admits every non-empty file; callers that want
/// to skip the hash cost on small files should construct via `with_limits`
/// using `RECOMMENDED_MIN_CANDIDATE_SIZE` or their own threshold.
const DEFAULT_MIN_CANDIDATE_SIZE: u64 = 1;

/// Below this, grouping duplicates usually isn't worth the hash cost — a
/// recommendation, not the constructor default.
pub const RECOMMENDED_MIN_CANDIDATE_SIZE: u64 = 1024;

/// Two-phase content-addressed deduplicator: exact size bucketing followed
/// by a full-file SHA-256 hash within each bucket. There is no partial-read
/// quick-fingerprint shortcut — byte-identical content must be witnessed by
/// hash equality, and a separate fingerprint pass would only add I/O
/// without changing the final grouping.
pub struct DuplicateDetector {
    min_candidate_size: u64,
    concurrency: usize,
}

impl DuplicateDetector {
    /// Admits every non-empty file as a duplicate candidate. Use
    /// `with_limits(RECOMMENDED_MIN_CANDIDATE_SIZE, ...)` to skip the hash
    /// cost on small files instead.
    pub fn new() -> Self {
        DuplicateDetector {
            min_candidate_size: DEFAULT_MIN_CANDIDATE_SIZE,
            concurrency: num_cpus::get(),
        }
    }

    pub fn with_limits(min_candidate_size: u64, concurrency: usize) -> Self {
        DuplicateDetector {
            min_candidate_size,
            concurrency: concurrency.max(1),
        }
    }

    /// Finds duplicate groups among `items`, returning them ordered by
    /// descending `wasted_space`. Items that vanish or become unreadable
    /// between scan and hash are dropped from consideration, not treated
    /// as an error.
    pub async fn find_duplicates(
        &self,
        items: &[CleanableItem],
        token: &CancellationToken,
    ) -> CoreResult<Vec<DuplicateGroup>> {
        let mut size_buckets: HashMap<u64, Vec<CleanableItem>> = HashMap::new();
        for item in items {
            if item.size < self.min_candidate_size {
                continue;
            }
            size_buckets.entry(item.size).or_default().push(item.clone());
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut groups = Vec::new();

        for (_, bucket) in size_buckets {
            if bucket.len() < 2 {
                continue;
            }
            if token.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            let mut tasks = Vec::with_capacity(bucket.len());
            for item in bucket {
                let permit = Arc::clone(&semaphore);
                let token = token.clone();
                tasks.push(async move {
                    let _permit = permit.acquire_owned().await.ok()?;
                    let path = item.path.clone();
                    let hash = task::spawn_blocking(move || hash_file(&path, &token))
                        .await
                        .ok()??;
                    Some((item, hash))
                });
            }

            let hashed: Vec<(CleanableItem, String)> = futures::future::join_all(tasks)
                .await
                .into_iter()
                .flatten()
                .collect();

            let mut hash_groups: HashMap<String, Vec<CleanableItem>> = HashMap::new();
            for (mut item, hash) in hashed {
                item.content_hash = Some(hash.clone());
                hash_groups.entry(hash).or_default().push(item);
            }

            for (_, members) in hash_groups {
                if members.len() < 2 {
                    continue;
                }
                let primary = select_primary(&members);
                groups.push(DuplicateGroup::new(members, primary));
            }
        }

        groups.sort_by(|a, b| b.wasted_space.cmp(&a.wasted_space));
        Ok(groups)
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the whole file in chunks, hashing as it goes. Returns `None` if
/// cancelled mid-read or if the file became unreadable.
fn hash_file(path: &Path, token: &CancellationToken) -> Option<String> {
    let mut file = File::open(path).ok()?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_BYTES];

    loop {
        if token.is_cancelled() {
            return None;
        }
        let read = file.read(&mut buffer).ok()?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Some(format!("{:x}", hasher.finalize()))
}

/// Picks the group's representative, in order: home-directory preference,
/// shorter canonical path, older `ctime`, lexicographically smaller path.
fn select_primary(members: &[CleanableItem]) -> Uuid {
    let home = dirs::home_dir();
    members
        .iter()
        .min_by(|a, b| {
            let a_rank = u8::from(!is_under_home(&a.path, home.as_deref()));
            let b_rank = u8::from(!is_under_home(&b.path, home.as_deref()));
            a_rank
                .cmp(&b_rank)
                .then_with(|| a.path.as_os_str().len().cmp(&b.path.as_os_str().len()))
                .then_with(|| a.ctime.cmp(&b.ctime))
                .then_with(|| a.path.cmp(&b.path))
        })
        .map(|item| item.id)
        .unwrap_or_else(|| members[0].id)
}

fn is_under_home(path: &Path, home: Option<&Path>) -> bool {
    home.map(|home| path.starts_with(home)).unwrap_or(false)
}
