//! Work queue for batch processing.
//!
//! Jobs are sent over a std::sync::mpsc channel. With several workers the
//! receiver is shared behind a mutex; each job is taken by exactly one worker.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

/// One bulletin to process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BulletinJob {
    /// External bulletin identifier
    pub id: String,
    /// Page images in bulletin order
    pub images: Vec<PathBuf>,
}

/// A job tagged with its position in the batch.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub index: usize,
    pub job: BulletinJob,
}

/// Creates a new work queue.
///
/// The channel is unbounded; the producer enqueues the whole batch up front.
pub fn create_work_queue() -> (Sender<WorkItem>, Receiver<WorkItem>) {
    channel()
}

/// Reads a batch manifest: a JSON array of `{ "id": .., "images": [..] }`.
///
/// Relative image paths are resolved against the manifest's directory.
pub fn load_manifest(path: &Path) -> Result<Vec<BulletinJob>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let mut jobs: Vec<BulletinJob> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for job in &mut jobs {
        for image in &mut job.images {
            if image.is_relative() {
                *image = base.join(&*image);
            }
        }
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_work_queue_preserves_order() {
        let (sender, receiver) = create_work_queue();

        for i in 0..3 {
            let job = BulletinJob {
                id: format!("{}", 700 + i),
                images: vec![],
            };
            sender.send(WorkItem { index: i, job }).expect("Failed to send");
        }
        drop(sender);

        let received: Vec<usize> = receiver.iter().map(|item| item.index).collect();
        assert_eq!(received, vec![0, 1, 2]);
    }

    #[test]
    fn test_load_manifest_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(
            &path,
            r#"[
                { "id": "729", "images": ["downloads/p1.jpeg", "/abs/p2.jpeg"] },
                { "id": "730", "images": [] }
            ]"#,
        )
        .unwrap();

        let jobs = load_manifest(&path).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].images[0], dir.path().join("downloads/p1.jpeg"));
        assert_eq!(jobs[0].images[1], PathBuf::from("/abs/p2.jpeg"));
        assert!(jobs[1].images.is_empty());
    }

    #[test]
    fn test_load_manifest_rejects_bad_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(&path, r#"{ "id": "729" }"#).unwrap();
        assert!(load_manifest(&path).is_err());
    }
}
