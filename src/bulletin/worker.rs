//! Batch runner.
//!
//! Bulletins are independent: each worker thread takes jobs from the shared
//! queue and runs the full pipeline for one bulletin at a time. A failing
//! bulletin does not affect the others. Store writes are serialized by the
//! store itself.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::thread;

use super::processor::{BulletinOutcome, BulletinProcessor, ProcessOptions};
use super::queue::{create_work_queue, BulletinJob, WorkItem};

/// Processes every job and returns the outcomes in manifest order.
///
/// `workers <= 1` runs sequentially on the calling thread.
pub fn run_batch(
    processor: &BulletinProcessor<'_>,
    jobs: Vec<BulletinJob>,
    workers: usize,
    options: ProcessOptions,
) -> Vec<BulletinOutcome> {
    crate::log(&format!(
        "Batch started: {} bulletin(s), {} worker(s)",
        jobs.len(),
        workers.max(1)
    ));

    let outcomes = if workers <= 1 {
        jobs.iter()
            .map(|job| processor.process(&job.id, &job.images, options))
            .collect()
    } else {
        run_parallel(processor, jobs, workers, options)
    };

    crate::log("Batch finished");
    outcomes
}

fn run_parallel(
    processor: &BulletinProcessor<'_>,
    jobs: Vec<BulletinJob>,
    workers: usize,
    options: ProcessOptions,
) -> Vec<BulletinOutcome> {
    let total = jobs.len();
    let (sender, receiver) = create_work_queue();
    for (index, job) in jobs.into_iter().enumerate() {
        // Receiver is alive until the scope below ends
        let _ = sender.send(WorkItem { index, job });
    }
    drop(sender);

    let receiver = Mutex::new(receiver);
    let (result_sender, result_receiver) = channel();

    thread::scope(|scope| {
        for worker_id in 0..workers.min(total.max(1)) {
            let receiver = &receiver;
            let result_sender = result_sender.clone();
            scope.spawn(move || run_worker(worker_id, receiver, result_sender, processor, options));
        }
    });
    drop(result_sender);

    let mut slots: Vec<Option<BulletinOutcome>> = vec![None; total];
    for (index, outcome) in result_receiver.iter() {
        slots[index] = Some(outcome);
    }
    slots.into_iter().flatten().collect()
}

/// Runs the worker loop until the queue is drained.
fn run_worker(
    worker_id: usize,
    receiver: &Mutex<Receiver<WorkItem>>,
    results: Sender<(usize, BulletinOutcome)>,
    processor: &BulletinProcessor<'_>,
    options: ProcessOptions,
) {
    crate::log(&format!("Worker {} started", worker_id));

    loop {
        // Hold the lock only while taking the next item
        let next = match receiver.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => break,
        };

        match next {
            Ok(item) => {
                crate::log(&format!(
                    "Worker {}: processing bulletin {}",
                    worker_id, item.job.id
                ));
                let outcome = processor.process(&item.job.id, &item.job.images, options);
                if results.send((item.index, outcome)).is_err() {
                    break;
                }
            }
            // Channel closed and drained
            Err(_) => break,
        }
    }

    crate::log(&format!("Worker {} finished", worker_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulletin::processor::BulletinState;
    use crate::bulletin::store::{DocumentStore, JsonFileStore};
    use crate::config::AppConfig;
    use crate::ocr::testing::ScriptedBackend;
    use image::{ImageBuffer, Rgba, RgbaImage};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn cover_page(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let img: RgbaImage = ImageBuffer::from_pixel(437, 620, Rgba([250, 250, 250, 255]));
        img.save(&path).unwrap();
        path
    }

    fn jobs(dir: &std::path::Path) -> Vec<BulletinJob> {
        let page = cover_page(dir, "cover.png");
        vec![
            BulletinJob {
                id: "729".to_string(),
                images: vec![page.clone()],
            },
            BulletinJob {
                id: "730".to_string(),
                images: vec![],
            },
            BulletinJob {
                id: "731".to_string(),
                images: vec![page],
            },
        ]
    }

    #[test]
    fn test_failed_bulletin_does_not_stop_batch() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("bulletins.json")).unwrap();
        let config = AppConfig::default();
        let backend = ScriptedBackend::default().answering_everything("제 1234 호", 80.0);
        let processor = BulletinProcessor::new(&config, &backend, &store);

        let outcomes = run_batch(&processor, jobs(dir.path()), 1, ProcessOptions::default());

        let states: Vec<&BulletinState> = outcomes.iter().map(|o| &o.state).collect();
        assert_eq!(states[0], &BulletinState::Completed);
        assert!(outcomes[1].is_failed());
        assert_eq!(states[2], &BulletinState::Completed);
        assert!(store.has_document("729").unwrap());
        assert!(store.has_document("731").unwrap());
    }

    #[test]
    fn test_parallel_batch_keeps_manifest_order() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("bulletins.json")).unwrap();
        let config = AppConfig::default();
        let backend = ScriptedBackend::default().answering_everything("제 1234 호", 80.0);
        let processor = BulletinProcessor::new(&config, &backend, &store);

        let outcomes = run_batch(&processor, jobs(dir.path()), 3, ProcessOptions::default());

        let ids: Vec<&str> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["729", "730", "731"]);
        assert_eq!(outcomes[0].state, BulletinState::Completed);
        assert!(outcomes[1].is_failed());
        assert_eq!(outcomes[2].state, BulletinState::Completed);
    }

    #[test]
    fn test_empty_batch() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("bulletins.json")).unwrap();
        let config = AppConfig::default();
        let backend = ScriptedBackend::default();
        let processor = BulletinProcessor::new(&config, &backend, &store);

        assert!(run_batch(&processor, vec![], 4, ProcessOptions::default()).is_empty());
    }
}
