//! In-process FIFO job queue.
//!
//! One queue per run. Discovery jobs enqueue extraction jobs, so the queue
//! is only drained when no job is queued *and* none is in flight.

mod worker;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::models::Job;

pub use worker::{run_worker, WorkerContext};

/// FIFO queue with drain detection.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    notify: Notify,
    /// Jobs queued or currently being processed.
    outstanding: AtomicUsize,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a job.
    pub fn push(&self, job: Job) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.jobs
            .lock()
            .expect("queue lock never poisoned")
            .push_back(job);
        self.notify.notify_waiters();
    }

    /// Pop the next job, waiting while other workers may still enqueue.
    /// Returns `None` once the queue has fully drained.
    pub async fn next(&self) -> Option<Job> {
        loop {
            let notified = self.notify.notified();
            if let Some(job) = self
                .jobs
                .lock()
                .expect("queue lock never poisoned")
                .pop_front()
            {
                return Some(job);
            }
            if self.outstanding.load(Ordering::SeqCst) == 0 {
                // Wake the other waiters so they observe the drain too.
                self.notify.notify_waiters();
                return None;
            }
            notified.await;
        }
    }

    /// Mark one popped job as finished. Must be called exactly once per
    /// job returned by [`Self::next`].
    pub fn job_done(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlMode;
    use std::sync::Arc;

    fn job(key: &str) -> Job {
        Job::Municipality {
            run_id: "r1".into(),
            municipality_key: key.into(),
            municipality_name: key.into(),
            mode: CrawlMode::Fast,
        }
    }

    #[tokio::test]
    async fn fifo_order() {
        let queue = JobQueue::new();
        queue.push(job("a"));
        queue.push(job("b"));

        let first = queue.next().await.unwrap();
        assert_eq!(first.municipality_key(), "a");
        queue.job_done();
        let second = queue.next().await.unwrap();
        assert_eq!(second.municipality_key(), "b");
        queue.job_done();
    }

    #[tokio::test]
    async fn drains_when_empty_and_idle() {
        let queue = JobQueue::new();
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn waits_for_in_flight_jobs_to_enqueue_more() {
        let queue = Arc::new(JobQueue::new());
        queue.push(job("discovery"));

        let popped = queue.next().await.unwrap();
        assert_eq!(popped.municipality_key(), "discovery");

        // A second consumer must wait: the in-flight job may enqueue more.
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // The in-flight job enqueues a follow-up and completes.
        queue.push(job("extraction"));
        queue.job_done();

        let next = waiter.await.unwrap().unwrap();
        assert_eq!(next.municipality_key(), "extraction");
        queue.job_done();
        assert!(queue.next().await.is_none());
    }
}
