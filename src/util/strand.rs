//! Serialized work queue.
//!
//! A strand is a single-consumer queue backed by one worker thread:
//! closures posted to it run off the embedder thread, one at a time, in
//! posting order. Plugins use strands to keep asset and network fetches
//! out of the main loop without losing ordering guarantees.

use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use tracing::debug;

type Job = Box<dyn FnOnce() + Send>;

enum Command {
    Run(Job),
    Stop,
}

/// Serialized single-consumer work queue.
pub struct Strand {
    tx: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    name: String,
}

impl Strand {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Command>();
        let thread_name = name.clone();
        let worker = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!("[{}] strand started", thread_name);
                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        Command::Run(job) => job(),
                        Command::Stop => break,
                    }
                }
                debug!("[{}] strand stopped", thread_name);
            })
            .expect("failed to spawn strand thread");

        Self { tx, worker: Some(worker), name }
    }

    /// Queue a closure for in-order execution on the strand thread.
    ///
    /// Posting to a stopped strand is a no-op.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send(Command::Run(Box::new(job)));
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Strand {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn jobs_run_in_posting_order() {
        let strand = Strand::new("test");
        let (tx, rx) = mpsc::channel();
        for i in 0..16 {
            let tx = tx.clone();
            strand.post(move || tx.send(i).unwrap());
        }
        drop(strand); // join the worker
        let seen: Vec<i32> = rx.try_iter().collect();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn drop_waits_for_pending_jobs() {
        let (tx, rx) = mpsc::channel();
        {
            let strand = Strand::new("drain");
            strand.post(move || {
                std::thread::sleep(std::time::Duration::from_millis(10));
                tx.send(()).unwrap();
            });
        }
        assert!(rx.try_recv().is_ok());
    }
}
