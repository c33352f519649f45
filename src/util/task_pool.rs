use crate::util::MessagesQueue;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Manages a collection of worker threads.
///
/// Every task is either handed to a parked worker whose idle slot the
/// spawner claims, or gets a freshly spawned worker, so a task can never sit
/// in the queue behind long-running work. Idle workers beyond a small floor
/// retire after a few seconds.
pub(crate) struct TaskPool {
    queue: Arc<MessagesQueue<Box<dyn FnOnce() + Send>>>,
    idle_workers: Arc<AtomicUsize>,
    total_workers: Arc<AtomicUsize>,
    closing: Arc<AtomicBool>,
}

/// Number of workers that stay alive even when idle.
const MIN_WORKERS: usize = 4;

/// How long an idle worker waits for a task before considering retirement.
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

impl TaskPool {
    pub fn new() -> TaskPool {
        TaskPool {
            queue: MessagesQueue::with_capacity(8),
            idle_workers: Arc::new(AtomicUsize::new(0)),
            total_workers: Arc::new(AtomicUsize::new(0)),
            closing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Executes a task on an idle worker, spawning one if none is parked.
    pub fn spawn_task(&self, task: Box<dyn FnOnce() + Send>) {
        let claimed_idle_slot = self
            .idle_workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idle| {
                idle.checked_sub(1)
            })
            .is_ok();

        if !claimed_idle_slot {
            self.add_worker();
        }

        self.queue.push(task);
    }

    fn add_worker(&self) {
        let queue = Arc::clone(&self.queue);
        let idle_workers = Arc::clone(&self.idle_workers);
        let total_workers = Arc::clone(&self.total_workers);
        let closing = Arc::clone(&self.closing);

        thread::spawn(move || {
            total_workers.fetch_add(1, Ordering::AcqRel);

            loop {
                idle_workers.fetch_add(1, Ordering::AcqRel);

                match queue.pop_timeout(IDLE_TIMEOUT) {
                    // whoever pushed this task already released an idle slot
                    Some(task) => task(),

                    None => {
                        // if our slot was claimed in the meantime, a task is
                        // on its way and we are not allowed to leave
                        let unregistered = idle_workers
                            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idle| {
                                idle.checked_sub(1)
                            })
                            .is_ok();
                        if !unregistered {
                            continue;
                        }

                        let can_retire = closing.load(Ordering::Acquire)
                            || total_workers.load(Ordering::Acquire) > MIN_WORKERS;
                        if can_retire {
                            break;
                        }
                    }
                }
            }

            total_workers.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // lets every idle worker retire at its next timeout
        self.closing.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::TaskPool;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    #[test]
    fn tasks_run() {
        let pool = TaskPool::new();
        let (tx, rx) = channel();

        for i in 0..20 {
            let tx = tx.clone();
            pool.spawn_task(Box::new(move || {
                tx.send(i).unwrap();
            }));
        }

        let mut results: Vec<i32> = (0..20).map(|_| rx.recv().unwrap()).collect();
        results.sort_unstable();
        assert_eq!(results, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn tasks_are_not_starved_by_long_running_ones() {
        let pool = TaskPool::new();
        let (tx, rx) = channel();

        // occupy workers indefinitely
        for _ in 0..8 {
            pool.spawn_task(Box::new(|| loop {
                std::thread::sleep(Duration::from_secs(60));
            }));
        }

        pool.spawn_task(Box::new(move || {
            tx.send(()).unwrap();
        }));

        rx.recv_timeout(Duration::from_secs(10)).unwrap();
    }
}
