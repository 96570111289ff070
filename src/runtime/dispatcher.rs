//! Single-threaded task dispatcher
//!
//! A [`Dispatcher`] is a cloneable handle to one named worker thread that
//! exclusively owns a piece of state `S`. Tasks run one at a time in
//! submission order and receive `&S`; the state never leaves the thread, so
//! it can use `RefCell` for mutation instead of a lock.
//!
//! Synchronous calls made on the dispatcher thread itself run immediately
//! against the same state rather than queueing behind the running task.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle, ThreadId};

use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Dispatcher has been shut down")]
    Closed,

    #[error("State is already borrowed by the running task")]
    Busy,

    #[error("Task was dropped before it completed")]
    Dropped,

    #[error("Failed to start dispatcher thread: {0}")]
    Spawn(String),
}

type Job<S> = Box<dyn FnOnce(&S) + Send + 'static>;

enum Message<S> {
    Run(Job<S>),
    Shutdown,
}

thread_local! {
    /// State owned by the dispatcher running on this thread
    static CURRENT: RefCell<Option<Rc<dyn Any>>> = const { RefCell::new(None) };
}

/// Handle used to submit tasks to the dispatcher thread
pub struct Dispatcher<S> {
    tx: mpsc::Sender<Message<S>>,
    owner: ThreadId,
    closed: Arc<AtomicBool>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            owner: self.owner,
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<S: Send + 'static> Dispatcher<S> {
    /// Starts a dispatcher thread named `name` that owns `state`
    pub fn spawn(name: &str, state: S) -> Result<(Self, DispatchThread<S>), DispatchError> {
        let (tx, rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_loop(rx, state))
            .map_err(|e| DispatchError::Spawn(e.to_string()))?;

        let dispatcher = Self {
            tx,
            owner: handle.thread().id(),
            closed: Arc::new(AtomicBool::new(false)),
        };
        debug!(thread = name, "Dispatcher spawned");

        let thread = DispatchThread {
            handle,
            dispatcher: dispatcher.clone(),
        };
        Ok((dispatcher, thread))
    }

    /// Returns true when called from the dispatcher thread itself
    pub fn is_dispatch_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Queues `task` and returns without waiting for it
    ///
    /// Allowed from any thread, including the dispatcher thread, where the
    /// task runs after the current one finishes.
    pub fn run_async<F>(&self, task: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&S) + Send + 'static,
    {
        self.send(Box::new(task))
    }

    /// Queues `task` and returns a [`Completion`] for its result
    ///
    /// Splitting submission from waiting lets a caller enqueue while holding
    /// its own lock and wait after releasing it. On the dispatcher thread the
    /// task runs before this returns and the completion is already settled.
    pub fn submit<R, F>(&self, task: F) -> Result<Completion<R>, DispatchError>
    where
        R: Send + 'static,
        F: FnOnce(&S) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);

        if self.is_dispatch_thread() {
            match self.run_inline(task) {
                Ok(value) => {
                    let _ = reply_tx.send(value);
                }
                // Dropping the sender settles the completion as Dropped
                Err(DispatchError::Dropped) => {}
                Err(e) => return Err(e),
            }
            return Ok(Completion { rx: reply_rx });
        }

        self.send(Box::new(move |state: &S| {
            // The waiter may have given up; nothing to do then.
            let _ = reply_tx.send(task(state));
        }))?;

        Ok(Completion { rx: reply_rx })
    }

    /// Runs `task` on the dispatcher thread and blocks until it has finished
    ///
    /// Called from the dispatcher thread, the task executes immediately
    /// against the live state instead of queueing behind the caller.
    pub fn run_sync<R, F>(&self, task: F) -> Result<R, DispatchError>
    where
        R: Send + 'static,
        F: FnOnce(&S) -> R + Send + 'static,
    {
        if self.is_dispatch_thread() {
            return self.run_inline(task);
        }
        self.submit(task)?.wait()
    }

    /// Rejects further submissions and asks the thread to stop
    ///
    /// Tasks accepted before this call still run. Idempotent.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Dispatcher shutting down");
            let _ = self.tx.send(Message::Shutdown);
        }
    }

    fn run_inline<R, F>(&self, task: F) -> Result<R, DispatchError>
    where
        F: FnOnce(&S) -> R,
    {
        if self.is_closed() {
            return Err(DispatchError::Closed);
        }
        let state = CURRENT
            .with(|slot| slot.borrow().clone())
            .and_then(|any| any.downcast::<S>().ok())
            .ok_or(DispatchError::Closed)?;

        panic::catch_unwind(AssertUnwindSafe(|| task(&*state))).map_err(|payload| {
            error!("Dispatcher task panicked: {}", panic_message(payload.as_ref()));
            DispatchError::Dropped
        })
    }

    fn send(&self, job: Job<S>) -> Result<(), DispatchError> {
        if self.is_closed() {
            return Err(DispatchError::Closed);
        }
        self.tx
            .send(Message::Run(job))
            .map_err(|_| DispatchError::Closed)
    }
}

/// Pending result of a task queued with [`Dispatcher::submit`]
#[must_use = "a completion does nothing unless waited on"]
pub struct Completion<R> {
    rx: mpsc::Receiver<R>,
}

impl<R> Completion<R> {
    /// Blocks until the task has run
    ///
    /// Fails with [`DispatchError::Dropped`] if the task panicked or was
    /// discarded.
    pub fn wait(self) -> Result<R, DispatchError> {
        self.rx.recv().map_err(|_| DispatchError::Dropped)
    }
}

/// Owner of the dispatcher thread
pub struct DispatchThread<S> {
    handle: JoinHandle<Option<S>>,
    dispatcher: Dispatcher<S>,
}

impl<S: Send + 'static> DispatchThread<S> {
    /// Shuts the dispatcher down, waits for queued tasks, and returns the state
    pub fn join(self) -> Result<S, DispatchError> {
        self.dispatcher.shutdown();
        self.handle
            .join()
            .ok()
            .flatten()
            .ok_or(DispatchError::Dropped)
    }
}

fn run_loop<S: 'static>(rx: mpsc::Receiver<Message<S>>, state: S) -> Option<S> {
    debug!("Dispatcher loop started");
    let state = Rc::new(state);
    CURRENT.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&state) as Rc<dyn Any>));

    while let Ok(message) = rx.recv() {
        match message {
            Message::Run(job) => execute(job, &*state),
            Message::Shutdown => break,
        }
    }

    // Submissions that raced the shutdown flag were still accepted.
    while let Ok(message) = rx.try_recv() {
        if let Message::Run(job) = message {
            execute(job, &*state);
        }
    }

    CURRENT.with(|slot| slot.borrow_mut().take());
    debug!("Dispatcher loop stopped");
    Rc::try_unwrap(state).ok()
}

fn execute<S>(job: Job<S>, state: &S) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job(state))) {
        error!("Dispatcher task panicked: {}", panic_message(payload.as_ref()));
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    type Log = RefCell<Vec<u32>>;

    fn spawn_log() -> (Dispatcher<Log>, DispatchThread<Log>) {
        Dispatcher::spawn("test-dispatch", RefCell::new(Vec::new())).unwrap()
    }

    fn finish(thread: DispatchThread<Log>) -> Vec<u32> {
        thread.join().unwrap().into_inner()
    }

    #[test]
    fn run_sync_returns_task_result() {
        let (dispatcher, thread) = spawn_log();
        let len = dispatcher
            .run_sync(|log: &Log| {
                log.borrow_mut().push(7);
                log.borrow().len()
            })
            .unwrap();

        assert_eq!(len, 1);
        assert_eq!(finish(thread), vec![7]);
    }

    #[test]
    fn mixed_submissions_run_in_fifo_order() {
        let (dispatcher, thread) = spawn_log();
        dispatcher.run_async(|log| log.borrow_mut().push(1)).unwrap();
        dispatcher.run_sync(|log| log.borrow_mut().push(2)).unwrap();
        dispatcher.run_async(|log| log.borrow_mut().push(3)).unwrap();
        dispatcher.run_async(|log| log.borrow_mut().push(4)).unwrap();

        let seen = dispatcher.run_sync(|log| log.borrow().clone()).unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4]);
        thread.join().unwrap();
    }

    #[test]
    fn tasks_run_on_the_dispatcher_thread() {
        let (dispatcher, thread) = spawn_log();
        assert!(!dispatcher.is_dispatch_thread());

        let inner = dispatcher.clone();
        let on_thread = dispatcher
            .run_sync(move |_| inner.is_dispatch_thread())
            .unwrap();
        assert!(on_thread);
        thread.join().unwrap();
    }

    #[test]
    fn nested_run_sync_executes_immediately() {
        let (dispatcher, thread) = spawn_log();
        let inner = dispatcher.clone();
        let seen = dispatcher
            .run_sync(move |log: &Log| {
                log.borrow_mut().push(1);
                let nested = inner.run_sync(|log: &Log| {
                    log.borrow_mut().push(2);
                    log.borrow().len()
                });
                log.borrow_mut().push(3);
                (nested, log.borrow().clone())
            })
            .unwrap();

        assert_eq!(seen, (Ok(2), vec![1, 2, 3]));
        thread.join().unwrap();
    }

    #[test]
    fn nested_submit_is_already_settled() {
        let (dispatcher, thread) = spawn_log();
        let inner = dispatcher.clone();
        let settled = dispatcher
            .run_sync(move |_| {
                let completion = inner.submit(|log: &Log| log.borrow_mut().push(4)).unwrap();
                let ran = inner.run_sync(|log: &Log| log.borrow().clone());
                (ran, completion.wait())
            })
            .unwrap();

        assert_eq!(settled, (Ok(vec![4]), Ok(())));
        thread.join().unwrap();
    }

    #[test]
    fn nested_panic_is_reported_to_the_caller() {
        let (dispatcher, thread) = spawn_log();
        let inner = dispatcher.clone();
        let nested = dispatcher
            .run_sync(move |_| inner.run_sync(|_: &Log| -> u32 { panic!("inner") }))
            .unwrap();

        assert_eq!(nested, Err(DispatchError::Dropped));
        thread.join().unwrap();
    }

    #[test]
    fn run_async_from_dispatcher_thread_runs_later() {
        let (dispatcher, thread) = spawn_log();
        let inner = dispatcher.clone();
        dispatcher
            .run_sync(move |log| {
                inner.run_async(|log| log.borrow_mut().push(2)).unwrap();
                log.borrow_mut().push(1);
            })
            .unwrap();

        let seen = dispatcher.run_sync(|log| log.borrow().clone()).unwrap();
        assert_eq!(seen, vec![1, 2]);
        thread.join().unwrap();
    }

    #[test]
    fn submissions_after_shutdown_are_rejected() {
        let (dispatcher, thread) = spawn_log();
        dispatcher.run_async(|log| log.borrow_mut().push(1)).unwrap();
        dispatcher.shutdown();
        dispatcher.shutdown();

        assert_eq!(
            dispatcher.run_async(|log| log.borrow_mut().push(2)),
            Err(DispatchError::Closed)
        );
        assert_eq!(
            dispatcher.run_sync(|log| log.borrow().len()),
            Err(DispatchError::Closed)
        );
        assert_eq!(finish(thread), vec![1]);
    }

    #[test]
    fn panicking_task_does_not_stop_the_loop() {
        let (dispatcher, thread) = spawn_log();
        let result = dispatcher.run_sync(|_| -> u32 { panic!("boom") });
        assert_eq!(result, Err(DispatchError::Dropped));

        dispatcher.run_sync(|log| log.borrow_mut().push(5)).unwrap();
        assert_eq!(finish(thread), vec![5]);
    }

    #[test]
    fn concurrent_producers_all_land() {
        let (dispatcher, thread) = spawn_log();
        let producers: Vec<_> = (0..8)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        if i % 2 == 0 {
                            dispatcher.run_async(|log| log.borrow_mut().push(1)).unwrap();
                        } else {
                            dispatcher.run_sync(|log| log.borrow_mut().push(1)).unwrap();
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(dispatcher.run_sync(|log| log.borrow().len()).unwrap(), 400);
        thread.join().unwrap();
    }

    #[test]
    fn completion_can_be_awaited_later() {
        let (dispatcher, thread) = spawn_log();
        let completion = dispatcher
            .submit(|log: &Log| {
                std::thread::sleep(Duration::from_millis(10));
                log.borrow_mut().push(9);
                log.borrow().len()
            })
            .unwrap();

        assert_eq!(completion.wait().unwrap(), 1);
        thread.join().unwrap();
    }
}
