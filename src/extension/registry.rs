//! Tracks discovered extensions and mirrors them onto the canvas
//!
//! Notifications arrive on arbitrary threads. Each one updates the tracked
//! set under a short lock and queues the matching canvas mutation on the
//! dispatcher before the lock is released, so the dispatcher sees changes in
//! the same order as the tracked set. Waiting for the mutation happens after
//! the lock is dropped. A notification delivered on the dispatcher thread
//! applies its mutation before returning.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::capability::ExtensionDescriptor;
use super::discovery::{Announcement, DiscoveryListener};
use super::proxy::{ExtensionProxy, Placeholder};
use crate::canvas::{Canvas, SharedCanvas};
use crate::runtime::{Completion, DispatchError, Dispatcher};

pub struct ExtensionRegistry {
    dispatcher: Dispatcher<SharedCanvas>,
    placeholder: Arc<Placeholder>,
    tracked: Mutex<HashMap<String, Arc<ExtensionProxy>>>,
    closed: AtomicBool,
}

impl ExtensionRegistry {
    pub fn new(dispatcher: Dispatcher<SharedCanvas>, placeholder: Arc<Placeholder>) -> Self {
        Self {
            dispatcher,
            placeholder,
            tracked: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Names of tracked extensions, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tracked().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tracked().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tracked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops tracking: disposes every remaining proxy and queues clearing
    /// the toolbar. Idempotent, callable from any thread.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let remaining: Vec<(String, Arc<ExtensionProxy>)> = self.tracked().drain().collect();
        for (_, proxy) in &remaining {
            proxy.dispose();
        }

        let count = remaining.len();
        if count > 0 {
            let teardown = self.dispatcher.run_async(|cell: &SharedCanvas| {
                cell.borrow_mut().clear_extensions();
            });
            if let Err(e) = teardown {
                debug!("Toolbar teardown skipped: {}", e);
            }
        }

        info!(count, "Extension registry closed");
    }

    fn register(&self, descriptor: ExtensionDescriptor) {
        let ExtensionDescriptor { name, icon, shape } = descriptor;
        let proxy = Arc::new(ExtensionProxy::new(shape, Arc::clone(&self.placeholder)));

        let pending = {
            let mut tracked = self.tracked();
            if self.is_closed() {
                debug!(extension = %name, "Ignoring add after close");
                return;
            }

            if let Some(stale) = tracked.insert(name.clone(), Arc::clone(&proxy)) {
                warn!(extension = %name, "Extension registered twice, replacing earlier registration");
                stale.dispose();
            }

            let task_name = name.clone();
            self.schedule(move |canvas| {
                canvas.install_extension(task_name, icon, proxy);
            })
        };

        self.settle(&name, "registered", pending);
    }

    fn replace(&self, descriptor: ExtensionDescriptor) {
        let ExtensionDescriptor { name, icon, shape } = descriptor;
        let proxy = Arc::new(ExtensionProxy::new(shape, Arc::clone(&self.placeholder)));

        let pending = {
            let mut tracked = self.tracked();
            if self.is_closed() {
                debug!(extension = %name, "Ignoring modify after close");
                return;
            }

            match tracked.insert(name.clone(), Arc::clone(&proxy)) {
                Some(previous) => previous.dispose(),
                None => debug!(extension = %name, "Modify for untracked extension, treating as add"),
            }

            let task_name = name.clone();
            self.schedule(move |canvas| {
                canvas.replace_extension(task_name, icon, proxy);
            })
        };

        self.settle(&name, "replaced", pending);
    }

    fn unregister(&self, name: &str) {
        let pending = {
            let mut tracked = self.tracked();
            if self.is_closed() {
                debug!(extension = %name, "Ignoring remove after close");
                return;
            }

            let Some(proxy) = tracked.remove(name) else {
                debug!(extension = %name, "Ignoring remove of unknown extension");
                return;
            };
            proxy.dispose();

            let task_name = name.to_string();
            self.schedule(move |canvas| {
                canvas.uninstall_extension(&task_name);
            })
        };

        self.settle(name, "unregistered", pending);
    }

    /// Queues a canvas mutation
    ///
    /// On the dispatcher thread the mutation runs before this returns, unless
    /// the running task is itself holding the canvas; then it goes to the back
    /// of the queue.
    fn schedule<F>(&self, task: F) -> Result<Completion<()>, DispatchError>
    where
        F: FnOnce(&mut Canvas) + Send + 'static,
    {
        let requeue = self.dispatcher.clone();
        self.dispatcher
            .submit(move |cell: &SharedCanvas| match cell.try_borrow_mut() {
                Ok(mut canvas) => task(&mut *canvas),
                Err(_) => {
                    debug!("Canvas busy, deferring update");
                    let deferred = requeue.run_async(move |cell: &SharedCanvas| {
                        task(&mut *cell.borrow_mut());
                    });
                    if let Err(e) = deferred {
                        warn!("Deferred canvas update dropped: {}", e);
                    }
                }
            })
    }

    fn settle(&self, name: &str, action: &str, pending: Result<Completion<()>, DispatchError>) {
        match pending.and_then(Completion::wait) {
            Ok(()) => info!(extension = %name, "Extension {}", action),
            Err(e) => warn!(extension = %name, "Canvas update failed: {}", e),
        }
    }

    fn tracked(&self) -> MutexGuard<'_, HashMap<String, Arc<ExtensionProxy>>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiscoveryListener for ExtensionRegistry {
    fn on_add(&self, announcement: Announcement) {
        match announcement.into_descriptor() {
            Some(descriptor) => self.register(descriptor),
            None => debug!("Dropping add notification without name or icon"),
        }
    }

    fn on_modify(&self, announcement: Announcement) {
        match announcement.into_descriptor() {
            Some(descriptor) => self.replace(descriptor),
            None => debug!("Dropping modify notification without name or icon"),
        }
    }

    fn on_remove(&self, name: &str) {
        self.unregister(name);
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("names", &self.names())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Point, Surface};
    use crate::extension::{Drawable, Icon};
    use crate::runtime::DispatchThread;

    fn noop() -> Arc<dyn Drawable> {
        Arc::new(|_: &mut dyn Surface, _: Point| Ok(()))
    }

    type Setup = (
        ExtensionRegistry,
        Dispatcher<SharedCanvas>,
        DispatchThread<SharedCanvas>,
    );

    fn setup() -> Setup {
        let placeholder = Arc::new(Placeholder::new(None, 54));
        let canvas = Canvas::new(400, 400, 54, Arc::clone(&placeholder));
        let (dispatcher, thread) =
            Dispatcher::spawn("registry-test", SharedCanvas::new(canvas)).unwrap();
        let registry = ExtensionRegistry::new(dispatcher.clone(), placeholder);
        (registry, dispatcher, thread)
    }

    fn announce(name: &str) -> Announcement {
        Announcement::new(name, Icon::new(name.to_lowercase()), noop())
    }

    fn toolbar(dispatcher: &Dispatcher<SharedCanvas>) -> Vec<String> {
        dispatcher
            .run_sync(|cell| cell.borrow().tool_names())
            .unwrap()
    }

    #[test]
    fn add_registers_and_selects_first() {
        let (registry, dispatcher, _thread) = setup();

        registry.on_add(announce("Circle"));
        registry.on_add(announce("Square"));

        assert_eq!(registry.names(), vec!["Circle", "Square"]);
        assert_eq!(toolbar(&dispatcher), vec!["Circle", "Square"]);
        let selected = dispatcher
            .run_sync(|cell| cell.borrow().selected_tool().map(str::to_string))
            .unwrap();
        assert_eq!(selected.as_deref(), Some("Circle"));
    }

    #[test]
    fn malformed_add_is_dropped() {
        let (registry, dispatcher, _thread) = setup();

        registry.on_add(Announcement {
            name: Some("Circle".to_string()),
            icon: None,
            shape: noop(),
        });

        assert!(registry.is_empty());
        assert!(toolbar(&dispatcher).is_empty());
    }

    #[test]
    fn duplicate_add_disposes_stale_proxy_and_control() {
        let (registry, dispatcher, _thread) = setup();

        registry.on_add(announce("Circle"));
        let first = dispatcher.run_sync(|cell| cell.borrow().lookup("Circle")).unwrap();
        registry.on_add(announce("Circle"));

        assert!(!first.is_live());
        assert_eq!(toolbar(&dispatcher), vec!["Circle"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn modify_keeps_selection_and_position() {
        let (registry, dispatcher, _thread) = setup();
        registry.on_add(announce("Circle"));
        registry.on_add(announce("Square"));
        dispatcher
            .run_sync(|cell| cell.borrow_mut().select_tool("Square"))
            .unwrap();
        let before = dispatcher.run_sync(|cell| cell.borrow().lookup("Square")).unwrap();

        registry.on_modify(Announcement::new("Square", Icon::new("[]"), noop()));

        let after = dispatcher.run_sync(|cell| cell.borrow().lookup("Square")).unwrap();
        assert!(!before.is_live());
        assert!(after.is_live());
        assert_eq!(toolbar(&dispatcher), vec!["Circle", "Square"]);
        let (selected, icon) = dispatcher
            .run_sync(|cell| {
                let canvas = cell.borrow();
                (
                    canvas.selected_tool().map(str::to_string),
                    canvas.tools()[1].icon.clone(),
                )
            })
            .unwrap();
        assert_eq!(selected.as_deref(), Some("Square"));
        assert_eq!(icon, Icon::new("[]"));
    }

    #[test]
    fn removing_unknown_name_changes_nothing() {
        let (registry, dispatcher, _thread) = setup();
        registry.on_add(announce("Circle"));
        let revision = dispatcher.run_sync(|cell| cell.borrow().revision()).unwrap();

        registry.on_remove("Hexagon");

        assert_eq!(registry.names(), vec!["Circle"]);
        assert_eq!(
            dispatcher.run_sync(|cell| cell.borrow().revision()).unwrap(),
            revision
        );
    }

    #[test]
    fn close_disposes_everything_and_ignores_later_events() {
        let (registry, dispatcher, _thread) = setup();
        registry.on_add(announce("Circle"));
        registry.on_add(announce("Square"));
        let proxies = dispatcher
            .run_sync(|cell| {
                let canvas = cell.borrow();
                vec![canvas.lookup("Circle"), canvas.lookup("Square")]
            })
            .unwrap();

        registry.close();
        registry.close();
        registry.on_add(announce("Triangle"));

        assert!(proxies.iter().all(|p| !p.is_live()));
        assert!(registry.is_empty());
        assert!(toolbar(&dispatcher).is_empty());
    }

    #[test]
    fn notifications_from_dispatcher_thread_apply_immediately() {
        let (registry, dispatcher, _thread) = setup();
        let registry = Arc::new(registry);

        let inner = Arc::clone(&registry);
        let seen = dispatcher
            .run_sync(move |cell: &SharedCanvas| {
                inner.on_add(announce("Circle"));
                let added = cell.borrow().tool_names();
                inner.on_remove("Circle");
                (added, cell.borrow().tool_names())
            })
            .unwrap();

        assert_eq!(seen, (vec!["Circle".to_string()], Vec::<String>::new()));
    }

    #[test]
    fn notification_while_canvas_is_held_is_deferred() {
        let (registry, dispatcher, _thread) = setup();
        let registry = Arc::new(registry);

        let inner = Arc::clone(&registry);
        let during = dispatcher
            .run_sync(move |cell: &SharedCanvas| {
                let canvas = cell.borrow();
                inner.on_add(announce("Circle"));
                canvas.tool_names()
            })
            .unwrap();

        assert!(during.is_empty());
        assert_eq!(registry.names(), vec!["Circle"]);
        assert_eq!(toolbar(&dispatcher), vec!["Circle"]);
    }
}
