use crate::{BoxError, SchmockError};
use http::{Method, StatusCode};
use log::warn;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Lifecycle notifications published by a mock instance.
#[derive(Debug, Clone)]
pub enum Event {
    /// A call to `handle` started.
    RequestStart { method: Method, path: String },
    /// A call to `handle` is about to return `status`.
    RequestEnd {
        method: Method,
        path: String,
        status: StatusCode,
    },
    /// A request failed, whether or not an `on_error` hook recovered from it.
    Error {
        method: Method,
        path: String,
        error: SchmockError,
    },
}

/// The discriminant of an [`Event`], used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RequestStart,
    RequestEnd,
    Error,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::RequestStart { .. } => EventKind::RequestStart,
            Event::RequestEnd { .. } => EventKind::RequestEnd,
            Event::Error { .. } => EventKind::Error,
        }
    }

    fn request_line(&self) -> (&Method, &str) {
        match self {
            Event::RequestStart { method, path }
            | Event::RequestEnd { method, path, .. }
            | Event::Error { method, path, .. } => (method, path),
        }
    }
}

/// Returned by [`EventBus::on`]; hand it back to [`EventBus::off`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&Event) -> Result<(), BoxError> + Send + Sync>;

/// Synchronous publish/subscribe, one listener list per [`EventKind`].
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if no listener with this id was subscribed to `kind`.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match listeners.get_mut(&kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|(listener_id, _)| *listener_id != id);
                list.len() != before
            }
            None => false,
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Invoke the listeners subscribed to the kind of `event`, in subscription order.
    ///
    /// Listeners subscribed or unsubscribed while the event is being delivered only take
    /// effect from the next `emit`. A failing listener is reported as an [`Event::Error`];
    /// failures of `Error` listeners are logged and dropped.
    pub fn emit(&self, event: &Event) {
        let kind = event.kind();
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(|list| list.iter().map(|(_, listener)| listener.clone()).collect())
            .unwrap_or_default();

        for listener in snapshot {
            let Err(e) = listener(event) else {
                continue;
            };
            if kind == EventKind::Error {
                warn!("An `error` listener failed, ignoring it: {}", e);
                continue;
            }
            let (method, path) = event.request_line();
            self.emit(&Event::Error {
                method: method.clone(),
                path: path.to_string(),
                error: SchmockError::internal(format!("{:?} listener failed: {}", kind, e)),
            });
        }
    }
}

impl Debug for EventBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("request_start", &self.listener_count(EventKind::RequestStart))
            .field("request_end", &self.listener_count(EventKind::RequestEnd))
            .field("error", &self.listener_count(EventKind::Error))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn start() -> Event {
        Event::RequestStart {
            method: Method::GET,
            path: "/".into(),
        }
    }

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        label: &'static str,
    ) -> impl Fn(&Event) -> Result<(), BoxError> + Send + Sync + 'static {
        let log = log.clone();
        move |_event| {
            log.lock().unwrap().push(label.to_string());
            Ok(())
        }
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(vec![]));
        bus.on(EventKind::RequestStart, recorder(&log, "first"));
        bus.on(EventKind::RequestStart, recorder(&log, "second"));
        bus.on(EventKind::RequestEnd, recorder(&log, "end"));

        bus.emit(&start());

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn off_removes_a_single_listener() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(vec![]));
        let first = bus.on(EventKind::RequestStart, recorder(&log, "first"));
        bus.on(EventKind::RequestStart, recorder(&log, "second"));

        assert!(bus.off(EventKind::RequestStart, first));
        assert!(!bus.off(EventKind::RequestStart, first));
        assert!(!bus.off(EventKind::Error, first));
        bus.emit(&start());

        assert_eq!(*log.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn failing_listener_is_reported_as_an_error_event() {
        let bus = EventBus::new();
        let errors = Arc::new(Mutex::new(vec![]));
        let recorded = errors.clone();
        bus.on(EventKind::RequestStart, |_| Err("boom".into()));
        bus.on(EventKind::Error, move |event| {
            if let Event::Error { error, .. } = event {
                recorded.lock().unwrap().push(error.to_string());
            }
            Ok(())
        });

        bus.emit(&start());

        assert_eq!(
            *errors.lock().unwrap(),
            vec!["RequestStart listener failed: boom"]
        );
    }

    #[test]
    fn failing_error_listener_does_not_recurse() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(vec![]));
        bus.on(EventKind::Error, |_| Err("error handler failed".into()));
        bus.on(EventKind::Error, recorder(&log, "still called"));

        bus.emit(&Event::Error {
            method: Method::GET,
            path: "/".into(),
            error: SchmockError::internal("original"),
        });

        assert_eq!(*log.lock().unwrap(), vec!["still called"]);
    }

    #[test]
    fn listeners_may_subscribe_while_an_event_is_delivered() {
        let bus = Arc::new(EventBus::new());
        let inner = bus.clone();
        bus.on(EventKind::RequestStart, move |_| {
            inner.on(EventKind::RequestStart, |_| Ok(()));
            Ok(())
        });

        bus.emit(&start());

        assert_eq!(bus.listener_count(EventKind::RequestStart), 2);
    }
}
