//! Host command bindings.
//!
//! A flat table from command name to handler. Handlers run on the
//! session worker, one at a time, and get a [`SessionHandle`] so they
//! can issue commands back; anything they send is queued and processed
//! on later loop iterations, never re-entrantly.

use std::collections::HashMap;

use crate::event::Event;
use crate::session::SessionHandle;

/// A host-supplied event handler.
pub type Handler = Box<dyn Fn(&SessionHandle, &Event) + Send>;

/// Command-name to handler mapping. Last registration per name wins.
#[derive(Default)]
pub struct Binds {
    table: HashMap<String, Handler>,
}

impl Binds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `command`, replacing any previous one.
    pub fn bind(&mut self, command: impl Into<String>, handler: Handler) {
        self.table.insert(command.into(), handler);
    }

    /// Invoke the handler bound to the event's command. Absence of a
    /// binding is a no-op, never an error.
    pub fn dispatch(&self, handle: &SessionHandle, event: &Event) {
        if let Some(handler) = self.table.get(&event.command) {
            handler(handle, event);
        }
    }

    pub fn contains(&self, command: &str) -> bool {
        self.table.contains_key(command)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl std::fmt::Debug for Binds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut commands: Vec<_> = self.table.keys().collect();
        commands.sort();
        f.debug_struct("Binds").field("commands", &commands).finish()
    }
}
