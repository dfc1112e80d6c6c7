//! Request/response envelopes over a message transport.
//!
//! Outbound requests carry a monotonically increasing `_index`; the reply
//! echoing that index resolves the pending callback exactly once. Inbound
//! messages without an index are broadcasts and are dispatched by their
//! `action` string.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GuiError, Result};

const WATCH_ACTION: &str = "vfs:watch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "_index")]
    pub index: u64,
    pub sid: String,
    pub path: String,
    pub args: Value,
}

impl RequestEnvelope {
    pub fn new(index: u64, sid: impl Into<String>, method: &str, args: Value) -> Self {
        Self { index, sid: sid.into(), path: request_path(method), args }
    }
}

/// `FS:<m>` methods go to `/FS/<m>`, everything else to `/API/<m>`.
pub fn request_path(method: &str) -> String {
    match method.strip_prefix("FS:") {
        Some(m) => format!("/FS/{}", m),
        None => format!("/API/{}", method),
    }
}

/// A broadcast: `{action, args}` without an index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notification {
    pub action: String,
    #[serde(default)]
    pub args: Value,
}

/// The socket underneath a [`Connection`].
pub trait Transport {
    fn send(&mut self, text: &str) -> Result<()>;
    fn close(&mut self);
}

pub type ResponseCallback = Box<dyn FnOnce(Value)>;
pub type MessageHandler = Rc<dyn Fn(&Value)>;

pub struct Connection<T: Transport> {
    transport: Option<T>,
    sid: String,
    next_index: u64,
    pending: HashMap<u64, ResponseCallback>,
    handlers: HashMap<String, Vec<MessageHandler>>,
    watchers: Vec<(u64, MessageHandler)>,
    next_watch: u64,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, sid: impl Into<String>) -> Self {
        Self {
            transport: Some(transport),
            sid: sid.into(),
            next_index: 0,
            pending: HashMap::new(),
            handlers: HashMap::new(),
            watchers: Vec::new(),
            next_watch: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Sends `method` and remembers `on_response` under the new index.
    /// Nothing is remembered when the send fails.
    pub fn request(&mut self, method: &str, args: Value, on_response: impl FnOnce(Value) + 'static) -> Result<u64> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| GuiError::Connection("not connected".into()))?;

        let index = self.next_index;
        let envelope = RequestEnvelope::new(index, self.sid.clone(), method, args);
        let text = serde_json::to_string(&envelope)?;
        transport.send(&text)?;

        self.next_index += 1;
        self.pending.insert(index, Box::new(on_response));
        log::trace!("request #{} {}", index, envelope.path);
        Ok(index)
    }

    /// Handles one inbound message.
    pub fn receive(&mut self, text: &str) -> Result<()> {
        let mut data: Value = serde_json::from_str(text)?;

        let index = data.as_object_mut().and_then(|o| o.remove("_index"));
        match index {
            Some(index) => {
                let callback = index.as_u64().and_then(|i| self.pending.remove(&i));
                match callback {
                    Some(callback) => callback(data),
                    None => log::warn!("response for unknown request {}", index),
                }
            }
            None => {
                let note: Notification = serde_json::from_value(data)?;
                self.notify(&note);
            }
        }
        Ok(())
    }

    fn notify(&self, note: &Notification) {
        if note.action == WATCH_ACTION {
            let watchers: Vec<_> = self.watchers.iter().map(|(_, w)| w.clone()).collect();
            for watcher in watchers {
                watcher(&note.args);
            }
        }
        let handlers = self.handlers.get(&note.action).cloned().unwrap_or_default();
        for handler in handlers {
            handler(&note.args);
        }
    }

    /// Subscribes to broadcasts with `action`.
    pub fn on(&mut self, action: &str, handler: impl Fn(&Value) + 'static) {
        self.handlers.entry(action.to_string()).or_default().push(Rc::new(handler));
    }

    pub fn off(&mut self, action: &str) {
        self.handlers.remove(action);
    }

    /// Subscribes to file change broadcasts; the handler receives the
    /// changed file's descriptor.
    pub fn watch_vfs(&mut self, handler: impl Fn(&Value) + 'static) -> u64 {
        let id = self.next_watch;
        self.next_watch += 1;
        self.watchers.push((id, Rc::new(handler)));
        id
    }

    pub fn unwatch_vfs(&mut self, id: u64) {
        self.watchers.retain(|(w, _)| *w != id);
    }

    /// Closes the transport and forgets every pending callback.
    pub fn destroy(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.pending.clear();
        log::debug!("connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Clone, Default)]
    struct Wire {
        sent: Rc<RefCell<Vec<String>>>,
        closed: Rc<RefCell<bool>>,
        broken: bool,
    }

    impl Transport for Wire {
        fn send(&mut self, text: &str) -> Result<()> {
            if self.broken {
                return Err(GuiError::Connection("socket closed".into()));
            }
            self.sent.borrow_mut().push(text.to_string());
            Ok(())
        }

        fn close(&mut self) {
            *self.closed.borrow_mut() = true;
        }
    }

    #[test]
    fn paths_split_on_fs_prefix() {
        assert_eq!(request_path("FS:scandir"), "/FS/scandir");
        assert_eq!(request_path("login"), "/API/login");
        assert_eq!(request_path("application"), "/API/application");
    }

    #[test]
    fn requests_are_indexed_envelopes() {
        let wire = Wire::default();
        let mut conn = Connection::new(wire.clone(), "abc");
        assert_eq!(conn.request("FS:read", json!({"path": "home:///a"}), |_| {}).unwrap(), 0);
        assert_eq!(conn.request("logout", Value::Null, |_| {}).unwrap(), 1);

        let sent: Vec<Value> = wire.sent.borrow().iter().map(|s| serde_json::from_str(s).unwrap()).collect();
        assert_eq!(sent[0], json!({"_index": 0, "sid": "abc", "path": "/FS/read", "args": {"path": "home:///a"}}));
        assert_eq!(sent[1]["path"], "/API/logout");
        assert_eq!(conn.pending(), 2);
    }

    #[test]
    fn response_resolves_once_without_index() {
        let mut conn = Connection::new(Wire::default(), "s");
        let got = Rc::new(RefCell::new(Vec::new()));
        let g = got.clone();
        conn.request("ping", Value::Null, move |v| g.borrow_mut().push(v)).unwrap();

        conn.receive(r#"{"_index": 0, "result": "pong"}"#).unwrap();
        conn.receive(r#"{"_index": 0, "result": "again"}"#).unwrap();

        assert_eq!(*got.borrow(), [json!({"result": "pong"})]);
        assert_eq!(conn.pending(), 0);
    }

    #[test]
    fn failed_send_keeps_nothing_pending() {
        let wire = Wire { broken: true, ..Wire::default() };
        let mut conn = Connection::new(wire, "s");
        assert!(matches!(conn.request("ping", Value::Null, |_| {}), Err(GuiError::Connection(_))));
        assert_eq!(conn.pending(), 0);
    }

    #[test]
    fn broadcasts_dispatch_by_action() {
        let mut conn = Connection::new(Wire::default(), "s");
        let changes = Rc::new(RefCell::new(Vec::new()));
        let watched = Rc::new(RefCell::new(Vec::new()));
        let c = changes.clone();
        conn.on("vfs:watch", move |args| c.borrow_mut().push(args.clone()));
        let w = watched.clone();
        let id = conn.watch_vfs(move |args| w.borrow_mut().push(args["path"].clone()));

        conn.receive(r#"{"action": "vfs:watch", "args": {"path": "home:///a.txt"}}"#).unwrap();
        conn.receive(r#"{"action": "other"}"#).unwrap();
        conn.unwatch_vfs(id);
        conn.receive(r#"{"action": "vfs:watch", "args": {"path": "home:///b.txt"}}"#).unwrap();

        assert_eq!(*watched.borrow(), [json!("home:///a.txt")]);
        assert_eq!(changes.borrow().len(), 2);
    }

    #[test]
    fn destroy_closes_and_rejects_requests() {
        let wire = Wire::default();
        let mut conn = Connection::new(wire.clone(), "s");
        conn.request("ping", Value::Null, |_| panic!("dropped callbacks never run")).unwrap();
        conn.destroy();

        assert!(*wire.closed.borrow());
        assert!(!conn.is_open());
        assert_eq!(conn.pending(), 0);
        conn.receive(r#"{"_index": 0}"#).unwrap();
        assert!(conn.request("ping", Value::Null, |_| {}).is_err());
    }

    #[test]
    fn malformed_input_is_an_error() {
        let mut conn = Connection::new(Wire::default(), "s");
        assert!(matches!(conn.receive("not json"), Err(GuiError::Json(_))));
        assert!(conn.receive(r#"{"args": 1}"#).is_err());
    }
}
