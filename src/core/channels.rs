//! Platform message channels.
//!
//! Every compiled-in feature registers a handler for its channel name in
//! the [`BindingRegistry`] at process start. Dispatch is an exact string
//! match, with no prefixes or wildcards. A lookup miss is answered with an
//! "unhandled" error envelope so the runtime side never waits on a
//! response that will not come.
//!
//! The registry is an explicitly constructed object owned by the process
//! root and passed by reference to whatever needs it; there is no hidden
//! global instance.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::json;
use tracing::{debug, warn};

/// An inbound platform message: channel name plus opaque payload.
#[derive(Debug, Clone)]
pub struct PlatformMessage {
    pub channel: String,
    pub payload: Vec<u8>,
}

/// Sink for the single response a message produces.
pub trait ResponseWriter: Send {
    fn write(&mut self, data: &[u8]);
}

/// Consume-once response handle.
///
/// Every platform message produces exactly one response. `send` consumes
/// the responder; a responder dropped without sending answers with an
/// empty buffer so the posting side is never left waiting.
pub struct Responder {
    writer: Option<Box<dyn ResponseWriter>>,
}

impl Responder {
    pub fn new(writer: Box<dyn ResponseWriter>) -> Self {
        Self { writer: Some(writer) }
    }

    /// Answer with raw bytes and consume the handle.
    pub fn send(mut self, data: &[u8]) {
        if let Some(mut writer) = self.writer.take() {
            writer.write(data);
        }
    }

    /// Answer with a structured JSON error envelope.
    pub fn send_error(self, code: &str, message: &str) {
        let envelope = json!({ "error": { "code": code, "message": message } });
        self.send(envelope.to_string().as_bytes());
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.write(&[]);
        }
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder").field("pending", &self.writer.is_some()).finish()
    }
}

pub type MessageHandler = Box<dyn Fn(&PlatformMessage, Responder) + Send + Sync>;

/// Channel-name → handler table.
#[derive(Default)]
pub struct BindingRegistry {
    handlers: RwLock<HashMap<String, MessageHandler>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a channel. Last registration wins.
    pub fn register(&self, channel: impl Into<String>, handler: MessageHandler) {
        let channel = channel.into();
        debug!("channel registered: {channel}");
        self.handlers.write().unwrap().insert(channel, handler);
    }

    pub fn is_registered(&self, channel: &str) -> bool {
        self.handlers.read().unwrap().contains_key(channel)
    }

    /// Route a message to its handler, or answer with the unhandled
    /// envelope when no handler matches.
    pub fn dispatch(&self, message: &PlatformMessage, responder: Responder) {
        let handlers = self.handlers.read().unwrap();
        match handlers.get(&message.channel) {
            Some(handler) => handler(message, responder),
            None => {
                warn!("no handler for channel \"{}\" ({} bytes)", message.channel, message.payload.len());
                responder.send_error("unhandled", &format!("no handler for channel {}", message.channel));
            }
        }
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.handlers.read().unwrap().keys().cloned().collect();
        f.debug_struct("BindingRegistry").field("channels", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    struct ChannelWriter(mpsc::Sender<Vec<u8>>);

    impl ResponseWriter for ChannelWriter {
        fn write(&mut self, data: &[u8]) {
            self.0.send(data.to_vec()).unwrap();
        }
    }

    fn responder() -> (Responder, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        (Responder::new(Box::new(ChannelWriter(tx))), rx)
    }

    #[test]
    fn registered_handler_receives_message() {
        let registry = BindingRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.register(
            "app/echo",
            Box::new(move |msg, responder| {
                sink.lock().unwrap().push(msg.payload.clone());
                responder.send(&msg.payload);
            }),
        );

        let (responder, rx) = responder();
        let msg = PlatformMessage { channel: "app/echo".into(), payload: b"ping".to_vec() };
        registry.dispatch(&msg, responder);

        assert_eq!(seen.lock().unwrap().as_slice(), &[b"ping".to_vec()]);
        assert_eq!(rx.recv().unwrap(), b"ping".to_vec());
    }

    #[test]
    fn unhandled_channel_gets_error_envelope() {
        let registry = BindingRegistry::new();
        let (responder, rx) = responder();
        let msg = PlatformMessage { channel: "foo/bar".into(), payload: vec![1, 2, 3] };
        registry.dispatch(&msg, responder);

        let reply = rx.recv().unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&reply).unwrap();
        assert_eq!(parsed["error"]["code"], "unhandled");
    }

    #[test]
    fn dropped_responder_still_answers_once() {
        let (responder, rx) = responder();
        drop(responder);
        assert_eq!(rx.recv().unwrap(), Vec::<u8>::new());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_answers_exactly_once() {
        let (responder, rx) = responder();
        responder.send(b"done");
        assert_eq!(rx.recv().unwrap(), b"done".to_vec());
        assert!(rx.try_recv().is_err());
    }
}
