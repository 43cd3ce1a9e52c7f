//! `Intent` dispatch bus: a tagged-value message routed through a
//! priority-ordered set of handler addins.
//!
//! Ported from the original's `foundry-intent-manager.c`: every matching
//! handler is collected into a plain `Vec` up front (so a concurrent
//! plugin-unload during dispatch can't affect the handler list a dispatch is
//! iterating), handlers run in priority order, and a handler declining with
//! `NotSupported` just means "try the next one" rather than aborting
//! dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::errors::{FoundryError, Result};
use crate::plugin::PluginEngine;
use crate::scheduler::Cancellable;
use crate::service::Addin;

/// A loosely typed value carried by an `Intent` (or resolved by a handler's
/// `dispatch`), mirroring the original's `GVariant`-backed key-value bag.
#[derive(Debug, Clone)]
pub enum IntentValue {
    Bool(bool),
    Str(String),
    StringList(Vec<String>),
    Object(HashMap<String, IntentValue>),
    /// An opaque, self-describing value for kinds none of the above cover,
    /// mirroring a raw `GVariant` the original would pass through unparsed.
    Variant(serde_json::Value),
}

impl IntentValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IntentValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            IntentValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            IntentValue::StringList(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, IntentValue>> {
        match self {
            IntentValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<&serde_json::Value> {
        match self {
            IntentValue::Variant(v) => Some(v),
            _ => None,
        }
    }
}

/// A dispatchable message: a name plus a bag of typed parameters.
#[derive(Debug, Clone)]
pub struct Intent {
    pub name: String,
    params: HashMap<String, IntentValue>,
}

impl Intent {
    pub fn new(name: impl Into<String>) -> Self {
        Intent {
            name: name.into(),
            params: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: IntentValue) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&IntentValue> {
        self.params.get(key)
    }

    /// Build the `open-file` intent: open `file`, optionally declaring its
    /// `content_type` for handlers that pick a viewer by type rather than
    /// extension.
    pub fn open_file(file: impl Into<String>, content_type: Option<String>) -> Self {
        let mut intent = Intent::new("open-file").with("file", IntentValue::Str(file.into()));
        if let Some(content_type) = content_type {
            intent = intent.with("content-type", IntentValue::Str(content_type));
        }
        intent
    }

    /// Build the `web` intent: open `uri` in a browser-like handler.
    pub fn web(uri: impl Into<String>) -> Self {
        Intent::new("web").with("uri", IntentValue::Str(uri.into()))
    }

    /// Build the `action` intent: invoke a named action with an optional
    /// parameter.
    pub fn action(name: impl Into<String>, parameter: Option<IntentValue>) -> Self {
        let mut intent = Intent::new("action").with("name", IntentValue::Str(name.into()));
        if let Some(parameter) = parameter {
            intent = intent.with("parameter", parameter);
        }
        intent
    }
}

/// A plugin-supplied handler capable of acting on an [`Intent`].
///
/// Declares its own `id`/`priority` (rather than requiring `Addin` as a
/// supertrait) so that `dyn IntentHandler` can implement `Addin` directly
/// below without needing trait-object upcasting.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    fn id(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    /// Attempt to handle `intent`, resolving to whatever value the handler
    /// produced. Return `Err(FoundryError::NotSupported)` to decline without
    /// aborting dispatch to the remaining handlers.
    async fn handle(&self, intent: &Intent, cancellable: Cancellable) -> Result<IntentValue>;
}

/// Dispatches `Intent`s to every matching [`IntentHandler`] registered in
/// `engine`, in priority order.
pub struct IntentBus {
    engine: Arc<PluginEngine>,
}

impl IntentBus {
    pub fn new(engine: Arc<PluginEngine>) -> Self {
        IntentBus { engine }
    }

    /// Dispatch `intent` to every registered `IntentHandler`, in priority
    /// order, continuing past `NotSupported` rejections.
    ///
    /// Resolves to the first handler's resolved value. If every handler
    /// declined, returns the first non-`NotSupported` error encountered, or
    /// `NotSupported` if none occurred.
    #[instrument(skip(self, cancellable), fields(intent = %intent.name))]
    pub async fn dispatch(&self, intent: &Intent, cancellable: Cancellable) -> Result<IntentValue> {
        let handlers = self
            .engine
            .extension_set::<dyn IntentHandler>("Intent-Handler", &intent.name)?
            .snapshot();

        let mut first_error: Option<FoundryError> = None;
        for handler in handlers {
            match handler.handle(intent, cancellable.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_not_supported() => continue,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        Err(first_error.unwrap_or(FoundryError::NotSupported))
    }
}

impl Addin for dyn IntentHandler {
    fn id(&self) -> &str {
        IntentHandler::id(self)
    }
    fn priority(&self) -> i32 {
        IntentHandler::priority(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::plugin::{addin_factory_result, AddinFactory, Capability};

    struct AcceptingHandler;
    #[async_trait]
    impl IntentHandler for AcceptingHandler {
        fn id(&self) -> &str {
            "accepting"
        }
        async fn handle(&self, _intent: &Intent, _cancellable: Cancellable) -> Result<IntentValue> {
            Ok(IntentValue::Variant(serde_json::json!(42)))
        }
    }

    struct DecliningHandler;
    #[async_trait]
    impl IntentHandler for DecliningHandler {
        fn id(&self) -> &str {
            "declining"
        }
        fn priority(&self) -> i32 {
            10
        }
        async fn handle(&self, _intent: &Intent, _cancellable: Cancellable) -> Result<IntentValue> {
            Err(FoundryError::NotSupported)
        }
    }

    fn engine_with(factories: Vec<(&'static str, i32, AddinFactory)>) -> Arc<PluginEngine> {
        let engine = PluginEngine::new();
        for (name, priority, factory) in factories {
            let mut map: HashMap<String, AddinFactory> = HashMap::new();
            map.insert("Intent-Handler".into(), factory);
            engine.load_module(
                name,
                priority,
                vec![Capability {
                    interface: "Intent-Handler".into(),
                    criterion: "*".into(),
                }],
                map,
            );
        }
        Arc::new(engine)
    }

    #[tokio::test]
    async fn lower_priority_handler_resolves_after_higher_priority_declines() {
        let called = Arc::new(AtomicBool::new(false));
        let called2 = Arc::clone(&called);
        let engine = engine_with(vec![
            (
                "declining-plugin",
                10,
                Arc::new(move || {
                    addin_factory_result(Arc::new(DecliningHandler) as Arc<dyn IntentHandler>)
                }),
            ),
            (
                "accepting-plugin",
                0,
                Arc::new(move || {
                    called2.store(true, Ordering::SeqCst);
                    addin_factory_result(Arc::new(AcceptingHandler) as Arc<dyn IntentHandler>)
                }),
            ),
        ]);
        let bus = IntentBus::new(engine);
        let intent = Intent::open_file("/tmp/a.rs", None);
        let result = bus.dispatch(&intent, Cancellable::new()).await.unwrap();
        assert_eq!(result.as_variant().and_then(|v| v.as_i64()), Some(42));
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn no_handlers_returns_not_supported() {
        let engine = Arc::new(PluginEngine::new());
        let bus = IntentBus::new(engine);
        let intent = Intent::web("https://example.com");
        let err = bus.dispatch(&intent, Cancellable::new()).await.unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn intent_constructors_populate_expected_params() {
        let intent = Intent::action(
            "toggle-sidebar",
            Some(IntentValue::Str("left".to_string())),
        );
        assert_eq!(intent.get("name").unwrap().as_str(), Some("toggle-sidebar"));
        assert_eq!(intent.get("parameter").unwrap().as_str(), Some("left"));
    }

    #[test]
    fn open_file_carries_optional_content_type() {
        let intent = Intent::open_file("/tmp/a.rs", Some("text/rust".to_string()));
        assert_eq!(intent.get("file").unwrap().as_str(), Some("/tmp/a.rs"));
        assert_eq!(
            intent.get("content-type").unwrap().as_str(),
            Some("text/rust")
        );
    }
}
