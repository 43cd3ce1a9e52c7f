//! `TextDocument`: an open file's text content plus the addins (diagnostics
//! providers, formatters, ...) hosted against it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::instrument;

use crate::context::Context;
use crate::errors::Result;
use crate::service::{Addin, ExtensionSet};

/// An addin bound to one open [`TextDocument`] — a diagnostics provider, a
/// code-formatter, a symbol outline provider, and so on. Concrete providers
/// live outside this crate; this only defines the seam they plug into.
pub trait TextDocumentAddin: Send + Sync {
    /// Stable identifier, unique within the module that registers this
    /// addin. Used as the [`ExtensionSet`] sort/lookup key.
    fn id(&self) -> &str;

    /// Higher runs first among addins attached to the same document.
    fn priority(&self) -> i32 {
        0
    }

    /// Called once when the addin is attached to a document, before any
    /// other method.
    fn load(&self, _document: &TextDocument) -> Result<()> {
        Ok(())
    }

    /// Called when the document's content changes.
    fn content_changed(&self, _document: &TextDocument) {}
}

/// An open, in-memory text file tracked by a [`Context`].
pub struct TextDocument {
    path: PathBuf,
    content: RwLock<String>,
    /// Monotonically increasing revision, bumped on every edit; addins can
    /// use this to cheaply detect staleness without diffing content.
    revision: std::sync::atomic::AtomicU64,
    addins: ExtensionSet<dyn TextDocumentAddin>,
}

impl TextDocument {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Arc<Self> {
        Arc::new(TextDocument {
            path: path.into(),
            content: RwLock::new(content.into()),
            revision: std::sync::atomic::AtomicU64::new(0),
            addins: ExtensionSet::new(),
        })
    }

    /// Load `path`'s content from disk.
    pub fn open(path: &Path) -> Result<Arc<Self>> {
        let content = std::fs::read_to_string(path)?;
        Ok(TextDocument::new(path, content))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> String {
        self.content.read().expect("document lock poisoned").clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn addins(&self) -> &ExtensionSet<dyn TextDocumentAddin> {
        &self.addins
    }

    #[instrument(skip(self, content))]
    pub fn set_content(self: &Arc<Self>, content: impl Into<String>) {
        *self.content.write().expect("document lock poisoned") = content.into();
        self.revision
            .fetch_add(1, std::sync::atomic::Ordering::AcqRel);
        for addin in self.addins.snapshot() {
            addin.content_changed(self);
        }
    }

    pub fn attach_addin(self: &Arc<Self>, module: impl AsRef<str>, addin: Arc<dyn TextDocumentAddin>) -> Result<()> {
        addin.load(self)?;
        self.addins.insert(module, addin);
        Ok(())
    }
}

impl Addin for dyn TextDocumentAddin {
    fn id(&self) -> &str {
        TextDocumentAddin::id(self)
    }
    fn priority(&self) -> i32 {
        TextDocumentAddin::priority(self)
    }
}

/// A service tracking every open `TextDocument` for a [`Context`].
pub struct TextDocumentManager {
    context: std::sync::Weak<Context>,
    documents: RwLock<Vec<Arc<TextDocument>>>,
}

impl TextDocumentManager {
    pub fn new(context: &Arc<Context>) -> Self {
        TextDocumentManager {
            context: Arc::downgrade(context),
            documents: RwLock::new(Vec::new()),
        }
    }

    pub fn context(&self) -> Option<Arc<Context>> {
        self.context.upgrade()
    }

    pub fn open(&self, path: &Path) -> Result<Arc<TextDocument>> {
        if let Some(existing) = self.find(path) {
            return Ok(existing);
        }
        let doc = TextDocument::open(path)?;
        self.documents.write().expect("manager lock poisoned").push(Arc::clone(&doc));
        Ok(doc)
    }

    pub fn find(&self, path: &Path) -> Option<Arc<TextDocument>> {
        self.documents
            .read()
            .expect("manager lock poisoned")
            .iter()
            .find(|d| d.path() == path)
            .cloned()
    }

    pub fn close(&self, path: &Path) {
        self.documents
            .write()
            .expect("manager lock poisoned")
            .retain(|d| d.path() != path);
    }
}

impl crate::service::Service for TextDocumentManager {
    fn name(&self) -> &'static str {
        "text-document-manager"
    }
}
