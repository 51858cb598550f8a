use std::rc::Rc;

use crate::anim::player::PlayerRegistry;
use crate::host::document::Document;
use crate::reflow::Reflow;
use crate::style::sheets::SheetCache;

/// The composition root: one document, one scheduler, the player registry
/// pumped by the scheduler's write phase, and the stylesheet cache.
///
/// Cheap to clone (shared handles). All components are injected rather
/// than ambient, so tests can build a stage, drive [`Stage::tick`]
/// manually, and never touch a real display surface.
#[derive(Clone)]
pub struct Stage {
    document: Rc<Document>,
    reflow: Rc<Reflow>,
    players: Rc<PlayerRegistry>,
    sheets: Rc<SheetCache>,
}

impl Stage {
    /// A stage over a fresh, empty document.
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    /// A stage over an existing document.
    pub fn with_document(document: Rc<Document>) -> Self {
        let reflow = Reflow::new();
        let players = PlayerRegistry::attach(&reflow, &document);
        Self {
            document,
            reflow,
            players,
            sheets: Rc::new(SheetCache::default()),
        }
    }

    /// The shared document.
    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    /// The frame scheduler.
    pub fn reflow(&self) -> &Rc<Reflow> {
        &self.reflow
    }

    /// The stylesheet lookup cache.
    pub fn sheet_cache(&self) -> &Rc<SheetCache> {
        &self.sheets
    }

    pub(crate) fn players(&self) -> &Rc<PlayerRegistry> {
        &self.players
    }

    /// Drive one scheduler tick; the embedder calls this from its
    /// display-sync callback.
    pub fn tick(&self, now_ms: f64) {
        self.reflow.tick(now_ms);
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}
