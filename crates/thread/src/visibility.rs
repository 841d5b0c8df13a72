use std::collections::HashMap;

use domain::CommentId;

pub trait ScrollViewport {
    fn scroll_offset(&self) -> f64;
    fn scroll_to(&mut self, offset: f64);
}

#[derive(Debug, Default)]
pub struct ReplyVisibility {
    expanded: HashMap<CommentId, bool>,
    saved_offset: Option<f64>,
}

impl ReplyVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, parent: &CommentId) -> bool {
        self.expanded.get(parent).copied().unwrap_or(false)
    }

    /// Flips `parent` and remembers where the viewport was. Call
    /// [`restore_scroll`](Self::restore_scroll) once the new layout is in.
    pub fn toggle(&mut self, parent: &CommentId, viewport: &dyn ScrollViewport) -> bool {
        self.saved_offset = Some(viewport.scroll_offset());
        let entry = self.expanded.entry(parent.clone()).or_insert(false);
        *entry = !*entry;
        *entry
    }

    /// Puts the viewport back where it was before the last toggle. Only the
    /// first call after a toggle does anything.
    pub fn restore_scroll(&mut self, viewport: &mut dyn ScrollViewport) -> bool {
        match self.saved_offset.take() {
            Some(offset) => {
                viewport.scroll_to(offset);
                true
            }
            None => false,
        }
    }

    pub fn toggle_with<V, F>(&mut self, parent: &CommentId, viewport: &mut V, relayout: F) -> bool
    where
        V: ScrollViewport,
        F: FnOnce(&mut V),
    {
        let expanded = self.toggle(parent, &*viewport);
        relayout(&mut *viewport);
        self.restore_scroll(&mut *viewport);
        expanded
    }

    pub fn forget(&mut self, removed: &[CommentId]) {
        for id in removed {
            self.expanded.remove(id);
        }
    }
}
