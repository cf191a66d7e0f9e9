use crate::types::Stroke;

/// Linear stroke history of one session.
///
/// `committed` replays in order to rebuild the surface. `undone` is a stack
/// whose last element is the most recently undone stroke. Undo and redo are
/// shared by everyone in the session, not scoped per author.
#[derive(Debug, Default, Clone)]
pub struct StrokeStore {
    committed: Vec<Stroke>,
    undone: Vec<Stroke>,
}

impl StrokeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any forward action invalidates the redo history.
    pub fn append(&mut self, stroke: Stroke) {
        self.committed.push(stroke);
        self.undone.clear();
    }

    pub fn undo(&mut self) -> bool {
        match self.committed.pop() {
            Some(stroke) => {
                self.undone.push(stroke);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.undone.pop() {
            Some(stroke) => {
                self.committed.push(stroke);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.undone.clear();
    }

    pub fn replace(&mut self, strokes: Vec<Stroke>) {
        self.committed = strokes;
        self.undone.clear();
    }

    pub fn snapshot(&self) -> &[Stroke] {
        &self.committed
    }

    pub fn undone(&self) -> &[Stroke] {
        &self.undone
    }
}
