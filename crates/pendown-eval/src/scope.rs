//! Chained lexical environment.
//!
//! Frames form a stack; each frame also records its lexical parent so a
//! procedure body can be chained to the frame of the block that defines it
//! rather than to its caller. Lookup follows the parent links, innermost
//! first.

use crate::block::BlockId;
use crate::value::TypedValue;
use std::collections::BTreeMap;

/// One lexical level's bindings.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Block whose execution created this frame; `None` for the global frame.
    pub owner: Option<BlockId>,
    parent: Option<usize>,
    bindings: BTreeMap<String, TypedValue>,
}

impl Frame {
    fn new(owner: Option<BlockId>, parent: Option<usize>) -> Self {
        Self {
            owner,
            parent,
            bindings: BTreeMap::new(),
        }
    }

    pub fn bindings(&self) -> &BTreeMap<String, TypedValue> {
        &self.bindings
    }
}

/// Scoped variable environment with push/pop semantics.
///
/// The bottom frame is the host's global frame; it is never popped and may
/// be seeded before a run.
#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Scope {
    /// Create a scope holding only the global frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(None, None)],
        }
    }

    /// Push a frame chained to the current top frame.
    pub fn push(&mut self, owner: BlockId) {
        let parent = self.frames.len() - 1;
        self.push_lexical(owner, parent);
    }

    /// Push a frame chained to an explicit outer frame.
    pub fn push_lexical(&mut self, owner: BlockId, parent: usize) {
        let parent = parent.min(self.frames.len() - 1);
        self.frames.push(Frame::new(Some(owner), Some(parent)));
    }

    /// Discard the top frame. The global frame is never removed.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames, the global frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn top(&self) -> usize {
        self.frames.len() - 1
    }

    /// Frame indices from the top outward along the lexical chain.
    fn chain(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(self.top()), move |&i| self.frames[i].parent)
    }

    /// Owner of the current frame.
    pub fn current_owner(&self) -> Option<BlockId> {
        self.frames[self.top()].owner
    }

    /// Nearest frame on the lexical chain owned by `owner`.
    pub fn frame_of(&self, owner: BlockId) -> Option<usize> {
        self.chain().find(|&i| self.frames[i].owner == Some(owner))
    }

    /// Bind `name` in the current frame, shadowing any outer binding.
    pub fn declare(&mut self, name: &str, value: TypedValue) {
        let top = self.top();
        self.frames[top].bindings.insert(name.to_string(), value);
    }

    /// Update the nearest frame that declares `name`; declare it in the
    /// current frame if no frame does.
    pub fn assign(&mut self, name: &str, value: TypedValue) {
        let target = self
            .chain()
            .find(|&i| self.frames[i].bindings.contains_key(name))
            .unwrap_or_else(|| self.top());
        self.frames[target].bindings.insert(name.to_string(), value);
    }

    /// Look a name up, innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<&TypedValue> {
        self.chain().find_map(|i| self.frames[i].bindings.get(name))
    }

    /// True if the current frame itself binds `name`.
    pub fn is_local(&self, name: &str) -> bool {
        self.frames[self.top()].bindings.contains_key(name)
    }

    /// Bindings of the global frame.
    pub fn globals(&self) -> &BTreeMap<String, TypedValue> {
        self.frames[0].bindings()
    }

    /// Every visible binding, inner frames shadowing outer ones.
    pub fn snapshot(&self) -> BTreeMap<String, TypedValue> {
        let mut visible = BTreeMap::new();
        for i in self.chain() {
            for (name, value) in &self.frames[i].bindings {
                visible
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        visible
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
