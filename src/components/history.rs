use crate::edit_state::EditState;

// ============================================================================
// HISTORY STACK — linear undo/redo over EditState snapshots
// ============================================================================

/// One snapshot plus the label shown in history listings.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub state: EditState,
    pub description: String,
}

/// Linear undo/redo history: an ordered sequence of snapshots and a cursor.
///
/// The cursor is `None` only while the sequence is empty. Pushing after an
/// undo discards everything beyond the cursor, so history never branches.
#[derive(Clone, Debug)]
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
    /// Oldest entries are pruned once the sequence grows past this.
    max_len: Option<usize>,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStack {
    /// Unbounded history.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            max_len: None,
        }
    }

    /// History holding at most `max_len` snapshots (minimum 1).
    pub fn with_capacity_limit(max_len: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            max_len: Some(max_len.max(1)),
        }
    }

    pub fn push(&mut self, state: EditState, description: impl Into<String>) {
        let keep = self.cursor.map_or(0, |i| i + 1);
        self.entries.truncate(keep);
        self.entries.push(HistoryEntry {
            state,
            description: description.into(),
        });
        self.prune();
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Step back one snapshot. `None` when already at the first entry (or empty);
    /// the cursor does not move in that case.
    pub fn undo(&mut self) -> Option<&EditState> {
        match self.cursor {
            Some(i) if i > 0 => {
                self.cursor = Some(i - 1);
                Some(&self.entries[i - 1].state)
            }
            _ => None,
        }
    }

    /// Step forward one snapshot. `None` when nothing was undone.
    pub fn redo(&mut self) -> Option<&EditState> {
        match self.cursor {
            Some(i) if i + 1 < self.entries.len() => {
                self.cursor = Some(i + 1);
                Some(&self.entries[i + 1].state)
            }
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&EditState> {
        self.cursor.map(|i| &self.entries[i].state)
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(i) if i + 1 < self.entries.len())
    }

    /// Description of the edit that `undo()` would revert.
    pub fn undo_description(&self) -> Option<&str> {
        match self.cursor {
            Some(i) if i > 0 => Some(self.entries[i].description.as_str()),
            _ => None,
        }
    }

    /// Description of the edit that `redo()` would reapply.
    pub fn redo_description(&self) -> Option<&str> {
        match self.cursor {
            Some(i) => self.entries.get(i + 1).map(|e| e.description.as_str()),
            None => None,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn index(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Only called right after a push, when the cursor is about to move to the
    /// new last entry, so dropping from the front never strands it.
    fn prune(&mut self) {
        if let Some(max) = self.max_len
            && self.entries.len() > max
        {
            let excess = self.entries.len() - max;
            self.entries.drain(..excess);
        }
    }
}
