// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history.
//!
//! Entries are kept oldest first. `reverse_index` counts how many of the
//! newest entries are currently undone.

use crate::commands::Command;
use crate::error::Result;
use crate::state::SceneState;
use std::fmt;
use vpe_graph::NodeId;

/// A finished command with the selection around it
pub struct HistoryEntry {
    /// The command
    pub command: Box<dyn Command>,
    /// Selection when the command started
    pub selection_before: Vec<NodeId>,
    /// Selection when the command ended
    pub selection_after: Vec<NodeId>,
}

/// Bounded undo stack with a redo tail
pub struct UndoHistory {
    entries: Vec<HistoryEntry>,
    reverse_index: usize,
    max_depth: usize,
}

impl fmt::Debug for UndoHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoHistory")
            .field("entries", &self.descriptions())
            .field("reverse_index", &self.reverse_index)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl UndoHistory {
    /// Create an empty history keeping at most `max_depth` entries
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: Vec::new(),
            reverse_index: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// Record a finished command, dropping the redo tail
    pub fn push(&mut self, command: Box<dyn Command>, selection_before: Vec<NodeId>, selection_after: Vec<NodeId>) {
        let keep = self.entries.len() - self.reverse_index;
        self.entries.truncate(keep);
        self.reverse_index = 0;
        self.entries.push(HistoryEntry {
            command,
            selection_before,
            selection_after,
        });
        if self.entries.len() > self.max_depth {
            self.entries.remove(0);
        }
    }

    /// Whether there is something to undo
    pub fn can_undo(&self) -> bool {
        self.reverse_index < self.entries.len()
    }

    /// Whether there is something to redo
    pub fn can_redo(&self) -> bool {
        self.reverse_index > 0
    }

    /// Undo the newest applied entry. Returns `false` when there is none.
    pub fn undo(&mut self, state: &mut SceneState) -> Result<bool> {
        if !self.can_undo() {
            return Ok(false);
        }
        let index = self.entries.len() - self.reverse_index - 1;
        let entry = &mut self.entries[index];
        tracing::debug!("Undo {}", entry.command.description());
        entry.command.undo(state)?;
        state.set_selection(&entry.selection_before);
        self.reverse_index += 1;
        Ok(true)
    }

    /// Redo the oldest undone entry. Returns `false` when there is none.
    pub fn redo(&mut self, state: &mut SceneState) -> Result<bool> {
        if !self.can_redo() {
            return Ok(false);
        }
        let index = self.entries.len() - self.reverse_index;
        let entry = &mut self.entries[index];
        tracing::debug!("Redo {}", entry.command.description());
        entry.command.redo(state)?;
        state.set_selection(&entry.selection_after);
        self.reverse_index -= 1;
        Ok(true)
    }

    /// Description of what undo would revert
    pub fn undo_description(&self) -> String {
        if self.can_undo() {
            let index = self.entries.len() - self.reverse_index - 1;
            format!("Undo {}", self.entries[index].command.description())
        } else {
            "Nothing to undo".to_string()
        }
    }

    /// Description of what redo would re-apply
    pub fn redo_description(&self) -> String {
        if self.can_redo() {
            let index = self.entries.len() - self.reverse_index;
            format!("Redo {}", self.entries[index].command.description())
        } else {
            "Nothing to redo".to_string()
        }
    }

    /// Descriptions of every entry, oldest first
    pub fn descriptions(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.command.description()).collect()
    }

    /// Number of entries, undone ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of undone entries
    pub fn reverse_index(&self) -> usize {
        self.reverse_index
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.reverse_index = 0;
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::state;
    use crate::commands::CommandInput;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Command for Recorder {
        fn description(&self) -> String {
            self.name.to_string()
        }

        fn exec(&mut self, _state: &mut SceneState, _input: &CommandInput) -> Result<()> {
            Ok(())
        }

        fn undo(&mut self, _state: &mut SceneState) -> Result<()> {
            self.log.borrow_mut().push(format!("undo {}", self.name));
            Ok(())
        }

        fn redo(&mut self, _state: &mut SceneState) -> Result<()> {
            self.log.borrow_mut().push(format!("redo {}", self.name));
            Ok(())
        }
    }

    fn history_of(names: &[&'static str], log: &Rc<RefCell<Vec<String>>>) -> UndoHistory {
        let mut history = UndoHistory::new(10);
        for name in names {
            let command = Recorder {
                name,
                log: Rc::clone(log),
            };
            history.push(Box::new(command), Vec::new(), Vec::new());
        }
        history
    }

    #[test]
    fn test_undo_redo_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut history = history_of(&["a", "b", "c"], &log);
        let mut state = state();

        assert!(history.undo(&mut state).unwrap());
        assert!(history.undo(&mut state).unwrap());
        assert!(history.redo(&mut state).unwrap());
        assert_eq!(*log.borrow(), vec!["undo c", "undo b", "redo b"]);
        assert_eq!(history.undo_description(), "Undo b");
        assert_eq!(history.redo_description(), "Redo c");
    }

    #[test]
    fn test_out_of_bounds_is_a_no_op() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut history = history_of(&["a"], &log);
        let mut state = state();

        assert!(!history.redo(&mut state).unwrap());
        assert!(history.undo(&mut state).unwrap());
        assert!(!history.undo(&mut state).unwrap());
        assert_eq!(history.undo_description(), "Nothing to undo");
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_push_truncates_redo_tail() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut history = history_of(&["a", "b", "c"], &log);
        let mut state = state();

        history.undo(&mut state).unwrap();
        history.undo(&mut state).unwrap();
        history.push(
            Box::new(Recorder {
                name: "d",
                log: Rc::clone(&log),
            }),
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(history.descriptions(), vec!["a", "d"]);
        assert_eq!(history.reverse_index(), 0);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_depth_is_bounded() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut history = UndoHistory::new(2);
        for name in ["a", "b", "c"] {
            history.push(
                Box::new(Recorder {
                    name,
                    log: Rc::clone(&log),
                }),
                Vec::new(),
                Vec::new(),
            );
        }
        assert_eq!(history.descriptions(), vec!["b", "c"]);
    }
}
