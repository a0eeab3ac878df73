// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Nested input/output context stacks.
//
// A context is a snapshot of the settings in force at one point of the
// assembly script. Pushing clones the parent, so children inherit its values
// at creation time and later sibling mutations never alias. The implicit
// root context exists from construction and is never popped.

use std::path::PathBuf;

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::{DocumentMetadata, PageLabel, PageModifier, Rotation};

/// Settings in force for input (image-side) statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputContext {
    pub source_file: Option<PathBuf>,
    pub rotation: Rotation,
    pub modifier: PageModifier,
}

/// Settings in force for output (document-side) statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputContext {
    pub target_file: Option<PathBuf>,
    pub metadata: DocumentMetadata,
    pub bookmark: Option<String>,
    pub page_label: Option<PageLabel>,
    /// Armed when the bookmark is (re)declared; cleared once the first page
    /// under it has been emitted.
    pub bookmark_pending: bool,
    /// Same emission rule for the page-numbering label.
    pub label_pending: bool,
}

/// A stack of inherited context snapshots.
#[derive(Debug)]
pub struct ContextStack<C> {
    frames: Vec<C>,
}

impl<C: Clone + Default> ContextStack<C> {
    pub fn new() -> Self {
        Self {
            frames: vec![C::default()],
        }
    }

    /// Enter a nested context that starts as a copy of the current one.
    pub fn push(&mut self) {
        let top = self.top().clone();
        self.frames.push(top);
    }

    /// Leave the current context, restoring its parent. The root context
    /// cannot be popped.
    pub fn pop(&mut self) -> Result<()> {
        if self.frames.len() <= 1 {
            return Err(BindwerkError::StackUnderflow);
        }
        self.frames.pop();
        Ok(())
    }

    pub fn top(&self) -> &C {
        self.frames.last().expect("stack always holds the root")
    }

    pub fn top_mut(&mut self) -> &mut C {
        self.frames.last_mut().expect("stack always holds the root")
    }

    /// Nesting depth including the root.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl<C: Clone + Default> Default for ContextStack<C> {
    fn default() -> Self {
        Self::new()
    }
}
