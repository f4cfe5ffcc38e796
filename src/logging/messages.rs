//! Persistent messages attached to nodes
//!
//! Unlike recorded log entries, a persistent message stays attached to its node
//! until the token that created it is dropped. The editor shows them on the node.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::factory::NodeLogger;
use crate::nodes::{NodeId, NodePath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMessage {
    pub id: u64,
    pub node: NodeId,
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Default)]
struct BoardState {
    next_id: u64,
    messages: BTreeMap<u64, NodeMessage>,
}

/// Shared board of persistent node messages
#[derive(Debug, Clone, Default)]
pub struct MessageBoard {
    state: Arc<Mutex<BoardState>>,
}

impl MessageBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a message to a node until the returned token is dropped
    pub fn add(&self, node: NodeId, severity: Severity, text: impl Into<String>) -> MessageToken {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.messages.insert(
            id,
            NodeMessage {
                id,
                node,
                severity,
                text: text.into(),
            },
        );
        MessageToken {
            board: self.clone(),
            id,
        }
    }

    /// All messages, in insertion order
    pub fn messages(&self) -> Vec<NodeMessage> {
        self.lock().messages.values().cloned().collect()
    }

    pub fn messages_for(&self, node: NodeId) -> Vec<NodeMessage> {
        self.lock()
            .messages
            .values()
            .filter(|message| message.node == node)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.lock().messages.remove(&id);
    }
}

/// Keeps a persistent message alive; dropping it removes the message
pub struct MessageToken {
    board: MessageBoard,
    id: u64,
}

impl MessageToken {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for MessageToken {
    fn drop(&mut self) {
        self.board.remove(self.id);
    }
}

impl fmt::Debug for MessageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageToken").field(&self.id).finish()
    }
}

/// Reports a structural usage error on every enclosing node of a subtree
///
/// Used when a node detects it is nested inside another node of the same kind.
/// The error is placed on each node of the path except the outermost one,
/// reported once, and withdrawn when the diagnostic is cleared or dropped.
#[derive(Debug)]
pub struct SubtreeDiagnostic {
    board: MessageBoard,
    logger: Option<NodeLogger>,
    tokens: Vec<MessageToken>,
}

impl SubtreeDiagnostic {
    pub fn new(board: MessageBoard) -> Self {
        Self {
            board,
            logger: None,
            tokens: Vec::new(),
        }
    }

    /// Also record reported errors through `logger`
    pub fn with_logger(mut self, logger: NodeLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Report `text` along `path`. Returns false if a report is already active.
    pub fn report(&mut self, path: &NodePath, severity: Severity, text: &str) -> bool {
        if self.is_active() {
            return false;
        }
        self.tokens = path
            .without_root()
            .map(|node| self.board.add(node, severity, text))
            .collect();
        if let Some(logger) = &self.logger {
            match severity {
                Severity::Error => logger.error(text),
                Severity::Warning => logger.warn(text),
                Severity::Info => logger.info(text),
            }
        }
        self.is_active()
    }

    pub fn is_active(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Withdraw every message of the active report
    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}
