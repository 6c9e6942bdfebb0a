//! Host editor seam
//!
//! The engine never owns the editing surface. Cursor queries and
//! confirmation prompts go through [`HostEditor`]; lifecycle notifications
//! arrive as [`HostEvent`]s.

use crate::config::ConfirmPolicy;
use std::collections::VecDeque;
use trellis_document::NodeId;

/// Notifications from the host editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Undo,
    Redo,
    /// Fired before the host snapshots the document for its undo stack
    BeforeAddUndo,
    /// Content changed in some way
    NodeChange,
    FocusIn(NodeId),
    Click(NodeId),
}

impl HostEvent {
    /// Events after which content may have been rearranged wholesale
    pub fn rearranges_content(&self) -> bool {
        matches!(self, HostEvent::Undo | HostEvent::Redo | HostEvent::BeforeAddUndo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestructiveAction {
    DeleteColumns { count: usize },
    DeleteRow,
    DeleteGrid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub action: DestructiveAction,
    pub message: String,
}

impl ConfirmRequest {
    pub fn new(action: DestructiveAction) -> Self {
        let message = match &action {
            DestructiveAction::DeleteColumns { count: 1 } => "Delete a column that has content?".to_string(),
            DestructiveAction::DeleteColumns { count } => format!("Delete {} columns that have content?", count),
            DestructiveAction::DeleteRow => "Delete this row and its content?".to_string(),
            DestructiveAction::DeleteGrid => "Delete this grid and its content?".to_string(),
        };
        Self { action, message }
    }
}

pub trait HostEditor {
    /// Ask the user to confirm a destructive action
    fn confirm(&mut self, request: &ConfirmRequest) -> bool;

    /// Node containing the edit cursor
    fn cursor(&self) -> Option<NodeId>;

    fn set_cursor(&mut self, node: Option<NodeId>);
}

/// Host without a user: answers prompts from a queue, then from a policy
#[derive(Debug, Default)]
pub struct HeadlessHost {
    policy: ConfirmPolicy,
    cursor: Option<NodeId>,
    prompts: Vec<ConfirmRequest>,
    answers: VecDeque<bool>,
}

impl HeadlessHost {
    pub fn new(policy: ConfirmPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Queue the answer for the next prompt
    pub fn answer_next(&mut self, accept: bool) {
        self.answers.push_back(accept);
    }

    pub fn prompts(&self) -> &[ConfirmRequest] {
        &self.prompts
    }
}

impl HostEditor for HeadlessHost {
    fn confirm(&mut self, request: &ConfirmRequest) -> bool {
        self.prompts.push(request.clone());
        self.answers
            .pop_front()
            .unwrap_or(self.policy == ConfirmPolicy::Accept)
    }

    fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    fn set_cursor(&mut self, node: Option<NodeId>) {
        self.cursor = node;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_answers_queue_then_policy() {
        let mut host = HeadlessHost::new(ConfirmPolicy::Decline);
        host.answer_next(true);
        let request = ConfirmRequest::new(DestructiveAction::DeleteRow);

        assert!(host.confirm(&request));
        assert!(!host.confirm(&request));
        assert_eq!(host.prompts().len(), 2);
    }

    #[test]
    fn test_confirm_messages() {
        let one = ConfirmRequest::new(DestructiveAction::DeleteColumns { count: 1 });
        let two = ConfirmRequest::new(DestructiveAction::DeleteColumns { count: 2 });
        assert_eq!(one.message, "Delete a column that has content?");
        assert_eq!(two.message, "Delete 2 columns that have content?");
    }
}
