use std::rc::Rc;

use super::node::NodeId;
use super::op::OpType;

/// A single document change, delivered to the change callback while the tree
/// is already in its post-mutation state.
///
/// For inserts and moves, `before_id` names the element now immediately after
/// the affected node (`NONE` = at end), so a view can mirror the mutation
/// without rescanning the tree. For removes the triple describes the node's
/// former location. Parameter events carry the owning item in `parent_id`;
/// scalar and transaction events carry all-zero ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub op: OpType,
    pub id: NodeId,
    pub parent_id: NodeId,
    pub before_id: NodeId,
}

impl ChangeEvent {
    pub(crate) fn scalar(op: OpType) -> Self {
        Self {
            op,
            id: NodeId::NONE,
            parent_id: NodeId::NONE,
            before_id: NodeId::NONE,
        }
    }

    pub(crate) fn node(op: OpType, id: NodeId, parent_id: NodeId, before_id: NodeId) -> Self {
        Self {
            op,
            id,
            parent_id,
            before_id,
        }
    }
}

/// Per-operation notification slot.
pub(crate) type ChangeCallback = Rc<dyn Fn(&ChangeEvent)>;

/// Coarse "something changed, refresh the toolbar" notification slot.
pub(crate) type StateCallback = Rc<dyn Fn()>;
