//! Node context injection
//!
//! Many nodes share one thread in the simulator, so the acting node changes
//! on every callback. [`NodeContextGuard`] records it in thread-local storage
//! and enters a `node` span, so every event logged while the guard lives
//! carries the node id and role.

use std::cell::RefCell;

use gradient_core::{NodeId, Role};
use tracing::span::EnteredSpan;

/// Node context stored in thread-local storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContextData {
    pub node: NodeId,
    pub role: Role,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// Creating the guard sets the acting node for the current thread and
/// enters a `node` span. Dropping it exits the span and restores the
/// previous context.
///
/// # Example
///
/// ```rust
/// use gradient_core::{NodeId, Role};
/// use gradient_logging::NodeContextGuard;
///
/// {
///     let _guard = NodeContextGuard::new(NodeId(4), Role::Sensor);
///     assert_eq!(NodeContextGuard::current_node(), Some(NodeId(4)));
///     tracing::debug!("Accepted BUILD");
/// }
/// assert_eq!(NodeContextGuard::current_node(), None);
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
    _span: EnteredSpan,
}

impl NodeContextGuard {
    /// Act as `node` until the guard is dropped
    pub fn new(node: NodeId, role: Role) -> Self {
        let previous = NODE_CONTEXT.with(|ctx| ctx.replace(Some(NodeContextData { node, role })));
        let span = tracing::info_span!("node", id = %node, role = %role).entered();
        Self {
            previous,
            _span: span,
        }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| *ctx.borrow())
    }

    /// Get the acting node (if set)
    pub fn current_node() -> Option<NodeId> {
        Self::current().map(|ctx| ctx.node)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = previous);
    }
}

/// Run a block as a node
///
/// # Example
///
/// ```ignore
/// with_node_context!(NodeId(3), Role::Sensor, {
///     tracing::info!("Forwarded DATA");
/// });
/// ```
#[macro_export]
macro_rules! with_node_context {
    ($node:expr, $role:expr, $body:block) => {{
        let _guard = $crate::context::NodeContextGuard::new($node, $role);
        $body
    }};
}
