//! Host scheduling and observation primitives consumed by the engine.

use crate::config::VisibilityOptions;
use crate::error::ReadifyError;
use crate::tree::NodeId;

/// Event-loop and observer services supplied by the embedding host.
///
/// The engine requests callbacks; the host later drives them by calling
/// [`Engine::run_microtask`](crate::Engine::run_microtask),
/// [`Engine::on_frame`](crate::Engine::on_frame),
/// [`Engine::on_visibility`](crate::Engine::on_visibility) and
/// [`Engine::on_changes`](crate::Engine::on_changes).
pub trait Host {
    /// Ask for one `run_microtask` call before the next frame.
    fn queue_microtask(&mut self);

    /// Ask for one `on_frame` call at the next render frame.
    fn request_frame(&mut self);

    /// Monotonic clock in milliseconds.
    fn now_ms(&self) -> f64;

    /// Start reporting when `node` intersects the viewport.
    fn observe_visibility(
        &mut self,
        node: NodeId,
        options: &VisibilityOptions,
    ) -> Result<(), ReadifyError>;

    fn unobserve_visibility(&mut self, node: NodeId);

    /// Start delivering change records for the subtree of `root`.
    fn observe_changes(&mut self, root: NodeId) -> Result<(), ReadifyError>;

    /// Drop every visibility and change subscription.
    fn disconnect(&mut self);
}
