/// Capability sandbox
///
/// Rule blocks and addin setup hooks never see the parser itself. They run
/// against a [`Scope`]: the record primitives (`on`/`set`/`get`/`stop`/...)
/// plus exactly the operations compiled into the current [`Surface`].
///
/// # Architecture
///
/// - `receiver.rs`: the [`Receiver`] trait and the closure-backed [`Operations`]
/// - `surface.rs`: immutable compiled capability set (name → receiver)
/// - `context.rs`: mutable binding table, lazy recompilation, `run`
/// - `scope.rs`: the per-run surface instance handed to blocks
///
/// Any call to an operation missing from the surface fails with
/// [`DelogError::Capability`](crate::error::DelogError::Capability) and
/// poisons the in-progress record, so the parse aborts even if the caller
/// drops the error.

pub mod context;
pub mod receiver;
pub mod scope;
pub mod surface;

pub use context::Context;
pub use receiver::{OperationFn, Operations, Receiver};
pub use scope::Scope;
pub use surface::Surface;
