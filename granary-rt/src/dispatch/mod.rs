//! Name-indexed method dispatch for actor types.
//!
//! A build-time generator (an external collaborator) emits one
//! [`MethodTable`] per actor type and registers it before first use; the
//! process-wide [`DispatcherRegistry`] then routes framed invocations by
//! `(type name, method name)`.

pub mod registry;

pub use registry::{
    ActorDispatcher, DispatchError, DispatcherRegistry, MethodResult, MethodTable,
    TypedDispatcher,
};
