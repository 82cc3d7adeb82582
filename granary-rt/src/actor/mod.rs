//! Virtual actors: the actor trait, activations, the factory, and
//! supervision directives.

pub mod activation;
pub mod factory;
pub mod supervision;
pub mod traits;

pub use activation::{Activation, InvokeError};
pub use factory::{ActorCatalog, ActorFactory, FactoryError};
pub use supervision::{ChildFailureContext, SupervisionDirective};
pub use traits::{ActivationContext, ActorError, AsAny, VirtualActor};
