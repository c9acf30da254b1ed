//! Model resolution and the load state machine that drives a model from an
//! on-disk path to an activated, request-serving entry.

pub mod entry;
pub mod error;
pub mod registry;
pub mod resolver;

pub use entry::{ActivationWaiter, ModelEntry, ModelInfo, ModelState};
pub use error::RegistryError;
pub use registry::{ManagementTransport, Registry};
pub use resolver::{ModelSource, Resolver, ResolvedModel};
