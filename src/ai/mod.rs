pub mod chat;
pub mod prompt;
pub mod provider;
pub mod registry;

pub use provider::{ChatProvider, FragmentStream, ProviderDescriptor, ProviderKind};
pub use registry::{ProviderRegistry, Selection};
