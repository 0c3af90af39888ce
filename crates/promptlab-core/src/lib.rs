//! promptlab-core: playground state store and experiment comparison.
//!
//! The store keeps one observable snapshot of the playground (operation type,
//! input mode, instances). All mutations are synchronous; requests that make
//! no sense for the current state are ignored instead of failing.

pub mod catalog;
pub mod compare;
pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod storage;
pub mod store;

pub use catalog::{DefaultTemplates, TemplateCatalog};
pub use compare::{CompareExperimentsPayload, CompareTable, RunCell};
pub use config::PlaygroundConfig;
pub use error::{PlaygroundError, Result};
pub use ids::InstanceIdAllocator;
pub use models::{
    ChatMessage, InitialProps, InputMode, OperationType, PlaygroundAction, PlaygroundInstance,
    PlaygroundState, PlaygroundTemplate,
};
pub use store::{IgnoredOperation, ListenerId, PlaygroundStore, PlaygroundStoreBuilder};
