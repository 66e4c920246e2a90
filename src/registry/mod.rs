// file: src/registry/mod.rs
// description: Registry persistence module exports
// reference: Internal module structure

pub mod lock;
pub mod store;

pub use lock::RegistryLock;
pub use store::RegistryStore;
