//! Identity storage: MongoDB in production, in-memory for dev mode and tests

pub mod memory;
pub mod mongo;
pub mod mongo_store;
pub mod schemas;
pub mod store;

pub use memory::MemoryIdentityStore;
pub use mongo::{MongoClient, MongoCollection};
pub use mongo_store::MongoIdentityStore;
pub use store::IdentityStore;
