//! Vault Store - Encrypted semantic record store
//!
//! Stores agent descriptors so they can be found by topic similarity while
//! keeping each agent's name and description unreadable to anyone with only
//! storage access.
//!
//! Write path: validate, ensure the collection, encrypt the sensitive
//! fields, embed the topics, persist, then schedule an index rebuild.
//! Read path: embed the query, search, decrypt every hit.

pub mod refresh;
pub mod schema;
pub mod store;

pub use refresh::{IndexRefresh, InsertReceipt};
pub use schema::agent_schema;
pub use store::{RecordStore, StoreOptions};
