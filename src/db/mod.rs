pub mod docstore;
pub mod memstore;
pub mod dbdocs;

pub use docstore::{DocumentStore, StoreError};
pub use memstore::MemStore;
pub use dbdocs::PgStore;
