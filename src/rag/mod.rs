pub mod chunker;
pub mod retriever;
pub mod store;

pub use retriever::Retriever;
pub use store::PolicyStore;
