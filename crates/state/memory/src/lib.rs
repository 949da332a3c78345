mod store;

pub use store::MemoryDraftStore;
