mod store;

pub use store::FileDraftStore;
