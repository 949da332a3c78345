//! Draft synchronization for multi-step onboarding forms.
//!
//! Each form section keeps a locally persisted [`Draft`](onboard_core::Draft)
//! and the [`Snapshot`](onboard_core::Snapshot) of what the server last
//! confirmed. Syncing a section diffs the two and issues only the creates
//! and updates that are actually needed.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use onboard_client::OnboardClient;
//! use onboard_core::{Section, SectionSchema};
//! use onboard_state_memory::MemoryDraftStore;
//! use onboard_sync::OnboardingSession;
//!
//! # async fn example() -> Result<(), onboard_sync::SyncError> {
//! let session = OnboardingSession::new(
//!     "link-token",
//!     Arc::new(OnboardClient::new("http://localhost:8080")),
//!     Arc::new(MemoryDraftStore::new()),
//! );
//!
//! let mut draft = session.open_section(Section::Address).await?;
//! draft.set_field("permanent", "city", "Mumbai");
//! let outcome = session.sync_section(&mut draft, &SectionSchema::address()).await?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod debounce;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod merge;
pub mod session;
pub mod store;
pub mod testing;

pub use backend::RecordBackend;
pub use debounce::DebouncedWriter;
pub use diff::{SectionDiff, SectionStatus};
pub use dispatch::SyncDispatcher;
pub use error::{BackendError, SyncError};
pub use fetcher::RemoteFetcher;
pub use session::{OnboardingSession, SectionPreview};
pub use store::LocalDraftStore;
