pub mod attachment;
pub mod draft;
pub mod error;
pub mod field;
pub mod lookup;
pub mod outcome;
pub mod record;
pub mod schema;
pub mod types;

pub use attachment::{Attachment, PendingFile};
pub use draft::{Draft, Snapshot};
pub use error::{Missing, ValidationError};
pub use field::{FieldValue, Fields};
pub use lookup::{Country, EducationMapping, IdentityType};
pub use outcome::{Classification, SyncOutcome, SyncReport};
pub use record::SectionRecord;
pub use schema::{RecordRequirements, SectionSchema, SlotRule};
pub use types::{RecordKey, RemoteId, Section, SessionToken, UserId};
