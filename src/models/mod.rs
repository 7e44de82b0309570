pub mod profile;
pub mod records;
pub mod session;

pub use profile::{Profile, ProfileInsert, ProfileRole, ProfileUpdate, FORMCOACH_FEATURE};
pub use records::*;
pub use session::{AuthChangeEvent, AuthUser, Session, SignUpOutcome};
