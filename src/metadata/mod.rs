pub mod extract;
pub mod types;

pub use extract::extract;
pub use types::MetadataRecord;
