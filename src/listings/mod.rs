pub mod filter;
pub mod source;
pub mod store;

pub use filter::{FilterOutcome, FilterSpec, LocationMode, DEFAULT_RADIUS_KM};
pub use source::ListingSource;
pub use store::{ListingStore, RefreshOutcome};
