pub mod event;
pub mod verdict;

pub use event::{Event, EventKind};
pub use verdict::{Action, Alert, GeoMetadata, Verdict};
