pub mod nominatim;
pub mod provider;
pub mod service;
pub mod traits;
pub mod types;

pub use nominatim::NominatimGeocoder;
pub use provider::StaticPositionProvider;
pub use service::{LocationService, LocationSettings};
pub use traits::{PositionProvider, ReverseGeocoder};
pub use types::{AddressInfo, LocationPhase, LocationReading, Position, PositionOptions};
