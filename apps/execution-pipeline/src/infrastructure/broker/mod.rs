//! Venue Adapters
//!
//! Implementations of `VenuePort` for brokerage venues.

pub mod saxo;

pub use saxo::{SaxoConfig, SaxoVenueAdapter, TransportError};
