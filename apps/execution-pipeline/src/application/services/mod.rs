//! Application Services
//!
//! One service per pipeline stage. Each owns its caches and talks to the
//! venue only through [`VenuePort`](crate::application::ports::VenuePort).

mod disclaimer_resolver;
mod instrument_validator;
mod placement;
mod position_tracker;
mod precheck;

pub use disclaimer_resolver::{DISCLAIMER_CACHE_TTL, DisclaimerResolution, DisclaimerResolver};
pub use instrument_validator::{INSTRUMENT_CACHE_TTL, InstrumentValidator, ValidationError};
pub use placement::{PlacementAttempt, PlacementClient, PlacementSettings, TRADE_NOT_COMPLETED};
pub use position_tracker::{
    POSITIONS_CACHE_TTL, PositionGuards, PositionSnapshot, PositionTracker,
};
pub use precheck::{PrecheckClient, PrecheckRetry};
