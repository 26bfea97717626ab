//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for the venue, credentials, and submission store
//! - **Services**: One service per pipeline stage
//! - **Use Cases**: Execute/Reconcile and signal mapping
//! - **DTOs**: Data transfer objects for API boundaries

pub mod cache;
pub mod dto;
pub mod ports;
pub mod services;
pub mod use_cases;

pub use dto::*;
pub use ports::*;
pub use use_cases::*;
