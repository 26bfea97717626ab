//! Infrastructure Layer
//!
//! This module contains all adapters (implementations) for the ports defined
//! in the application layer. Following hexagonal architecture:
//!
//! - **Driven Adapters (Outbound)**: Implement ports for external systems
//!   - `broker/`: Venue REST adapters (Saxo OpenAPI) and credential providers
//!   - `persistence/`: Submission ledger
//!
//! - **Wiring**
//!   - `config/`: Dependency injection container

pub mod broker;
pub mod config;
pub mod persistence;
