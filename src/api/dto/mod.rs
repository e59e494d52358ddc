//! Data Transfer Objects for REST request/response serialization.
//!
//! The wire format is camelCase JSON. Money amounts are serialized as
//! JSON strings to prevent precision loss on decimal values.

pub mod common_dto;
pub mod error_dto;
pub mod event_dto;
pub mod log_dto;
pub mod match_dto;
pub mod monetization_dto;
pub mod stats_dto;

pub use common_dto::*;
pub use error_dto::*;
pub use event_dto::*;
pub use log_dto::*;
pub use match_dto::*;
pub use monetization_dto::*;
pub use stats_dto::*;
