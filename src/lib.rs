//! Isochrone weather routing engine for sailing vessels.
//!
//! The engine propagates a frontier of reachable positions forward in time
//! through a wind/current field, using a polar performance model and a set of
//! geographic and sailing constraints, until a destination is reached or the
//! search is exhausted. Rendering, grib decoding and host integration are all
//! external; the engine only consumes queryable fields and exposes plain
//! geometry.

pub mod engine;
pub mod error;
pub mod parsers;

pub use engine::models::{Coordinate, CurrentData, RouteState, WindData};
pub use engine::routemap::{RouteConfig, RouteMap, RouteSession, SessionStatus};
pub use error::RoutingError;
