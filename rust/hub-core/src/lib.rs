//! Authorization and commit resolution for a personal data hub.
//!
//! A hub stores, for each owner DID, the signed [commits] that make up the
//! history of the owner's objects. This crate decides who may read and write
//! those objects and what an object's current state is:
//!
//! - [`AuthorizationController`] maps a request to the permission grants that
//!   entitle it, and prunes query results to what the grants cover.
//! - [`BasicStrategy`] folds an object's commits into the one winning commit.
//! - [`Hub`] parses requests, checks signatures, and dispatches to the
//!   [`InterfaceController`] serving the addressed interface.
//!
//! Persistence is behind the [`Store`] trait; [`VolatileStore`] keeps
//! everything in memory.
//!
//! [commits]: hub_commit::Commit

pub mod authorization;
pub mod commits;
pub mod controller;
pub mod hub;
pub mod permission;
pub mod request;
pub mod response;
pub mod store;
pub mod store_utils;
pub mod strategy;

pub use authorization::*;
pub use commits::*;
pub use controller::*;
pub use hub::*;
pub use permission::*;
pub use request::*;
pub use response::*;
pub use store::*;
pub use store_utils::*;
pub use strategy::*;
