//! REST surface of the fleet register under `/fleet-register/v1`.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod problem;
pub mod routes;
