pub mod authz;
pub mod error;
pub mod import;
pub mod lifecycle;
pub(crate) mod repos;
pub(crate) mod service;
