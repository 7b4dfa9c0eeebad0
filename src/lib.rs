pub mod admin;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod endpoints;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod paths;
pub mod quiz;
pub mod session;
pub mod storage;
pub mod validation;
pub mod videos;

#[cfg(test)]
mod testing;

pub use error::{PortalError, Result};
