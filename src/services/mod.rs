//! Business logic services

pub mod clustering;
pub mod geo;
pub mod planning;
pub mod references;
pub mod route_assembler;
pub mod routing;
pub mod store;
