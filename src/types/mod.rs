//! Type definitions

pub mod fleet;
pub mod messages;
pub mod planning;
pub mod point;
pub mod tournee;

pub use fleet::*;
pub use messages::*;
pub use planning::*;
pub use point::*;
pub use tournee::*;
