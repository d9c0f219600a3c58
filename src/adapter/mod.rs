mod actor;
mod bus;
mod catalog;
mod registry;
mod store;

pub use actor::*;
pub use bus::*;
pub use catalog::*;
pub use registry::*;
pub use store::*;
