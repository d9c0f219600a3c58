mod catalog;
mod ledger;
mod publisher;
mod repository;
mod shard;

pub use catalog::*;
pub use ledger::*;
pub use publisher::*;
pub use repository::*;
pub use shard::*;
