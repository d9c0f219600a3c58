pub mod boot;
pub mod mock;
pub mod orchestrator;

mod consumer;
mod order;
mod retry;

pub use boot::{boot, Services};
pub use consumer::*;
pub use order::*;
pub use retry::*;
