mod command;
mod error;
mod lifecycle;
mod message;
mod policy;
mod request;
mod wallet;

pub use command::*;
pub use error::*;
pub use lifecycle::*;
pub use message::*;
pub use policy::*;
pub use request::*;
pub use wallet::*;
