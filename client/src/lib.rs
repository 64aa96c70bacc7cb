mod connection;
mod reconnect;
mod session;
mod transport;

pub use connection::*;
pub use reconnect::*;
pub use session::*;
pub use transport::*;

pub extern crate system;
