mod authorization;
mod card_state;
mod message;
mod snapshot_store;
mod types;

pub use authorization::*;
pub use card_state::*;
pub use message::*;
pub use snapshot_store::*;
pub use types::*;

pub extern crate serde;
pub extern crate serde_json;
