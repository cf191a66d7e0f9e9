pub extern crate serde;
pub extern crate serde_json;
pub extern crate uuid;

mod message;
mod participant_directory;
mod stroke_store;
mod types;

pub use message::*;
pub use participant_directory::*;
pub use stroke_store::*;
pub use types::*;
