pub mod descriptor;
pub mod error;
pub mod instant;
pub mod protocol;
pub mod types;
pub mod wire;

pub use descriptor::*;
pub use error::{Error, Result};
pub use protocol::*;
pub use types::*;
pub use wire::*;
