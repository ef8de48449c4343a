pub mod enums;
pub mod request;

pub use enums::*;
pub use request::*;
