mod organization;
mod prospect;
mod user;

pub use organization::*;
pub use prospect::*;
pub use user::*;
