mod customer;
mod invoice;
mod user;

pub use customer::*;
pub use invoice::*;
pub use user::*;
