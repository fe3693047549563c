mod models;
mod roles;

pub use models::*;
pub use roles::*;
