mod helpers;
mod middleware;
mod token;

pub use helpers::issue_token;
pub use middleware::{AuthError, CurrentUser, RequireAdmin, RequireUser};
pub use token::{TokenGenerator, parse_token};
