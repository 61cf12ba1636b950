mod auth;
mod health_check;

pub use auth::get_current_user;
pub use auth::login;
pub use auth::logout;
pub use auth::logout_all;
pub use auth::refresh;
pub use auth::register;
pub use health_check::health_check;
