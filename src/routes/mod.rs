mod health_check;
mod session;

pub use health_check::health_check;
pub use session::login;
pub use session::refresh;
pub use session::revoke;
pub use session::revoke_all;
