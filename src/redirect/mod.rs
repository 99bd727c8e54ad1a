pub mod handlers;
pub mod middleware;
pub mod open_app;
pub mod policy;
pub mod routes;

pub use handlers::RedirectState;
pub use policy::{MobileRedirect, RedirectOutcome, RedirectPolicy, RouteIntent};
pub use routes::create_redirect_router;
