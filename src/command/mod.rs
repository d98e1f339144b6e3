mod config;
mod logout;
mod open;
mod routes;

pub use config::run_config;
pub use logout::run_logout;
pub use open::run_open;
pub use routes::run_routes;
