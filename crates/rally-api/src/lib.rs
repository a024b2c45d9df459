pub mod auth;
pub mod blog;
pub mod content;
pub mod error;
pub mod middleware;
pub mod payments;
pub mod routes;
pub mod settings;
pub mod social;
pub mod state;
pub mod submissions;
pub mod users;

pub use routes::router;
pub use state::{AppState, AppStateInner};
