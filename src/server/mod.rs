// HTTP surface — routes, shared state and server lifecycle.

pub mod extract;
pub mod handler;

pub use handler::{router, AppState, GatewayServer, SharedState};
