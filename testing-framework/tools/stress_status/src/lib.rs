pub mod server;

pub use server::{AppState, StatusError, status_app};
