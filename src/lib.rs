pub mod cli;
pub mod error;
pub mod mime_types;
pub mod path;
pub mod routes;
pub mod server;
