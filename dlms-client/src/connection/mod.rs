//! Connection management module

pub mod builder;
pub mod connection;

pub use builder::{ConnectionBuilder, ConnectionFactory, ConnectionSettings};
pub use connection::DlmsConnection;
