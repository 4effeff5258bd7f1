//! In-process tool servers for Parley sessions.
//!
//! Each server exposes a small set of named operations. The bridge in
//! [`server`] registers those operations as local function tools so a
//! session can dispatch to them without a network hop.

pub mod chinook;
pub mod errors;
pub mod price;
pub mod server;
pub mod weather;

pub use chinook::ChinookServer;
pub use errors::ServerError;
pub use price::PriceServer;
pub use server::{OperationSpec, ToolServer, register_server_tools};
pub use weather::weather_tool;
