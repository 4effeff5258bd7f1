//! Conversational agent core for Parley.
//!
//! Session orchestration over a Responses-style model runner: tool
//! registration, response normalization, tool-approval correlation,
//! transcript bookkeeping, and event delivery.

pub mod approval;
pub mod config;
pub mod errors;
pub mod events;
pub mod normalize;
pub mod registry;
pub mod session;
pub mod turn;

pub use approval::*;
pub use config::*;
pub use errors::*;
pub use events::*;
pub use normalize::*;
pub use registry::*;
pub use session::*;
pub use turn::*;
