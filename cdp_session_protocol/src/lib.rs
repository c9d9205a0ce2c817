//! Hand-written stand-in for the generated CDP domain bindings. A real
//! deployment would emit this from the PDL protocol description; here
//! it covers the subset of domains the session core actually drives
//! (Target, Page, Runtime, Network, Input, Browser).

#[macro_use]
mod macros;

pub mod browser;
pub mod empty_result;
pub mod event;
pub mod input;
pub mod network;
pub mod page;
pub mod runtime;
pub mod target;

pub use event::{CdpEvent, EventKind, ALWAYS_ENABLED_DOMAINS};
