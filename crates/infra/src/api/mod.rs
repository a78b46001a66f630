//! Remote case-management API gateway.

mod client;
mod wire;

pub use client::ModuleoClient;
