//! Concrete triple-store adapters.

#[cfg(feature = "oxigraph")]
pub mod oxigraph;

#[cfg(feature = "oxigraph")]
pub use self::oxigraph::{OxigraphClient, OxigraphRepository};
