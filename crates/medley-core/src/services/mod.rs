//! High-level services shared across client frontends.

pub mod library;

pub use library::LibraryService;
