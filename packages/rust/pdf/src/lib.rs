//! Markdown-to-PDF conversion.
//!
//! This crate provides:
//! - [`discover`] — expand glob patterns (or literal paths) into markdown files
//! - [`render`] — markdown → standalone HTML document
//! - [`PdfEngine`] — HTML → PDF bytes, with [`CommandEngine`] driving an
//!   external renderer
//! - [`Converter`] — sequential conversion with per-file failure isolation

pub mod convert;
pub mod discover;
pub mod engine;
pub mod render;

pub use convert::{ConvertProgress, ConvertReport, ConvertedFile, Converter, FileFailure, SilentProgress};
pub use discover::{DiscoverOptions, Discovery, discover};
pub use engine::{CommandEngine, PdfEngine};
