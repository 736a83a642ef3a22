//! Document preparation pipeline: resolve the input, rasterise pages, apply
//! image enhancement.
//!
//! Everything here runs before the first recognition attempt and produces the
//! [`crate::ocr::PageImage`] list the orchestrator consumes.

pub mod enhance;
pub mod input;
pub mod render;
