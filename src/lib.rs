//! OCR PDF Server Library
//!
//! Accepts a PDF upload, rasterizes every page with `pdftoppm`, runs OCR on
//! each page image and returns the joined text. The binary in main.rs only
//! loads configuration and serves [`routes::app`].
//!
//! # Modules
//!
//! - `workspace`: per-request scratch directories
//! - `rasterizer`: PDF to page images
//! - `ocr`: page image to text
//! - `pipeline`: upload validation, page ordering and text aggregation
//! - `auth`: optional `X-API-Key` gate
//! - `routes`: HTTP surface

pub mod auth;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod rasterizer;
pub mod routes;
pub mod state;
pub mod workspace;
