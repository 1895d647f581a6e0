//! scoresection — serves random two-measure excerpts of a MusicXML score.
//!
//! Supports both uncompressed MusicXML (.musicxml / .xml) and compressed
//! MXL (.mxl) files as the source score.
//!
//! # Example
//! ```no_run
//! use scoresection::{load_section, parse_file};
//!
//! let score = parse_file("static/MozaVeilSample.xml").unwrap();
//! println!("Parts: {}", score.parts.len());
//! println!("Measures: {}", score.measure_count());
//!
//! let section = load_section("static/MozaVeilSample.xml", &mut rand::thread_rng()).unwrap();
//! println!("Measures {}..={}", section.window.start, section.window.end);
//! println!("{}", section.to_musicxml());
//! ```

pub mod config;
pub mod error;
pub mod excerpt;
pub mod model;
pub mod mxl;
pub mod parser;
pub mod server;
pub mod writer;

use std::path::Path;

pub use error::{ScoreError, SectionError};
pub use excerpt::{load_section, select_section, Section, Window, HIGHLIGHT_COLOR, MEASURE_COUNT};
pub use model::*;
pub use mxl::parse_mxl;
pub use parser::parse_musicxml;
pub use writer::score_to_musicxml;

/// Parse a MusicXML file from a file path.
/// Automatically detects format based on file extension:
/// - `.musicxml` or `.xml` → uncompressed MusicXML
/// - `.mxl` → compressed MXL (ZIP archive)
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Score, ScoreError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| ScoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_bytes(&data, path.extension().and_then(|e| e.to_str()))
}

/// Parse MusicXML from raw bytes with an optional format hint.
/// If `extension` is None, tries to auto-detect the format.
pub fn parse_bytes(data: &[u8], extension: Option<&str>) -> Result<Score, ScoreError> {
    match extension {
        Some("mxl") => parse_mxl(data),
        Some("musicxml") | Some("xml") => parse_musicxml(std::str::from_utf8(data)?),
        _ => {
            // Auto-detect: try as XML first, then as MXL
            if let Ok(xml) = std::str::from_utf8(data) {
                if xml.trim_start().starts_with('<') {
                    return parse_musicxml(xml);
                }
            }
            parse_mxl(data)
        }
    }
}
