//! MXL file handler — reads compressed MusicXML (.mxl) archives.
//!
//! An .mxl file is a ZIP archive containing:
//!   - META-INF/container.xml  — declares the root MusicXML file path
//!   - <rootfile>.xml          — the actual MusicXML content (e.g., score.xml)
//!   - (optional) other files  — images, sounds, etc.

use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::ScoreError;
use crate::model::Score;
use crate::parser;

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Read and parse a .mxl file from raw bytes.
pub fn parse_mxl(data: &[u8]) -> Result<Score, ScoreError> {
    let xml = extract_musicxml_from_mxl(data)?;
    parser::parse_musicxml(&xml)
}

/// Extract the MusicXML content string from .mxl bytes.
pub fn extract_musicxml_from_mxl(data: &[u8]) -> Result<String, ScoreError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let root_file_path = find_root_file(&mut archive)?;
    read_entry(&mut archive, &root_file_path)
}

/// Locate the root MusicXML file: the first `<rootfile full-path>` in
/// container.xml, or the first .xml/.musicxml outside META-INF.
fn find_root_file(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String, ScoreError> {
    if archive.by_name(CONTAINER_PATH).is_ok() {
        let xml = read_entry(archive, CONTAINER_PATH)?;
        let doc = roxmltree::Document::parse(&xml)?;

        if let Some(path) = doc
            .descendants()
            .filter(|n| n.tag_name().name() == "rootfile")
            .find_map(|n| n.attribute("full-path"))
        {
            return Ok(path.to_string());
        }
    }

    let names: Vec<String> = archive.file_names().map(String::from).collect();

    let found = names
        .iter()
        .find(|name| {
            !name.starts_with("META-INF/")
                && (name.ends_with(".xml") || name.ends_with(".musicxml"))
        })
        .cloned();
    found.ok_or(ScoreError::MissingRootFile(names))
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<String, ScoreError> {
    let mut file = archive.by_name(name)?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|source| ScoreError::ArchiveEntry {
            name: name.to_string(),
            source,
        })?;
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const SCORE: &str = r#"<score-partwise version="4.0">
  <part-list><score-part id="P1"><part-name>Flute</part-name></score-part></part-list>
  <part id="P1"><measure number="1"/><measure number="2"/></part>
</score-partwise>"#;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            for (name, body) in entries {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn follows_container_rootfile() {
        let container = r#"<container><rootfiles><rootfile full-path="music/score.xml"/></rootfiles></container>"#;
        let data = archive(&[
            ("META-INF/container.xml", container),
            ("decoy.xml", "<not-a-score/>"),
            ("music/score.xml", SCORE),
        ]);
        let score = parse_mxl(&data).unwrap();
        assert_eq!(score.parts[0].name, "Flute");
        assert_eq!(score.measure_count(), 2);
    }

    #[test]
    fn falls_back_to_first_xml_entry() {
        let data = archive(&[("score.musicxml", SCORE)]);
        assert_eq!(parse_mxl(&data).unwrap().measure_count(), 2);
    }

    #[test]
    fn reports_archive_without_score() {
        let data = archive(&[("readme.txt", "hello")]);
        match parse_mxl(&data) {
            Err(ScoreError::MissingRootFile(names)) => assert_eq!(names, ["readme.txt"]),
            other => panic!("expected MissingRootFile, got {other:?}"),
        }
    }
}
