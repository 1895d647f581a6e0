//! Integration tests — parse the bundled score and the test fixtures.

use scoresection::{parse_bytes, parse_file, MeasureElement, Score};
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
}

// ─── Bundled score ──────────────────────────────────────────────────

#[test]
fn parse_bundled_score() {
    let score = parse_file(static_dir().join("MozaVeilSample.xml"))
        .expect("Failed to parse MozaVeilSample.xml");

    assert_eq!(score.title.as_deref(), Some("Veil Sample"));
    assert_eq!(score.version.as_deref(), Some("3.1"));
    assert_eq!(score.parts.len(), 2);
    assert_eq!(score.parts[0].name, "Violin");
    assert_eq!(score.parts[1].abbreviation.as_deref(), Some("Vc."));

    // Every part has the same number of measures, enough for a section
    assert_eq!(score.measure_count(), 12);
    assert!(score.parts.iter().all(|p| p.measures.len() == 12));

    let attrs = score.parts[1].measures[0]
        .attributes()
        .next()
        .expect("First measure should have attributes");
    assert_eq!(attrs.divisions, Some(2));
    assert_eq!(attrs.key.as_ref().map(|k| k.fifths), Some(-1));
    assert_eq!(attrs.clefs[0].sign, "F");

    println!("✓ MozaVeilSample.xml parsed successfully");
    println!(
        "  Total notes: {}",
        score
            .parts
            .iter()
            .flat_map(|p| &p.measures)
            .map(|m| m.notes().count())
            .sum::<usize>()
    );
}

// ─── Fixtures ───────────────────────────────────────────────────────

#[test]
fn parse_duet_fixture() {
    let score = parse_file(fixtures_dir().join("duet.musicxml")).expect("Failed to parse duet");
    assert_score_duet(&score);
}

fn assert_score_duet(score: &Score) {
    assert_eq!(score.title.as_deref(), Some("Duet Fixture"));
    assert_eq!(score.composer.as_deref(), Some("Test Composer"));
    assert_eq!(score.software.as_deref(), Some("handwritten"));

    let flute = &score.parts[0];
    assert_eq!(flute.id, "P1");
    assert_eq!(flute.midi_program, Some(74));
    assert_eq!(flute.midi_channel, Some(1));
    assert_eq!(flute.measures.len(), 4);

    let m1 = &flute.measures[0];
    assert_eq!(m1.number, "1");
    assert_eq!(m1.width, Some(220.0));
    assert!(!m1.new_system, "<system-layout> alone is not a break");

    let notes: Vec<_> = m1.notes().collect();
    assert_eq!(notes.len(), 4);
    assert_eq!(notes[0].lyrics[0].text, "Al");
    assert_eq!(notes[0].default_x, Some(20.0));
    assert_eq!(notes[1].beams[0].beam_type, "begin");
    assert!(notes[3].tie_start);
    assert_eq!(notes[3].notations[0].name, "tied");

    let m2_notes: Vec<_> = flute.measures[1].notes().collect();
    assert!(m2_notes[0].tie_stop);
    assert!(m2_notes[2].chord);
    assert_eq!(m2_notes[2].accidental.as_deref(), Some("sharp"));
    assert_eq!(m2_notes[3].slurs[0].placement.as_deref(), Some("above"));

    let piano = &score.parts[1];
    let m1 = &piano.measures[0];
    assert!(matches!(m1.elements[1], MeasureElement::Harmony(_)));
    assert!(m1
        .elements
        .iter()
        .any(|e| matches!(e, MeasureElement::Backup { duration: 6 })));
    assert_eq!(m1.attributes().next().map(|a| a.clefs.len()), Some(2));
    assert!(piano.measures[2]
        .elements
        .iter()
        .any(|e| matches!(e, MeasureElement::Forward { duration: 2 })));
    assert!(piano.measures[3].barlines().any(|b| b.bar_style.as_deref() == Some("light-heavy")));
}

#[test]
fn parse_bytes_detects_xml_without_extension() {
    let data = std::fs::read(fixtures_dir().join("duet.musicxml")).unwrap();
    let score = parse_bytes(&data, None).expect("Failed to auto-detect MusicXML");
    assert_score_duet(&score);
}

#[test]
fn parse_fixture_without_parts() {
    let score = parse_file(fixtures_dir().join("no_parts.musicxml")).unwrap();
    assert_eq!(score.title.as_deref(), Some("Empty"));
    assert!(score.parts.is_empty());
    assert_eq!(score.measure_count(), 0);
}

#[test]
fn missing_file_is_a_read_error() {
    let err = parse_file(fixtures_dir().join("does-not-exist.musicxml")).unwrap_err();
    assert!(err.to_string().starts_with("Failed to read file"), "{err}");
}
