//! MusicXML parser — converts MusicXML XML into the Score data model.

use roxmltree::{Document, Node};

use crate::error::ScoreError;
use crate::model::*;

/// Parse a MusicXML XML string into a Score.
pub fn parse_musicxml(xml: &str) -> Result<Score, ScoreError> {
    // MusicXML files include a DOCTYPE declaration, so we must allow DTDs
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, options)?;
    let root = doc.root_element();

    if root.tag_name().name() != "score-partwise" {
        return Err(ScoreError::UnsupportedRoot(
            root.tag_name().name().to_string(),
        ));
    }

    let mut score = Score::new();
    score.version = root.attribute("version").map(String::from);

    for child in elements(&root) {
        match child.tag_name().name() {
            "work" => parse_work(&child, &mut score),
            "movement-title" => {
                if score.title.is_none() {
                    score.title = text_of(&child);
                }
            }
            "identification" => parse_identification(&child, &mut score),
            "part-list" => parse_part_list(&child, &mut score),
            "part" => parse_part(&child, &mut score),
            _ => {}
        }
    }

    Ok(score)
}

// ─── Header ──────────────────────────────────────────────────────────

fn parse_work(node: &Node, score: &mut Score) {
    for child in elements(node) {
        if child.tag_name().name() == "work-title" {
            // <work-title> wins over <movement-title>, whichever comes first.
            score.title = text_of(&child);
        }
    }
}

fn parse_identification(node: &Node, score: &mut Score) {
    for child in elements(node) {
        match child.tag_name().name() {
            "creator" => {
                if child.attribute("type") == Some("composer") {
                    score.composer = text_of(&child);
                }
            }
            "encoding" => {
                for enc_child in elements(&child) {
                    if enc_child.tag_name().name() == "software" {
                        score.software = text_of(&enc_child);
                    }
                }
            }
            _ => {}
        }
    }
}

// ─── Part List ───────────────────────────────────────────────────────

fn parse_part_list(node: &Node, score: &mut Score) {
    for child in elements(node) {
        if child.tag_name().name() != "score-part" {
            continue;
        }
        let mut part = Part {
            id: child.attribute("id").unwrap_or("").to_string(),
            name: String::new(),
            abbreviation: None,
            midi_program: None,
            midi_channel: None,
            measures: Vec::new(),
        };

        for sp_child in elements(&child) {
            match sp_child.tag_name().name() {
                "part-name" => part.name = text_of(&sp_child).unwrap_or_default(),
                "part-abbreviation" => part.abbreviation = text_of(&sp_child),
                "midi-instrument" => {
                    for midi in elements(&sp_child) {
                        match midi.tag_name().name() {
                            "midi-channel" => part.midi_channel = parse_i32(&midi),
                            "midi-program" => part.midi_program = parse_i32(&midi),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        score.parts.push(part);
    }
}

// ─── Part (measures) ─────────────────────────────────────────────────

fn parse_part(node: &Node, score: &mut Score) {
    let part_id = node.attribute("id").unwrap_or("");

    // Parts missing from the part-list are skipped
    let Some(part) = score.parts.iter_mut().find(|p| p.id == part_id) else {
        return;
    };

    for child in elements(node) {
        if child.tag_name().name() == "measure" {
            part.measures.push(parse_measure(&child));
        }
    }
}

// ─── Measure ─────────────────────────────────────────────────────────

fn parse_measure(node: &Node) -> Measure {
    let mut measure = Measure::new(node.attribute("number").unwrap_or(""));
    measure.implicit = node.attribute("implicit") == Some("yes");
    measure.width = node.attribute("width").and_then(|w| w.parse::<f64>().ok());

    for child in elements(node) {
        let element = match child.tag_name().name() {
            "attributes" => MeasureElement::Attributes(parse_attributes(&child)),
            "note" => MeasureElement::Note(parse_note(&child)),
            "backup" => MeasureElement::Backup {
                duration: child_i32(&child, "duration").unwrap_or(0),
            },
            "forward" => MeasureElement::Forward {
                duration: child_i32(&child, "duration").unwrap_or(0),
            },
            "harmony" => MeasureElement::Harmony(parse_harmony(&child)),
            "barline" => MeasureElement::Barline(parse_barline(&child)),
            "direction" => match parse_direction(&child) {
                Some(dir) => MeasureElement::Direction(dir),
                None => continue,
            },
            "sound" => match bare_tempo(&child) {
                // <sound> can appear directly in <measure> (not inside <direction>)
                Some(tempo) => MeasureElement::Direction(Direction {
                    sound_tempo: Some(tempo),
                    ..Default::default()
                }),
                None => MeasureElement::Other(parse_xml_element(&child)),
            },
            "print" => {
                if child.attribute("new-system") == Some("yes") {
                    measure.new_system = true;
                }
                if child.attribute("new-page") == Some("yes") {
                    measure.new_page = true;
                }
                continue;
            }
            _ => MeasureElement::Other(parse_xml_element(&child)),
        };
        measure.elements.push(element);
    }

    measure
}

/// Tempo of a `<sound>` that carries nothing else.
fn bare_tempo(node: &Node) -> Option<f64> {
    if node.attributes().count() != 1 || elements(node).next().is_some() {
        return None;
    }
    node.attribute("tempo").and_then(|t| t.parse::<f64>().ok())
}

// ─── Attributes ──────────────────────────────────────────────────────

fn parse_attributes(node: &Node) -> Attributes {
    let mut attrs = Attributes::default();

    for child in elements(node) {
        match child.tag_name().name() {
            "divisions" => attrs.divisions = parse_i32(&child),
            "key" => attrs.key = Some(parse_key(&child)),
            "time" => attrs.time = Some(parse_time(&child)),
            "staves" => attrs.staves = parse_i32(&child),
            "clef" => attrs.clefs.push(parse_clef(&child)),
            "transpose" => attrs.transpose = Some(parse_transpose(&child)),
            _ => {}
        }
    }

    attrs
}

fn parse_key(node: &Node) -> Key {
    Key {
        fifths: child_i32(node, "fifths").unwrap_or(0),
        mode: child_text(node, "mode"),
    }
}

fn parse_time(node: &Node) -> TimeSignature {
    TimeSignature {
        beats: child_i32(node, "beats").unwrap_or(4),
        beat_type: child_i32(node, "beat-type").unwrap_or(4),
        symbol: node.attribute("symbol").map(String::from),
    }
}

fn parse_clef(node: &Node) -> Clef {
    Clef {
        number: node
            .attribute("number")
            .and_then(|n| n.parse::<i32>().ok())
            .unwrap_or(1),
        sign: child_text(node, "sign").unwrap_or_else(|| "G".to_string()),
        line: child_i32(node, "line").unwrap_or(2),
        octave_change: child_i32(node, "clef-octave-change"),
    }
}

fn parse_transpose(node: &Node) -> Transpose {
    Transpose {
        diatonic: child_i32(node, "diatonic").unwrap_or(0),
        chromatic: child_i32(node, "chromatic").unwrap_or(0),
        octave_change: child_i32(node, "octave-change"),
    }
}

// ─── Note ────────────────────────────────────────────────────────────

fn parse_note(node: &Node) -> Note {
    let mut note = Note {
        color: node.attribute("color").map(String::from),
        default_x: node.attribute("default-x").and_then(|v| v.parse().ok()),
        default_y: node.attribute("default-y").and_then(|v| v.parse().ok()),
        ..Default::default()
    };

    for child in elements(node) {
        match child.tag_name().name() {
            "grace" => {
                note.grace = true;
                note.grace_slash = child.attribute("slash") == Some("yes");
            }
            "chord" => note.chord = true,
            "pitch" => note.pitch = Some(parse_pitch(&child)),
            "unpitched" => {
                note.unpitched = Some(Pitch {
                    step: child_text(&child, "display-step").unwrap_or_else(|| "C".to_string()),
                    octave: child_i32(&child, "display-octave").unwrap_or(4),
                    alter: None,
                });
            }
            "rest" => {
                note.rest = true;
                note.measure_rest = child.attribute("measure") == Some("yes");
            }
            "duration" => note.duration = parse_i32(&child).unwrap_or(0),
            "tie" => match child.attribute("type") {
                Some("start") => note.tie_start = true,
                Some("stop") => note.tie_stop = true,
                _ => {}
            },
            "voice" => note.voice = parse_i32(&child),
            "type" => note.note_type = text_of(&child),
            "dot" => note.dots += 1,
            "accidental" => note.accidental = text_of(&child),
            "time-modification" => {
                note.time_modification = Some(TimeModification {
                    actual_notes: child_i32(&child, "actual-notes").unwrap_or(1),
                    normal_notes: child_i32(&child, "normal-notes").unwrap_or(1),
                });
            }
            "stem" => note.stem = text_of(&child),
            "notehead" => note.notehead = Some(parse_xml_element(&child)),
            "staff" => note.staff = parse_i32(&child),
            "beam" => {
                let number = child
                    .attribute("number")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(1);
                let beam_type = text_of(&child).unwrap_or_default();
                note.beams.push(Beam { number, beam_type });
            }
            "notations" => {
                for nc in elements(&child) {
                    if nc.tag_name().name() == "slur" {
                        note.slurs.push(Slur {
                            slur_type: nc.attribute("type").unwrap_or("").to_string(),
                            number: nc
                                .attribute("number")
                                .and_then(|n| n.parse().ok())
                                .unwrap_or(1),
                            placement: nc.attribute("placement").map(String::from),
                        });
                    } else {
                        note.notations.push(parse_xml_element(&nc));
                    }
                }
            }
            "lyric" => {
                let number = child
                    .attribute("number")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(1);
                let text = child_text(&child, "text").unwrap_or_default();
                if !text.is_empty() {
                    note.lyrics.push(Lyric {
                        number,
                        syllabic: child_text(&child, "syllabic"),
                        text,
                    });
                }
            }
            _ => {}
        }
    }

    note
}

fn parse_pitch(node: &Node) -> Pitch {
    Pitch {
        step: child_text(node, "step").unwrap_or_else(|| "C".to_string()),
        octave: child_i32(node, "octave").unwrap_or(4),
        alter: child(node, "alter").and_then(|n| parse_f64(&n)),
    }
}

// ─── Harmony ─────────────────────────────────────────────────────────

fn parse_harmony(node: &Node) -> Harmony {
    let mut root = HarmonyRoot {
        step: "C".to_string(),
        alter: None,
    };
    let mut kind = "major".to_string();
    let mut bass = None;

    for child in elements(node) {
        match child.tag_name().name() {
            "root" => root = parse_harmony_root(&child, "root-step", "root-alter"),
            "kind" => kind = text_of(&child).unwrap_or_else(|| "major".to_string()),
            "bass" => bass = Some(parse_harmony_root(&child, "bass-step", "bass-alter")),
            _ => {}
        }
    }

    Harmony { root, kind, bass }
}

fn parse_harmony_root(node: &Node, step_tag: &str, alter_tag: &str) -> HarmonyRoot {
    HarmonyRoot {
        step: child_text(node, step_tag).unwrap_or_else(|| "C".to_string()),
        alter: child(node, alter_tag).and_then(|n| parse_f64(&n)),
    }
}

// ─── Barline ─────────────────────────────────────────────────────────

fn parse_barline(node: &Node) -> Barline {
    let mut barline = Barline {
        location: node.attribute("location").unwrap_or("right").to_string(),
        bar_style: None,
        ending: None,
        repeat: None,
    };

    for child in elements(node) {
        match child.tag_name().name() {
            "bar-style" => barline.bar_style = text_of(&child),
            "repeat" => {
                barline.repeat = Some(Repeat {
                    direction: child.attribute("direction").unwrap_or("forward").to_string(),
                });
            }
            "ending" => {
                barline.ending = Some(Ending {
                    number: child.attribute("number").unwrap_or("1").to_string(),
                    ending_type: child.attribute("type").unwrap_or("start").to_string(),
                    text: text_of(&child),
                });
            }
            _ => {}
        }
    }

    barline
}

// ─── Direction ───────────────────────────────────────────────────────

fn parse_direction(node: &Node) -> Option<Direction> {
    let mut dir = Direction {
        placement: node.attribute("placement").map(String::from),
        ..Default::default()
    };

    for child in elements(node) {
        match child.tag_name().name() {
            "direction-type" => {
                for dt_child in elements(&child) {
                    if let Some(kind) = parse_direction_type(&dt_child) {
                        dir.types.push(kind);
                    }
                }
            }
            "voice" => dir.voice = parse_i32(&child),
            "staff" => dir.staff = parse_i32(&child),
            "sound" => {
                if let Some(tempo) = child.attribute("tempo").and_then(|t| t.parse::<f64>().ok()) {
                    dir.sound_tempo = Some(tempo);
                }
            }
            _ => {}
        }
    }

    if dir.has_display() {
        Some(dir)
    } else {
        // Nothing to show: keep only the playback tempo, if any
        dir.sound_tempo.map(|tempo| Direction {
            sound_tempo: Some(tempo),
            ..Default::default()
        })
    }
}

fn parse_direction_type(node: &Node) -> Option<DirectionType> {
    match node.tag_name().name() {
        // Whitespace-only words show nothing
        "words" => text_of(node).map(DirectionType::Words),
        "dynamics" => {
            let marks: Vec<Node> = elements(node).collect();
            match marks.as_slice() {
                [mark] if mark.tag_name().name() != "other-dynamics" => {
                    Some(DirectionType::Dynamics(mark.tag_name().name().to_string()))
                }
                _ => Some(DirectionType::Other(parse_xml_element(node))),
            }
        }
        "metronome" if child(node, "per-minute").is_some() => {
            Some(DirectionType::Metronome(parse_metronome(node)))
        }
        _ => Some(DirectionType::Other(parse_xml_element(node))),
    }
}

fn parse_metronome(node: &Node) -> MetronomeMark {
    let mut beat_unit = "quarter".to_string();
    let mut per_minute = 120;
    let mut dotted = false;

    for child in elements(node) {
        match child.tag_name().name() {
            "beat-unit" => {
                beat_unit = text_of(&child).unwrap_or_else(|| "quarter".to_string());
            }
            "beat-unit-dot" => dotted = true,
            "per-minute" => {
                per_minute = parse_f64(&child).map(|v| v as i32).unwrap_or(120);
            }
            _ => {}
        }
    }

    MetronomeMark {
        beat_unit,
        dotted,
        per_minute,
    }
}

// ─── Unmodelled elements ─────────────────────────────────────────────

fn parse_xml_element(node: &Node) -> XmlElement {
    let children: Vec<XmlElement> = elements(node).map(|n| parse_xml_element(&n)).collect();
    XmlElement {
        name: node.tag_name().name().to_string(),
        attributes: node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect(),
        text: if children.is_empty() { text_of(node) } else { None },
        children,
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn elements<'a, 'input>(node: &Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn child<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

fn child_text(node: &Node, name: &str) -> Option<String> {
    child(node, name).and_then(|n| text_of(&n))
}

fn child_i32(node: &Node, name: &str) -> Option<i32> {
    child(node, name).and_then(|n| parse_i32(&n))
}

/// Trimmed text content; whitespace-only text counts as absent.
fn text_of(node: &Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

fn parse_i32(node: &Node) -> Option<i32> {
    node.text()?.trim().parse().ok()
}

fn parse_f64(node: &Node) -> Option<f64> {
    node.text()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_VOICES: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <movement-title>Fallback</movement-title>
  <work><work-title>Two Voices</work-title></work>
  <part-list>
    <score-part id="P1"><part-name>Piano</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <print new-page="yes"><system-layout/></print>
      <attributes>
        <divisions>2</divisions>
        <key><fifths>-1</fifths></key>
        <time symbol="common"><beats>4</beats><beat-type>4</beat-type></time>
      </attributes>
      <sound tempo="96"/>
      <note color="#FF0000"><pitch><step>B</step><alter>-1</alter><octave>4</octave></pitch><duration>8</duration><voice>1</voice><type>whole</type></note>
      <backup><duration>8</duration></backup>
      <note><rest measure="yes"/><duration>8</duration><voice>2</voice></note>
      <direction placement="below"><direction-type><dynamics><mf/></dynamics></direction-type><staff>1</staff></direction>
      <direction><direction-type><words>   </words></direction-type></direction>
    </measure>
  </part>
</score-partwise>"##;

    #[test]
    fn keeps_measure_elements_in_document_order() {
        let score = parse_musicxml(TWO_VOICES).unwrap();
        assert_eq!(score.title.as_deref(), Some("Two Voices"));
        assert_eq!(score.version.as_deref(), Some("4.0"));

        let m = &score.parts[0].measures[0];
        assert!(m.new_page);
        // System layout alone does not force a break
        assert!(!m.new_system);
        let kinds: Vec<&str> = m
            .elements
            .iter()
            .map(|e| match e {
                MeasureElement::Attributes(_) => "attributes",
                MeasureElement::Note(_) => "note",
                MeasureElement::Backup { .. } => "backup",
                MeasureElement::Forward { .. } => "forward",
                MeasureElement::Harmony(_) => "harmony",
                MeasureElement::Direction(_) => "direction",
                MeasureElement::Barline(_) => "barline",
                MeasureElement::Other(_) => "other",
            })
            .collect();
        // The empty <words> direction carries nothing and is dropped
        assert_eq!(
            kinds,
            ["attributes", "direction", "note", "backup", "note", "direction"]
        );
    }

    #[test]
    fn reads_note_details() {
        let score = parse_musicxml(TWO_VOICES).unwrap();
        let m = &score.parts[0].measures[0];
        let notes: Vec<&Note> = m.notes().collect();

        let pitch = notes[0].pitch.as_ref().unwrap();
        assert_eq!(pitch.step, "B");
        assert_eq!(pitch.alter, Some(-1.0));
        assert_eq!(notes[0].color.as_deref(), Some("#FF0000"));

        assert!(notes[1].rest);
        assert!(notes[1].measure_rest);
        assert_eq!(notes[1].voice, Some(2));

        let attrs = m.attributes().next().unwrap();
        assert_eq!(attrs.key.as_ref().map(|k| k.fifths), Some(-1));
        assert_eq!(
            attrs.time.as_ref().and_then(|t| t.symbol.as_deref()),
            Some("common")
        );
    }

    #[test]
    fn bare_sound_becomes_tempo_only_direction() {
        let score = parse_musicxml(TWO_VOICES).unwrap();
        let dirs: Vec<&Direction> = score.parts[0].measures[0]
            .elements
            .iter()
            .filter_map(|e| match e {
                MeasureElement::Direction(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(dirs[0].sound_tempo, Some(96.0));
        assert!(!dirs[0].has_display());
        assert_eq!(dirs[1].types, [DirectionType::Dynamics("mf".to_string())]);
        assert_eq!(dirs[1].placement.as_deref(), Some("below"));
        assert_eq!(dirs[1].staff, Some(1));
    }

    const MARKINGS: &str = r#"<score-partwise version="4.0">
  <part-list><score-part id="P1"><part-name>Oboe</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <print><system-layout><system-distance>90</system-distance></system-layout></print>
      <direction placement="below">
        <direction-type><wedge type="crescendo" number="1"/></direction-type>
      </direction>
      <direction>
        <direction-type><words>dolce</words><words>espr.</words></direction-type>
        <direction-type><dynamics><other-dynamics>sfzp</other-dynamics></dynamics></direction-type>
        <voice>1</voice>
      </direction>
      <sound dynamics="80"/>
      <note>
        <pitch><step>A</step><octave>4</octave></pitch>
        <duration>1</duration>
        <notehead>diamond</notehead>
        <notations>
          <tied type="start"/>
          <tuplet type="start" bracket="yes"/>
          <articulations><staccato placement="above"/><accent/></articulations>
          <fermata type="upright"/>
          <ornaments><trill-mark/></ornaments>
          <slur type="start" number="1"/>
        </notations>
      </note>
      <figured-bass><figure><figure-number>6</figure-number></figure></figured-bass>
    </measure>
  </part>
</score-partwise>"#;

    fn leaf(name: &str) -> XmlElement {
        XmlElement {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn keeps_notations_without_a_dedicated_type() {
        let score = parse_musicxml(MARKINGS).unwrap();
        let m = &score.parts[0].measures[0];
        assert!(!m.new_system);

        let note = m.notes().next().unwrap();
        assert_eq!(note.slurs.len(), 1);
        let names: Vec<&str> = note.notations.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["tied", "tuplet", "articulations", "fermata", "ornaments"]);
        assert_eq!(
            note.notations[2].children,
            [
                XmlElement {
                    attributes: vec![("placement".to_string(), "above".to_string())],
                    ..leaf("staccato")
                },
                leaf("accent"),
            ]
        );
        assert_eq!(note.notations[3].attributes[0].1, "upright");
        assert_eq!(note.notehead.as_ref().and_then(|n| n.text.as_deref()), Some("diamond"));
    }

    #[test]
    fn keeps_every_direction_type() {
        let score = parse_musicxml(MARKINGS).unwrap();
        let elements = &score.parts[0].measures[0].elements;

        let MeasureElement::Direction(wedge) = &elements[0] else {
            panic!("expected the wedge direction, got {:?}", elements[0]);
        };
        assert!(wedge.has_display());
        assert!(matches!(&wedge.types[..], [DirectionType::Other(w)] if w.name == "wedge"));

        let MeasureElement::Direction(text) = &elements[1] else {
            panic!("expected the text direction, got {:?}", elements[1]);
        };
        assert_eq!(text.types[0], DirectionType::Words("dolce".to_string()));
        assert_eq!(text.types[1], DirectionType::Words("espr.".to_string()));
        let DirectionType::Other(dynamics) = &text.types[2] else {
            panic!("other-dynamics should be kept as read");
        };
        assert_eq!(dynamics.children[0].text.as_deref(), Some("sfzp"));
        assert_eq!(text.voice, Some(1));

        // Neither a tempo-only <sound> nor figured bass is dropped
        assert!(matches!(&elements[2], MeasureElement::Other(s) if s.name == "sound"));
        assert!(matches!(&elements[4], MeasureElement::Other(f) if f.name == "figured-bass"));
    }

    #[test]
    fn rejects_timewise_scores() {
        let xml = r#"<score-timewise version="4.0"><part-list/></score-timewise>"#;
        match parse_musicxml(xml) {
            Err(ScoreError::UnsupportedRoot(name)) => assert_eq!(name, "score-timewise"),
            other => panic!("expected UnsupportedRoot, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(matches!(
            parse_musicxml("<score-partwise><part-list>"),
            Err(ScoreError::Xml(_))
        ));
    }

    #[test]
    fn part_without_part_list_entry_is_skipped() {
        let xml = r#"<score-partwise>
  <part-list/>
  <part id="P9"><measure number="1"/></part>
</score-partwise>"#;
        let score = parse_musicxml(xml).unwrap();
        assert!(score.parts.is_empty());
    }
}
