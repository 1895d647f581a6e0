//! MusicXML writer — serializes the Score data model as a partwise document.
//!
//! Everything the parser reads is written back, in the element order the
//! MusicXML schema requires, so parse → write → parse yields the same model.

use crate::model::*;

const DOCTYPE: &str = r#"<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">"#;
const DEFAULT_VERSION: &str = "4.0";

/// Serialize a score to a MusicXML 4.0 partwise document.
pub fn score_to_musicxml(score: &Score) -> String {
    let mut xml = XmlBuilder::new();
    let version = score.version.as_deref().unwrap_or(DEFAULT_VERSION);

    xml.open("score-partwise", &[("version", version.to_string())]);
    write_header(&mut xml, score);
    write_part_list(&mut xml, score);
    for part in &score.parts {
        xml.open("part", &[("id", part.id.clone())]);
        for measure in &part.measures {
            write_measure(&mut xml, measure);
        }
        xml.close("part");
    }
    xml.close("score-partwise");

    xml.build()
}

// ═══════════════════════════════════════════════════════════════════════
// XmlBuilder
// ═══════════════════════════════════════════════════════════════════════

type Attrs = [(&'static str, String)];

struct XmlBuilder {
    lines: Vec<String>,
    depth: usize,
}

impl XmlBuilder {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            depth: 0,
        }
    }

    fn build(self) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#);
        out.push('\n');
        out.push_str(DOCTYPE);
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn push(&mut self, line: String) {
        let mut indented = "  ".repeat(self.depth);
        indented.push_str(&line);
        self.lines.push(indented);
    }

    fn open(&mut self, tag: &str, attrs: &Attrs) {
        self.push(format!("<{tag}{}>", attr_string(attrs)));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.push(format!("</{tag}>"));
    }

    /// `<tag attrs/>`
    fn empty(&mut self, tag: &str, attrs: &Attrs) {
        self.push(format!("<{tag}{}/>", attr_string(attrs)));
    }

    /// `<tag>text</tag>`
    fn leaf(&mut self, tag: &str, text: &str) {
        self.leaf_with(tag, &[], text);
    }

    fn leaf_with(&mut self, tag: &str, attrs: &Attrs, text: &str) {
        self.push(format!("<{tag}{}>{}</{tag}>", attr_string(attrs), escape(text)));
    }

    fn leaf_opt(&mut self, tag: &str, text: Option<&str>) {
        if let Some(text) = text {
            self.leaf(tag, text);
        }
    }

    fn leaf_num<T: std::fmt::Display>(&mut self, tag: &str, value: T) {
        self.leaf(tag, &value.to_string());
    }

    fn leaf_num_opt<T: std::fmt::Display>(&mut self, tag: &str, value: Option<T>) {
        if let Some(value) = value {
            self.leaf_num(tag, value);
        }
    }

    /// Write an element kept as read, with its whole subtree.
    fn element(&mut self, el: &XmlElement) {
        let attrs: String = el
            .attributes
            .iter()
            .map(|(name, value)| format!(r#" {name}="{}""#, escape(value)))
            .collect();
        let tag = &el.name;
        if !el.children.is_empty() {
            self.push(format!("<{tag}{attrs}>"));
            self.depth += 1;
            for child in &el.children {
                self.element(child);
            }
            self.close(tag);
        } else if let Some(text) = &el.text {
            self.push(format!("<{tag}{attrs}>{}</{tag}>", escape(text)));
        } else {
            self.push(format!("<{tag}{attrs}/>"));
        }
    }
}

fn attr_string(attrs: &Attrs) -> String {
    attrs
        .iter()
        .map(|(name, value)| format!(r#" {name}="{}""#, escape(value)))
        .collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ═══════════════════════════════════════════════════════════════════════
// Header
// ═══════════════════════════════════════════════════════════════════════

fn write_header(xml: &mut XmlBuilder, score: &Score) {
    if let Some(title) = &score.title {
        xml.open("work", &[]);
        xml.leaf("work-title", title);
        xml.close("work");
    }

    if score.composer.is_some() || score.software.is_some() {
        xml.open("identification", &[]);
        if let Some(composer) = &score.composer {
            xml.leaf_with("creator", &[("type", "composer".to_string())], composer);
        }
        if let Some(software) = &score.software {
            xml.open("encoding", &[]);
            xml.leaf("software", software);
            xml.close("encoding");
        }
        xml.close("identification");
    }
}

fn write_part_list(xml: &mut XmlBuilder, score: &Score) {
    xml.open("part-list", &[]);
    for part in &score.parts {
        xml.open("score-part", &[("id", part.id.clone())]);
        xml.leaf("part-name", &part.name);
        xml.leaf_opt("part-abbreviation", part.abbreviation.as_deref());

        if part.midi_channel.is_some() || part.midi_program.is_some() {
            // midi-instrument must reference a declared score-instrument
            let instrument_id = format!("{}-I1", part.id);
            xml.open("score-instrument", &[("id", instrument_id.clone())]);
            xml.leaf("instrument-name", &part.name);
            xml.close("score-instrument");
            xml.open("midi-instrument", &[("id", instrument_id)]);
            xml.leaf_num_opt("midi-channel", part.midi_channel);
            xml.leaf_num_opt("midi-program", part.midi_program);
            xml.close("midi-instrument");
        }
        xml.close("score-part");
    }
    xml.close("part-list");
}

// ═══════════════════════════════════════════════════════════════════════
// Measures
// ═══════════════════════════════════════════════════════════════════════

fn write_measure(xml: &mut XmlBuilder, measure: &Measure) {
    let mut attrs = vec![("number", measure.number.clone())];
    if measure.implicit {
        attrs.push(("implicit", "yes".to_string()));
    }
    if let Some(width) = measure.width {
        attrs.push(("width", width.to_string()));
    }
    xml.open("measure", &attrs);

    if measure.new_system || measure.new_page {
        let mut print = Vec::new();
        if measure.new_system {
            print.push(("new-system", "yes".to_string()));
        }
        if measure.new_page {
            print.push(("new-page", "yes".to_string()));
        }
        xml.empty("print", &print);
    }

    for element in &measure.elements {
        match element {
            MeasureElement::Attributes(a) => write_attributes(xml, a),
            MeasureElement::Note(n) => write_note(xml, n),
            MeasureElement::Backup { duration } => {
                xml.open("backup", &[]);
                xml.leaf_num("duration", duration);
                xml.close("backup");
            }
            MeasureElement::Forward { duration } => {
                xml.open("forward", &[]);
                xml.leaf_num("duration", duration);
                xml.close("forward");
            }
            MeasureElement::Harmony(h) => write_harmony(xml, h),
            MeasureElement::Direction(d) => write_direction(xml, d),
            MeasureElement::Barline(b) => write_barline(xml, b),
            MeasureElement::Other(el) => xml.element(el),
        }
    }

    xml.close("measure");
}

fn write_attributes(xml: &mut XmlBuilder, attrs: &Attributes) {
    xml.open("attributes", &[]);
    xml.leaf_num_opt("divisions", attrs.divisions);

    if let Some(key) = &attrs.key {
        xml.open("key", &[]);
        xml.leaf_num("fifths", key.fifths);
        xml.leaf_opt("mode", key.mode.as_deref());
        xml.close("key");
    }

    if let Some(time) = &attrs.time {
        let time_attrs: Vec<_> = time
            .symbol
            .iter()
            .map(|s| ("symbol", s.clone()))
            .collect();
        xml.open("time", &time_attrs);
        xml.leaf_num("beats", time.beats);
        xml.leaf_num("beat-type", time.beat_type);
        xml.close("time");
    }

    xml.leaf_num_opt("staves", attrs.staves);

    for clef in &attrs.clefs {
        xml.open("clef", &[("number", clef.number.to_string())]);
        xml.leaf("sign", &clef.sign);
        xml.leaf_num("line", clef.line);
        xml.leaf_num_opt("clef-octave-change", clef.octave_change);
        xml.close("clef");
    }

    if let Some(t) = &attrs.transpose {
        xml.open("transpose", &[]);
        xml.leaf_num("diatonic", t.diatonic);
        xml.leaf_num("chromatic", t.chromatic);
        xml.leaf_num_opt("octave-change", t.octave_change);
        xml.close("transpose");
    }

    xml.close("attributes");
}

fn write_note(xml: &mut XmlBuilder, note: &Note) {
    let mut attrs = Vec::new();
    if let Some(x) = note.default_x {
        attrs.push(("default-x", x.to_string()));
    }
    if let Some(y) = note.default_y {
        attrs.push(("default-y", y.to_string()));
    }
    if let Some(color) = &note.color {
        attrs.push(("color", color.clone()));
    }
    xml.open("note", &attrs);

    if note.grace {
        if note.grace_slash {
            xml.empty("grace", &[("slash", "yes".to_string())]);
        } else {
            xml.empty("grace", &[]);
        }
    }
    if note.chord {
        xml.empty("chord", &[]);
    }

    if let Some(pitch) = &note.pitch {
        xml.open("pitch", &[]);
        xml.leaf("step", &pitch.step);
        xml.leaf_num_opt("alter", pitch.alter);
        xml.leaf_num("octave", pitch.octave);
        xml.close("pitch");
    } else if let Some(display) = &note.unpitched {
        xml.open("unpitched", &[]);
        xml.leaf("display-step", &display.step);
        xml.leaf_num("display-octave", display.octave);
        xml.close("unpitched");
    } else if note.measure_rest {
        xml.empty("rest", &[("measure", "yes".to_string())]);
    } else {
        xml.empty("rest", &[]);
    }

    if !note.grace {
        xml.leaf_num("duration", note.duration);
    }
    if note.tie_stop {
        xml.empty("tie", &[("type", "stop".to_string())]);
    }
    if note.tie_start {
        xml.empty("tie", &[("type", "start".to_string())]);
    }

    xml.leaf_num_opt("voice", note.voice);
    xml.leaf_opt("type", note.note_type.as_deref());
    for _ in 0..note.dots {
        xml.empty("dot", &[]);
    }
    xml.leaf_opt("accidental", note.accidental.as_deref());

    if let Some(tm) = &note.time_modification {
        xml.open("time-modification", &[]);
        xml.leaf_num("actual-notes", tm.actual_notes);
        xml.leaf_num("normal-notes", tm.normal_notes);
        xml.close("time-modification");
    }

    xml.leaf_opt("stem", note.stem.as_deref());
    if let Some(notehead) = &note.notehead {
        xml.element(notehead);
    }
    xml.leaf_num_opt("staff", note.staff);

    for beam in &note.beams {
        xml.leaf_with("beam", &[("number", beam.number.to_string())], &beam.beam_type);
    }

    if !note.notations.is_empty() || !note.slurs.is_empty() {
        xml.open("notations", &[]);
        for notation in &note.notations {
            xml.element(notation);
        }
        for slur in &note.slurs {
            let mut slur_attrs = vec![
                ("type", slur.slur_type.clone()),
                ("number", slur.number.to_string()),
            ];
            if let Some(placement) = &slur.placement {
                slur_attrs.push(("placement", placement.clone()));
            }
            xml.empty("slur", &slur_attrs);
        }
        xml.close("notations");
    }

    for lyric in &note.lyrics {
        xml.open("lyric", &[("number", lyric.number.to_string())]);
        xml.leaf_opt("syllabic", lyric.syllabic.as_deref());
        xml.leaf("text", &lyric.text);
        xml.close("lyric");
    }

    xml.close("note");
}

fn write_harmony(xml: &mut XmlBuilder, harmony: &Harmony) {
    xml.open("harmony", &[]);
    xml.open("root", &[]);
    xml.leaf("root-step", &harmony.root.step);
    xml.leaf_num_opt("root-alter", harmony.root.alter);
    xml.close("root");
    xml.leaf("kind", &harmony.kind);
    if let Some(bass) = &harmony.bass {
        xml.open("bass", &[]);
        xml.leaf("bass-step", &bass.step);
        xml.leaf_num_opt("bass-alter", bass.alter);
        xml.close("bass");
    }
    xml.close("harmony");
}

fn write_direction(xml: &mut XmlBuilder, dir: &Direction) {
    if !dir.has_display() {
        // Tempo-only directions are written as a bare <sound>
        if let Some(tempo) = dir.sound_tempo {
            xml.empty("sound", &[("tempo", tempo.to_string())]);
        }
        return;
    }

    let attrs: Vec<_> = dir
        .placement
        .iter()
        .map(|p| ("placement", p.clone()))
        .collect();
    xml.open("direction", &attrs);

    for kind in &dir.types {
        xml.open("direction-type", &[]);
        match kind {
            DirectionType::Words(words) => xml.leaf("words", words),
            DirectionType::Dynamics(mark) => {
                xml.open("dynamics", &[]);
                xml.empty(mark, &[]);
                xml.close("dynamics");
            }
            DirectionType::Metronome(metronome) => {
                xml.open("metronome", &[]);
                xml.leaf("beat-unit", &metronome.beat_unit);
                if metronome.dotted {
                    xml.empty("beat-unit-dot", &[]);
                }
                xml.leaf_num("per-minute", metronome.per_minute);
                xml.close("metronome");
            }
            DirectionType::Other(el) => xml.element(el),
        }
        xml.close("direction-type");
    }

    xml.leaf_num_opt("voice", dir.voice);
    xml.leaf_num_opt("staff", dir.staff);
    if let Some(tempo) = dir.sound_tempo {
        xml.empty("sound", &[("tempo", tempo.to_string())]);
    }
    xml.close("direction");
}

fn write_barline(xml: &mut XmlBuilder, barline: &Barline) {
    xml.open("barline", &[("location", barline.location.clone())]);
    xml.leaf_opt("bar-style", barline.bar_style.as_deref());
    if let Some(ending) = &barline.ending {
        let attrs = [
            ("number", ending.number.clone()),
            ("type", ending.ending_type.clone()),
        ];
        match &ending.text {
            Some(text) => xml.leaf_with("ending", &attrs, text),
            None => xml.empty("ending", &attrs),
        }
    }
    if let Some(repeat) = &barline.repeat {
        xml.empty("repeat", &[("direction", repeat.direction.clone())]);
    }
    xml.close("barline");
}
