//! Data model for representing a parsed MusicXML score.
//!
//! The model keeps the musical content a notation renderer needs and keeps
//! measure contents in document order, so a score can be written back out
//! without losing voice positioning (`backup` / `forward`).

/// A complete musical score parsed from MusicXML.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Title of the piece (`<work-title>`, falling back to `<movement-title>`)
    pub title: Option<String>,
    /// Composer name
    pub composer: Option<String>,
    /// MusicXML version (e.g., "3.1", "4.0")
    pub version: Option<String>,
    /// Software that created the file
    pub software: Option<String>,
    /// Musical parts (instruments)
    pub parts: Vec<Part>,
}

/// A musical part (one instrument or voice).
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    /// Part identifier (e.g., "P1")
    pub id: String,
    /// Part name (e.g., "Violin")
    pub name: String,
    /// Abbreviated name (e.g., "Vln.")
    pub abbreviation: Option<String>,
    /// MIDI program number
    pub midi_program: Option<i32>,
    /// MIDI channel
    pub midi_channel: Option<i32>,
    /// Ordered list of measures
    pub measures: Vec<Measure>,
}

/// A single measure (bar) of music.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    /// Measure number as written (MusicXML allows tokens such as "12a")
    pub number: String,
    /// Whether this is an implicit measure (e.g., pickup/anacrusis)
    pub implicit: bool,
    /// Width in tenths (for layout)
    pub width: Option<f64>,
    /// Whether this measure starts a new system (line break)
    pub new_system: bool,
    /// Whether this measure starts a new page
    pub new_page: bool,
    /// Measure contents in document order
    pub elements: Vec<MeasureElement>,
}

/// One child of a `<measure>`.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureElement {
    Attributes(Attributes),
    Note(Note),
    /// Move the cursor back by a duration (start of another voice/staff)
    Backup { duration: i32 },
    /// Move the cursor forward by a duration (invisible rest)
    Forward { duration: i32 },
    Harmony(Harmony),
    Direction(Direction),
    Barline(Barline),
    /// Any other measure child (figured bass, grouping, a bare `<sound>`
    /// carrying more than a tempo, ...)
    Other(XmlElement),
}

/// An element kept as read, for notation the model has no dedicated type for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Trimmed text content; only kept for leaf elements
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

/// Musical attributes that may change at the start of a measure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    /// Divisions per quarter note (determines duration resolution)
    pub divisions: Option<i32>,
    /// Key signature
    pub key: Option<Key>,
    /// Time signature
    pub time: Option<TimeSignature>,
    /// Number of staves in this part (e.g. 2 for piano grand staff)
    pub staves: Option<i32>,
    /// Clefs, one per staff, each tagged with a staff `number`
    pub clefs: Vec<Clef>,
    /// Transposition
    pub transpose: Option<Transpose>,
}

/// Key signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    /// Number of sharps (positive) or flats (negative)
    pub fifths: i32,
    /// Mode (e.g., "major", "minor")
    pub mode: Option<String>,
}

/// Time signature.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    pub beats: i32,
    /// Denominator (e.g., 4 in 3/4)
    pub beat_type: i32,
    /// Display symbol: "common", "cut", ...
    pub symbol: Option<String>,
}

/// Clef definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Clef {
    /// Staff number this clef belongs to (1-based; defaults to 1)
    pub number: i32,
    /// Clef sign: "G" (treble), "F" (bass), "C" (alto/tenor)
    pub sign: String,
    /// Staff line the clef sits on
    pub line: i32,
    /// Octave transposition (e.g., -1 for guitar's octave-lower treble clef)
    pub octave_change: Option<i32>,
}

/// Transposition information.
#[derive(Debug, Clone, PartialEq)]
pub struct Transpose {
    pub diatonic: i32,
    pub chromatic: i32,
    pub octave_change: Option<i32>,
}

/// A single note or rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Note {
    /// Pitch (None for rests and unpitched notes)
    pub pitch: Option<Pitch>,
    /// Display position of an unpitched (percussion) note
    pub unpitched: Option<Pitch>,
    /// Whether this is a rest
    pub rest: bool,
    /// Whether the rest fills the whole measure
    pub measure_rest: bool,
    /// Duration in divisions (grace notes have none)
    pub duration: i32,
    /// Whether this is a grace note
    pub grace: bool,
    /// Whether the grace note is slashed (acciaccatura)
    pub grace_slash: bool,
    /// Whether this note is part of a chord with the previous note
    pub chord: bool,
    /// Tie starts at this note
    pub tie_start: bool,
    /// Tie ends at this note
    pub tie_stop: bool,
    /// Voice number (for multi-voice writing)
    pub voice: Option<i32>,
    /// Note type: "whole", "half", "quarter", "eighth", "16th", "32nd"
    pub note_type: Option<String>,
    /// Number of augmentation dots
    pub dots: u32,
    /// Accidental: "sharp", "flat", "natural", "double-sharp", "flat-flat"
    pub accidental: Option<String>,
    /// Tuplet ratio
    pub time_modification: Option<TimeModification>,
    /// Stem direction: "up" or "down"
    pub stem: Option<String>,
    /// Notehead shape (`<notehead>x</notehead>`, ...)
    pub notehead: Option<XmlElement>,
    /// Staff number (1-based; for multi-staff parts like piano)
    pub staff: Option<i32>,
    /// Beam information
    pub beams: Vec<Beam>,
    /// Slur starts/stops attached to this note
    pub slurs: Vec<Slur>,
    /// Every other `<notations>` child: tied, tuplet, articulations,
    /// fermata, ornaments, technical, ...
    pub notations: Vec<XmlElement>,
    /// Lyrics attached to this note
    pub lyrics: Vec<Lyric>,
    /// Display color as "#RRGGBB" or "#AARRGGBB"
    pub color: Option<String>,
    /// Default X position in tenths (for layout)
    pub default_x: Option<f64>,
    /// Default Y position in tenths (for layout)
    pub default_y: Option<f64>,
}

/// Pitch of a note.
#[derive(Debug, Clone, PartialEq)]
pub struct Pitch {
    /// Note name: A, B, C, D, E, F, G
    pub step: String,
    /// Octave number (middle C = C4)
    pub octave: i32,
    /// Chromatic alteration: -1.0 = flat, 1.0 = sharp, 0.0 = natural
    pub alter: Option<f64>,
}

/// Tuplet ratio, e.g. 3 in the time of 2.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeModification {
    pub actual_notes: i32,
    pub normal_notes: i32,
}

/// Beam grouping information.
#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    /// Beam level (1 = eighth-note beam, 2 = sixteenth-note beam, etc.)
    pub number: i32,
    /// Beam type: "begin", "continue", "end"
    pub beam_type: String,
}

/// Slur event attached to a note.
#[derive(Debug, Clone, PartialEq)]
pub struct Slur {
    /// "start", "stop", or "continue"
    pub slur_type: String,
    pub number: i32,
    pub placement: Option<String>,
}

/// One lyric syllable.
#[derive(Debug, Clone, PartialEq)]
pub struct Lyric {
    /// Verse number
    pub number: i32,
    /// "single", "begin", "middle", "end"
    pub syllabic: Option<String>,
    pub text: String,
}

/// A chord symbol (harmony).
#[derive(Debug, Clone, PartialEq)]
pub struct Harmony {
    /// Root note
    pub root: HarmonyRoot,
    /// Chord quality: "major", "minor", "dominant", "diminished", etc.
    pub kind: String,
    /// Bass note (for slash chords)
    pub bass: Option<HarmonyRoot>,
}

/// Root or bass note of a harmony.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonyRoot {
    /// Note name: A–G
    pub step: String,
    /// Alteration: -1 = flat, 1 = sharp
    pub alter: Option<f64>,
}

/// A direction: text, dynamics, tempo marking, hairpin, ...
///
/// A direction with only `sound_tempo` set corresponds to a bare `<sound>`
/// element in the measure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Direction {
    /// "above" or "below"
    pub placement: Option<String>,
    /// `<direction-type>` contents in document order
    pub types: Vec<DirectionType>,
    pub voice: Option<i32>,
    pub staff: Option<i32>,
    /// Playback tempo in quarter notes per minute
    pub sound_tempo: Option<f64>,
}

/// One item inside `<direction-type>`.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectionType {
    Words(String),
    /// A single standard dynamic mark, e.g. "p", "mf", "ff"
    Dynamics(String),
    Metronome(MetronomeMark),
    /// Wedges, octave shifts, pedals, rehearsal marks, ...
    Other(XmlElement),
}

impl Direction {
    /// Whether anything beyond a playback tempo is displayed.
    pub fn has_display(&self) -> bool {
        !self.types.is_empty()
    }
}

/// A metronome mark such as ♩ = 120.
#[derive(Debug, Clone, PartialEq)]
pub struct MetronomeMark {
    pub beat_unit: String,
    pub dotted: bool,
    pub per_minute: i32,
}

/// A barline (may include repeat signs).
#[derive(Debug, Clone, PartialEq)]
pub struct Barline {
    /// Location: "left", "right", "middle"
    pub location: String,
    /// Visual style: "regular", "light-light", "light-heavy", "heavy-light", etc.
    pub bar_style: Option<String>,
    /// Volta bracket (1st/2nd ending)
    pub ending: Option<Ending>,
    /// Repeat sign
    pub repeat: Option<Repeat>,
}

/// A repeat sign on a barline.
#[derive(Debug, Clone, PartialEq)]
pub struct Repeat {
    /// "forward" or "backward"
    pub direction: String,
}

/// A volta bracket (1st/2nd ending).
#[derive(Debug, Clone, PartialEq)]
pub struct Ending {
    /// Ending number(s), e.g., "1", "2", "1, 2"
    pub number: String,
    /// "start", "stop", or "discontinue"
    pub ending_type: String,
    /// Display text
    pub text: Option<String>,
}

impl Score {
    /// Create a new empty score.
    pub fn new() -> Self {
        Self {
            title: None,
            composer: None,
            version: None,
            software: None,
            parts: Vec::new(),
        }
    }

    /// Number of measures in the first part.
    pub fn measure_count(&self) -> usize {
        self.parts.first().map_or(0, |p| p.measures.len())
    }

    /// Copy of the metadata without any parts.
    pub fn clone_header(&self) -> Self {
        Self {
            title: self.title.clone(),
            composer: self.composer.clone(),
            version: self.version.clone(),
            software: self.software.clone(),
            parts: Vec::new(),
        }
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

impl Part {
    /// Copy of the part's identity without any measures.
    pub fn clone_header(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            abbreviation: self.abbreviation.clone(),
            midi_program: self.midi_program,
            midi_channel: self.midi_channel,
            measures: Vec::new(),
        }
    }

    /// Attributes in effect at the start of measure `index`, i.e. every
    /// `<attributes>` block from measure 0 up to and including `index`
    /// merged in order.
    pub fn attributes_at(&self, index: usize) -> Attributes {
        let mut effective = Attributes::default();
        for measure in self.measures.iter().take(index + 1) {
            for attrs in measure.attributes() {
                effective.overlay(attrs);
            }
        }
        effective
    }
}

impl Measure {
    /// Create an empty measure with the given number.
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            implicit: false,
            width: None,
            new_system: false,
            new_page: false,
            elements: Vec::new(),
        }
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.elements.iter().filter_map(|e| match e {
            MeasureElement::Note(n) => Some(n),
            _ => None,
        })
    }

    pub fn notes_mut(&mut self) -> impl Iterator<Item = &mut Note> {
        self.elements.iter_mut().filter_map(|e| match e {
            MeasureElement::Note(n) => Some(n),
            _ => None,
        })
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attributes> {
        self.elements.iter().filter_map(|e| match e {
            MeasureElement::Attributes(a) => Some(a),
            _ => None,
        })
    }

    pub fn barlines(&self) -> impl Iterator<Item = &Barline> {
        self.elements.iter().filter_map(|e| match e {
            MeasureElement::Barline(b) => Some(b),
            _ => None,
        })
    }
}

impl Attributes {
    /// Apply `other` on top of `self`: every value `other` sets replaces
    /// ours; clefs are replaced per staff number.
    pub fn overlay(&mut self, other: &Attributes) {
        if other.divisions.is_some() {
            self.divisions = other.divisions;
        }
        if other.key.is_some() {
            self.key = other.key.clone();
        }
        if other.time.is_some() {
            self.time = other.time.clone();
        }
        if other.staves.is_some() {
            self.staves = other.staves;
        }
        if other.transpose.is_some() {
            self.transpose = other.transpose.clone();
        }
        for clef in &other.clefs {
            match self.clefs.iter_mut().find(|c| c.number == clef.number) {
                Some(existing) => *existing = clef.clone(),
                None => self.clefs.push(clef.clone()),
            }
        }
        self.clefs.sort_by_key(|c| c.number);
    }

    /// Length of a full measure in divisions. Missing values default to one
    /// division per quarter and 4/4.
    pub fn measure_duration(&self) -> i32 {
        let divisions = self.divisions.unwrap_or(1);
        let (beats, beat_type) = self
            .time
            .as_ref()
            .map_or((4, 4), |t| (t.beats, t.beat_type.max(1)));
        divisions * 4 * beats / beat_type
    }

    pub fn is_empty(&self) -> bool {
        self.divisions.is_none()
            && self.key.is_none()
            && self.time.is_none()
            && self.staves.is_none()
            && self.clefs.is_empty()
            && self.transpose.is_none()
    }
}

impl Note {
    /// Whether this carries a pitch (not a rest, not unpitched).
    pub fn is_pitched(&self) -> bool {
        !self.rest && self.pitch.is_some()
    }
}
