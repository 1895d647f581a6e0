//! Excerpt selection: pick a random run of measures from a score, cut it out
//! across all parts, and mark the first note.

use std::path::Path;

use rand::Rng;
use tracing::debug;

use crate::error::SectionError;
use crate::model::{Attributes, Measure, MeasureElement, Note, Part, Score};
use crate::writer::score_to_musicxml;

/// Number of measures in every excerpt.
pub const MEASURE_COUNT: usize = 2;

/// Display color given to the highlighted note (green).
pub const HIGHLIGHT_COLOR: &str = "#008000";

/// Inclusive range of measure indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// An excerpt cut from a score.
#[derive(Debug, Clone)]
pub struct Section {
    pub window: Window,
    pub score: Score,
    /// Whether a note was found to highlight
    pub highlighted: bool,
}

impl Section {
    pub fn to_musicxml(&self) -> String {
        score_to_musicxml(&self.score)
    }
}

/// Parse the score at `path` and cut a random section from it.
pub fn load_section<P: AsRef<Path>, R: Rng>(
    path: P,
    rng: &mut R,
) -> Result<Section, SectionError> {
    let score = crate::parse_file(path)?;
    select_section(&score, rng)
}

/// Cut a random [`MEASURE_COUNT`]-measure section from `score`.
///
/// The window is chosen against the first part's measures and applied to
/// every part. The first pitched note of the first measure of the first part
/// is colored with [`HIGHLIGHT_COLOR`]; when there is none the section is
/// returned unhighlighted.
pub fn select_section<R: Rng>(score: &Score, rng: &mut R) -> Result<Section, SectionError> {
    let first = score.parts.first().ok_or(SectionError::InsufficientParts)?;
    let window = choose_window(first.measures.len(), MEASURE_COUNT, rng)?;
    debug!(start = window.start, end = window.end, "selected measure window");

    let mut excerpt = extract_measures(score, window);
    let highlighted = highlight_first_note(&mut excerpt, HIGHLIGHT_COLOR);
    if !highlighted {
        debug!("no note to highlight in the first measure of the section");
    }

    Ok(Section {
        window,
        score: excerpt,
        highlighted,
    })
}

/// Pick a uniformly random window of `length` measures out of
/// `measure_count`. `length` must be at least 1.
pub fn choose_window<R: Rng>(
    measure_count: usize,
    length: usize,
    rng: &mut R,
) -> Result<Window, SectionError> {
    debug_assert!(length > 0, "window length must be positive");
    if measure_count < length {
        return Err(SectionError::InsufficientMeasures {
            required: length,
            found: measure_count,
        });
    }
    let start = rng.gen_range(0..=measure_count - length);
    Ok(Window {
        start,
        end: start + length - 1,
    })
}

/// Copy of `score` keeping only the measures inside `window`, in every part.
///
/// Parts that end before the window does are padded with whole-measure
/// rests, so every part has `window.len()` measures. The first measure of
/// each part is given the attributes (divisions, key, time, clefs, ...) in
/// effect where the window starts, so the excerpt stands on its own.
pub fn extract_measures(score: &Score, window: Window) -> Score {
    let mut excerpt = Score {
        parts: Vec::with_capacity(score.parts.len()),
        ..score.clone_header()
    };
    let numbers = score.parts.first().map(|p| p.measures.as_slice()).unwrap_or_default();

    for part in &score.parts {
        let mut measures: Vec<_> = part
            .measures
            .iter()
            .skip(window.start)
            .take(window.len())
            .cloned()
            .collect();

        if measures.len() < window.len() {
            debug!(part = %part.id, "padding short part with rests");
        }
        for index in window.start + measures.len()..=window.end {
            let number = numbers
                .get(index)
                .map_or_else(|| (index + 1).to_string(), |m| m.number.clone());
            measures.push(rest_measure(number, &part.attributes_at(index)));
        }

        if window.start > 0 {
            if let Some(first) = measures.first_mut() {
                let mut context = part.attributes_at(window.start - 1);
                match first.elements.first_mut() {
                    // Attributes at the very start of the measure win over the context
                    Some(MeasureElement::Attributes(own)) => {
                        context.overlay(own);
                        *own = context;
                    }
                    _ if !context.is_empty() => {
                        first.elements.insert(0, MeasureElement::Attributes(context));
                    }
                    _ => {}
                }
            }
        }

        excerpt.parts.push(Part {
            measures,
            ..part.clone_header()
        });
    }

    excerpt
}

/// A measure holding a single whole-measure rest.
fn rest_measure(number: String, attrs: &Attributes) -> Measure {
    let mut measure = Measure::new(number);
    measure.elements.push(MeasureElement::Note(Note {
        rest: true,
        measure_rest: true,
        duration: attrs.measure_duration(),
        voice: Some(1),
        ..Default::default()
    }));
    measure
}

/// Color the first single pitched note in the first measure of the first
/// part. Rests, unpitched notes and chord members are skipped. Returns
/// whether a note was found.
pub fn highlight_first_note(score: &mut Score, color: &str) -> bool {
    let Some(measure) = score
        .parts
        .first_mut()
        .and_then(|p| p.measures.first_mut())
    else {
        return false;
    };

    let mut notes: Vec<_> = measure.notes_mut().collect();
    // A note followed by a <chord/> note is the bottom of that chord
    let found = (0..notes.len()).find(|&i| {
        notes[i].is_pitched() && !notes[i].chord && !notes.get(i + 1).is_some_and(|n| n.chord)
    });

    match found {
        Some(i) => {
            notes[i].color = Some(color.to_string());
            true
        }
        None => false,
    }
}
