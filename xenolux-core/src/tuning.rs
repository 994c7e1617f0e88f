//! # Musical Tuning Module
//!
//! Equal-temperament note math for the tuner. Converts a detected frequency
//! into the nearest named note and the signed deviation from it in cents.
//!
//! ## Features
//! - MIDI note table (0..=127) referenced to A4 = 440 Hz at note 69
//! - Nearest-note search with a fixed round-half-up tie-break
//! - Cent deviation calculation (positive = sharp, negative = flat)
//! - Frequency band filter that drops rumble and hiss before analysis

use once_cell::sync::Lazy;

/// Reference pitch for A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI_NOTE: i32 = 69;

/// Lowest frequency the analyzer accepts (inclusive bound).
pub const MIN_FREQUENCY: f32 = 50.0;

/// Highest frequency the analyzer accepts (inclusive bound).
pub const MAX_FREQUENCY: f32 = 5000.0;

/// Distance from a half-semitone point, in semitones, that still counts as
/// a tie. An `f32` input is only resolved to about 1e-6 semitones, so an
/// exact quarter-tone can arrive a hair below the half.
const TIE_TOLERANCE: f64 = 1e-5;

/// Pitch class names, starting at C. MIDI note 0 is C in octave -1.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A single named note of the MIDI range.
#[derive(Debug, Clone)]
pub struct Note {
    /// Pitch class (e.g. "C#")
    pub name: &'static str,
    /// Octave number, -1 for MIDI notes 0..=11
    pub octave: i32,
    /// Equal-temperament frequency in Hz
    pub frequency: f64,
}

/// Every MIDI note with its name, octave and equal-temperament frequency.
///
/// Computed once on first use. The analyzer reads target frequencies from
/// here so the same value is used for every frame.
static NOTES: Lazy<Vec<Note>> = Lazy::new(|| {
    (0..128)
        .map(|midi: i32| Note {
            name: NOTE_NAMES[midi.rem_euclid(12) as usize],
            octave: midi.div_euclid(12) - 1,
            frequency: midi_to_frequency(midi),
        })
        .collect()
});

/// The outcome of analysing one frequency estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningResult {
    /// Pitch class of the nearest note (e.g. "A")
    pub note_name: &'static str,
    /// Octave of the nearest note
    pub octave: i32,
    /// Signed deviation in cents (negative = flat, positive = sharp)
    pub cents: f32,
    /// MIDI number of the nearest note
    pub midi_note: i32,
}

impl TuningResult {
    /// Note name with octave, e.g. "C#3".
    pub fn label(&self) -> String {
        format!("{}{}", self.note_name, self.octave)
    }
}

/// Finds the nearest equal-temperament note to `frequency`.
///
/// # Arguments
/// * `frequency` - Frequency estimate in Hz
///
/// # Returns
/// * `Some(result)` - Nearest note and deviation in cents
/// * `None` - Frequency outside [50, 5000] Hz or below MIDI note 0
pub fn analyze(frequency: f32) -> Option<TuningResult> {
    // NaN fails both comparisons, so reject it explicitly.
    if !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&frequency) {
        return None;
    }
    let frequency = f64::from(frequency);

    let exact_note = f64::from(A4_MIDI_NOTE) + 12.0 * (frequency / f64::from(A4_FREQUENCY)).log2();
    let closest_note = round_half_up(exact_note + TIE_TOLERANCE);
    if closest_note < 0 {
        return None;
    }

    let note = NOTES.get(closest_note as usize)?;
    Some(TuningResult {
        note_name: note.name,
        octave: note.octave,
        cents: cents_between(frequency, note.frequency) as f32,
        midi_note: closest_note,
    })
}

/// Rounds to the nearest integer, with exact halves going up (towards +inf).
///
/// `69.5` becomes `70` and `-0.5` becomes `0`.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Equal-temperament frequency of a MIDI note in Hz.
pub fn midi_to_frequency(midi_note: i32) -> f64 {
    f64::from(A4_FREQUENCY) * 2.0_f64.powf(f64::from(midi_note - A4_MIDI_NOTE) / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
///
/// # Returns
/// * Cent deviation (positive = sharp, negative = flat)
pub fn cents_between(frequency: f64, target_frequency: f64) -> f64 {
    1200.0 * (frequency / target_frequency).log2()
}
