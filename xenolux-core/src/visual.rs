//! # Visual Mapping Module
//!
//! Maps a classified frame onto the tuner's visuals: a fixed gold target
//! ring, a pitch ring whose size tracks the cent deviation, and the text
//! readouts. Sizes are in *vmin* (1/100 of the shorter window side) so the
//! renderer only has to scale.
//!
//! The `Animator` holds the only state that survives between frames, and it
//! is purely cosmetic: rotation, the eased ring size and the jitter source.

use crate::classify::TuningState;
use crate::session::FrameReport;
use crate::tuning::{MIN_FREQUENCY, TuningResult};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Diameter of the target ring.
pub const TARGET_DIAMETER: f32 = 40.0;
/// Pitch ring diameter at -50 cents.
pub const FLAT_DIAMETER: f32 = 25.0;
/// Pitch ring diameter at +50 cents.
pub const SHARP_DIAMETER: f32 = 55.0;
/// Smallest and largest pitch ring the renderer will draw.
pub const DIAMETER_LIMITS: (f32, f32) = (20.0, 60.0);
/// Jitter amplitude at full loudness.
pub const MAX_VIBRATION: f32 = 6.0;

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn grey(level: u8) -> Self {
        Self::rgb(level, level, level)
    }
}

pub const BACKGROUND: Rgba = Rgba::rgb(15, 10, 20);
pub const GOLD: Rgba = Rgba::rgb(230, 180, 80);
pub const TARGET_RING: Rgba = Rgba { a: 100, ..GOLD };
pub const TEAL: Rgba = Rgba::rgb(0, 255, 200);
pub const PURPLE: Rgba = Rgba::rgb(180, 100, 255);
pub const WARNING: Rgba = Rgba::rgb(255, 100, 100);
pub const WHITE: Rgba = Rgba::grey(255);
pub const DIM: Rgba = Rgba::grey(100);
pub const FAINT: Rgba = Rgba::grey(50);

/// Stroke of a ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingStyle {
    /// Target diameter before easing and jitter
    pub diameter: f32,
    pub stroke_width: f32,
    pub color: Rgba,
    /// Half-width of the random jitter applied to each axis
    pub vibration: f32,
}

/// The fixed reference ring.
pub fn target_ring() -> RingStyle {
    RingStyle {
        diameter: TARGET_DIAMETER,
        stroke_width: 2.0,
        color: TARGET_RING,
        vibration: 0.0,
    }
}

/// The pitch ring for this frame, if a note is being shown.
pub fn pitch_ring(frame: &FrameReport) -> Option<RingStyle> {
    if !frame.state.has_pitch() {
        return None;
    }
    let result = frame.result?;
    let vibration = frame.loudness.clamp(0.0, 1.0) * MAX_VIBRATION;

    Some(if frame.state == TuningState::InTune {
        RingStyle {
            diameter: TARGET_DIAMETER,
            stroke_width: 6.0,
            color: TEAL,
            vibration,
        }
    } else {
        RingStyle {
            diameter: cents_to_diameter(result.cents),
            stroke_width: 3.0,
            color: PURPLE,
            vibration,
        }
    })
}

/// Linear map of -50..50 cents onto the flat..sharp diameters, clamped to
/// the drawable limits. Values beyond ±50 cents extrapolate until clamped.
pub fn cents_to_diameter(cents: f32) -> f32 {
    let t = (cents + 50.0) / 100.0;
    let diameter = FLAT_DIAMETER + t * (SHARP_DIAMETER - FLAT_DIAMETER);
    diameter.clamp(DIAMETER_LIMITS.0, DIAMETER_LIMITS.1)
}

/// The status line under the note name.
pub fn headline(state: TuningState) -> Option<(&'static str, Rgba)> {
    match state {
        TuningState::InTune => Some(("PERFECT HARMONY", TEAL)),
        TuningState::Flat => Some(("FLAT", WARNING)),
        TuningState::Sharp => Some(("SHARP", WARNING)),
        _ => None,
    }
}

/// Frequency readout: one decimal place while a signal is present.
pub fn frequency_label(frequency: f32) -> (String, Rgba) {
    if frequency > MIN_FREQUENCY {
        (format!("{:.1} Hz", frequency), PURPLE)
    } else {
        ("--- Hz".to_string(), DIM)
    }
}

/// Large note readout, e.g. "A4", or dashes when there is nothing to show.
pub fn note_label(result: Option<&TuningResult>) -> (String, Rgba) {
    match result {
        Some(result) => (result.label(), GOLD),
        None => ("---".to_string(), FAINT),
    }
}

/// Pose of the pitch ring for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPose {
    pub width: f32,
    pub height: f32,
    /// Rotation in radians
    pub rotation: f32,
}

/// Frame-to-frame animation state for the pitch ring.
#[derive(Debug, Clone)]
pub struct Animator {
    rotation_step: f32,
    smoothing: f32,
    rotation: f32,
    diameter: Option<f32>,
    rng: SmallRng,
}

impl Animator {
    /// # Arguments
    /// * `rotation_step` - Radians added every frame
    /// * `smoothing` - Share of the gap to the target closed each frame (1.0 = snap)
    pub fn new(rotation_step: f32, smoothing: f32) -> Self {
        Self::with_rng(rotation_step, smoothing, SmallRng::from_os_rng())
    }

    /// Same as `new` with a reproducible jitter sequence.
    pub fn seeded(rotation_step: f32, smoothing: f32, seed: u64) -> Self {
        Self::with_rng(rotation_step, smoothing, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rotation_step: f32, smoothing: f32, rng: SmallRng) -> Self {
        Self {
            rotation_step,
            smoothing: smoothing.clamp(f32::EPSILON, 1.0),
            rotation: 0.0,
            diameter: None,
            rng,
        }
    }

    /// Advances one frame. Rotation keeps turning even while no ring is
    /// shown; the eased diameter restarts at the target when a ring reappears.
    pub fn advance(&mut self, ring: Option<&RingStyle>) -> Option<RingPose> {
        self.rotation = (self.rotation + self.rotation_step) % std::f32::consts::TAU;

        let Some(ring) = ring else {
            self.diameter = None;
            return None;
        };

        let eased = match self.diameter {
            Some(current) => current + (ring.diameter - current) * self.smoothing,
            None => ring.diameter,
        };
        self.diameter = Some(eased);

        let v = ring.vibration.max(0.0);
        Some(RingPose {
            width: eased + self.rng.random_range(-v..=v),
            height: eased + self.rng.random_range(-v..=v),
            rotation: self.rotation,
        })
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }
}
