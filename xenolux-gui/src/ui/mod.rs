//! # UI Module
//!
//! This module contains all UI components for the Xenolux tuner.

pub mod main_display;
pub mod tuner_canvas;
