//! # Tuner Canvas
//!
//! Draws the whole tuner on a single canvas: background, the gold target
//! ring, the rotating pitch ring and the text readouts. Everything is laid
//! out in vmin units (1/100 of the shorter side) around the window centre.

use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke, Text};
use iced::{mouse, Color, Point, Rectangle, Renderer, Theme};
use xenolux_core::visual::{self, RingPose, RingStyle, Rgba};
use xenolux_core::FrameReport;

/// Points used to approximate the pitch ring ellipse.
const ELLIPSE_SEGMENTS: usize = 96;

/// What the canvas shows this frame.
#[derive(Debug, Clone)]
pub enum Screen {
    Loading,
    Failed {
        title: &'static str,
        detail: String,
    },
    Tuner {
        frame: FrameReport,
        ring: Option<(RingStyle, RingPose)>,
        diagnostics: String,
        /// Show the "click to activate" instruction
        prompt: bool,
    },
}

pub struct TunerCanvas {
    screen: Screen,
}

impl TunerCanvas {
    pub fn new(screen: Screen) -> Self {
        Self { screen }
    }
}

fn color(rgba: Rgba) -> Color {
    Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a as f32 / 255.0)
}

/// Centre of the canvas and the size of one vmin.
struct Layout {
    center: Point,
    vmin: f32,
    height: f32,
}

impl Layout {
    fn new(bounds: Rectangle) -> Self {
        Self {
            center: Point::new(bounds.width / 2.0, bounds.height / 2.0),
            vmin: bounds.width.min(bounds.height) / 100.0,
            height: bounds.height,
        }
    }

    /// Point `offset` vmin below the centre.
    fn from_center(&self, offset: f32) -> Point {
        Point::new(self.center.x, self.center.y + offset * self.vmin)
    }

    /// Point `offset` vmin above the bottom edge.
    fn from_bottom(&self, offset: f32) -> Point {
        Point::new(self.center.x, self.height - offset * self.vmin)
    }
}

fn centered_text(frame: &mut Frame, content: String, position: Point, size: f32, fill: Rgba) {
    frame.fill_text(Text {
        content,
        position,
        color: color(fill),
        size: size.into(),
        horizontal_alignment: iced::alignment::Horizontal::Center,
        vertical_alignment: iced::alignment::Vertical::Center,
        ..Text::default()
    });
}

/// Closed polygon for an ellipse of the given diameters, rotated about its centre.
fn ellipse(center: Point, width: f32, height: f32, rotation: f32) -> Path {
    let (rx, ry) = (width / 2.0, height / 2.0);
    let (sin_r, cos_r) = rotation.sin_cos();

    Path::new(|builder| {
        for i in 0..ELLIPSE_SEGMENTS {
            let theta = i as f32 / ELLIPSE_SEGMENTS as f32 * std::f32::consts::TAU;
            let (x, y) = (rx * theta.cos(), ry * theta.sin());
            let point = Point::new(
                center.x + x * cos_r - y * sin_r,
                center.y + x * sin_r + y * cos_r,
            );
            if i == 0 {
                builder.move_to(point);
            } else {
                builder.line_to(point);
            }
        }
        builder.close();
    })
}

impl TunerCanvas {
    fn draw_tuner(
        &self,
        frame: &mut Frame,
        layout: &Layout,
        report: &FrameReport,
        ring: Option<&(RingStyle, RingPose)>,
        diagnostics: &str,
        prompt: bool,
    ) {
        let vmin = layout.vmin;

        let target = visual::target_ring();
        frame.stroke(
            &Path::circle(layout.center, target.diameter * vmin / 2.0),
            Stroke::default()
                .with_width(target.stroke_width)
                .with_color(color(target.color)),
        );

        if let Some((style, pose)) = ring {
            let path = ellipse(layout.center, pose.width * vmin, pose.height * vmin, pose.rotation);
            frame.stroke(
                &path,
                Stroke::default()
                    .with_width(style.stroke_width)
                    .with_color(color(style.color)),
            );
        }

        centered_text(
            frame,
            "DETECTED FUNDAMENTAL".to_string(),
            layout.from_center(-25.0),
            3.0 * vmin,
            visual::WHITE,
        );

        let (frequency, frequency_color) = visual::frequency_label(report.frequency);
        centered_text(frame, frequency, layout.from_center(-19.0), 3.0 * vmin, frequency_color);

        let (note, note_color) = visual::note_label(report.result.as_ref());
        centered_text(frame, note, layout.from_center(2.0), 15.0 * vmin, note_color);

        if let Some((headline, headline_color)) = visual::headline(report.state) {
            centered_text(
                frame,
                headline.to_string(),
                layout.from_center(15.0),
                4.0 * vmin,
                headline_color,
            );
        }

        centered_text(
            frame,
            diagnostics.to_string(),
            layout.from_bottom(6.0),
            2.0 * vmin,
            visual::DIM,
        );

        if prompt {
            centered_text(
                frame,
                "Click to activate audio.".to_string(),
                layout.from_bottom(3.0),
                2.0 * vmin,
                visual::WHITE,
            );
        }
    }
}

impl<Message> canvas::Program<Message> for TunerCanvas {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let layout = Layout::new(bounds);

        let background = Path::rectangle(Point::ORIGIN, bounds.size());
        frame.fill(&background, color(visual::BACKGROUND));

        match &self.screen {
            Screen::Loading => {
                centered_text(
                    &mut frame,
                    "Loading pitch model...".to_string(),
                    layout.center,
                    4.0 * layout.vmin,
                    visual::WHITE,
                );
            }
            Screen::Failed { title, detail } => {
                centered_text(
                    &mut frame,
                    title.to_string(),
                    layout.from_center(-3.0),
                    4.0 * layout.vmin,
                    visual::WARNING,
                );
                centered_text(
                    &mut frame,
                    detail.clone(),
                    layout.from_center(3.0),
                    2.5 * layout.vmin,
                    visual::WARNING,
                );
            }
            Screen::Tuner {
                frame: report,
                ring,
                diagnostics,
                prompt,
            } => {
                self.draw_tuner(&mut frame, &layout, report, ring.as_ref(), diagnostics, *prompt);
            }
        }

        vec![frame.into_geometry()]
    }
}
