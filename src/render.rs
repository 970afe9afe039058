use cgmath::Vector2;

use crate::config::SceneConfig;

/// Linear RGBA colour, the layout the shader expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const WHITE: Color = Color([1.0, 1.0, 1.0, 1.0]);
    pub const BLACK: Color = Color([0.0, 0.0, 0.0, 1.0]);
    pub const TRANSPARENT: Color = Color([0.0, 0.0, 0.0, 0.0]);

    /// Parses `#rgb` or `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        let (r, g, b) = match digits.len() {
            6 => (channel(&digits[0..2])?, channel(&digits[2..4])?, channel(&digits[4..6])?),
            3 => {
                let short = |i: usize| channel(&digits[i..i + 1].repeat(2));
                (short(0)?, short(1)?, short(2)?)
            }
            _ => return None,
        };
        Some(Color([r, g, b, 1.0]))
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b, a] = self.0;
        wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: a as f64 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyStyle {
    pub visible: bool,
    pub fill: Color,
    pub stroke: Color,
    pub line_width: f32,
}

impl BodyStyle {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            fill: Color::TRANSPARENT,
            stroke: Color::TRANSPARENT,
            line_width: 0.0,
        }
    }

    pub fn square(config: &SceneConfig) -> Self {
        Self {
            visible: true,
            fill: config.fill,
            stroke: config.stroke,
            line_width: config.line_width,
        }
    }
}

/// What the renderer needs to know about one body for one frame, in canvas pixels.
#[derive(Debug, Clone, Copy)]
pub struct BodySprite {
    pub center: Vector2<f32>,
    pub size: Vector2<f32>,
    pub angle: f32,
    pub style: BodyStyle,
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
    pub background: Color,
}

impl RenderOptions {
    /// Backing-store size of the canvas in device pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        let scale = |v: f32| (v * self.pixel_ratio).round().max(1.0) as u32;
        (scale(self.width), scale(self.height))
    }
}

/// Render loop control. The GPU side lives in `renderer::State`; this only decides
/// whether a frame may be drawn.
#[derive(Debug)]
pub struct Render {
    pub options: RenderOptions,
    running: bool,
    frames: u64,
}

impl Render {
    pub fn new(options: RenderOptions) -> Self {
        Self { options, running: true, frames: 0 }
    }

    /// Returns false once stopped; otherwise counts the frame.
    pub fn begin_frame(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.frames += 1;
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colours() {
        assert_eq!(Color::from_hex("#ffffff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("#000"), Some(Color::BLACK));
        let stroke = Color::from_hex("#373737").unwrap();
        assert!((stroke.0[0] - 55.0 / 255.0).abs() < 1e-6);
        assert_eq!(Color::from_hex("373737"), None);
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn stopped_render_draws_nothing() {
        let mut render = Render::new(RenderOptions {
            width: 100.0,
            height: 100.0,
            pixel_ratio: 1.0,
            background: Color::WHITE,
        });
        assert!(render.begin_frame());
        assert!(render.begin_frame());
        render.stop();
        assert!(!render.begin_frame());
        assert_eq!(render.frames(), 2);
    }

    #[test]
    fn surface_follows_canvas_size_and_pixel_ratio() {
        let mut options = RenderOptions {
            width: 1024.0,
            height: 773.0,
            pixel_ratio: 1.0,
            background: Color::WHITE,
        };
        assert_eq!(options.surface_size(), (1024, 773));
        options.pixel_ratio = 2.0;
        assert_eq!(options.surface_size(), (2048, 1546));
        options.width = 0.2;
        assert_eq!(options.surface_size().0, 1);
    }
}
