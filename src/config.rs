use std::ops::RangeInclusive;

use crate::render::Color;

/// Every tunable of the scene. `Default` reproduces the look of the landing page.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub wall_width: f32,
    /// Added to the measured canvas height so the floor sits just below the fold.
    pub height_padding: f32,
    pub stack_columns: usize,
    pub stack_rows: usize,
    pub stack_top_desktop: f32,
    pub stack_top_mobile: f32,
    pub square_size: RangeInclusive<f32>,
    /// Degrees, converted to radians when a square is built.
    pub square_angle: RangeInclusive<f32>,
    pub restitution: f32,
    pub gravity_x: RangeInclusive<f32>,
    pub gravity_y: RangeInclusive<f32>,
    pub motion_scale: f32,
    pub nudge_factor: f32,
    pub drag_suppression_ms: f64,
    pub obstacle_delay_ms: f64,
    pub obstacle_selector: String,
    pub fill: Color,
    pub stroke: Color,
    pub line_width: f32,
    pub background: Color,
    pub pixel_ratio: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            wall_width: 50.0,
            height_padding: 5.0,
            stack_columns: 32,
            stack_rows: 5,
            stack_top_desktop: -500.0,
            stack_top_mobile: 50.0,
            square_size: 5.0..=60.0,
            square_angle: 0.0..=45.0,
            restitution: 0.1,
            gravity_x: -0.2..=0.2,
            gravity_y: 0.2..=2.0,
            motion_scale: 0.6,
            nudge_factor: 0.05,
            drag_suppression_ms: 500.0,
            obstacle_delay_ms: 300.0,
            obstacle_selector: "#about-card".to_string(),
            fill: Color::WHITE,
            stroke: Color::from_hex("#373737").unwrap_or(Color::BLACK),
            line_width: 2.0,
            background: Color::from_hex("#efefef").unwrap_or(Color::WHITE),
            pixel_ratio: 1.0,
        }
    }
}

pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_landing_page() {
        let config = SceneConfig::default();
        assert_eq!(config.wall_width, 50.0);
        assert_eq!(config.stack_columns * config.stack_rows, 160);
        assert_eq!(config.stroke, Color::from_hex("#373737").unwrap());
        assert_eq!(config.background, Color::from_hex("#efefef").unwrap());
        assert_eq!(config.obstacle_selector, "#about-card");
    }

    #[test]
    fn converts_degrees() {
        assert_eq!(degrees_to_radians(0.0), 0.0);
        assert!((degrees_to_radians(45.0) - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
        assert!((degrees_to_radians(180.0) - std::f32::consts::PI).abs() < 1e-6);
    }
}
