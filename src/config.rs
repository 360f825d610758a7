//! Engine configuration with documented defaults.

use std::path::PathBuf;

/// Start-up configuration for [`crate::engine::Engine`] and the headless
/// [`crate::scene::Scene`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Initial window width in physical pixels. Default `1280`.
    pub width: u32,
    /// Initial window height in physical pixels. Default `720`.
    pub height: u32,
    pub title: String,
    /// Wait for vertical blank when presenting. Default `true`.
    pub vsync: bool,
    pub clear_colour: wgpu::Color,
    /// Root for every mesh, texture and shader path. Default `./assets`.
    pub asset_dir: PathBuf,
    /// Side length of the square shadow depth texture. Default `2048`.
    pub shadow_map_size: u32,
    /// Half extent of the orthographic volume rendered into the shadow map. Default `50.0`.
    pub shadow_extent: f32,
    /// Lights beyond this count are dropped when building a frame. Capped at
    /// [`crate::data_structures::light::MAX_POINT_LIGHTS`].
    pub max_point_lights: usize,
    /// Seed for particle spawn jitter, so runs are reproducible. Default `0x5eed`.
    pub particle_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: String::from("spark-ngin"),
            vsync: true,
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.12,
                a: 1.0,
            },
            asset_dir: PathBuf::from("assets"),
            shadow_map_size: 2048,
            shadow_extent: 50.0,
            max_point_lights: crate::data_structures::light::MAX_POINT_LIGHTS,
            particle_seed: 0x5eed,
        }
    }
}
