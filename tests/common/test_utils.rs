#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use spark_ngin::{EngineConfig, Scene, cgmath::Matrix4};

/// One unit triangle in the XY plane, spanning 2 units on X and Y.
pub const TRIANGLE_OBJ: &str = "\
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
";

/// Axis-aligned box from (0, 0, 0) to (4, 2, 1), two triangles per used face.
pub const BOX_OBJ: &str = "\
v 0.0 0.0 0.0
v 4.0 0.0 0.0
v 4.0 2.0 0.0
v 0.0 2.0 0.0
v 0.0 0.0 1.0
v 4.0 0.0 1.0
v 4.0 2.0 1.0
v 0.0 2.0 1.0
f 1 2 3
f 1 3 4
f 5 6 7
f 5 7 8
";

pub const VERTEX_ONLY_WGSL: &str = "
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}
";

pub const FRAGMENT_ONLY_WGSL: &str = "
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
";

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// A scratch asset directory removed again on drop.
pub struct TempAssets {
    dir: PathBuf,
}

impl TempAssets {
    pub fn new() -> Self {
        let dir = std::env::temp_dir().join(format!(
            "spark-ngin-test-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).expect("failed to create the asset directory");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn write_text(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create the asset subdirectory");
        }
        std::fs::write(&path, contents).expect("failed to write the asset");
        path
    }

    pub fn write_png(&self, name: &str, width: u32, height: u32, rgba: [u8; 4]) -> PathBuf {
        let path = self.dir.join(name);
        image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
            .save(&path)
            .expect("failed to write the png");
        path
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            asset_dir: self.dir.clone(),
            ..Default::default()
        }
    }

    pub fn scene(&self) -> Scene {
        Scene::new(&self.config())
    }
}

impl Drop for TempAssets {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

pub fn assert_matrix_close(actual: Matrix4<f32>, expected: Matrix4<f32>) {
    let actual: [[f32; 4]; 4] = actual.into();
    let expected: [[f32; 4]; 4] = expected.into();
    for (column, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        for row in 0..4 {
            assert!(
                (a[row] - e[row]).abs() < 1e-4,
                "matrices differ at column {column}, row {row}: {actual:?} vs {expected:?}"
            );
        }
    }
}
