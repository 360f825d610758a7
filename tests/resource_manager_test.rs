use std::sync::Arc;

use spark_ngin::resources::{BUILTIN_SHADERS, ResourceManager};

mod common;
use common::test_utils::{
    BOX_OBJ, FRAGMENT_ONLY_WGSL, TRIANGLE_OBJ, TempAssets, VERTEX_ONLY_WGSL, assert_close,
};

#[test]
fn should_share_cached_textures() {
    let assets = TempAssets::new();
    assets.write_png("white.png", 2, 3, [255, 255, 255, 255]);
    let mut resources = ResourceManager::new(assets.path());

    let first = resources.get_texture("white.png").unwrap();
    let second = resources.get_texture("white.png").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.dimensions(), (2, 3));
    assert_eq!(first.pixels().len(), 2 * 3 * 4);
    assert_eq!(resources.len(), 1);
}

#[test]
fn should_parse_obj_meshes_with_bounds() {
    let assets = TempAssets::new();
    assets.write_text("meshes/tri.obj", TRIANGLE_OBJ);
    assets.write_text("box.obj", BOX_OBJ);
    let mut resources = ResourceManager::new(assets.path());

    let triangle = resources.get_mesh("meshes/tri.obj").unwrap();
    assert_eq!(triangle.indices.len(), 3);
    assert_eq!(triangle.vertices.len(), 3);
    assert_eq!(triangle.min, [-1.0, -1.0, 0.0]);
    assert_eq!(triangle.max, [1.0, 1.0, 0.0]);
    assert_eq!(triangle.vertices[0].normal, [0.0, 0.0, 1.0]);
    // v is flipped for top-down textures
    assert_close(triangle.vertices[2].tex_coords[1], 0.0);

    let cube = resources.get_mesh("box.obj").unwrap();
    assert_eq!(cube.indices.len(), 12);
    assert_close(cube.bounding_size(), 4.0);

    assert!(Arc::ptr_eq(&cube, &resources.get_mesh("box.obj").unwrap()));
}

#[test]
fn should_accept_absolute_paths() {
    let assets = TempAssets::new();
    let path = assets.write_text("tri.obj", TRIANGLE_OBJ);
    let mut resources = ResourceManager::new("does/not/exist");
    let mesh = resources.get_mesh(&path.to_string_lossy()).unwrap();
    assert_eq!(mesh.indices.len(), 3);
}

#[test]
fn should_fail_without_panicking() {
    let assets = TempAssets::new();
    assets.write_text("broken.png", "not an image");
    assets.write_text("model.fbx", "binary");
    let mut resources = ResourceManager::new(assets.path());

    assert!(resources.get_texture("missing.png").is_err());
    assert!(resources.get_texture("broken.png").is_err());
    assert!(resources.get_mesh("missing.obj").is_err());
    let err = resources.get_mesh("model.fbx").unwrap_err();
    assert!(err.to_string().contains("unsupported mesh format"));
    assert!(resources.is_empty());
}

#[test]
fn should_serve_builtin_shaders() {
    let mut resources = ResourceManager::new("assets");
    for (name, _) in BUILTIN_SHADERS {
        let program = resources
            .get_shader(name, name, None)
            .unwrap_or_else(|e| panic!("{name}: {e:#}"));
        assert_eq!(program.source(), program.vertex);
    }
    let again = resources
        .get_shader("builtin/lit.wgsl", "builtin/lit.wgsl", None)
        .unwrap();
    let first = resources
        .get_shader("builtin/lit.wgsl", "builtin/lit.wgsl", None)
        .unwrap();
    assert!(Arc::ptr_eq(&again, &first));
    assert_eq!(resources.len(), BUILTIN_SHADERS.len());
}

#[test]
fn should_link_separate_stage_files() {
    let assets = TempAssets::new();
    assets.write_text("shader.vert.wgsl", VERTEX_ONLY_WGSL);
    assets.write_text("shader.frag.wgsl", FRAGMENT_ONLY_WGSL);
    let mut resources = ResourceManager::new(assets.path());

    let program = resources
        .get_shader("shader.vert.wgsl", "shader.frag.wgsl", None)
        .unwrap();
    assert!(program.source().contains("vs_main"));
    assert!(program.source().contains("fs_main"));
}

#[test]
fn should_reject_programs_missing_an_entry_point() {
    let assets = TempAssets::new();
    assets.write_text("shader.vert.wgsl", VERTEX_ONLY_WGSL);
    assets.write_text("shader.frag.wgsl", FRAGMENT_ONLY_WGSL);
    let mut resources = ResourceManager::new(assets.path());

    // stages swapped: neither file has the entry point its slot needs
    assert!(
        resources
            .get_shader("shader.frag.wgsl", "shader.vert.wgsl", None)
            .is_err()
    );
    assert!(resources.is_empty());
}

#[test]
fn should_reject_geometry_stages() {
    let mut resources = ResourceManager::new("assets");
    let err = resources
        .get_shader(
            "builtin/lit.wgsl",
            "builtin/lit.wgsl",
            Some("shader.geom"),
        )
        .unwrap_err();
    assert!(err.to_string().contains("geometry shader"));
}
