use spark_ngin::{
    cgmath::{Matrix4, Point3, SquareMatrix, Transform, Vector3, Vector4},
    data_structures::camera::{Camera, CameraConfig},
};

mod common;
use common::test_utils::{assert_close, assert_matrix_close};

#[test]
fn should_use_documented_defaults() {
    let camera = Camera::default();
    assert_eq!(camera.near(), 0.1);
    assert_eq!(camera.far(), 5000.0);
    assert_eq!(camera.fov(), 70.0);
    assert_close(camera.aspect(), 1280.0 / 720.0);
    assert!(camera.is_perspective());
    assert!(camera.is_active());
    assert_eq!(camera.camera_target(), Vector3::new(0.0, 0.0, -1.0));
    assert_eq!(camera.camera_up(), Vector3::new(0.0, 1.0, 0.0));
}

#[test]
fn should_recompute_identical_projections() {
    let mut camera = Camera::default();
    let first = camera.calculate_projection_matrix();
    assert_eq!(first, camera.calculate_projection_matrix());

    camera.set_fov(30.0);
    assert_ne!(first, camera.calculate_projection_matrix());
    camera.set_fov(70.0);
    assert_eq!(first, camera.calculate_projection_matrix());
}

#[test]
fn should_build_orthographic_projection_from_clip_planes() {
    let mut camera = Camera::new(CameraConfig {
        perspective: false,
        ..Default::default()
    });
    camera.set_camera_config(-1.0, 1.0, 10.0, -10.0, 5.0, -5.0);
    let projection = camera.calculate_projection_matrix();
    assert_matrix_close(projection, spark_ngin::cgmath::ortho(-10.0, 10.0, -5.0, 5.0, -1.0, 1.0));

    let corner = projection * Vector4::new(10.0, 5.0, 0.0, 1.0);
    assert_close(corner.x, 1.0);
    assert_close(corner.y, 1.0);
}

#[test]
fn should_map_the_near_plane_into_clip_space() {
    let camera = Camera::default();
    let projection = camera.calculate_projection_matrix();
    let clip = projection * Vector4::new(0.0, 0.0, -camera.near(), 1.0);
    // OpenGL convention: the near plane lands on z = -1
    assert_close(clip.z / clip.w, -1.0);
}

#[test]
fn should_ignore_invalid_aspect_ratios() {
    let mut camera = Camera::default();
    camera.set_aspect(0.0);
    camera.set_aspect(f32::NAN);
    assert_close(camera.aspect(), 1280.0 / 720.0);
    camera.set_aspect(2.0);
    assert_close(camera.aspect(), 2.0);
}

#[test]
fn should_look_from_eye_to_target() {
    let camera = Camera::new(CameraConfig {
        target: Vector3::new(0.0, 0.0, 0.0),
        ..Default::default()
    });
    let view = camera.view_matrix(Vector3::new(0.0, 0.0, 10.0));

    let eye = view.transform_point(Point3::new(0.0, 0.0, 10.0));
    assert_close(eye.x, 0.0);
    assert_close(eye.y, 0.0);
    assert_close(eye.z, 0.0);

    // the target sits straight ahead, down the -z axis of view space
    let target = view.transform_point(Point3::new(0.0, 0.0, 0.0));
    assert_close(target.x, 0.0);
    assert_close(target.z, -10.0);
    assert!(view.invert().is_some());
    assert_ne!(view, Matrix4::identity());
}
