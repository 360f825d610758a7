use std::time::Duration;

use spark_ngin::{
    SceneError,
    cgmath::Vector3,
    data_structures::{
        billboard::BillboardConfig,
        camera::CameraConfig,
        entity::Entity,
        light::PointLightConfig,
        mesh::MeshConfig,
        particles::{EmitterShape, ParticleEffects, ParticleSystemConfig},
        skybox::SkyboxFaces,
    },
};

mod common;
use common::test_utils::{BOX_OBJ, TRIANGLE_OBJ, TempAssets, assert_close};

#[test]
fn should_keep_siblings_when_deleting_a_mesh() {
    let assets = TempAssets::new();
    assets.write_text("tri.obj", TRIANGLE_OBJ);
    let mut scene = assets.scene();

    scene.add_camera(None, 1, CameraConfig::default()).unwrap();
    scene
        .add_mesh(None, 2, MeshConfig::from_file("tri.obj"))
        .unwrap();
    scene
        .add_point_light(None, 3, PointLightConfig::default())
        .unwrap();

    assert!(scene.delete_node(2));
    assert!(scene.get_node_by_id(2).is_none());
    assert!(scene.get_node_by_id(1).is_some());
    assert!(scene.get_node_by_id(3).is_some());
}

#[test]
fn should_fail_a_duplicate_id_before_loading() {
    let assets = TempAssets::new();
    let mut scene = assets.scene();
    scene.add_group(None, 5).unwrap();

    // the mesh file does not exist, so only the id check can be reported
    let err = scene
        .add_mesh(None, 5, MeshConfig::from_file("missing.obj"))
        .unwrap_err();
    assert!(matches!(err, SceneError::DuplicateId(5)));
    assert_eq!(scene.graph().len(), 2);
}

#[test]
fn should_report_resource_failures_without_adding_a_node() {
    let assets = TempAssets::new();
    let mut scene = assets.scene();

    let err = scene
        .add_mesh(None, 7, MeshConfig::from_file("missing.obj"))
        .unwrap_err();
    match err {
        SceneError::Resource { path, .. } => assert_eq!(path, "missing.obj"),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(scene.get_node_by_id(7).is_none());

    let err = scene
        .add_billboard(
            None,
            8,
            BillboardConfig {
                texture: "nope.png".into(),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, SceneError::Resource { .. }));
    assert!(scene.get_node_by_id(8).is_none());
}

#[test]
fn should_scale_bounding_size_with_the_node() {
    let assets = TempAssets::new();
    assets.write_text("box.obj", BOX_OBJ);
    let mut scene = assets.scene();

    let group = scene.add_group(None, 1).unwrap();
    scene
        .graph_mut()
        .get_mut(group)
        .unwrap()
        .set_scale(Vector3::new(0.5, 3.0, 1.0));
    scene
        .add_mesh(Some(group), 2, MeshConfig::from_file("box.obj"))
        .unwrap();
    scene.add_camera(None, 3, CameraConfig::default()).unwrap();

    // longest side 4, largest world scale 3
    assert_close(scene.get_bounding_size_by_id(2).unwrap(), 12.0);
    assert_eq!(scene.get_bounding_size_by_id(1), None);
    assert_eq!(scene.get_bounding_size_by_id(3), None);
    assert_eq!(scene.get_bounding_size_by_id(99), None);
}

#[test]
fn should_share_loaded_meshes_between_nodes() {
    let assets = TempAssets::new();
    assets.write_text("tri.obj", TRIANGLE_OBJ);
    let mut scene = assets.scene();

    scene
        .add_mesh(None, 1, MeshConfig::from_file("tri.obj"))
        .unwrap();
    scene
        .add_mesh(None, 2, MeshConfig::from_file("tri.obj"))
        .unwrap();

    let mesh = |id| {
        scene
            .get_node_by_id(id)
            .and_then(|node| node.entity())
            .and_then(Entity::as_mesh)
            .and_then(|mesh| mesh.mesh())
            .cloned()
            .unwrap()
    };
    assert!(std::sync::Arc::ptr_eq(&mesh(1), &mesh(2)));
    assert_eq!(scene.resources().len(), 1);
}

#[test]
fn should_pick_the_first_active_camera_in_pre_order() {
    let mut scene = spark_ngin::Scene::default();
    let group = scene.add_group(None, 1).unwrap();
    scene
        .add_camera(
            None,
            2,
            CameraConfig {
                active: false,
                ..Default::default()
            },
        )
        .unwrap();
    scene
        .add_camera(
            Some(group),
            3,
            CameraConfig {
                fov: 45.0,
                ..Default::default()
            },
        )
        .unwrap();
    scene
        .add_camera(
            None,
            4,
            CameraConfig {
                fov: 90.0,
                ..Default::default()
            },
        )
        .unwrap();

    let active = scene.get_active_camera_node().unwrap();
    assert_eq!(scene.graph().get(active).unwrap().id(), 3);
    assert_eq!(scene.fov_active_camera(), Some(45.0));
    assert_eq!(scene.cameras().len(), 3);

    assert!(scene.delete_node(1));
    assert_eq!(scene.fov_active_camera(), Some(90.0));
}

#[test]
fn should_report_the_active_camera_world_position() {
    let mut scene = spark_ngin::Scene::default();
    let group = scene.add_group(None, 1).unwrap();
    scene
        .graph_mut()
        .get_mut(group)
        .unwrap()
        .set_translation(Vector3::new(0.0, 10.0, 0.0));
    let camera = scene
        .add_camera(
            Some(group),
            2,
            CameraConfig {
                target: Vector3::new(1.0, 2.0, 3.0),
                ..Default::default()
            },
        )
        .unwrap();
    scene
        .graph_mut()
        .get_mut(camera)
        .unwrap()
        .set_translation(Vector3::new(0.0, 0.0, 5.0));

    assert_eq!(
        scene.position_active_camera(),
        Some(Vector3::new(0.0, 10.0, 5.0))
    );
    assert_eq!(
        scene.target_active_camera(),
        Some(Vector3::new(1.0, 2.0, 3.0))
    );
}

#[test]
fn should_have_no_active_camera_without_cameras() {
    let scene = spark_ngin::Scene::default();
    assert!(scene.get_active_camera().is_none());
    assert_eq!(scene.fov_active_camera(), None);
    assert_eq!(scene.position_active_camera(), None);
}

#[test]
fn should_remove_lights_and_cameras_only() {
    let mut scene = spark_ngin::Scene::default();
    let light = scene
        .add_point_light(None, 1, PointLightConfig::default())
        .unwrap();
    // lives below the light and goes with it
    scene.add_group(Some(light), 2).unwrap();
    scene.add_camera(None, 3, CameraConfig::default()).unwrap();
    scene.add_group(None, 4).unwrap();
    let inner = scene.add_group(None, 5).unwrap();
    scene
        .add_point_light(Some(inner), 6, PointLightConfig::default())
        .unwrap();

    scene.remove_lights_and_cameras();

    assert!(scene.point_lights().is_empty());
    assert!(scene.cameras().is_empty());
    for id in [1, 2, 3, 6] {
        assert!(scene.get_node_by_id(id).is_none(), "node {id} should be gone");
    }
    assert!(scene.get_node_by_id(4).is_some());
    assert!(scene.get_node_by_id(5).is_some());
}

#[test]
fn should_bind_shadow_mapping_to_point_lights_only() {
    let mut scene = spark_ngin::Scene::default();
    scene
        .add_point_light(None, 1, PointLightConfig::default())
        .unwrap();
    scene.add_camera(None, 2, CameraConfig::default()).unwrap();

    assert!(matches!(
        scene.add_shadow_mapping(9),
        Err(SceneError::NodeNotFound(9))
    ));
    assert!(matches!(
        scene.add_shadow_mapping(2),
        Err(SceneError::NotAPointLight(2))
    ));
    assert!(scene.shadow_mapping().is_none());

    scene.add_shadow_mapping(1).unwrap();
    let shadow = scene.shadow_mapping().unwrap();
    assert_eq!(shadow.light_id(), 1);
    assert_eq!(shadow.size(), 2048);
}

#[test]
fn should_load_a_skybox_with_matching_faces() {
    let assets = TempAssets::new();
    let names = ["right", "left", "top", "bottom", "front", "back"];
    for name in names {
        assets.write_png(&format!("{name}.png"), 4, 4, [0, 0, 255, 255]);
    }
    let faces = SkyboxFaces {
        right: "right.png".into(),
        left: "left.png".into(),
        top: "top.png".into(),
        bottom: "bottom.png".into(),
        front: "front.png".into(),
        back: "back.png".into(),
    };
    let mut scene = assets.scene();
    scene.add_skybox(faces.clone()).unwrap();
    assert_eq!(scene.skybox().unwrap().faces()[2].path, "top.png");

    assets.write_png("small.png", 2, 2, [0, 0, 255, 255]);
    let err = scene
        .add_skybox(SkyboxFaces {
            back: "small.png".into(),
            ..faces
        })
        .unwrap_err();
    assert!(matches!(err, SceneError::Resource { .. }));
    // the previous skybox stays
    assert_eq!(scene.skybox().unwrap().faces()[5].path, "back.png");
}

#[test]
fn should_queue_debug_lines_in_world_space() {
    let mut scene = spark_ngin::Scene::default();
    let node = scene.add_group(None, 1).unwrap();
    scene
        .graph_mut()
        .get_mut(node)
        .unwrap()
        .set_translation(Vector3::new(5.0, 0.0, 0.0));

    let red = [1.0, 0.0, 0.0, 1.0];
    scene.draw_3d_line(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0), red);
    assert!(scene.draw_3d_line_local(
        1,
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        red
    ));
    assert!(!scene.draw_3d_line_local(
        2,
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        red
    ));

    let lines = scene.debug_lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].from, Vector3::new(5.0, 0.0, 0.0));
    assert_eq!(lines[1].to, Vector3::new(6.0, 0.0, 0.0));

    scene.clear_debug_lines();
    assert!(scene.debug_lines().is_empty());
}

#[test]
fn should_recycle_particles_after_their_lifespan() {
    let mut scene = spark_ngin::Scene::default();
    scene
        .add_particle_system(
            None,
            1,
            ParticleSystemConfig {
                count: 100,
                lifespan_ms: 2000,
                spawn_delay_ms: 100,
                batch_size: 10,
                ..Default::default()
            },
        )
        .unwrap();
    let system = |scene: &spark_ngin::Scene| {
        scene
            .get_node_by_id(1)
            .and_then(|node| node.entity())
            .and_then(Entity::as_particle_system)
            .map(|system| (system.alive_count(), system.capacity()))
            .unwrap()
    };

    scene.update(Duration::ZERO);
    for _ in 0..9 {
        scene.update(Duration::from_millis(100));
    }
    assert_eq!(system(&scene), (100, 100));

    scene
        .get_node_by_id_mut(1)
        .and_then(|node| node.entity_mut())
        .and_then(Entity::as_particle_system_mut)
        .unwrap()
        .set_emitting(false);
    scene.update(Duration::from_millis(2000));
    assert_eq!(system(&scene), (0, 100));
}

#[test]
fn should_hide_particle_systems() {
    let mut scene = spark_ngin::Scene::default();
    scene
        .add_particle_system(
            None,
            1,
            ParticleSystemConfig {
                shape: EmitterShape::Sphere { radius: 2.0 },
                effects: ParticleEffects::FADE_OUT,
                ..Default::default()
            },
        )
        .unwrap();
    scene.add_group(None, 2).unwrap();

    scene.set_particles_visibility(false);
    assert!(!scene.get_node_by_id(1).unwrap().is_visible());
    assert!(scene.get_node_by_id(2).unwrap().is_visible());

    scene.set_particles_visibility(true);
    assert!(scene.get_node_by_id(1).unwrap().is_visible());
}
