use spark_ngin::{
    ROOT_ID, SceneError,
    cgmath::{Deg, Point3, Quaternion, Rotation3, Vector3},
    data_structures::{
        camera::Camera, entity::Entity, instance::Instance, light::PointLight,
        scene_graph::SceneGraph,
    },
};

mod common;
use common::test_utils::assert_close;

fn ids(graph: &SceneGraph) -> Vec<u32> {
    graph.iter().map(|(_, node, _)| node.id()).collect()
}

#[test]
fn should_start_with_only_the_root() {
    let graph = SceneGraph::new();
    assert_eq!(graph.len(), 1);
    assert!(graph.is_empty());
    assert_eq!(graph.find_by_id(ROOT_ID), Some(graph.root()));
    assert!(graph.get(graph.root()).unwrap().parent().is_none());
}

#[test]
fn should_find_inserted_nodes_until_deleted() {
    let mut graph = SceneGraph::new();
    let a = graph.add_child(None, 1, None).unwrap();
    let b = graph.add_child(Some(a), 2, None).unwrap();
    let c = graph.add_child(Some(b), 3, None).unwrap();

    assert_eq!(graph.find_by_id(1), Some(a));
    assert_eq!(graph.find_by_id(2), Some(b));
    assert_eq!(graph.find_by_id(3), Some(c));
    assert_eq!(graph.get(c).unwrap().parent(), Some(b));
    assert!(graph.has_child(a, b));
    assert!(!graph.has_child(a, c));

    assert!(graph.delete_node(3));
    assert_eq!(graph.find_by_id(3), None);
    assert!(graph.get(c).is_none(), "stale keys must not resolve");
    assert_eq!(graph.find_by_id(2), Some(b));
}

#[test]
fn should_reject_duplicate_ids_without_mutation() {
    let mut graph = SceneGraph::new();
    let first = graph.add_child(None, 5, None).unwrap();
    let group = graph.add_child(None, 6, None).unwrap();

    let err = graph.add_child(Some(group), 5, None).unwrap_err();
    assert!(matches!(err, SceneError::DuplicateId(5)));
    assert_eq!(graph.len(), 3);
    assert!(graph.get(group).unwrap().children().is_empty());
    assert_eq!(
        graph.iter().filter(|(_, node, _)| node.id() == 5).count(),
        1
    );
    assert_eq!(graph.find_by_id(5), Some(first));
}

#[test]
fn should_reject_the_root_id() {
    let mut graph = SceneGraph::new();
    assert!(matches!(
        graph.add_child(None, ROOT_ID, None),
        Err(SceneError::DuplicateId(ROOT_ID))
    ));
}

#[test]
fn should_reject_stale_parent_keys() {
    let mut graph = SceneGraph::new();
    let parent = graph.add_child(None, 1, None).unwrap();
    assert!(graph.delete_node_by_key(parent));

    let err = graph.add_child(Some(parent), 2, None).unwrap_err();
    assert!(matches!(err, SceneError::ParentNotFound));
    assert_eq!(graph.len(), 1);
}

#[test]
fn should_delete_whole_subtree() {
    let mut graph = SceneGraph::new();
    let a = graph.add_child(None, 1, None).unwrap();
    let b = graph.add_child(Some(a), 2, None).unwrap();
    graph.add_child(Some(b), 3, None).unwrap();
    graph.add_child(Some(a), 4, None).unwrap();
    graph.add_child(None, 5, None).unwrap();

    assert!(graph.delete_node(1));
    for id in 1..=4 {
        assert_eq!(graph.find_by_id(id), None, "node {id} should be gone");
    }
    assert!(graph.find_by_id(5).is_some());
    assert_eq!(graph.len(), 2);
}

#[test]
fn should_only_remove_direct_children() {
    let mut graph = SceneGraph::new();
    let a = graph.add_child(None, 1, None).unwrap();
    let b = graph.add_child(Some(a), 2, None).unwrap();
    let c = graph.add_child(Some(b), 3, None).unwrap();
    let other = graph.add_child(None, 4, None).unwrap();

    assert!(!graph.remove_child(a, c), "grandchildren are not direct children");
    assert!(!graph.remove_child(other, b));
    assert_eq!(graph.len(), 5);

    assert!(graph.remove_child(a, b));
    assert_eq!(graph.find_by_id(2), None);
    assert_eq!(graph.find_by_id(3), None);
    assert!(graph.find_by_id(4).is_some());
    assert!(graph.get(a).unwrap().children().is_empty());
}

#[test]
fn should_not_delete_the_root() {
    let mut graph = SceneGraph::new();
    graph.add_child(None, 1, None).unwrap();
    assert!(!graph.delete_node(ROOT_ID));
    assert!(!graph.delete_node_by_key(graph.root()));
    assert_eq!(graph.len(), 2);
}

#[test]
fn should_report_missing_ids() {
    let mut graph = SceneGraph::new();
    assert!(!graph.delete_node(42));
    assert_eq!(graph.find_by_id(42), None);
    assert_eq!(graph.bounding_size(42), None);
}

#[test]
fn should_traverse_in_pre_order() {
    let mut graph = SceneGraph::new();
    let a = graph.add_child(None, 1, None).unwrap();
    graph.add_child(Some(a), 2, None).unwrap();
    graph.add_child(Some(a), 3, None).unwrap();
    let d = graph.add_child(None, 4, None).unwrap();
    graph.add_child(Some(d), 5, None).unwrap();

    assert_eq!(ids(&graph), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn should_search_from_a_subtree() {
    let mut graph = SceneGraph::new();
    let a = graph.add_child(None, 1, None).unwrap();
    let b = graph.add_child(Some(a), 2, None).unwrap();
    let c = graph.add_child(None, 3, None).unwrap();

    assert_eq!(graph.find_by_id_from(a, 2), Some(b));
    assert_eq!(graph.find_by_id_from(c, 2), None);
}

#[test]
fn should_skip_hidden_subtrees() {
    let mut graph = SceneGraph::new();
    let a = graph.add_child(None, 1, None).unwrap();
    graph.add_child(Some(a), 2, None).unwrap();
    graph.add_child(None, 3, None).unwrap();
    graph.get_mut(a).unwrap().set_visible(false);

    let visible: Vec<u32> = graph.iter_visible().map(|(_, node, _)| node.id()).collect();
    assert_eq!(visible, vec![0, 3]);
    assert_eq!(ids(&graph), vec![0, 1, 2, 3]);
}

#[test]
fn should_compose_world_transforms() {
    let mut graph = SceneGraph::new();
    let parent = graph.add_child(None, 1, None).unwrap();
    let child = graph.add_child(Some(parent), 2, None).unwrap();

    graph.get_mut(parent).unwrap().set_local_transform(Instance {
        position: Vector3::new(10.0, 0.0, 0.0),
        rotation: Quaternion::from_angle_y(Deg(90.0)),
        scale: Vector3::new(2.0, 2.0, 2.0),
    });
    graph
        .get_mut(child)
        .unwrap()
        .set_translation(Vector3::new(1.0, 0.0, 0.0));

    let world = graph.world_transform(child).unwrap();
    // x axis turned 90 degrees about y points to -z, scaled by 2
    assert_close(world.position().x, 10.0);
    assert_close(world.position().y, 0.0);
    assert_close(world.position().z, -2.0);
    assert_close(world.scale().x, 2.0);

    let (_, _, iter_world) = graph
        .iter()
        .find(|(key, _, _)| *key == child)
        .unwrap();
    assert_close(iter_world.position().z, world.position().z);
}

#[test]
fn should_rotate_children_before_parent_scale() {
    let mut graph = SceneGraph::new();
    let parent = graph.add_child(None, 1, None).unwrap();
    let child = graph.add_child(Some(parent), 2, None).unwrap();

    graph
        .get_mut(parent)
        .unwrap()
        .set_local_transform(Instance::new().with_scale(Vector3::new(2.0, 1.0, 1.0)));
    graph.get_mut(child).unwrap().set_local_transform(Instance {
        rotation: Quaternion::from_angle_z(Deg(90.0)),
        ..Instance::new().with_position(Vector3::new(1.0, 0.0, 0.0))
    });

    let world = graph.world_transform(child).unwrap();
    assert_close(world.position().x, 2.0);
    assert_close(world.position().y, 0.0);

    // local x turns into y first, so the parent's x stretch does not touch it
    let point = world.transform_point(Point3::new(1.0, 0.0, 0.0));
    assert_close(point.x, 2.0);
    assert_close(point.y, 1.0);
    assert_close(point.z, 0.0);

    let axis = world.transform_point(Point3::new(0.0, 1.0, 0.0));
    assert_close(axis.x, 0.0);
    assert_close(axis.y, 0.0);
    assert_close(world.max_scale(), 2.0);

    let (_, _, iter_world) = graph
        .iter()
        .find(|(key, _, _)| *key == child)
        .unwrap();
    let iter_point = iter_world.transform_point(Point3::new(1.0, 0.0, 0.0));
    assert_close(iter_point.x, point.x);
    assert_close(iter_point.y, point.y);
}

#[test]
fn should_have_no_bounds_for_non_geometric_payloads() {
    let mut graph = SceneGraph::new();
    graph
        .add_child(None, 1, Some(Entity::from(Camera::default())))
        .unwrap();
    graph
        .add_child(None, 2, Some(Entity::from(PointLight::default())))
        .unwrap();
    graph.add_child(None, 3, None).unwrap();

    assert_eq!(graph.bounding_size(1), None);
    assert_eq!(graph.bounding_size(2), None);
    assert_eq!(graph.bounding_size(3), None);
}

#[test]
fn should_replace_entities() {
    let mut graph = SceneGraph::new();
    let key = graph.add_child(None, 1, None).unwrap();
    let previous = graph
        .get_mut(key)
        .unwrap()
        .set_entity(Some(Camera::default().into()));
    assert!(previous.is_none());
    assert_eq!(graph.get(key).unwrap().entity().unwrap().kind(), "camera");
}
