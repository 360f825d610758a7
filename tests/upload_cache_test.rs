use std::{cell::Cell, sync::Arc};

use spark_ngin::data_structures::{
    mesh::{MeshData, MeshVertex},
    texture::UploadCache,
};

fn triangle(offset: f32) -> Arc<MeshData> {
    let vertex = |x: f32, y: f32| MeshVertex {
        position: [x + offset, y, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coords: [0.0, 0.0],
    };
    Arc::new(MeshData::new(
        "",
        vec![vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(0.0, 1.0)],
        vec![0, 1, 2],
    ))
}

/// Stands in for a GPU upload: remembers which vertices it was built from.
fn upload(data: &MeshData) -> [f32; 3] {
    data.vertices[0].position
}

#[test]
fn should_upload_each_source_once() {
    let mut cache = UploadCache::new();
    let mesh = triangle(0.0);
    let uploads = Cell::new(0);

    let first = cache.get_or_upload(&mesh, |data| {
        uploads.set(uploads.get() + 1);
        upload(data)
    });
    let second = cache.get_or_upload(&Arc::clone(&mesh), |data| {
        uploads.set(uploads.get() + 1);
        upload(data)
    });

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(uploads.get(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn should_not_share_uploads_between_meshes_with_the_same_path() {
    let mut cache = UploadCache::new();
    let a = triangle(0.0);
    let b = triangle(5.0);
    assert_eq!(a.path, b.path);

    let uploaded_a = cache.get_or_upload(&a, upload);
    let uploaded_b = cache.get_or_upload(&b, upload);

    assert_eq!(*uploaded_a, [-1.0, -1.0, 0.0]);
    assert_eq!(*uploaded_b, [4.0, -1.0, 0.0]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn should_release_uploads_of_dropped_sources() {
    let mut cache = UploadCache::new();
    let kept = triangle(0.0);
    let dropped = triangle(1.0);
    let handle = cache.get_or_upload(&dropped, upload);
    cache.get_or_upload(&kept, upload);

    assert_eq!(cache.purge(), 0);
    drop(dropped);
    assert_eq!(cache.purge(), 1);
    assert_eq!(cache.len(), 1);
    // handles already given out stay valid
    assert_eq!(*handle, [0.0, -1.0, 0.0]);

    let replacement = triangle(2.0);
    assert_eq!(*cache.get_or_upload(&replacement, upload), [1.0, -1.0, 0.0]);
    assert_eq!(cache.len(), 2);
}
