//! Asynchronous model loading
//!
//! OBJ parsing and texture decoding run on a worker thread; the result is
//! delivered over an mpsc channel that the app polls once per loop tick.
//! Dropping the [`ModelLoadHandle`] detaches an in-flight load: the worker's
//! send fails and the result is discarded, which is the cancellation path
//! used at teardown.

use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;

use crate::error::ViewerError;
use crate::gfx::scene::node::Mesh;

/// A fully loaded model: meshes plus the decoded texture shared by the
/// materials built for them
#[derive(Debug)]
pub struct LoadedModel {
    pub meshes: Vec<Mesh>,
    pub texture: Arc<image::DynamicImage>,
}

/// Receiving end of an in-flight model load
pub struct ModelLoadHandle {
    receiver: mpsc::Receiver<Result<LoadedModel, ViewerError>>,
}

impl ModelLoadHandle {
    /// Non-blocking poll; `None` until the worker finishes (or forever, if
    /// the worker panicked)
    pub fn try_recv(&self) -> Option<Result<LoadedModel, ViewerError>> {
        self.receiver.try_recv().ok()
    }
}

/// Spawns a worker thread loading the OBJ and decoding its texture
pub fn load_model_async(
    model_path: impl Into<String>,
    texture_path: impl Into<String>,
) -> ModelLoadHandle {
    let model_path = model_path.into();
    let texture_path = texture_path.into();
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        let result = load_model_blocking(&model_path, &texture_path);
        // Receiver dropped means the viewer is gone; nothing to deliver
        let _ = sender.send(result);
    });

    ModelLoadHandle { receiver }
}

/// Loads an OBJ model and its texture synchronously
///
/// Meshes are triangulated and single-indexed; normals missing from the file
/// are reconstructed from face geometry.
pub fn load_model_blocking(
    model_path: &str,
    texture_path: &str,
) -> Result<LoadedModel, ViewerError> {
    let (models, _materials) = tobj::load_obj(
        Path::new(model_path),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| ViewerError::load_failure(model_path, e))?;

    let mut meshes = Vec::with_capacity(models.len());
    for m in &models {
        let mesh = &m.mesh;

        let normals = if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len() {
            mesh.normals.clone()
        } else {
            Mesh::calculate_face_normals(&mesh.positions, &mesh.indices)
        };

        meshes.push(Mesh::new(
            mesh.positions.clone(),
            normals,
            mesh.texcoords.clone(),
            mesh.indices.clone(),
        ));
    }

    if meshes.is_empty() {
        return Err(ViewerError::load_failure(model_path, "OBJ contains no meshes"));
    }

    let texture = image::open(texture_path)
        .map_err(|e| ViewerError::load_failure(texture_path, e))?;

    log::info!(
        "loaded model {:?}: {} mesh(es), texture {:?}",
        model_path,
        meshes.len(),
        texture_path
    );

    Ok(LoadedModel {
        meshes,
        texture: Arc::new(texture),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &[u8]) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("vantage_loader_test_{}_{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    const TRIANGLE_OBJ: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
f 1/1 2/2 3/3
";

    // 1x1 PNG, white pixel
    fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        let img = image::DynamicImage::new_rgba8(1, 1);
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        bytes
    }

    #[test]
    fn missing_model_is_a_load_failure() {
        let err = load_model_blocking("/no/such/model.obj", "/no/such/tex.png").unwrap_err();
        assert!(matches!(err, ViewerError::LoadFailure { .. }));
    }

    #[test]
    fn missing_texture_is_a_load_failure() {
        let obj = write_temp("tri.obj", TRIANGLE_OBJ.as_bytes());
        let err =
            load_model_blocking(obj.to_str().unwrap(), "/no/such/tex.png").unwrap_err();
        assert!(matches!(err, ViewerError::LoadFailure { .. }));
        fs::remove_file(obj).ok();
    }

    #[test]
    fn valid_obj_yields_expected_mesh() {
        let obj = write_temp("tri_ok.obj", TRIANGLE_OBJ.as_bytes());
        let png = write_temp("tex.png", &tiny_png());

        let model =
            load_model_blocking(obj.to_str().unwrap(), png.to_str().unwrap()).unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].vertex_count(), 3);
        assert_eq!(model.meshes[0].index_count(), 3);
        // normals reconstructed for a file without them
        let n = model.meshes[0].vertices()[0].normal;
        assert!((n[2].abs() - 1.0).abs() < 1e-5);

        fs::remove_file(obj).ok();
        fs::remove_file(png).ok();
    }

    #[test]
    fn async_load_delivers_over_channel() {
        let obj = write_temp("tri_async.obj", TRIANGLE_OBJ.as_bytes());
        let png = write_temp("tex_async.png", &tiny_png());

        let handle = load_model_async(
            obj.to_str().unwrap().to_string(),
            png.to_str().unwrap().to_string(),
        );

        // poll until the worker finishes
        let mut result = None;
        for _ in 0..200 {
            if let Some(r) = handle.try_recv() {
                result = Some(r);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(result.unwrap().is_ok());

        fs::remove_file(obj).ok();
        fs::remove_file(png).ok();
    }
}
