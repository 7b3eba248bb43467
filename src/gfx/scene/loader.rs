//! OBJ import: one prop per model, Phong materials shared by name.

use std::path::Path;
use std::rc::Rc;

use anyhow::Context;

use super::mesh::{MeshData, MeshSource};
use super::prop::{Prop, PropId};
use super::stage::Stage;
use crate::gfx::resources::material::{Material, SharedMaterial};

/// Color given to models whose material is missing or has no diffuse term.
pub const DEFAULT_DIFFUSE: [f32; 3] = [0.8, 0.8, 0.8];
const DEFAULT_MATERIAL: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub props: Vec<PropId>,
    pub meshes: usize,
    pub materials: usize,
}

#[derive(Debug, Clone)]
pub struct StageLoader {
    load_options: tobj::LoadOptions,
}

impl Default for StageLoader {
    fn default() -> Self {
        Self {
            load_options: tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        }
    }
}

impl StageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `path` and its MTL library into `stage`. A missing MTL file is
    /// not an error; every model then uses the default material.
    pub fn load_obj(&self, path: impl AsRef<Path>, stage: &mut Stage) -> anyhow::Result<LoadSummary> {
        let path = path.as_ref();
        let (models, materials) = tobj::load_obj(path, &self.load_options)
            .with_context(|| format!("failed to load OBJ file {}", path.display()))?;

        let materials = materials.unwrap_or_else(|err| {
            log::warn!("{}: no usable MTL file ({err}), using default materials", path.display());
            Vec::new()
        });

        let summary = self
            .add_models(stage, &models, &materials)
            .with_context(|| format!("failed to add {} to the stage", path.display()))?;
        log::info!(
            "loaded {}: {} props, {} meshes, {} materials",
            path.display(),
            summary.props.len(),
            summary.meshes,
            summary.materials
        );
        Ok(summary)
    }

    /// Adds already-parsed models. Materials already on the stage under the
    /// same name are reused rather than duplicated.
    pub fn add_models(
        &self,
        stage: &mut Stage,
        models: &[tobj::Model],
        materials: &[tobj::Material],
    ) -> anyhow::Result<LoadSummary> {
        let known_before = stage.materials().len();
        let mut summary = LoadSummary::default();

        for (index, model) in models.iter().enumerate() {
            let name = if model.name.is_empty() {
                format!("prop{index}")
            } else {
                model.name.clone()
            };
            if model.mesh.indices.is_empty() {
                log::warn!("skipping model '{name}': it has no triangle faces");
                continue;
            }

            let material = match model.mesh.material_id.and_then(|id| materials.get(id).map(|m| (id, m))) {
                Some((id, mtl)) => stage_material(stage, &material_name(mtl, id), mtl)?,
                None => stage_material(stage, DEFAULT_MATERIAL, &tobj::Material::default())?,
            };

            let mesh = MeshData::new(name.clone(), mesh_source(&model.mesh), material)
                .with_context(|| format!("model '{name}'"))?;
            let id = stage.add_prop(Prop::new(name, vec![Rc::new(mesh)]))?;

            summary.props.push(id);
            summary.meshes += 1;
        }

        summary.materials = stage.materials().len() - known_before;
        Ok(summary)
    }
}

fn material_name(mtl: &tobj::Material, index: usize) -> String {
    if mtl.name.is_empty() {
        format!("material_{index}")
    } else {
        mtl.name.clone()
    }
}

/// Returns the stage material called `name`, creating a Phong one from
/// `mtl` the first time.
fn stage_material(stage: &mut Stage, name: &str, mtl: &tobj::Material) -> anyhow::Result<SharedMaterial> {
    if let Some(existing) = stage.material_by_name(name) {
        return Ok(Rc::clone(existing));
    }
    let diffuse = mtl.diffuse.unwrap_or(DEFAULT_DIFFUSE);
    let alpha = mtl.dissolve.unwrap_or(1.0);
    let material = Material::phong(name, diffuse)
        .with_default_color([diffuse[0], diffuse[1], diffuse[2], alpha]);
    Ok(stage.add_material(material)?)
}

/// Keeps the streams whose length matches the vertex count. The rest are
/// derived by `MeshData::new`.
fn mesh_source(mesh: &tobj::Mesh) -> MeshSource {
    let vertices = mesh.positions.len() / 3;
    let stream = |data: &[f32], width: usize| {
        (!data.is_empty() && data.len() == vertices * width).then(|| data.to_vec())
    };
    MeshSource {
        positions: mesh.positions.clone(),
        normals: stream(&mesh.normals, 3),
        colors: stream(&mesh.vertex_color, 3),
        uvs: stream(&mesh.texcoords, 2),
        indices: mesh.indices.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageConfig;

    fn stage() -> Stage {
        Stage::new(StageConfig::default().with_random_lights(0)).unwrap()
    }

    fn triangle(name: &str, material_id: Option<usize>) -> tobj::Model {
        let mesh = tobj::Mesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
            material_id,
            ..Default::default()
        };
        tobj::Model::new(mesh, name.to_string())
    }

    fn mtl(name: &str, diffuse: [f32; 3]) -> tobj::Material {
        tobj::Material {
            name: name.to_string(),
            diffuse: Some(diffuse),
            ..Default::default()
        }
    }

    #[test]
    fn one_prop_per_model_with_shared_materials() {
        let mut stage = stage();
        let models = [
            triangle("a", Some(0)),
            triangle("b", Some(0)),
            triangle("c", Some(1)),
        ];
        let materials = [mtl("red", [1.0, 0.0, 0.0]), mtl("blue", [0.0, 0.0, 1.0])];

        let summary = StageLoader::new()
            .add_models(&mut stage, &models, &materials)
            .unwrap();
        assert_eq!(summary.props.len(), 3);
        assert_eq!(summary.materials, 2);
        assert_eq!(stage.draw_order(), summary.props);

        let a = stage.prop_by_name("a").unwrap();
        let b = stage.prop_by_name("b").unwrap();
        assert!(Rc::ptr_eq(a.meshes()[0].material(), b.meshes()[0].material()));
        assert_eq!(a.meshes()[0].material().borrow().color(), Some([1.0, 0.0, 0.0]));
    }

    #[test]
    fn reloading_reuses_materials_by_name() {
        let mut stage = stage();
        let loader = StageLoader::new();
        let materials = [mtl("red", [1.0, 0.0, 0.0])];
        loader
            .add_models(&mut stage, &[triangle("a", Some(0))], &materials)
            .unwrap();
        let again = loader
            .add_models(&mut stage, &[triangle("b", Some(0))], &materials)
            .unwrap();
        assert_eq!(again.materials, 0);
        assert_eq!(stage.materials().len(), 1);
    }

    #[test]
    fn models_without_material_get_the_default() {
        let mut stage = stage();
        StageLoader::new()
            .add_models(&mut stage, &[triangle("", None), triangle("", Some(9))], &[])
            .unwrap();
        assert_eq!(stage.materials().len(), 1);
        let prop = stage.prop_by_name("prop0").unwrap();
        let material = prop.meshes()[0].material().borrow();
        assert_eq!(material.name, DEFAULT_MATERIAL);
        assert_eq!(material.color(), Some(DEFAULT_DIFFUSE));
        assert!(stage.prop_by_name("prop1").is_some());
    }

    #[test]
    fn faceless_models_are_skipped() {
        let mut stage = stage();
        let mut points = triangle("points", None);
        points.mesh.indices.clear();

        let summary = StageLoader::new()
            .add_models(&mut stage, &[points, triangle("tri", None)], &[])
            .unwrap();
        assert_eq!(summary.props.len(), 1);
        assert!(stage.prop_by_name("points").is_none());
        assert!(stage.prop_by_name("tri").is_some());
    }

    #[test]
    fn mismatched_streams_are_derived() {
        let mesh = tobj::Mesh {
            positions: vec![0.0; 9],
            normals: vec![0.0; 6],
            texcoords: vec![0.0; 6],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let source = mesh_source(&mesh);
        assert!(source.normals.is_none());
        assert_eq!(source.uvs.map(|uvs| uvs.len()), Some(6));
        assert!(source.colors.is_none());
    }

    #[test]
    fn loads_obj_file_without_mtl() {
        let path = std::env::temp_dir().join(format!("prismatic_loader_{}.obj", std::process::id()));
        std::fs::write(
            &path,
            "o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n\
             o quad\nv 0 0 1\nv 1 0 1\nv 1 1 1\nv 0 1 1\nf 4 5 6 7\n",
        )
        .unwrap();

        let mut stage = stage();
        let summary = StageLoader::new().load_obj(&path, &mut stage).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(summary.props.len(), 2);
        let quad = stage.prop_by_name("quad").unwrap();
        assert_eq!(quad.meshes()[0].vertex_count(), 4);
        assert_eq!(quad.meshes()[0].index_count(), 6);
        assert_eq!(stage.stats().total_triangles, 3);
    }

    #[test]
    fn missing_file_reports_path() {
        let mut stage = stage();
        let err = StageLoader::new()
            .load_obj("/nonexistent/prismatic.obj", &mut stage)
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/prismatic.obj"));
    }
}
