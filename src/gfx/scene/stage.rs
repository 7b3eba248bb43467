//! The stage owns everything that is drawn in a frame and drives the
//! build, encode and render steps over it.
//!
//! A frame runs [`Stage::build_all_buffers`], [`Stage::encode_commands`],
//! [`Stage::render_pass`] and, once the command buffer is submitted,
//! [`Stage::finish_frame`]. Calling a step out of order is an error.

use std::rc::Rc;
use std::sync::Arc;

use cgmath::{Matrix4, One, Quaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::mesh::MeshData;
use super::prop::{Prop, PropId};
use crate::config::{CameraConfig, StageConfig};
use crate::error::{StageError, StageResult};
use crate::gfx::camera::{Camera, FlyCameraController, InputState};
use crate::gfx::geometry::generate_sphere;
use crate::gfx::lighting::{Light, LightArray, LightRecord, MAX_LIGHTS};
use crate::gfx::rendering::frame::{FramePhase, FrameSequence, PassReport, PassState};
use crate::gfx::rendering::pipeline_manager::PipelineLibrary;
use crate::gfx::resources::bind_group_layouts::{CAMERA_GROUP, LIGHTS_GROUP};
use crate::gfx::resources::material::{Material, SharedMaterial};
use crate::gfx::transform::Transform;
use crate::wgpu_utils::{BindGroupBuilder, StagedUniform};

/// Scale of the marker spheres built by [`Stage::build_debug_lights`].
pub const DEBUG_LIGHT_SCALE: f32 = 0.1;

/// Index of a point light on its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightHandle(pub(crate) usize);

impl LightHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Counts reported by [`Stage::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStatistics {
    pub prop_count: usize,
    pub light_count: usize,
    pub material_count: usize,
    pub total_triangles: usize,
    pub total_vertices: usize,
}

struct StageGpu {
    device: Arc<wgpu::Device>,
    pipelines: Arc<PipelineLibrary>,
    sun: StagedUniform<LightRecord>,
    lights: StagedUniform<LightArray>,
    lights_group: wgpu::BindGroup,
}

/// Scene container and per-frame orchestrator
///
/// Props draw in insertion order. The driver calls
/// [`Stage::build_all_buffers`], [`Stage::encode_commands`],
/// [`Stage::render_pass`] and [`Stage::finish_frame`] once each per frame.
pub struct Stage {
    pub camera: Camera,
    pub sun_light: Light,
    camera_config: CameraConfig,
    lights: Vec<Light>,
    props: Vec<Prop>,
    materials: Vec<SharedMaterial>,
    light_array: LightArray,
    frames: FrameSequence,
    next_prop_id: u64,
    frames_in_flight: usize,
    gpu: Option<StageGpu>,
}

impl Stage {
    /// Builds a stage with the configured sun and randomly scattered point
    /// lights. No GPU resources exist until [`Stage::initialize`].
    pub fn new(config: StageConfig) -> StageResult<Self> {
        let sun = &config.sun;
        let sun_light = Light::sun("SunLight", Vector3::from(sun.position))
            .with_color(sun.color)
            .with_strengths(sun.ambient, sun.diffuse, sun.specular);

        let mut stage = Self {
            camera: Camera::new(&config.camera, 1.0),
            sun_light,
            camera_config: config.camera.clone(),
            lights: Vec::with_capacity(MAX_LIGHTS),
            props: Vec::new(),
            materials: Vec::new(),
            light_array: LightArray::new(),
            frames: FrameSequence::default(),
            next_prop_id: 0,
            frames_in_flight: config.frames_in_flight.max(1),
            gpu: None,
        };

        let mut rng = match config.light_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        stage.scatter_random_lights(&mut rng, config.random_lights)?;
        Ok(stage)
    }

    /// Replaces the camera with one looking from the configured pose at the
    /// given viewport. An initialized stage gets the camera buffers too.
    ///
    /// # Arguments
    /// * `width`, `height` - Viewport size in pixels; zero is treated as one
    pub fn create_perspective_camera(&mut self, width: u32, height: u32) {
        self.camera = Camera::for_viewport(&self.camera_config, width, height);
        if let Some(gpu) = &self.gpu {
            self.camera.initialize_bind_group(
                &gpu.device,
                &gpu.pipelines.layouts().camera,
                self.frames_in_flight,
            );
        }
    }

    /// Creates the light buffers and camera group, pairs every known material
    /// with its pipeline and uploads every prop. Later calls are no-ops.
    pub fn initialize(
        &mut self,
        device: Arc<wgpu::Device>,
        pipelines: Arc<PipelineLibrary>,
    ) -> StageResult<()> {
        if self.gpu.is_some() {
            return Ok(());
        }
        let frames = self.frames_in_flight;
        let layouts = Arc::clone(pipelines.layouts());

        for material in &self.materials {
            pipelines.assign(&mut material.borrow_mut())?;
        }
        for prop in self.props.iter_mut() {
            prop.initialize(&device, &layouts, frames)?;
        }
        self.camera
            .initialize_bind_group(&device, &layouts.camera, frames);

        let sun = StagedUniform::new(&device, "sun light", frames);
        let lights = StagedUniform::new(&device, "light array", frames);
        let lights_group = BindGroupBuilder::new(&layouts.lights)
            .resource(sun.binding_resource())
            .resource(lights.binding_resource())
            .create(&device, "multi light group");

        self.gpu = Some(StageGpu {
            device,
            pipelines,
            sun,
            lights,
            lights_group,
        });

        log::info!(
            "stage initialized: {} props, {} materials, {} lights, {} frames in flight",
            self.props.len(),
            self.materials.len(),
            self.lights.len(),
            frames
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn frame_phase(&self) -> FramePhase {
        self.frames.phase()
    }

    pub fn frame_index(&self) -> u64 {
        self.frames.frame()
    }

    // Props

    /// Appends `prop` to the draw order and returns its handle. On an
    /// initialized stage the prop is uploaded and its materials paired now.
    ///
    /// # Returns
    /// The new prop's id, or `NoPipelineForShape` when one of its materials
    /// has no pipeline to draw it
    pub fn add_prop(&mut self, mut prop: Prop) -> StageResult<PropId> {
        for material in prop.materials() {
            self.register_material(material)?;
        }
        if let Some(gpu) = &self.gpu {
            prop.initialize(&gpu.device, gpu.pipelines.layouts(), self.frames_in_flight)?;
        }

        let id = PropId(self.next_prop_id);
        self.next_prop_id += 1;
        prop.assign_id(id);
        log::debug!("prop '{}' added as {:?}", prop.name, id);
        self.props.push(prop);
        Ok(id)
    }

    /// Removes the most recently added prop, unlinking it from any light.
    pub fn remove_last_prop(&mut self) -> Option<Prop> {
        let removed = self.props.pop()?;
        self.unlink_debug_props(std::slice::from_ref(&removed));
        Some(removed)
    }

    /// Removes every prop called `name`, keeping the order of the rest.
    ///
    /// # Returns
    /// The removed props, empty when nothing matched
    pub fn remove_prop_by_name(&mut self, name: &str) -> Vec<Prop> {
        let (removed, kept): (Vec<Prop>, Vec<Prop>) = std::mem::take(&mut self.props)
            .into_iter()
            .partition(|prop| prop.name == name);
        self.props = kept;
        self.unlink_debug_props(&removed);
        removed
    }

    pub fn remove_prop(&mut self, id: PropId) -> Option<Prop> {
        let index = self.props.iter().position(|prop| prop.id() == Some(id))?;
        let removed = self.props.remove(index);
        self.unlink_debug_props(std::slice::from_ref(&removed));
        Some(removed)
    }

    fn unlink_debug_props(&mut self, removed: &[Prop]) {
        for light in self.lights.iter_mut() {
            if removed.iter().any(|prop| prop.id().is_some() && prop.id() == light.debug_prop) {
                light.debug_prop = None;
            }
        }
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn prop(&self, id: PropId) -> Option<&Prop> {
        self.props.iter().find(|prop| prop.id() == Some(id))
    }

    pub fn prop_mut(&mut self, id: PropId) -> Option<&mut Prop> {
        self.props.iter_mut().find(|prop| prop.id() == Some(id))
    }

    pub fn prop_by_name(&self, name: &str) -> Option<&Prop> {
        self.props.iter().find(|prop| prop.name == name)
    }

    pub fn draw_order(&self) -> Vec<PropId> {
        self.props.iter().filter_map(Prop::id).collect()
    }

    // Materials

    /// Registers a standalone material and returns the shared handle meshes
    /// should be built with.
    pub fn add_material(&mut self, material: Material) -> StageResult<SharedMaterial> {
        let shared = material.into_shared();
        self.register_material(Rc::clone(&shared))?;
        Ok(shared)
    }

    fn register_material(&mut self, material: SharedMaterial) -> StageResult<()> {
        if self.materials.iter().any(|known| Rc::ptr_eq(known, &material)) {
            return Ok(());
        }
        if let Some(gpu) = &self.gpu {
            gpu.pipelines.assign(&mut material.borrow_mut())?;
        }
        self.materials.push(material);
        Ok(())
    }

    pub fn materials(&self) -> &[SharedMaterial] {
        &self.materials
    }

    pub fn material_by_name(&self, name: &str) -> Option<&SharedMaterial> {
        self.materials
            .iter()
            .find(|material| material.borrow().name == name)
    }

    // Lights

    /// Adds a point light to the packed light array.
    ///
    /// # Returns
    /// A handle to the light, or `LightCapacityExceeded` once `MAX_LIGHTS`
    /// lights exist
    pub fn add_light(&mut self, light: Light) -> StageResult<LightHandle> {
        if self.lights.len() >= MAX_LIGHTS {
            return Err(StageError::LightCapacityExceeded {
                index: self.lights.len(),
                capacity: MAX_LIGHTS,
            });
        }
        self.lights.push(light);
        Ok(LightHandle(self.lights.len() - 1))
    }

    /// Adds `count` point lights at random positions in x,z [-5, 5) and
    /// y [0, 10) with random colors.
    ///
    /// # Arguments
    /// * `rng` - Source of positions and colors; seed it for repeatable scenes
    /// * `count` - Number of lights to add
    pub fn scatter_random_lights<R: Rng>(
        &mut self,
        rng: &mut R,
        count: usize,
    ) -> StageResult<Vec<LightHandle>> {
        (0..count)
            .map(|_| {
                let index = self.lights.len();
                let position = Vector3::new(
                    rng.random::<f32>() * 10.0 - 5.0,
                    rng.random::<f32>() * 10.0,
                    rng.random::<f32>() * 10.0 - 5.0,
                );
                let color = [rng.random::<f32>(), rng.random::<f32>(), rng.random::<f32>()];
                let light = Light::point(format!("light{index}"), position)
                    .with_color(color)
                    .with_strengths(0.05, 0.8, 1.0);
                self.add_light(light)
            })
            .collect()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn light(&self, handle: LightHandle) -> Option<&Light> {
        self.lights.get(handle.0)
    }

    pub fn light_by_name(&self, name: &str) -> Option<LightHandle> {
        self.lights
            .iter()
            .position(|light| light.name == name)
            .map(LightHandle)
    }

    /// Moves a light and the marker prop linked to it.
    ///
    /// # Arguments
    /// * `handle` - Light to move; `UnknownLight` if it is not on this stage
    /// * `delta` - World-space offset
    pub fn move_light(&mut self, handle: LightHandle, delta: Vector3<f32>) -> StageResult<()> {
        self.lights
            .get_mut(handle.0)
            .ok_or(StageError::UnknownLight(handle.0))?
            .translate(delta);
        self.on_light_moved(handle, delta);
        Ok(())
    }

    /// Applies a light's world-space move to its debug prop, if it has one.
    pub fn on_light_moved(&mut self, handle: LightHandle, delta: Vector3<f32>) {
        let Some(id) = self.lights.get(handle.0).and_then(|light| light.debug_prop) else {
            return;
        };
        if let Some(prop) = self.prop_mut(id) {
            prop.transform.matrix = Matrix4::from_translation(delta) * prop.transform.matrix;
        }
    }

    pub fn move_sun(&mut self, delta: Vector3<f32>) {
        self.sun_light.translate(delta);
    }

    /// Adds a small sphere in the light's color at each of the first `count`
    /// lights that does not have a marker yet.
    ///
    /// # Returns
    /// Ids of the marker props created by this call
    pub fn build_debug_lights(&mut self, count: usize) -> StageResult<Vec<PropId>> {
        let mut built = Vec::new();
        for index in 0..count.min(self.lights.len()) {
            if self.lights[index].debug_prop.is_some() {
                continue;
            }
            let name = format!("Light_Debug{index}");
            let [r, g, b] = self.lights[index].color;
            let material = Material::unlit(name.clone())
                .with_default_color([r, g, b, 1.0])
                .into_shared();
            let mesh = MeshData::new(
                name.clone(),
                generate_sphere(16, 12).into_mesh_source(),
                material,
            )?;
            let transform = Transform::new(
                Quaternion::one(),
                self.lights[index].position(),
                Vector3::new(DEBUG_LIGHT_SCALE, DEBUG_LIGHT_SCALE, DEBUG_LIGHT_SCALE),
            );

            let id = self.add_prop(Prop::new(name, vec![Rc::new(mesh)]).with_transform(transform))?;
            self.lights[index].debug_prop = Some(id);
            built.push(id);
        }
        log::debug!("built {} debug light props", built.len());
        Ok(built)
    }

    /// Rebuilds every light record and packs them into the light array,
    /// zeroing unused slots.
    pub fn pack_lights(&mut self) -> StageResult<&LightArray> {
        self.sun_light.build_light_struct();
        self.light_array.clear();
        for (index, light) in self.lights.iter_mut().enumerate() {
            self.light_array.set(index, light.build_light_struct())?;
        }
        Ok(&self.light_array)
    }

    /// Applies one frame of fly-camera input, including sun nudging.
    pub fn apply_input(&mut self, controller: &FlyCameraController, input: &InputState, delta_time: f32) {
        controller.update_camera(input, &mut self.camera, delta_time);
        let sun_delta = controller.sun_offset(input, delta_time);
        if sun_delta != Vector3::new(0.0, 0.0, 0.0) {
            self.move_sun(sun_delta);
        }
    }

    // Frame protocol

    /// Stages this frame's camera, prop, material and light data. Any failure,
    /// including device out-of-memory, abandons the frame.
    pub fn build_all_buffers(&mut self) -> StageResult<()> {
        if self.gpu.is_none() {
            return Err(StageError::NotInitialized);
        }
        let frame = self.frames.begin_build()?;
        let result = self.stage_frame(frame);
        if result.is_err() {
            self.frames.abandon();
        }
        result
    }

    fn stage_frame(&mut self, frame: u64) -> StageResult<()> {
        self.pack_lights()?;

        let Self {
            gpu,
            camera,
            props,
            sun_light,
            light_array,
            ..
        } = self;
        let gpu = gpu.as_mut().ok_or(StageError::NotInitialized)?;
        let device = Arc::clone(&gpu.device);

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let staged = (|| -> StageResult<()> {
            camera.build_buffers(&device)?;
            for prop in props.iter_mut() {
                prop.build_buffers(&device, frame)?;
            }
            gpu.sun.stage(&device, sun_light.record());
            gpu.lights.stage(&device, light_array);
            Ok(())
        })();
        let out_of_memory = pollster::block_on(device.pop_error_scope());

        staged?;
        match out_of_memory {
            Some(error) => Err(StageError::OutOfMemory {
                during: format!("staging frame {frame} ({error})"),
            }),
            None => Ok(()),
        }
    }

    /// Records the staging-to-resident copies for the frame built last.
    pub fn encode_commands(&mut self, encoder: &mut wgpu::CommandEncoder) -> StageResult<()> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Err(StageError::NotInitialized);
        };
        let frame = self.frames.begin_encode()?;

        let encoded = (|| -> StageResult<()> {
            for prop in self.props.iter_mut() {
                prop.encode_commands(encoder, frame)?;
            }
            self.camera.encode_commands(encoder)?;
            gpu.sun.encode(encoder);
            gpu.lights.encode(encoder);
            Ok(())
        })();
        if encoded.is_err() {
            self.frames.abandon();
        }
        encoded
    }

    /// Draws every prop in insertion order. Camera and lights are bound once.
    ///
    /// # Returns
    /// The props drawn, in order, and the number of draw calls issued
    pub fn render_pass(&mut self, pass: &mut wgpu::RenderPass<'_>) -> StageResult<PassReport> {
        let gpu = self.gpu.as_ref().ok_or(StageError::NotInitialized)?;
        let camera_group = self.camera.bind_group().ok_or(StageError::NotInitialized)?;
        self.frames.begin_render()?;

        pass.set_bind_group(CAMERA_GROUP, camera_group, &[]);
        pass.set_bind_group(LIGHTS_GROUP, &gpu.lights_group, &[]);

        let mut state = PassState::new(&gpu.lights_group);
        match self.props.iter().try_for_each(|prop| prop.draw(pass, &mut state)) {
            Ok(()) => Ok(state.into_report()),
            Err(error) => {
                self.frames.abandon();
                Err(error)
            }
        }
    }

    /// Closes the frame after its commands were submitted and hands the used
    /// staging buffers back for mapping.
    ///
    /// # Returns
    /// The index of the frame just finished
    pub fn finish_frame(&mut self) -> StageResult<u64> {
        let frame = self.frames.finish()?;
        self.camera.reclaim();
        for prop in self.props.iter_mut() {
            prop.reclaim();
        }
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.sun.reclaim();
            gpu.lights.reclaim();
        }
        Ok(frame)
    }

    /// Drops a partially built frame so the next one can start.
    pub fn abandon_frame(&mut self) {
        self.frames.abandon();
    }

    /// Resident sun and light-array buffers, for readback.
    pub fn light_buffers(&self) -> Option<(&wgpu::Buffer, &wgpu::Buffer)> {
        self.gpu
            .as_ref()
            .map(|gpu| (gpu.sun.buffer(), gpu.lights.buffer()))
    }

    /// Prop, light and material counts plus total geometry size.
    pub fn stats(&self) -> StageStatistics {
        let meshes = || self.props.iter().flat_map(|prop| prop.meshes());
        StageStatistics {
            prop_count: self.props.len(),
            light_count: self.lights.len(),
            material_count: self.materials.len(),
            total_triangles: meshes().map(|mesh| mesh.index_count() / 3).sum(),
            total_vertices: meshes().map(|mesh| mesh.vertex_count()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_cube;
    use crate::gfx::lighting::colors;
    use approx::assert_abs_diff_eq;

    fn empty_stage() -> Stage {
        Stage::new(StageConfig::default().with_random_lights(0)).unwrap()
    }

    fn cube_prop(name: &str, material: SharedMaterial) -> Prop {
        let mesh = MeshData::new(name, generate_cube().into_mesh_source(), material).unwrap();
        Prop::new(name, vec![Rc::new(mesh)])
    }

    #[test]
    fn scattered_lights_stay_in_bounds() {
        let stage = Stage::new(StageConfig::default().with_light_seed(7)).unwrap();
        assert_eq!(stage.lights().len(), MAX_LIGHTS);
        for (i, light) in stage.lights().iter().enumerate() {
            let p = light.position();
            assert!((-5.0..5.0).contains(&p.x), "{p:?}");
            assert!((0.0..10.0).contains(&p.y), "{p:?}");
            assert!((-5.0..5.0).contains(&p.z), "{p:?}");
            assert!(light.color.iter().all(|c| (0.0..1.0).contains(c)));
            assert_eq!(light.name, format!("light{i}"));
            assert_abs_diff_eq!(light.ambient, 0.05);
            assert_abs_diff_eq!(light.diffuse, 0.8);
            assert_abs_diff_eq!(light.specular, 1.0);
        }
    }

    #[test]
    fn same_seed_scatters_same_lights() {
        let a = Stage::new(StageConfig::default().with_light_seed(42)).unwrap();
        let b = Stage::new(StageConfig::default().with_light_seed(42)).unwrap();
        for (la, lb) in a.lights().iter().zip(b.lights()) {
            assert_eq!(la.position(), lb.position());
            assert_eq!(la.color, lb.color);
        }
    }

    #[test]
    fn sun_follows_config() {
        let stage = empty_stage();
        assert_eq!(stage.sun_light.name, "SunLight");
        assert_eq!(stage.sun_light.color, colors::NOONSUN);
        assert_eq!(stage.sun_light.position(), Vector3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn seventeenth_light_is_rejected() {
        let mut stage = Stage::new(StageConfig::default().with_light_seed(1)).unwrap();
        let err = stage
            .add_light(Light::point("extra", Vector3::new(0.0, 1.0, 0.0)))
            .unwrap_err();
        assert!(matches!(
            err,
            StageError::LightCapacityExceeded { index: 16, capacity: 16 }
        ));
        assert_eq!(stage.lights().len(), MAX_LIGHTS);
    }

    #[test]
    fn packed_lights_match_records_and_zero_the_rest() {
        let mut stage = empty_stage();
        stage
            .add_light(Light::point("a", Vector3::new(1.0, 2.0, 3.0)).with_color(colors::RED))
            .unwrap();
        stage
            .add_light(Light::point("b", Vector3::new(-1.0, 0.5, 0.0)))
            .unwrap();

        let packed = *stage.pack_lights().unwrap();
        let first = packed.get(0).unwrap().as_floats();
        assert_eq!(&first[..8], &[1.0f32, 2.0, 3.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(packed.get(1).unwrap().position, [-1.0f32, 0.5, 0.0]);
        for i in 2..MAX_LIGHTS {
            assert_eq!(packed.get(i).unwrap().as_floats(), [0.0f32; 12]);
        }
    }

    #[test]
    fn packing_sees_moved_lights() {
        let mut stage = empty_stage();
        let handle = stage
            .add_light(Light::point("a", Vector3::new(0.0, 1.0, 0.0)))
            .unwrap();
        stage.move_light(handle, Vector3::new(2.0, 0.0, 0.0)).unwrap();
        let packed = *stage.pack_lights().unwrap();
        assert_eq!(packed.get(0).unwrap().position, [2.0f32, 1.0, 0.0]);
    }

    #[test]
    fn props_get_increasing_ids_in_draw_order() {
        let mut stage = empty_stage();
        let material = Material::phong("shared", colors::WHITE).into_shared();
        let a = stage.add_prop(cube_prop("a", Rc::clone(&material))).unwrap();
        let b = stage.add_prop(cube_prop("b", Rc::clone(&material))).unwrap();
        assert!(a < b);
        assert_eq!(stage.draw_order(), vec![a, b]);
        assert_eq!(stage.materials().len(), 1);
    }

    #[test]
    fn remove_by_name_drops_every_match_and_keeps_order() {
        let mut stage = empty_stage();
        let material = Material::phong("m", colors::WHITE).into_shared();
        let a = stage.add_prop(cube_prop("a", Rc::clone(&material))).unwrap();
        stage.add_prop(cube_prop("dup", Rc::clone(&material))).unwrap();
        let c = stage.add_prop(cube_prop("c", Rc::clone(&material))).unwrap();
        stage.add_prop(cube_prop("dup", Rc::clone(&material))).unwrap();

        let removed = stage.remove_prop_by_name("dup");
        assert_eq!(removed.len(), 2);
        assert_eq!(stage.draw_order(), vec![a, c]);
        assert!(stage.remove_prop_by_name("missing").is_empty());
    }

    #[test]
    fn remove_last_and_by_id() {
        let mut stage = empty_stage();
        let material = Material::unlit("m").into_shared();
        let a = stage.add_prop(cube_prop("a", Rc::clone(&material))).unwrap();
        let b = stage.add_prop(cube_prop("b", Rc::clone(&material))).unwrap();
        assert_eq!(stage.remove_last_prop().and_then(|p| p.id()), Some(b));
        assert_eq!(stage.remove_prop(a).map(|p| p.name), Some("a".to_string()));
        assert!(stage.remove_last_prop().is_none());
    }

    #[test]
    fn debug_props_track_their_lights() {
        let mut stage = empty_stage();
        let handle = stage
            .add_light(Light::point("a", Vector3::new(1.0, 2.0, 3.0)).with_color(colors::BLUE))
            .unwrap();
        stage
            .add_light(Light::point("b", Vector3::new(0.0, 5.0, 0.0)))
            .unwrap();

        let built = stage.build_debug_lights(6).unwrap();
        assert_eq!(built.len(), 2);
        assert_eq!(stage.lights()[0].debug_prop, Some(built[0]));

        stage.move_light(handle, Vector3::new(0.5, -1.0, 2.0)).unwrap();
        let marker = stage.prop(built[0]).unwrap();
        let expected = stage.lights()[0].position();
        let actual = marker.transform.get_position();
        assert_abs_diff_eq!(actual.x, expected.x, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.y, expected.y, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.z, expected.z, epsilon = 1e-5);
        assert_abs_diff_eq!(marker.transform.matrix.x.x, DEBUG_LIGHT_SCALE, epsilon = 1e-6);

        let vertex_colors = marker.meshes()[0].colors();
        assert_eq!(&vertex_colors[..3], &colors::BLUE);
    }

    #[test]
    fn debug_lights_are_built_once() {
        let mut stage = Stage::new(StageConfig::default().with_light_seed(3)).unwrap();
        assert_eq!(stage.build_debug_lights(6).unwrap().len(), 6);
        assert!(stage.build_debug_lights(6).unwrap().is_empty());
        assert_eq!(stage.props().len(), 6);
    }

    #[test]
    fn removing_a_marker_unlinks_its_light() {
        let mut stage = empty_stage();
        let handle = stage
            .add_light(Light::point("a", Vector3::new(0.0, 1.0, 0.0)))
            .unwrap();
        stage.build_debug_lights(1).unwrap();
        stage.remove_prop_by_name("Light_Debug0");
        assert_eq!(stage.light(handle).unwrap().debug_prop, None);
        stage.move_light(handle, Vector3::new(1.0, 0.0, 0.0)).unwrap();
    }

    #[test]
    fn moving_an_unknown_light_fails() {
        let mut stage = empty_stage();
        let err = stage
            .move_light(LightHandle(3), Vector3::new(1.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, StageError::UnknownLight(3)));
    }

    #[test]
    fn frame_steps_need_gpu_resources() {
        let mut stage = empty_stage();
        assert!(matches!(
            stage.build_all_buffers(),
            Err(StageError::NotInitialized)
        ));
        assert_eq!(stage.frame_phase(), FramePhase::Idle);
        assert!(matches!(stage.finish_frame(), Err(StageError::FrameOrder { .. })));
    }

    #[test]
    fn statistics_count_geometry() {
        let mut stage = empty_stage();
        let material = Material::unlit("m").into_shared();
        stage.add_prop(cube_prop("a", Rc::clone(&material))).unwrap();
        stage.add_prop(cube_prop("b", material)).unwrap();

        let stats = stage.stats();
        assert_eq!(stats.prop_count, 2);
        assert_eq!(stats.material_count, 1);
        assert_eq!(stats.total_triangles, 24);
        assert_eq!(stats.total_vertices, 48);
    }

    #[test]
    fn perspective_camera_uses_viewport_aspect() {
        let mut stage = empty_stage();
        stage.create_perspective_camera(800, 400);
        assert_abs_diff_eq!(stage.camera.aspect, 2.0);
        assert_eq!(stage.camera.position(), Vector3::new(0.0, 3.0, 10.0));
    }
}
