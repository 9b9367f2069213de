//! Frame orchestrator.
//!
//! Owns the GPU context, the render targets and the five passes, plus the
//! camera and parameter state the window loop edits. One `render` call runs
//! the whole per-frame sequence in fixed order; there is no retry or
//! recovery inside a frame.

use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::arena::{GpuArena, SubBuffer};
use crate::error::ViewerResult;
use crate::gpu::GpuContext;
use crate::input::ControlState;
use crate::overlay::Overlay;
use crate::pipeline::geometry_pass::{build_draw_commands, material_ids};
use crate::pipeline::{
    AoParams, BlurPass, CompositePass, GeometryPass, MipChainPass, OcclusionPass, RenderMode,
    SceneBuffers,
};
use crate::resources::Model;
use crate::scene::{Camera, GlobalsUniform};
use crate::targets::RenderTargets;
use crate::ViewerConfig;

pub struct Viewer {
    context: GpuContext,
    targets: RenderTargets,
    geometry_pass: GeometryPass,
    mip_chain: MipChainPass,
    occlusion_pass: OcclusionPass,
    blur_pass: BlurPass,
    composite_pass: CompositePass,
    overlay: Overlay,
    scene: SceneBuffers,
    globals: SubBuffer,
    ao_params: SubBuffer,
    shade_mode: SubBuffer,
    pub camera: Camera,
    pub params: AoParams,
    camera_dirty: bool,
}

impl Viewer {
    pub fn new(window: Arc<Window>, model_path: &Path, config: &ViewerConfig) -> ViewerResult<Self> {
        let context = GpuContext::new(window.clone(), config.vsync)?;
        let (width, height) = context.surface_size();

        let mut arena = GpuArena::new(context.device(), config.arena_capacity);
        let model = Model::load(model_path)?;

        // Static model data, written once.
        let vertices = arena.allocate(model.vertex_bytes().len().max(4) as u64, 16)?;
        vertices.write_slice(context.queue(), &model.vertices);

        let indices = arena.allocate(model.index_bytes().len().max(4) as u64, 4)?;
        indices.write_slice(context.queue(), &model.indices);

        let ids = material_ids(&model.submeshes);
        let id_region = arena.allocate((ids.len() * 4).max(4) as u64, 4)?;
        id_region.write_slice(context.queue(), &ids);

        let commands = build_draw_commands(&model.submeshes);
        let command_bytes = std::mem::size_of_val(commands.as_slice());
        let draw_commands = arena.allocate(command_bytes.max(4) as u64, 4)?;
        draw_commands.write_slice(context.queue(), &commands);

        let materials = arena.allocate_storage(
            std::mem::size_of_val(model.materials.as_slice()) as u64,
        )?;
        materials.write_slice(context.queue(), &model.materials);

        let scene = SceneBuffers {
            vertices,
            material_ids: id_region,
            indices,
            draw_commands,
            draw_count: model.submeshes.len() as u32,
        };

        let mut camera = Camera::default();
        camera.set_aspect(width as f32, height as f32);

        let params = AoParams::default();

        let globals = arena.allocate_uniform(std::mem::size_of::<GlobalsUniform>() as u64)?;
        globals.write(
            context.queue(),
            &camera.globals(Vec2::new(width as f32, height as f32)),
        );

        let ao_params = arena.allocate_uniform(48)?;
        ao_params.write(context.queue(), &params.uniform_data());

        let shade_mode = arena.allocate_uniform(4)?;
        shade_mode.write(context.queue(), &0u32);

        let targets = RenderTargets::new(context.device(), width, height);

        let geometry_pass = GeometryPass::new(context.device(), &globals);
        let mip_chain = MipChainPass::new(context.device(), &targets);
        let occlusion_pass = OcclusionPass::new(
            context.device(),
            &targets,
            globals.clone(),
            ao_params.clone(),
        );
        let blur_pass = BlurPass::new(
            context.device(),
            context.queue(),
            &mut arena,
            ao_params.clone(),
            &targets,
        )?;
        let composite_pass = CompositePass::new(
            context.device(),
            context.swapchain_format(),
            &targets,
            globals.clone(),
            materials,
            shade_mode.clone(),
        );

        let overlay = Overlay::new(&window, context.device(), context.swapchain_format());

        // The regions hold the arena buffer alive; the allocator itself is
        // done once the static scene data is placed.
        log::info!(
            "Arena usage after load: {} of {} bytes",
            arena.used(),
            arena.capacity()
        );

        Ok(Self {
            context,
            targets,
            geometry_pass,
            mip_chain,
            occlusion_pass,
            blur_pass,
            composite_pass,
            overlay,
            scene,
            globals,
            ao_params,
            shade_mode,
            camera,
            params,
            camera_dirty: true,
        })
    }

    /// Route a window event to the overlay. True means egui consumed it.
    pub fn overlay_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.overlay.on_window_event(window, event)
    }

    pub fn overlay_wants_pointer(&self) -> bool {
        self.overlay.wants_pointer_input()
    }

    pub fn overlay_wants_keyboard(&self) -> bool {
        self.overlay.wants_keyboard_input()
    }

    /// Flag that the camera changed and the globals need a rewrite.
    pub fn mark_camera_moved(&mut self) {
        self.camera_dirty = true;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
        let (w, h) = self.context.surface_size();
        if (w, h) != (self.targets.width(), self.targets.height()) {
            self.targets = RenderTargets::new(self.context.device(), w, h);
            self.mip_chain.rebuild(self.context.device(), &self.targets);
            self.occlusion_pass.rebuild(self.context.device(), &self.targets);
            self.blur_pass.rebuild(self.context.device(), &self.targets);
            self.composite_pass.rebuild(self.context.device(), &self.targets);
            self.camera.set_aspect(w as f32, h as f32);
            self.camera_dirty = true;
        }
    }

    /// Reconfigure after the surface reported lost/outdated.
    pub fn handle_surface_lost(&mut self) {
        self.context.reconfigure_surface();
    }

    pub fn render(
        &mut self,
        window: &Window,
        controls: &mut ControlState,
        average_ms: f32,
        fps: f32,
    ) -> ViewerResult<()> {
        let mut frame = self.context.begin_frame()?;

        if self.camera_dirty {
            let viewport = Vec2::new(frame.width as f32, frame.height as f32);
            self.globals
                .write(self.context.queue(), &self.camera.globals(viewport));
            self.camera_dirty = false;
        }

        // Keep the shading flag in step with the passes recorded below.
        let ao_only = (controls.mode == RenderMode::AoOnly) as u32;
        self.shade_mode.write(self.context.queue(), &ao_only);

        if controls.mode == RenderMode::NoAo {
            self.targets.clear_occlusion(&mut frame.encoder);
        } else {
            self.geometry_pass
                .record(&mut frame.encoder, &self.targets, &self.scene);
            self.mip_chain.record(&mut frame.encoder, &self.targets);
            self.occlusion_pass.record(&mut frame.encoder, &self.targets);
            if controls.blur_enabled {
                self.blur_pass.record(&mut frame.encoder, &self.targets);
            }
        }

        self.composite_pass.record(
            &mut frame.encoder,
            &frame.view,
            self.context.depth_view(),
            &self.scene,
        );

        self.overlay.begin_frame(window);
        self.overlay.ui(average_ms, fps, controls, &mut self.params);
        self.overlay.end_frame(window);
        self.overlay.render(
            self.context.device(),
            self.context.queue(),
            &mut frame.encoder,
            &frame.view,
            frame.width,
            frame.height,
        );

        // The parameter block goes up every frame, edited or not.
        self.ao_params
            .write(self.context.queue(), &self.params.uniform_data());

        self.context.end_frame(frame);
        Ok(())
    }
}
