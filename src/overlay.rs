//! Parameter overlay drawn over the finished frame.
//!
//! Owns the egui context, winit input bridge and wgpu renderer. The window
//! edits the render mode, the blur toggle and the whole AO parameter block
//! in place; whatever it leaves behind is uploaded at the end of the frame.

use egui::ViewportId;
use egui_wgpu::ScreenDescriptor;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::input::ControlState;
use crate::pipeline::{AoParams, RenderMode};

pub struct Overlay {
    ctx: egui::Context,
    winit_state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
}

impl Overlay {
    pub fn new(window: &Window, device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let ctx = egui::Context::default();

        let winit_state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );

        let renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1);

        Self {
            ctx,
            winit_state,
            renderer,
            paint_jobs: Vec::new(),
            textures_delta: egui::TexturesDelta::default(),
        }
    }

    /// Feed a window event to egui. Returns true when egui consumed it and
    /// the camera should not see it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    pub fn wants_pointer_input(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    pub fn wants_keyboard_input(&self) -> bool {
        self.ctx.wants_keyboard_input()
    }

    pub fn begin_frame(&mut self, window: &Window) {
        let raw_input = self.winit_state.take_egui_input(window);
        self.ctx.begin_frame(raw_input);
    }

    /// The parameter window, rebuilt between `begin_frame` and `end_frame`.
    pub fn ui(
        &mut self,
        average_ms: f32,
        fps: f32,
        controls: &mut ControlState,
        params: &mut AoParams,
    ) {
        egui::Window::new("AO Debug")
            .default_width(280.0)
            .show(&self.ctx, |ui| {
                ui.label(format!("Average {average_ms:.3} ms/frame ({fps:.1} FPS)"));
                ui.separator();

                ui.radio_value(&mut controls.mode, RenderMode::Full, "Full Render");
                ui.radio_value(&mut controls.mode, RenderMode::AoOnly, "AO Only");
                ui.radio_value(&mut controls.mode, RenderMode::NoAo, "No AO");
                ui.separator();

                ui.checkbox(&mut controls.blur_enabled, "Blur Enabled");
                ui.checkbox(&mut params.use_rendered_normals, "Use Rendered Normals");

                egui::CollapsingHeader::new("AO Params")
                    .default_open(true)
                    .show(ui, |ui| {
                        ui.add(egui::Slider::new(&mut params.sample_count, 1..=64).text("Num Samples"));
                        ui.add(egui::Slider::new(&mut params.turns, 1..=64).text("Num Turns"));
                        ui.add(egui::Slider::new(&mut params.ball_radius, 0.1..=10.0).text("Ball Radius"));
                        ui.add(egui::Slider::new(&mut params.sigma, 0.1..=20.0).text("Sigma"));
                        ui.add(egui::Slider::new(&mut params.kappa, 0.1..=10.0).text("Kappa"));
                    });

                egui::CollapsingHeader::new("Filter Params")
                    .default_open(true)
                    .show(ui, |ui| {
                        ui.add(egui::Slider::new(&mut params.filter_scale, 1..=10).text("Filter Scale"));
                        ui.add(egui::Slider::new(&mut params.edge_sharpness, 0.0..=10.0).text("Edge Sharpness"));
                    });
            });
    }

    pub fn end_frame(&mut self, window: &Window) {
        let full_output = self.ctx.end_frame();

        self.winit_state
            .handle_platform_output(window, full_output.platform_output);

        self.paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        self.textures_delta = full_output.textures_delta;
    }

    /// Draw the tessellated UI over the frame
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) {
        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: self.ctx.pixels_per_point(),
        };

        for (id, image_delta) in &self.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &self.paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .render(&mut render_pass, &self.paint_jobs, &screen_descriptor);
        }

        for id in &self.textures_delta.free {
            self.renderer.free_texture(id);
        }

        self.textures_delta = egui::TexturesDelta::default();
    }
}
