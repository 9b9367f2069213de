//! Viewer entry point: window, event loop and input plumbing.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use ao_viewer::input::translate_key;
use ao_viewer::scene::{Camera, CameraController, CameraInput, FreeFlyController, OrbitController};
use ao_viewer::{ControlState, Viewer, ViewerConfig, ViewerError};

/// Application state for input handling
struct AppState {
    controls: ControlState,
    camera_input: CameraInput,
    free_fly: FreeFlyController,
    orbit: OrbitController,
    active_controller: usize, // 0 = FreeFly, 1 = Orbit
    last_frame: Instant,
    cursor_grabbed: bool,
    /// Frame time history for averaging
    frame_times: VecDeque<f32>,
    /// Averaged frame time in milliseconds
    average_ms: f32,
    /// Current FPS (averaged)
    fps: f32,
}

impl AppState {
    fn new() -> Self {
        Self {
            controls: ControlState::default(),
            camera_input: CameraInput::new(),
            free_fly: FreeFlyController::default(),
            orbit: OrbitController::default(),
            active_controller: 0,
            last_frame: Instant::now(),
            cursor_grabbed: false,
            frame_times: VecDeque::with_capacity(60),
            average_ms: 0.0,
            fps: 0.0,
        }
    }

    fn update_fps(&mut self, dt: f32) {
        // Keep last 60 frame times for averaging
        if self.frame_times.len() >= 60 {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(dt);

        if !self.frame_times.is_empty() {
            let avg_dt: f32 = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
            self.average_ms = avg_dt * 1000.0;
            self.fps = 1.0 / avg_dt;
        }
    }

    fn active_controller_name(&self) -> &'static str {
        match self.active_controller {
            0 => "FreeFly",
            1 => "Orbit",
            _ => "Unknown",
        }
    }

    /// Toggle controllers, aligning the incoming one with the current view
    /// so the camera does not jump.
    fn switch_controller(&mut self, camera: &Camera) {
        self.active_controller = (self.active_controller + 1) % 2;
        match self.active_controller {
            0 => self.free_fly.sync_with_camera(camera),
            _ => self.orbit.sync_with_camera(camera),
        }
        println!("Camera mode: {}", self.active_controller_name());
    }

    /// Returns true if the view changed this tick.
    fn update_camera(&mut self, camera: &mut Camera, dt: f32) -> bool {
        match self.active_controller {
            0 => self.free_fly.update(camera, &self.camera_input, dt),
            _ => self.orbit.update(camera, &self.camera_input, dt),
        }
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "ao-viewer".to_string());
    let model_path = match args.next() {
        Some(arg) => PathBuf::from(arg),
        None => {
            eprintln!("Usage: {} <model.gltf|model.glb>", program);
            std::process::exit(1);
        }
    };

    println!("Ambient Obscurance Viewer");
    println!();
    println!("Controls:");
    println!("  WASD        - Move camera");
    println!("  Q/E         - Move up/down");
    println!("  Shift       - Sprint (2x speed)");
    println!("  Right Mouse - Look / orbit");
    println!("  Scroll      - Adjust speed / zoom");
    println!("  Tab         - Switch camera mode");
    println!("  1/2/3       - Full render / AO only / AO off");
    println!("  B           - Toggle blur");
    println!("  N           - Toggle rendered normals");
    println!("  Escape      - Exit");
    println!();

    let config = ViewerConfig::default();

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(format!("{} - FreeFly Camera", config.title))
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)
            .expect("Failed to create window"),
    );

    let mut viewer = match Viewer::new(Arc::clone(&window), &model_path, &config) {
        Ok(viewer) => viewer,
        Err(e) => {
            eprintln!("Failed to start viewer: {}", e);
            std::process::exit(1);
        }
    };

    let mut state = AppState::new();
    state.free_fly.sync_with_camera(&viewer.camera);
    state.orbit.sync_with_camera(&viewer.camera);

    event_loop
        .run(move |event, elwt: &EventLoopWindowTarget<()>| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => {
                    // Pass events to egui first
                    let egui_consumed = viewer.overlay_event(&window, &event);

                    if !egui_consumed {
                        handle_window_event(&event, &mut viewer, &mut state, &window, elwt);
                    } else {
                        // Still need to handle certain events even if egui consumed them
                        match &event {
                            WindowEvent::CloseRequested => elwt.exit(),
                            WindowEvent::Resized(size) => viewer.resize(size.width, size.height),
                            WindowEvent::RedrawRequested => {
                                render_frame(&mut viewer, &mut state, &window);
                            }
                            _ => {}
                        }
                    }
                }
                Event::DeviceEvent { event, .. } => {
                    // Don't process mouse motion while egui owns the pointer
                    if !viewer.overlay_wants_pointer() {
                        handle_device_event(&event, &mut state);
                    }
                }
                Event::AboutToWait => {
                    let now = Instant::now();
                    let dt = (now - state.last_frame).as_secs_f32();
                    state.last_frame = now;

                    state.update_fps(dt);

                    // Update camera (skip if egui wants keyboard)
                    if !viewer.overlay_wants_keyboard() && state.update_camera(&mut viewer.camera, dt)
                    {
                        viewer.mark_camera_moved();
                    }

                    state.camera_input.reset_deltas();
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .expect("Event loop failed");
}

fn render_frame(viewer: &mut Viewer, state: &mut AppState, window: &winit::window::Window) {
    match viewer.render(window, &mut state.controls, state.average_ms, state.fps) {
        Ok(()) => {}
        Err(ViewerError::SurfaceLost) => viewer.handle_surface_lost(),
        Err(e) => eprintln!("Render error: {}", e),
    }
}

fn handle_window_event(
    event: &WindowEvent,
    viewer: &mut Viewer,
    state: &mut AppState,
    window: &winit::window::Window,
    elwt: &EventLoopWindowTarget<()>,
) {
    match event {
        WindowEvent::CloseRequested => {
            elwt.exit();
        }
        WindowEvent::Resized(size) => {
            viewer.resize(size.width, size.height);
        }
        WindowEvent::RedrawRequested => {
            render_frame(viewer, state, window);
        }
        WindowEvent::KeyboardInput { event, .. } => {
            let pressed = event.state == ElementState::Pressed;

            if let PhysicalKey::Code(key) = event.physical_key {
                if pressed && !event.repeat {
                    if let Some(action) = translate_key(key) {
                        let (next, toggle_normals) = state.controls.apply(action);
                        state.controls = next;

                        if toggle_normals {
                            viewer.params.use_rendered_normals =
                                !viewer.params.use_rendered_normals;
                        }
                        if state.controls.switch_controller {
                            state.controls.switch_controller = false;
                            state.switch_controller(&viewer.camera);
                            window.set_title(&format!(
                                "Ambient Obscurance Viewer - {} Camera",
                                state.active_controller_name()
                            ));
                        }
                        if state.controls.quit_requested {
                            elwt.exit();
                        }
                    }
                }

                match key {
                    KeyCode::KeyW => state.camera_input.forward = pressed,
                    KeyCode::KeyS => state.camera_input.backward = pressed,
                    KeyCode::KeyA => state.camera_input.left = pressed,
                    KeyCode::KeyD => state.camera_input.right = pressed,
                    KeyCode::KeyQ | KeyCode::ControlLeft => state.camera_input.down = pressed,
                    KeyCode::KeyE | KeyCode::Space => state.camera_input.up = pressed,
                    KeyCode::ShiftLeft | KeyCode::ShiftRight => {
                        state.camera_input.sprint = pressed
                    }
                    _ => {}
                }
            }
        }
        WindowEvent::MouseInput { state: btn_state, button, .. } => {
            if *button == MouseButton::Right {
                let pressed = *btn_state == ElementState::Pressed;
                state.camera_input.mouse_look_active = pressed;

                // Grab/release cursor
                if pressed && !state.cursor_grabbed {
                    let _ = window.set_cursor_grab(winit::window::CursorGrabMode::Confined);
                    window.set_cursor_visible(false);
                    state.cursor_grabbed = true;
                } else if !pressed && state.cursor_grabbed {
                    let _ = window.set_cursor_grab(winit::window::CursorGrabMode::None);
                    window.set_cursor_visible(true);
                    state.cursor_grabbed = false;
                }
            }
        }
        WindowEvent::MouseWheel { delta, .. } => {
            let scroll = match delta {
                MouseScrollDelta::LineDelta(_, y) => *y,
                MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
            };
            state.camera_input.scroll_delta += scroll;
        }
        WindowEvent::Focused(false) => {
            // Release all keys when window loses focus
            state.camera_input = CameraInput::new();
            if state.cursor_grabbed {
                let _ = window.set_cursor_grab(winit::window::CursorGrabMode::None);
                window.set_cursor_visible(true);
                state.cursor_grabbed = false;
            }
        }
        _ => {}
    }
}

fn handle_device_event(event: &DeviceEvent, state: &mut AppState) {
    if let DeviceEvent::MouseMotion { delta } = event {
        if state.camera_input.mouse_look_active {
            state.camera_input.mouse_delta.x += delta.0 as f32;
            state.camera_input.mouse_delta.y += delta.1 as f32;
        }
    }
}
