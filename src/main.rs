//! softpipe viewer
//!
//! Renders the scene on the CPU every frame and shows the framebuffer as a
//! full-window texture.
//!
//! Controls: left-drag to look, W/S forward, D/A right, E/Q up, Shift sprint,
//! Space pause, F wireframe, Escape quit.

use std::path::PathBuf;

use macroquad::prelude::*;
use softpipe::app::{AppState, FrameInput};
use softpipe::config::{load_scene_or_default, SceneConfig};
use softpipe::logging::{init_logging, LoggingConfig};
use softpipe::rasterizer::{self as sp, Framebuffer};
use softpipe::VERSION;

const DEFAULT_SCENE: &str = "scene.ron";
/// Frames between timing reports
const REPORT_INTERVAL: u64 = 120;

fn scene_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCENE))
}

fn load_scene() -> SceneConfig {
    let path = scene_path();
    match load_scene_or_default(&path) {
        Ok(scene) => scene,
        Err(e) => {
            log::error!("failed to load {}: {}, using defaults", path.display(), e);
            SceneConfig::default()
        }
    }
}

fn window_conf() -> Conf {
    let window = load_scene().window;
    Conf {
        window_title: format!("{} v{}", window.title, VERSION),
        window_width: window.width,
        window_height: window.height,
        window_resizable: window.resizable,
        ..Default::default()
    }
}

/// +1 / -1 / 0 from a pair of keys
fn axis(positive: KeyCode, negative: KeyCode) -> f32 {
    is_key_down(positive) as i32 as f32 - is_key_down(negative) as i32 as f32
}

fn gather_input(last_mouse: (f32, f32)) -> FrameInput {
    let mouse = mouse_position();
    let mouse_delta = if is_mouse_button_down(MouseButton::Left) {
        sp::Vec2::new([mouse.0 - last_mouse.0, mouse.1 - last_mouse.1])
    } else {
        sp::Vec2::zeros()
    };

    FrameInput {
        mouse_delta,
        movement: sp::Vec3::new([
            axis(KeyCode::D, KeyCode::A),
            axis(KeyCode::E, KeyCode::Q),
            axis(KeyCode::W, KeyCode::S),
        ]),
        sprint: is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift),
        toggle_pause: is_key_pressed(KeyCode::Space),
        toggle_wireframe: is_key_pressed(KeyCode::F),
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    // Loaded again here so warnings reach the logger
    let scene = load_scene();
    init_logging(LoggingConfig::from_scene(&scene));
    log::info!("softpipe v{}", VERSION);

    let mut app = AppState::new(&scene);
    app.load_models(&scene.models);

    let mut fb = Framebuffer::new(screen_width() as usize, screen_height() as usize);
    let mut last_mouse = mouse_position();
    let mut frame: u64 = 0;
    let mut render_time = 0.0;

    loop {
        if is_key_pressed(KeyCode::Escape) {
            log::info!("quit");
            break;
        }

        let input = gather_input(last_mouse);
        last_mouse = mouse_position();
        app.update(get_frame_time(), &input);

        // Follow the window size every frame
        fb.resize(screen_width() as usize, screen_height() as usize);
        let start = get_time();
        let stats = app.render(&mut fb);
        let elapsed = get_time() - start;
        render_time += elapsed;
        log::trace!("frame {}: {:.2} ms, {:?}", frame, elapsed * 1000.0, stats);

        clear_background(BLACK);
        if fb.width > 0 && fb.height > 0 {
            // Convert framebuffer to texture and draw
            let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
            texture.set_filter(FilterMode::Nearest);
            draw_texture_ex(
                &texture,
                0.0,
                0.0,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(screen_width(), screen_height())),
                    ..Default::default()
                },
            );
        }

        frame += 1;
        if frame % REPORT_INTERVAL == 0 {
            log::debug!(
                "avg render {:.2} ms over {} frames, {} fps, last frame {} triangles / {} pixels",
                render_time * 1000.0 / REPORT_INTERVAL as f64,
                REPORT_INTERVAL,
                get_fps(),
                stats.rasterized,
                stats.pixels
            );
            render_time = 0.0;
        }

        next_frame().await;
    }
}
