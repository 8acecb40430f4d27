use softpipe::rasterizer::{Camera, Color, Fragment, Framebuffer, Material, RasterSettings, Vec2, Vec3};
use softpipe::world::{load_model_dir, Mesh};

const CUBE: &str = "\
mtllib cube.mtl
o cube
v -1 -1  1
v  1 -1  1
v  1  1  1
v -1  1  1
v -1 -1 -1
v  1 -1 -1
v  1  1 -1
v -1  1 -1
usemtl paint
f 1 2 3 4
f 6 5 8 7
f 5 1 4 8
f 2 6 7 3
f 4 3 7 8
f 5 6 2 1
";

const PAINT: &str = "newmtl paint\nKd 0.2 0.6 0.9\n";

fn settings(parallel: bool) -> RasterSettings {
    RasterSettings { parallel, ..Default::default() }
}

fn cube_at(z: f32) -> Mesh {
    let mut mesh = Mesh::from_obj_str(CUBE, PAINT).unwrap();
    mesh.set_position(Vec3::new([0.0, 0.0, z]));
    mesh
}

#[test]
fn cube_renders_front_faces_only() {
    let mut mesh = cube_at(-6.0);
    mesh.set_rotation(Vec3::new([0.5, 0.7, 0.0]));
    let camera = Camera::default();
    let mut fb = Framebuffer::new(96, 72);
    fb.clear(Color::BLACK);

    let stats = mesh.draw(&camera, &mut fb, &settings(false), None).unwrap();
    assert_eq!(stats.submitted, 12);
    // A convex solid shows at most three faces
    assert!(stats.rasterized <= 6, "{:?}", stats);
    assert_eq!(stats.culled + stats.rasterized, 12);
    assert!(fb.pixel(48, 36).is_some_and(|c| c != Color::BLACK));
}

#[test]
fn parallel_frame_matches_serial_frame() {
    let mut mesh = cube_at(-5.0);
    mesh.set_rotation(Vec3::new([0.3, -0.9, 0.2]));
    let mut camera = Camera::default();
    camera.set_position(Vec3::new([0.5, 0.2, 0.0]));
    camera.set_rotation(Vec2::new([0.05, 0.1]));

    let mut serial = Framebuffer::new(120, 90);
    serial.clear(Color::BLACK);
    let a = mesh.draw(&camera, &mut serial, &settings(false), None).unwrap();

    let mut parallel = Framebuffer::new(120, 90);
    parallel.clear(Color::BLACK);
    let b = mesh.draw(&camera, &mut parallel, &settings(true), None).unwrap();

    assert_eq!(a, b);
    assert_eq!(serial.pixels, parallel.pixels);
    assert_eq!(serial.zbuffer, parallel.zbuffer);
}

#[test]
fn nearer_mesh_wins_regardless_of_draw_order() {
    let near = cube_at(-4.0);
    let far = cube_at(-8.0);
    let camera = Camera::default();
    let red = |_: &Fragment, _: &Material| Some(Color::RED);
    let blue = |_: &Fragment, _: &Material| Some(Color::BLUE);

    let mut a = Framebuffer::new(64, 64);
    a.clear(Color::BLACK);
    far.draw(&camera, &mut a, &settings(false), Some(&blue)).unwrap();
    near.draw(&camera, &mut a, &settings(false), Some(&red)).unwrap();

    let mut b = Framebuffer::new(64, 64);
    b.clear(Color::BLACK);
    near.draw(&camera, &mut b, &settings(false), Some(&red)).unwrap();
    far.draw(&camera, &mut b, &settings(false), Some(&blue)).unwrap();

    assert_eq!(a.pixels, b.pixels);
    assert_eq!(a.pixel(32, 32), Some(Color::RED));
}

#[test]
fn shipped_cube_loads_with_texture() {
    let mut mesh = load_model_dir("assets/cube").unwrap();
    assert_eq!(mesh.triangle_count(), 12);
    let texture = mesh.materials[0].texture.as_ref().unwrap();
    assert_eq!((texture.width, texture.height), (16, 16));

    mesh.set_position(Vec3::new([0.0, 0.0, -5.0]));
    let mut fb = Framebuffer::new(64, 64);
    fb.clear(Color::BLACK);
    mesh.draw(&Camera::default(), &mut fb, &settings(true), None).unwrap();

    let checker = [Color::WHITE, Color::new(40, 90, 200)];
    assert!(checker.contains(&fb.pixel(32, 32).unwrap()));
}
