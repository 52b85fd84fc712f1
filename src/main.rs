use clap::Parser;

use orbit_playground::app::Playground;
use orbit_playground::config::{Args, ResourcePaths};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let paths = ResourcePaths::from_args(&args);
    let mut playground = Playground::new(&args, &paths);
    log::info!("Model: {}", playground.model_path().display());
    run(&args, &paths, &mut playground)
}

#[cfg(not(feature = "window"))]
fn run(args: &Args, _paths: &ResourcePaths, playground: &mut Playground) -> anyhow::Result<()> {
    use orbit_playground::app::run_headless;
    use orbit_playground::renderer::HeadlessBackend;

    let mut backend = HeadlessBackend::new();
    run_headless(playground, &mut backend, args.frames, args.max_time_step)?;
    log::info!(
        "Rendered {} frames without a window ({} draw calls)",
        args.frames,
        backend.draws().len()
    );
    Ok(())
}

#[cfg(feature = "window")]
fn run(args: &Args, paths: &ResourcePaths, playground: &mut Playground) -> anyhow::Result<()> {
    use sdl2::event::{Event, WindowEvent};
    use sdl2::video::GLProfile;

    use orbit_playground::app::{FrameClock, FrameHandler};
    use orbit_playground::renderer::{gl, GlBackend};

    let sdl_context = sdl2::init().map_err(SdlErr)?;
    let video_subsystem = sdl_context.video().map_err(SdlErr)?;
    let gl_attr = video_subsystem.gl_attr();
    gl_attr.set_context_profile(GLProfile::Core);
    gl_attr.set_context_version(3, 3);
    gl_attr.set_depth_size(24);
    // Linear->SRGB conversion is done in the fragment shader.
    gl_attr.set_framebuffer_srgb_compatible(false);
    let window = video_subsystem
        .window(env!("CARGO_PKG_NAME"), args.width, args.height)
        .resizable()
        .opengl()
        .build()?;
    let _gl_context = window.gl_create_context().map_err(SdlErr)?;
    gl::load_with(|s| video_subsystem.gl_get_proc_address(s) as *const core::ffi::c_void);
    if let Err(err) = video_subsystem.gl_set_swap_interval(1) {
        log::warn!("Could not enable vsync: {err}");
    }
    let mut event_pump = sdl_context.event_pump().map_err(SdlErr)?;

    let mut backend = GlBackend::new(paths)?;
    let (width, height) = window.drawable_size();
    backend.resize(width as i32, height as i32);
    playground.resize(width, height);
    playground.on_init(&mut backend)?;

    let mut clock = FrameClock::new(args.max_time_step);
    let result = 'running: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => break 'running Ok(()),
                Event::Window {
                    win_event: WindowEvent::SizeChanged(..),
                    ..
                } => {
                    let (width, height) = window.drawable_size();
                    backend.resize(width as i32, height as i32);
                    playground.resize(width, height);
                }
                _ => {}
            }
        }

        backend.begin_frame();
        if let Err(err) = playground.on_update(&mut backend, clock.tick()) {
            break Err(err);
        }
        window.gl_swap_window();
    };
    playground.on_cleanup(&mut backend);
    Ok(result?)
}

#[cfg(feature = "window")]
#[derive(Debug, thiserror::Error)]
#[error("sdl error: {0}")]
struct SdlErr(String);
