//! Renders a token's holder list as an orrery: one sun, one planet per
//! holder, sized by share of supply. Holder data arrives over the feed
//! protocol or from JSON files for offline work.

mod cli;
mod feed;
mod overlay;
mod starfield;
mod texture;
mod universe;
mod viewer;

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use log::{info, warn};
use pollster::FutureExt as _;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::Key,
    window::WindowBuilder,
};

use cli::{Args, LayoutPreset, load_layout_preset};
use overlay::OverlayFont;
use texture::TexturePool;
use universe::UniverseScene;
use viewer::ViewerState;

const HOLDER_SUMMARY_ROWS: usize = 12;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    ensure!(
        !args.headless || args.snapshot.is_some(),
        "--headless requires --snapshot; without a window there is no feed to wait on"
    );

    let layout_preset = match args.layout_preset.as_deref() {
        Some(path) => load_layout_preset(path)?,
        None => LayoutPreset::default(),
    };

    let pool = TexturePool::load_from_dir(&args.textures);
    info!(
        "planet texture pool: {}/{} slots loaded from {}",
        pool.loaded_count(),
        pool.slots.len(),
        args.textures.display()
    );

    let mut universe = UniverseScene::new(
        pool.view(),
        args.token_name.clone(),
        args.seed,
        !args.headless,
    );
    if pool.is_fallback_only() {
        warn!("no usable planet textures; rendering procedural swatches");
        universe.set_notice(format!(
            "no planet textures in {}; using fallback swatches",
            args.textures.display()
        ));
    } else if pool.loaded_count() < pool.slots.len() {
        universe.set_notice(format!(
            "{} of {} planet textures failed to decode; swatches fill the gaps",
            pool.slots.len() - pool.loaded_count(),
            pool.slots.len()
        ));
    }

    if let Some(path) = args.snapshot.as_deref() {
        let rows = orrery_data::load_snapshot_file(path)?;
        universe.apply_raw_rows(&rows);
    }
    if let Some(path) = args.customizations.as_deref() {
        let entries = orrery_data::load_customizations_file(path)?;
        universe.apply_customizations(entries);
    }

    if args.headless {
        return run_headless(universe);
    }

    let event_loop = EventLoop::new().context("creating event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Orrery Viewer")
            .with_inner_size(PhysicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    // File-driven sessions stay offline; otherwise the feed thread owns the
    // socket and reconnects forever.
    let feed_events = if args.snapshot.is_none() {
        Some(feed::spawn_feed_client(args.feed.clone()))
    } else {
        None
    };

    let font = OverlayFont::load_or_probe(&args.font);
    let mut state =
        ViewerState::new(window, &pool, font, universe, layout_preset, args.seed).block_on()?;

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            if let Some(events) = feed_events.as_ref() {
                for feed_event in events.try_iter() {
                    state.universe_mut().apply_feed_event(feed_event);
                }
            }

            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            let quit = event.state == ElementState::Pressed
                                && matches!(
                                    event.logical_key.as_ref(),
                                    Key::Character("q") | Key::Character("Q")
                                );
                            if quit {
                                target.exit();
                            } else {
                                state.handle_key_event(&event);
                            }
                        }
                        WindowEvent::Resized(new_size) => state.resize(new_size),
                        WindowEvent::Occluded(hidden) => state.set_paused(hidden),
                        WindowEvent::CursorMoved { position, .. } => {
                            state.handle_cursor_moved(position)
                        }
                        WindowEvent::MouseInput {
                            state: button_state,
                            button,
                            ..
                        } => state.handle_mouse_button(button, button_state),
                        WindowEvent::MouseWheel { delta, .. } => state.handle_mouse_wheel(delta),
                        WindowEvent::RedrawRequested => match state.render() {
                            Ok(()) => {}
                            Err(wgpu::SurfaceError::Lost) => {
                                let size = state.size();
                                state.resize(size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                eprintln!("[orrery_viewer] out of GPU memory; exiting");
                                target.exit();
                            }
                            Err(err) => eprintln!("[orrery_viewer] frame error: {err:?}"),
                        },
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    if !state.is_paused() {
                        state.window().request_redraw();
                    }
                }
                _ => {}
            }
        })
        .context("running event loop")?;

    Ok(())
}

/// Populates the scene at the same batch cadence a window would, then
/// prints the panel text to stdout. Used for data inspection and CI.
fn run_headless(mut universe: UniverseScene) -> Result<()> {
    let mut ticks = 0usize;
    while !universe.population_idle() {
        universe.advance(1.0 / 60.0);
        ticks += 1;
    }
    let (placed, expected) = universe.progress();
    println!("populated {placed}/{expected} holders in {ticks} ticks");
    for line in universe.status_lines() {
        println!("{line}");
    }
    for line in universe.holder_lines(HOLDER_SUMMARY_ROWS) {
        println!("{line}");
    }
    Ok(())
}
