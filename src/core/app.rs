//! Application orchestration.
//!
//! `App` owns the display connection, the dispatch state and the loop.
//! Window creation blocks until the compositor's first configure has
//! been acknowledged, then the drawable is created and the engine booted
//! against it. The loop gives every engine one scheduler turn, pumps the
//! socket, and paces itself to roughly 60 loop turns per second.

use std::time::{Duration, Instant};

use wayland_client::QueueHandle;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::backend::{NativeSurface, RenderBackend};
use crate::core::channels::BindingRegistry;
use crate::core::display::Display;
use crate::core::engine::{Engine, EnginePaths};
use crate::core::errors::Result;
use crate::core::state::EmbedderState;
use crate::prelude::Arc;

const LOOP_PACING: Duration = Duration::from_millis(16);
const FPS_REPORT_INTERVAL: Duration = Duration::from_secs(5);

pub struct App {
    display: Display,
    qh: QueueHandle<EmbedderState>,
    state: EmbedderState,
    registry: Arc<BindingRegistry>,
    backend: Arc<dyn RenderBackend>,
    config: Config,
    last_fps_report: Instant,
}

impl App {
    /// Connects, discovers globals and verifies the mandatory set. No
    /// window exists yet.
    pub fn new(
        config: Config,
        backend: Arc<dyn RenderBackend>,
        registry: Arc<BindingRegistry>,
    ) -> Result<Self> {
        let mut display = Display::connect()?;
        let qh = display.handle();
        let mut state = EmbedderState::new(backend.clone(), config.cursor_theme.clone());

        // First roundtrip announces globals, second resolves what binding
        // them triggered (output modes, seat capabilities).
        display.roundtrip(&mut state)?;
        state.check_mandatory_globals()?;
        display.roundtrip(&mut state)?;

        Ok(Self {
            display,
            qh,
            state,
            registry,
            backend,
            config,
            last_fps_report: Instant::now(),
        })
    }

    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    pub fn state(&self) -> &EmbedderState {
        &self.state
    }

    /// Creates a window, waits out its first configure, creates the
    /// drawable and boots an engine against it.
    pub fn create_window(&mut self) -> Result<usize> {
        let index = self.state.create_window(
            &self.qh,
            self.config.window_type,
            &self.config.app_id,
            &self.config.app_id,
            self.config.width,
            self.config.height,
            self.config.fullscreen,
        )?;

        // Configure barrier: no drawable before the first ack.
        while !self.state.windows[index].is_configured() {
            self.display.blocking_dispatch(&mut self.state)?;
        }

        let (width, height) = self.state.windows[index].window_size;
        // Window-system backends receive their native handles at
        // construction; the per-surface call only carries geometry.
        self.backend.create_surface(index, NativeSurface::headless(), width, height)?;

        let engine = Engine::load(
            &self.config.bundle,
            self.backend.clone(),
            self.registry.clone(),
            index,
            self.config.accessibility_features,
        )?;
        let engine_paths =
            EnginePaths::resolve(&self.config.bundle, engine.api().runs_aot_compiled_code())?;
        engine.clone().run(&engine_paths, Vec::new())?;

        let scale = self.state.windows[index].buffer_scale.max(1);
        engine.send_window_metrics(
            width as usize * scale as usize,
            height as usize * scale as usize,
            f64::from(scale),
        )?;

        self.state.attach_engine(index, engine)?;
        self.state.windows[index].request_frame(&self.qh);
        info!("window {index} up and running at {width}x{height}");
        Ok(index)
    }

    /// One loop turn. Returns `false` once every window has closed.
    pub fn loop_once(&mut self) -> Result<bool> {
        let turn_started = Instant::now();

        for engine in self.state.engines() {
            if let Err(e) = engine.run_task() {
                warn!("engine turn failed: {e}");
            }
            engine.draw_textures();
        }

        self.display.pump(&mut self.state)?;
        self.reap_closed_windows()?;
        if !self.state.has_open_windows() {
            info!("all windows closed");
            return Ok(false);
        }

        self.report_fps();

        let elapsed = turn_started.elapsed();
        if elapsed < LOOP_PACING {
            std::thread::sleep(LOOP_PACING - elapsed);
        }
        Ok(true)
    }

    /// Runs until the last window closes.
    pub fn run(&mut self) -> Result<()> {
        while self.loop_once()? {}
        Ok(())
    }

    fn reap_closed_windows(&mut self) -> Result<()> {
        let closing: Vec<usize> = self
            .state
            .windows
            .iter()
            .filter(|w| w.is_closing() && self.state.engine_at(w.index).is_some())
            .map(|w| w.index)
            .collect();
        for index in closing {
            self.state.destroy_window(index)?;
        }
        Ok(())
    }

    fn report_fps(&mut self) {
        let elapsed = self.last_fps_report.elapsed();
        if elapsed < FPS_REPORT_INTERVAL {
            return;
        }
        for window in &mut self.state.windows {
            let frames = window.take_fps_counter();
            if frames > 0 {
                debug!(
                    "window {}: {:.1} fps",
                    window.index,
                    f64::from(frames) / elapsed.as_secs_f64()
                );
            }
        }
        self.last_fps_report = Instant::now();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        for index in 0..self.state.windows.len() {
            if self.state.windows[index].is_closing() {
                continue;
            }
            if let Err(e) = self.state.destroy_window(index) {
                warn!("window {index} teardown failed: {e}");
            }
        }
    }
}
