use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use cgmath::Vector2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod physics;
pub mod platform;
pub mod render;
pub mod renderer;
pub mod runner;
pub mod scene;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::SceneConfig;
pub use error::SceneError;
pub use platform::{InputStrategy, Platform};
pub use scene::SceneController;

use input::{PointerGate, Subscription, Subscriptions};
use render::{Render, RenderOptions};
use renderer::State;
use runner::Runner;
use scene::{NoObstacle, ObstacleSource};

/// Something the scene can draw into.
pub trait CanvasTarget: Clone + 'static {
    fn window_attributes(&self, options: &RenderOptions) -> WindowAttributes;
}

/// Native stand-in for a page canvas: a window of the requested size.
#[derive(Debug, Clone)]
pub struct NativeCanvas {
    pub title: String,
}

impl CanvasTarget for NativeCanvas {
    fn window_attributes(&self, options: &RenderOptions) -> WindowAttributes {
        Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(options.width, options.height))
    }
}

#[cfg(target_arch = "wasm32")]
impl CanvasTarget for web_sys::HtmlCanvasElement {
    /// Sizes the canvas to the scene, so scene pixels, CSS pixels and cursor
    /// positions all agree.
    fn window_attributes(&self, options: &RenderOptions) -> WindowAttributes {
        use winit::platform::web::WindowAttributesExtWebSys;

        let (width, height) = options.surface_size();
        self.set_width(width);
        self.set_height(height);
        Window::default_attributes()
            .with_canvas(Some(self.clone()))
            .with_inner_size(LogicalSize::new(options.width, options.height))
    }
}

/// Inputs of `prepare_canvas`. A zero dimension counts as missing.
#[derive(Debug, Clone)]
pub struct SceneOptions<C> {
    pub canvas: Option<C>,
    pub canvas_width: Option<f32>,
    pub canvas_height: Option<f32>,
}

/// Everything the bootstrapper reads from its surroundings.
pub struct Environment {
    pub config: SceneConfig,
    pub platform: Platform,
    pub obstacle: Box<dyn ObstacleSource>,
    pub rng: StdRng,
    pub now_ms: f64,
}

impl Environment {
    pub fn detect() -> Self {
        let config = SceneConfig::default();

        #[cfg(target_arch = "wasm32")]
        let (platform, obstacle): (Platform, Box<dyn ObstacleSource>) = (
            web::detect_platform(),
            Box::new(web::DomObstacle { selector: config.obstacle_selector.clone() }),
        );
        #[cfg(not(target_arch = "wasm32"))]
        let (platform, obstacle): (Platform, Box<dyn ObstacleSource>) =
            (Platform::desktop(), Box::new(NoObstacle));

        Self {
            config,
            platform,
            obstacle,
            rng: StdRng::from_entropy(),
            now_ms: clock::now_ms(),
        }
    }
}

fn required(value: Option<f32>, missing: SceneError) -> Result<f32, SceneError> {
    match value {
        // same as a falsy check: 0 and NaN are missing
        Some(v) if v != 0.0 && !v.is_nan() => Ok(v),
        _ => Err(missing),
    }
}

/// Control handle of a running scene. Clones share the same scene.
pub struct SceneHandle<C> {
    pub engine: Rc<RefCell<SceneController>>,
    pub runner: Rc<RefCell<Runner>>,
    pub render: Rc<RefCell<Render>>,
    pub canvas: C,
    subscriptions: Rc<RefCell<Subscriptions>>,
    pointer: PointerGate,
}

impl<C: Clone> Clone for SceneHandle<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            runner: self.runner.clone(),
            render: self.render.clone(),
            canvas: self.canvas.clone(),
            subscriptions: self.subscriptions.clone(),
            pointer: self.pointer.clone(),
        }
    }
}

impl<C> SceneHandle<C> {
    /// Halt stepping and rendering and detach every listener. Bodies are kept.
    pub fn stop(&self) {
        self.render.borrow_mut().stop();
        let mut runner = self.runner.borrow_mut();
        runner.stop();
        let mut subscriptions = self.subscriptions.borrow_mut();
        let listeners = subscriptions.len();
        subscriptions.unsubscribe_all();
        log::info!("scene stopped after {} steps, {} listeners detached", runner.steps(), listeners);
    }

    pub fn subscribe(&self, subscription: impl Subscription + 'static) {
        self.subscriptions.borrow_mut().add(subscription);
    }

    pub fn pointer_attached(&self) -> bool {
        self.pointer.is_attached()
    }

    /// One pass of the physics loop: resolve timers, then step for the elapsed time.
    pub fn tick(&self, now_ms: f64) -> anyhow::Result<u32> {
        if !self.runner.borrow().is_running() {
            return Ok(0);
        }
        let mut engine = self.engine.borrow_mut();
        engine.poll(now_ms)?;
        Ok(self.runner.borrow_mut().tick(now_ms, || engine.step()))
    }
}

/// Validate the inputs, build the world and wire the input strategy.
pub fn prepare_canvas<C>(options: SceneOptions<C>) -> Result<SceneHandle<C>, SceneError> {
    prepare_canvas_with(options, Environment::detect())
}

pub fn prepare_canvas_with<C>(
    options: SceneOptions<C>,
    env: Environment,
) -> Result<SceneHandle<C>, SceneError> {
    let width = required(options.canvas_width, SceneError::MissingWidth)?;
    let height = required(options.canvas_height, SceneError::MissingHeight)?;
    let canvas = options.canvas.ok_or(SceneError::MissingCanvas)?;

    let strategy = InputStrategy::select(&env.platform);
    log::info!("platform {:?}, using {:?} input", env.platform, strategy);

    let render = Render::new(RenderOptions {
        width,
        height: height + env.config.height_padding,
        pixel_ratio: env.config.pixel_ratio,
        background: env.config.background,
    });
    let engine = SceneController::new(env.config, width, height, strategy, env.obstacle, env.rng, env.now_ms);

    let handle = SceneHandle {
        engine: Rc::new(RefCell::new(engine)),
        runner: Rc::new(RefCell::new(Runner::default())),
        render: Rc::new(RefCell::new(render)),
        canvas,
        subscriptions: Rc::new(RefCell::new(Subscriptions::default())),
        pointer: PointerGate::default(),
    };

    match strategy {
        InputStrategy::Pointer => {
            let gate = PointerGate::attach();
            let handle = SceneHandle { pointer: gate.clone(), ..handle };
            handle.subscribe(gate);
            Ok(handle)
        }
        InputStrategy::Tilt => {
            #[cfg(target_arch = "wasm32")]
            handle.subscribe(web::listen_device_motion(handle.engine.clone())?);
            Ok(handle)
        }
        InputStrategy::Static => Ok(handle),
    }
}

pub struct App<C: CanvasTarget> {
    #[cfg(target_arch = "wasm32")]
    proxy: Option<winit::event_loop::EventLoopProxy<State>>,
    handle: SceneHandle<C>,
    state: Option<State>,
    cursor: Vector2<f32>,
}

impl<C: CanvasTarget> App<C> {
    pub fn new(#[cfg(target_arch = "wasm32")] event_loop: &EventLoop<State>, handle: SceneHandle<C>) -> Self {
        #[cfg(target_arch = "wasm32")]
        let proxy = Some(event_loop.create_proxy());
        Self {
            state: None,
            #[cfg(target_arch = "wasm32")]
            proxy,
            handle,
            cursor: Vector2::new(0.0, 0.0),
        }
    }

    fn redraw(&mut self) {
        let now = clock::now_ms();
        if let Err(e) = self.handle.tick(now) {
            log::error!("scene update failed: {}", e);
        }

        let Some(state) = &mut self.state else { return };
        if !self.handle.render.borrow_mut().begin_frame() {
            return;
        }
        let sprites = self.handle.engine.borrow().sprites();
        match state.render(&sprites) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.window.inner_size();
                state.resize(size.width, size.height);
            }
            Err(e) => {
                log::error!("Unable to render {}", e)
            }
        }
    }
}

impl<C: CanvasTarget> ApplicationHandler<State> for App<C> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let options = self.handle.render.borrow().options.clone();
        let window_attributes = self.handle.canvas.window_attributes(&options);

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Unable to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            // If we are not on web we can use pollster to await the GPU setup
            match pollster::block_on(State::new(window, options)) {
                Ok(state) => self.state = Some(state),
                Err(e) => {
                    log::error!("Unable to set up rendering: {}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            // Run the future asynchronously and use the
            // proxy to send the results to the event loop
            if let Some(proxy) = self.proxy.take() {
                wasm_bindgen_futures::spawn_local(async move {
                    match State::new(window, options).await {
                        Ok(state) => {
                            if proxy.send_event(state).is_err() {
                                log::error!("event loop closed before rendering was ready");
                            }
                        }
                        Err(e) => log::error!("Unable to set up rendering: {}", e),
                    }
                });
            }
        }
    }

    #[allow(unused_mut)]
    fn user_event(&mut self, _event_loop: &ActiveEventLoop, mut event: State) {
        // This is where proxy.send_event() ends up
        #[cfg(target_arch = "wasm32")]
        {
            event.window.request_redraw();
            event.resize(
                event.window.inner_size().width,
                event.window.inner_size().height,
            );
        }
        self.state = Some(event);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.handle.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            WindowEvent::CursorMoved { position, .. } => {
                let scale = self.state.as_ref().map_or(1.0, |s| s.window.scale_factor());
                let logical = position.to_logical::<f32>(scale);
                self.cursor = Vector2::new(logical.x, logical.y);
                if self.handle.pointer_attached() {
                    self.handle.engine.borrow_mut().pointer_move(self.cursor);
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                if !self.handle.pointer_attached() {
                    return;
                }
                let mut engine = self.handle.engine.borrow_mut();
                match state {
                    ElementState::Pressed => engine.pointer_down(self.cursor),
                    ElementState::Released => {
                        engine.pointer_up(self.cursor, clock::now_ms());
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        env_logger::init();
    }
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("logger already set: {e}").into());
        }
    }
}

thread_local! {
    static EVENT_LOOP_CLAIMED: Cell<bool> = const { Cell::new(false) };
}

/// winit allows one event loop per thread for the lifetime of the program.
fn claim_event_loop() -> Result<(), SceneError> {
    if EVENT_LOOP_CLAIMED.with(|claimed| claimed.replace(true)) {
        return Err(SceneError::EventLoopInUse);
    }
    Ok(())
}

/// Drive the scene with winit. Blocks natively; returns immediately on the web.
/// Only one scene can be run per thread.
pub fn run<C: CanvasTarget>(handle: SceneHandle<C>) -> anyhow::Result<()> {
    claim_event_loop()?;
    let event_loop = EventLoop::with_user_event().build()?;
    let app = App::new(
        #[cfg(target_arch = "wasm32")]
        &event_loop,
        handle,
    );

    #[cfg(not(target_arch = "wasm32"))]
    {
        let mut app = app;
        event_loop.run_app(&mut app)?;
    }
    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
thread_local! {
    static ACTIVE_SCENE: RefCell<Option<GravityScene>> = const { RefCell::new(None) };
}

/// JS-facing handle, mirrors `SceneHandle`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
#[derive(Clone)]
pub struct GravityScene {
    handle: SceneHandle<web_sys::HtmlCanvasElement>,
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl GravityScene {
    pub fn stop(&self) {
        self.handle.stop();
    }

    #[wasm_bindgen(getter)]
    pub fn canvas(&self) -> web_sys::HtmlCanvasElement {
        self.handle.canvas.clone()
    }

    #[wasm_bindgen(js_name = squareCount)]
    pub fn square_count(&self) -> usize {
        self.handle.engine.borrow().squares().len()
    }

    #[wasm_bindgen(getter)]
    pub fn gravity(&self) -> Vec<f32> {
        let g = self.handle.engine.borrow().gravity();
        vec![g.x, g.y]
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = prepareCanvas)]
pub fn prepare_canvas_js(
    canvas: Option<web_sys::HtmlCanvasElement>,
    canvas_width: Option<f32>,
    canvas_height: Option<f32>,
) -> Result<GravityScene, JsError> {
    let handle = prepare_canvas(SceneOptions { canvas, canvas_width, canvas_height })?;
    if let Err(e) = run(handle.clone()) {
        // drop the device-motion listener along with the unused scene
        handle.stop();
        return Err(JsError::new(&e.to_string()));
    }
    let scene = GravityScene { handle };
    ACTIVE_SCENE.with(|active| *active.borrow_mut() = Some(scene.clone()));
    Ok(scene)
}

/// Boots the landing page scene: `#gravity-canvas` sized to the body width and
/// the height of `#main-content`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = bootPage)]
pub fn boot_page() -> Result<GravityScene, JsError> {
    prepare_canvas_js(
        web::canvas("#gravity-canvas").ok(),
        web::body_client_width().ok(),
        web::element_height("#main-content").ok(),
    )
}

/// Stops the running scene, if any.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = stopScene)]
pub fn stop_scene() {
    ACTIVE_SCENE.with(|active| {
        if let Some(scene) = active.borrow_mut().take() {
            scene.stop();
        }
    });
}

/// Module start only sets up logging; the page boots the scene through
/// `bootPage` or `prepareCanvas`, whichever it calls first.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() {
    init_logging();
}
