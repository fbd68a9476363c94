//! Browser host
//!
//! Binds the platform traits to the live DOM through web-sys and drives the
//! pilot from `requestAnimationFrame`. JS failures become `HostError`, get
//! logged, and collapse to `None` at the trait boundary.
//!
//! The runner is never borrowed while page listeners can run: status events
//! are queued and sent afterwards, and export calls that land mid-tick (from
//! a synthetic click or key) are deferred to the end of that tick.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, CustomEvent, CustomEventInit, Document, Element, EventTarget,
    HtmlButtonElement, HtmlCanvasElement, HtmlElement, KeyboardEvent, KeyboardEventInit,
    MouseEvent, MouseEventInit, PointerEvent, PointerEventInit, Window,
};

use super::{Control, FrameId, Host, Notice, Outbox, Page, Readout, Requests, StatusSink};
use crate::classify::ElementView;
use crate::input::{CanvasRect, ClientPoint, InputSynth, Key, pointer_target, release_point};
use crate::pilot::{Directive, Pilot, Status, StopReason};
use crate::settings::{Locator, LocatorChain, PilotConfig, Selectors};
use crate::sim::GameState;
use crate::stats::SessionStats;

/// Event carrying the status line for an external panel
pub const STATUS_EVENT: &str = "brick-autopilot:status";
/// Event carrying session stats as JSON
pub const STATS_EVENT: &str = "brick-autopilot:stats";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("no global window")]
    NoWindow,
    #[error("window has no document")]
    NoDocument,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("canvas has no 2d context")]
    NoContext,
    #[error("JS error: {0}")]
    Js(String),
}

impl From<JsValue> for HostError {
    fn from(value: JsValue) -> Self {
        HostError::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

/// Log a host failure and drop it
fn quiet<T>(what: &str, result: Result<T, HostError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("{}: {}", what, e);
            None
        }
    }
}

pub struct WebHost {
    window: Window,
    document: Document,
    selectors: Selectors,
    state_global: String,
    canvas: Option<(HtmlCanvasElement, CanvasRenderingContext2d)>,
    outbox: Outbox,
}

impl WebHost {
    pub fn new(config: &PilotConfig) -> Result<Self, HostError> {
        let window = web_sys::window().ok_or(HostError::NoWindow)?;
        let document = window.document().ok_or(HostError::NoDocument)?;
        Ok(Self {
            window,
            document,
            selectors: config.selectors.clone(),
            state_global: config.state_global.clone(),
            canvas: None,
            outbox: Outbox::default(),
        })
    }

    pub fn reconfigure(&mut self, config: &PilotConfig) {
        self.selectors = config.selectors.clone();
        self.state_global = config.state_global.clone();
        self.canvas = None;
    }

    fn find(&self, chain: &LocatorChain) -> Option<Element> {
        chain.resolve(|locator| match locator {
            Locator::Id(id) => self.document.get_element_by_id(id),
            Locator::Css(selector) => self.document.query_selector(selector).ok().flatten(),
        })
    }

    fn control(&self, control: Control) -> Option<Element> {
        match control {
            Control::Start => self.find(&self.selectors.start),
            Control::Pause => self.find(&self.selectors.pause),
        }
    }

    /// Cached canvas and context, re-located if the page replaced it
    fn canvas(&mut self) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), HostError> {
        if let Some((canvas, ctx)) = &self.canvas {
            if canvas.is_connected() {
                return Ok((canvas.clone(), ctx.clone()));
            }
            log::info!("Canvas detached, locating again");
        }

        let canvas: HtmlCanvasElement = self
            .find(&self.selectors.canvas)
            .and_then(|el| el.dyn_into().ok())
            .ok_or(HostError::NotFound("canvas"))?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or(HostError::NoContext)?
            .dyn_into()
            .map_err(|_| HostError::NoContext)?;

        self.canvas = Some((canvas.clone(), ctx.clone()));
        Ok((canvas, ctx))
    }

    fn canvas_rect(canvas: &HtmlCanvasElement) -> CanvasRect {
        let rect = canvas.get_bounding_client_rect();
        CanvasRect {
            left: rect.left(),
            top: rect.top(),
            width: rect.width(),
            height: rect.height(),
        }
    }

    fn element_view(&self, el: &Element) -> Result<ElementView, HostError> {
        let style = self
            .window
            .get_computed_style(el)?
            .ok_or(HostError::NotFound("computed style"))?;
        let rect = el.get_bounding_client_rect();
        let viewport = (
            self.window.inner_width()?.as_f64().unwrap_or(0.0),
            self.window.inner_height()?.as_f64().unwrap_or(0.0),
        );
        let disabled = el
            .dyn_ref::<HtmlButtonElement>()
            .map_or_else(|| el.has_attribute("disabled"), HtmlButtonElement::disabled);

        Ok(ElementView {
            display: style.get_property_value("display")?,
            visibility: style.get_property_value("visibility")?,
            opacity: style
                .get_property_value("opacity")?
                .trim()
                .parse()
                .unwrap_or(1.0),
            pointer_events: style.get_property_value("pointer-events")?,
            rect: (rect.left(), rect.top(), rect.width(), rect.height()),
            viewport,
            disabled,
        })
    }

    fn pixels(&mut self) -> Result<Vec<u8>, HostError> {
        let (canvas, ctx) = self.canvas()?;
        let data = ctx.get_image_data(0.0, 0.0, canvas.width() as f64, canvas.height() as f64)?;
        Ok(data.data().0)
    }

    fn snapshot(&self) -> Result<Option<GameState>, HostError> {
        if self.state_global.is_empty() {
            return Ok(None);
        }
        let value = js_sys::Reflect::get(&self.window, &JsValue::from_str(&self.state_global))?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        let json = match value.as_string() {
            Some(json) => json,
            None => js_sys::JSON::stringify(&value)?
                .as_string()
                .ok_or(HostError::Js("state not serializable".into()))?,
        };
        Ok(GameState::from_json(&json))
    }

    fn pointer_init(point: ClientPoint, buttons: u16) -> PointerEventInit {
        let init = PointerEventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        init.set_client_x(point.x.round() as i32);
        init.set_client_y(point.y.round() as i32);
        init.set_buttons(buttons);
        init.set_pointer_id(1);
        init.set_pointer_type("mouse");
        init.set_is_primary(true);
        init
    }

    fn dispatch_pointer(&mut self, kind: &str, point: ClientPoint, buttons: u16) -> Result<(), HostError> {
        let (canvas, _) = self.canvas()?;
        let event = PointerEvent::new_with_event_init_dict(kind, &Self::pointer_init(point, buttons))?;
        canvas.dispatch_event(&event)?;
        Ok(())
    }

    fn dispatch_mouse(&mut self, kind: &str, point: ClientPoint) -> Result<(), HostError> {
        let (canvas, _) = self.canvas()?;
        let init = MouseEventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        init.set_client_x(point.x.round() as i32);
        init.set_client_y(point.y.round() as i32);
        let event = MouseEvent::new_with_mouse_event_init_dict(kind, &init)?;
        canvas.dispatch_event(&event)?;
        Ok(())
    }

    fn dispatch_key(&mut self, key: Key) -> Result<(), HostError> {
        let init = KeyboardEventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        init.set_key(key.key());
        init.set_code(key.code());
        init.set_key_code(key.key_code());
        init.set_which(key.key_code());

        let mut targets: Vec<EventTarget> = vec![self.document.clone().into()];
        if let Ok((canvas, _)) = self.canvas() {
            targets.push(canvas.into());
        }
        targets.push(self.window.clone().into());

        for target in targets {
            let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init)?;
            target.dispatch_event(&event)?;
        }
        Ok(())
    }

}

fn emit(window: &Window, kind: &str, detail: &str) -> Result<(), HostError> {
    let init = CustomEventInit::new();
    init.set_detail(&JsValue::from_str(detail));
    let event = CustomEvent::new_with_event_init_dict(kind, &init)?;
    window.dispatch_event(&event)?;
    Ok(())
}

fn emit_all(notices: Vec<Notice>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    for notice in notices {
        let emitted = match &notice {
            Notice::Status(text) => emit(&window, STATUS_EVENT, text),
            Notice::Stats(json) => emit(&window, STATS_EVENT, json),
        };
        quiet("notice event", emitted);
    }
}

impl Page for WebHost {
    fn canvas_size(&mut self) -> Option<(u32, u32)> {
        let (canvas, _) = quiet("canvas", self.canvas())?;
        Some((canvas.width(), canvas.height()))
    }

    fn read_canvas(&mut self) -> Option<Vec<u8>> {
        quiet("read canvas", self.pixels())
    }

    fn probe(&mut self, control: Control) -> Option<ElementView> {
        let el = self.control(control)?;
        quiet("probe", self.element_view(&el))
    }

    fn click(&mut self, control: Control) -> bool {
        self.control(control)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .map(|el| el.click())
            .is_some()
    }

    fn read_text(&mut self, readout: Readout) -> Option<String> {
        let chain = match readout {
            Readout::Bricks => &self.selectors.bricks,
            Readout::Chests => &self.selectors.chests,
            Readout::Wallet => &self.selectors.wallet,
        };
        self.find(chain)?.text_content()
    }

    fn game_state(&mut self) -> Option<GameState> {
        quiet("game state", self.snapshot()).flatten()
    }
}

impl InputSynth for WebHost {
    fn move_paddle(&mut self, target_x: f32) {
        let Some((canvas, _)) = quiet("move paddle", self.canvas()) else {
            return;
        };
        let point = pointer_target(target_x, &Self::canvas_rect(&canvas), canvas.width());
        let moved = self
            .dispatch_pointer("pointermove", point, 0)
            .and_then(|_| self.dispatch_mouse("mousemove", point));
        quiet("move paddle", moved);
    }

    fn press_key(&mut self, key: Key) {
        let pressed = self.dispatch_key(key);
        quiet("press key", pressed);
    }

    fn release_ball(&mut self) {
        let Some((canvas, _)) = quiet("release ball", self.canvas()) else {
            return;
        };
        let point = release_point(&Self::canvas_rect(&canvas));
        let pressed = self.dispatch_pointer("pointerdown", point, 1);
        quiet("release ball", pressed);
        self.press_key(Key::Space);
    }
}

impl StatusSink for WebHost {
    fn report(&mut self, status: &Status) {
        self.outbox.report(status);
    }

    fn stats_changed(&mut self, stats: &SessionStats) {
        self.outbox.stats_changed(stats);
    }
}

impl Host for WebHost {
    fn cancel_frame(&mut self, id: FrameId) {
        if let Err(e) = self.window.cancel_animation_frame(id) {
            log::warn!("cancelAnimationFrame failed: {}", HostError::from(e));
        }
    }
}

/// Pilot plus the host it drives
struct Runner {
    pilot: Pilot,
    host: WebHost,
}

thread_local! {
    static RUNNER: RefCell<Option<Rc<RefCell<Runner>>>> = const { RefCell::new(None) };
    static REQUESTS: RefCell<Requests> = RefCell::new(Requests::default());
}

fn current_runner() -> Option<Rc<RefCell<Runner>>> {
    RUNNER.with(|r| r.borrow().clone())
}

fn runner() -> Result<Rc<RefCell<Runner>>, HostError> {
    if let Some(existing) = current_runner() {
        return Ok(existing);
    }
    let config = PilotConfig::load();
    let host = WebHost::new(&config)?;
    let seed = js_sys::Date::now() as u64;
    let runner = Rc::new(RefCell::new(Runner {
        pilot: Pilot::new(config, seed),
        host,
    }));
    RUNNER.with(|r| *r.borrow_mut() = Some(runner.clone()));
    Ok(runner)
}

/// Run `f` on the pilot, then apply deferred requests and send queued
/// notices once the borrow is released. `None` if the runner is busy.
fn with_pilot<T>(
    runner: &Rc<RefCell<Runner>>,
    f: impl FnOnce(&mut Pilot, &mut WebHost) -> T,
) -> Option<T> {
    let (result, notices) = {
        let Ok(mut guard) = runner.try_borrow_mut() else {
            return None;
        };
        let Runner { pilot, host } = &mut *guard;
        let result = f(pilot, host);

        let mut requests = REQUESTS.with(|r| std::mem::take(&mut *r.borrow_mut()));
        if !requests.is_empty() {
            log::debug!("Applying control calls made during the last tick");
            if let Some(config) = requests.apply(pilot, host) {
                host.reconfigure(&config);
            }
        }
        (result, host.outbox.drain())
    };
    emit_all(notices);
    Some(result)
}

fn defer(request: impl FnOnce(&mut Requests)) {
    REQUESTS.with(|r| request(&mut r.borrow_mut()));
}

fn request_animation_frame(runner: Rc<RefCell<Runner>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let handle = runner.clone();
    let closure = Closure::once(move |time: f64| {
        frame(handle, time);
    });
    match window.request_animation_frame(closure.as_ref().unchecked_ref()) {
        Ok(id) => {
            with_pilot(&runner, |pilot, _| pilot.frame_scheduled(id));
        }
        Err(e) => log::warn!("requestAnimationFrame failed: {}", HostError::from(e)),
    }
    closure.forget();
}

fn frame(runner: Rc<RefCell<Runner>>, time: f64) {
    // Deferred requests may stop the pilot after the tick itself continued
    let keep_going = with_pilot(&runner, |pilot, host| pilot.tick(host, time))
        .is_some_and(|directive| directive == Directive::Continue)
        && runner.try_borrow().is_ok_and(|r| r.pilot.is_running());
    if keep_going {
        request_animation_frame(runner);
    }
}

/// Start the autopilot (no-op if already running)
#[wasm_bindgen]
pub fn start_autopilot() {
    let runner = match runner() {
        Ok(runner) => runner,
        Err(e) => {
            log::error!("Cannot start autopilot: {}", e);
            return;
        }
    };
    let started = with_pilot(&runner, |pilot, host| {
        let was_running = pilot.is_running();
        pilot.start(host);
        !was_running && pilot.is_running()
    });
    match started {
        Some(true) => request_animation_frame(runner),
        Some(false) => {}
        // Busy means mid-tick, so it is already running
        None => log::debug!("start_autopilot while running"),
    }
}

/// Stop the autopilot (no-op if not running)
#[wasm_bindgen]
pub fn stop_autopilot() {
    let Some(runner) = current_runner() else {
        return;
    };
    if with_pilot(&runner, |pilot, host| pilot.stop(host, StopReason::User)).is_none() {
        defer(Requests::request_stop);
    }
}

/// Replace and persist the configuration from JSON
#[wasm_bindgen]
pub fn configure_autopilot(json: &str) {
    let config = PilotConfig::from_json(json);
    config.save();
    let runner = match runner() {
        Ok(runner) => runner,
        Err(e) => {
            log::error!("Cannot configure autopilot: {}", e);
            return;
        }
    };
    let applied = with_pilot(&runner, |pilot, host| {
        host.reconfigure(&config);
        pilot.set_config(config.clone());
    });
    if applied.is_none() {
        defer(|requests| requests.request_config(config));
    }
}

/// Current configuration as JSON
#[wasm_bindgen]
pub fn autopilot_config() -> String {
    let config = current_runner()
        .and_then(|runner| runner.try_borrow().ok().map(|r| r.pilot.config().clone()))
        .unwrap_or_else(PilotConfig::load);
    serde_json::to_string(&config).unwrap_or_default()
}

/// Prepare the runner; the panel calls `start_autopilot` when ready
pub fn boot() {
    match runner() {
        Ok(_) => log::info!("Brick autopilot ready"),
        Err(e) => log::error!("Brick autopilot unavailable: {}", e),
    }
}
