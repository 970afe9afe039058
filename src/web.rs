//! Browser glue: DOM measurements, platform detection and DOM event listeners.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{DeviceMotionEvent, Document, Event, EventTarget, HtmlCanvasElement, HtmlElement};

use crate::error::SceneError;
use crate::input::Subscription;
use crate::platform::Platform;
use crate::scene::{ObstacleSource, PageRect, SceneController};

fn window() -> Result<web_sys::Window, SceneError> {
    web_sys::window().ok_or_else(|| SceneError::Dom("no global window".to_string()))
}

fn document() -> Result<Document, SceneError> {
    window()?
        .document()
        .ok_or_else(|| SceneError::Dom("no document".to_string()))
}

fn element<T: JsCast>(selector: &str) -> Result<T, SceneError> {
    document()?
        .query_selector(selector)
        .map_err(|e| SceneError::Dom(format!("{e:?}")))?
        .ok_or_else(|| SceneError::ElementNotFound(selector.to_string()))?
        .dyn_into::<T>()
        .map_err(|_| SceneError::Dom(format!("{selector} has an unexpected element type")))
}

pub fn detect_platform() -> Platform {
    let Some(window) = web_sys::window() else {
        return Platform::desktop();
    };
    let user_agent = window.navigator().user_agent().unwrap_or_default();
    let motion_supported = js_sys::Reflect::has(&window, &JsValue::from_str("DeviceMotionEvent"))
        .unwrap_or(false);
    Platform::from_user_agent(&user_agent, motion_supported)
}

pub fn canvas(selector: &str) -> Result<HtmlCanvasElement, SceneError> {
    element(selector)
}

pub fn body_client_width() -> Result<f32, SceneError> {
    let body = document()?
        .body()
        .ok_or_else(|| SceneError::ElementNotFound("body".to_string()))?;
    Ok(body.client_width() as f32)
}

pub fn element_height(selector: &str) -> Result<f32, SceneError> {
    let element: HtmlElement = element(selector)?;
    Ok(element.get_bounding_client_rect().height() as f32)
}

/// Page-relative box of an element: its client rect shifted by the scroll offset.
pub fn page_rect(selector: &str) -> Result<PageRect, SceneError> {
    let window = window()?;
    let element: HtmlElement = element(selector)?;
    let rect = element.get_bounding_client_rect();
    let scroll_x = window.scroll_x().unwrap_or(0.0);
    let scroll_y = window.scroll_y().unwrap_or(0.0);
    Ok(PageRect {
        left: (rect.left() + scroll_x) as f32,
        top: (rect.top() + scroll_y) as f32,
        width: rect.width() as f32,
        height: rect.height() as f32,
    })
}

/// Measures a page element when the obstacle timer fires.
pub struct DomObstacle {
    pub selector: String,
}

impl ObstacleSource for DomObstacle {
    fn measure(&mut self) -> anyhow::Result<Option<PageRect>> {
        Ok(Some(page_rect(&self.selector)?))
    }
}

/// A closure registered with `addEventListener`, removed again on unsubscribe.
pub struct DomListener {
    target: EventTarget,
    event: &'static str,
    closure: Option<Closure<dyn FnMut(Event)>>,
}

impl DomListener {
    pub fn listen(
        target: EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, SceneError> {
        let closure = Closure::<dyn FnMut(Event)>::wrap(Box::new(handler));
        target
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            .map_err(|e| SceneError::Dom(format!("{e:?}")))?;
        Ok(Self { target, event, closure: Some(closure) })
    }
}

impl Subscription for DomListener {
    fn unsubscribe(&mut self) {
        if let Some(closure) = self.closure.take() {
            if let Err(e) = self
                .target
                .remove_event_listener_with_callback(self.event, closure.as_ref().unchecked_ref())
            {
                log::warn!("failed to remove {} listener: {:?}", self.event, e);
            }
        }
    }
}

/// Gravity follows the device tilt for as long as the listener is attached.
pub fn listen_device_motion(scene: Rc<RefCell<SceneController>>) -> Result<DomListener, SceneError> {
    let target: EventTarget = window()?.into();
    DomListener::listen(target, "devicemotion", move |event: Event| {
        let Ok(motion) = event.dyn_into::<DeviceMotionEvent>() else {
            return;
        };
        let Some(acceleration) = motion.acceleration_including_gravity() else {
            return;
        };
        let ax = acceleration.x().unwrap_or(0.0) as f32;
        let ay = acceleration.y().unwrap_or(0.0) as f32;
        scene.borrow_mut().on_device_motion(ax, ay);
    })
}
