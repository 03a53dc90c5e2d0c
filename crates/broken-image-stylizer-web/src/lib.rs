//! Browser backend for `broken-image-stylizer`.
//!
//! Wraps `document.images` and `window.localStorage`, and forwards
//! `DOMContentLoaded`, `load`, `resize` and per-image `error` events to a
//! [`Controller`].

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use broken_image_stylizer::{
    Controller, ControllerOptions, DocumentAdapter, ImageGeometry, ImageId, StorageBackend,
    StorageError, StyleProperty,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, EventTarget, HtmlImageElement, Storage, Window};

type FailureHandler = Rc<dyn Fn(ImageId)>;

/// `window.localStorage`, or nothing when the browser denies access.
#[derive(Clone, Debug, Default)]
pub struct LocalStorage {
    storage: Option<Storage>,
}

impl LocalStorage {
    pub fn from_window(window: &Window) -> Self {
        let storage = match window.local_storage() {
            Ok(storage) => storage,
            Err(err) => {
                log::debug!("localStorage denied: {}", js_error_text(&err));
                None
            }
        };
        Self { storage }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }
}

impl StorageBackend for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(storage) = &self.storage else {
            return Err(StorageError::Unavailable);
        };
        storage.get_item(key).map_err(js_storage_error)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let Some(storage) = &self.storage else {
            return Err(StorageError::Unavailable);
        };
        storage.set_item(key, value).map_err(js_storage_error)
    }
}

fn js_storage_error(err: JsValue) -> StorageError {
    StorageError::Backend(js_error_text(&err))
}

fn js_error_text(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

/// Image elements of a live document.
///
/// Ids are indices into a registry that only grows, so an element keeps its
/// id for the whole page view even when `document.images` is re-queried.
/// `ids` maps each element back to its index by identity.
pub struct WebDocument {
    document: Document,
    images: RefCell<Vec<HtmlImageElement>>,
    ids: js_sys::Map,
    observers: HashMap<ImageId, Closure<dyn FnMut()>>,
    // Released observers may still be on the JS stack; keep them alive.
    retired: Vec<Closure<dyn FnMut()>>,
    on_failure: FailureHandler,
}

impl WebDocument {
    fn new(document: Document, on_failure: FailureHandler) -> Self {
        Self {
            document,
            images: RefCell::new(Vec::new()),
            ids: js_sys::Map::new(),
            observers: HashMap::new(),
            retired: Vec::new(),
            on_failure,
        }
    }

    fn element(&self, image: ImageId) -> Option<HtmlImageElement> {
        self.images.borrow().get(image.0 as usize).cloned()
    }

    fn id_for(&self, element: HtmlImageElement) -> ImageId {
        let key: &JsValue = element.as_ref();
        if let Some(index) = self.ids.get(key).as_f64() {
            return ImageId(index as u32);
        }
        let mut images = self.images.borrow_mut();
        let id = ImageId(images.len() as u32);
        self.ids.set(key, &JsValue::from(id.0));
        images.push(element);
        id
    }
}

impl DocumentAdapter for WebDocument {
    fn images(&self) -> Vec<ImageId> {
        let collection = self.document.images();
        let mut out = Vec::with_capacity(collection.length() as usize);
        for index in 0..collection.length() {
            let Some(element) = collection.item(index) else {
                continue;
            };
            if let Ok(image) = element.dyn_into::<HtmlImageElement>() {
                out.push(self.id_for(image));
            }
        }
        out
    }

    fn geometry(&self, image: ImageId) -> Option<ImageGeometry> {
        let element = self.element(image)?;
        if !element.is_connected() {
            return None;
        }
        Some(ImageGeometry::new(element.width(), element.height()))
    }

    fn authored_source(&self, image: ImageId) -> Option<String> {
        self.element(image)?.get_attribute("src")
    }

    fn resolved_source(&self, image: ImageId) -> String {
        self.element(image)
            .map(|element| element.src())
            .unwrap_or_default()
    }

    fn observe_failure(&mut self, image: ImageId) {
        let Some(element) = self.element(image) else {
            return;
        };
        let handler = Rc::clone(&self.on_failure);
        let closure = Closure::<dyn FnMut()>::new(move || handler(image));
        element.set_onerror(Some(closure.as_ref().unchecked_ref::<js_sys::Function>()));
        if let Some(previous) = self.observers.insert(image, closure) {
            self.retired.push(previous);
        }
    }

    fn release_failure_observer(&mut self, image: ImageId) {
        if let Some(element) = self.element(image) {
            element.set_onerror(None);
        }
        if let Some(closure) = self.observers.remove(&image) {
            self.retired.push(closure);
        }
    }

    fn set_fallback_text(&mut self, image: ImageId, text: &str) {
        if let Some(element) = self.element(image) {
            element.set_alt(text);
        }
    }

    fn clear_source(&mut self, image: ImageId) {
        let Some(element) = self.element(image) else {
            return;
        };
        if let Err(err) = element.remove_attribute("src") {
            log::debug!("clearing src of {} failed: {}", image, js_error_text(&err));
        }
    }

    fn set_style(&mut self, image: ImageId, property: StyleProperty, value: &str) {
        let Some(element) = self.element(image) else {
            return;
        };
        if let Err(err) = element.style().set_property(property.css_name(), value) {
            log::debug!(
                "setting {} on {} failed: {}",
                property.css_name(),
                image,
                js_error_text(&err)
            );
        }
    }
}

/// Shared state reached from every event callback.
struct Host {
    document: RefCell<WebDocument>,
    controller: RefCell<Controller<LocalStorage>>,
}

impl Host {
    fn new(document: Document, storage: LocalStorage, options: ControllerOptions) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Host>| {
            let weak = weak.clone();
            let on_failure: FailureHandler = Rc::new(move |image: ImageId| {
                if let Some(host) = weak.upgrade() {
                    host.image_error(image);
                }
            });
            Host {
                document: RefCell::new(WebDocument::new(document, on_failure)),
                controller: RefCell::new(Controller::with_options(storage, options)),
            }
        })
    }

    fn with_parts<F>(&self, event: &str, action: F)
    where
        F: FnOnce(&mut Controller<LocalStorage>, &mut WebDocument),
    {
        let (Ok(mut controller), Ok(mut document)) = (
            self.controller.try_borrow_mut(),
            self.document.try_borrow_mut(),
        ) else {
            log::debug!("{} re-entered while busy; dropped", event);
            return;
        };
        action(&mut controller, &mut document);
    }

    fn ready(&self) {
        self.with_parts("ready", |controller, document| {
            controller.init(document);
            controller.on_ready(document);
        });
    }

    fn settled(&self) {
        self.with_parts("load", |controller, document| {
            controller.on_settled(document);
        });
    }

    fn resize(&self) {
        self.with_parts("resize", |controller, document| {
            controller.on_resize(document);
        });
    }

    fn image_error(&self, image: ImageId) {
        self.with_parts("error", |controller, document| {
            controller.on_image_error(document, image);
        });
    }
}

fn listen(
    target: &EventTarget,
    event: &str,
    host: &Rc<Host>,
    action: fn(&Host),
) -> Result<(), JsValue> {
    let host = Rc::clone(host);
    let closure = Closure::<dyn FnMut()>::new(move || action(&host));
    target.add_event_listener_with_callback(
        event,
        closure.as_ref().unchecked_ref::<js_sys::Function>(),
    )?;
    // Lives as long as the page.
    closure.forget();
    Ok(())
}

/// Wire the stylizer into the current page.
///
/// Phases the page has already passed run immediately.
pub fn install(options: ControllerOptions) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let storage = LocalStorage::from_window(&window);
    if !storage.is_available() {
        log::debug!("no persistent storage; known-broken memory disabled");
    }
    let host = Host::new(document.clone(), storage, options);

    match document.ready_state().as_str() {
        "loading" => {
            listen(&document, "DOMContentLoaded", &host, Host::ready)?;
            listen(&window, "load", &host, Host::settled)?;
        }
        "interactive" => {
            host.ready();
            listen(&window, "load", &host, Host::settled)?;
        }
        _ => {
            host.ready();
            host.settled();
        }
    }
    listen(&window, "resize", &host, Host::resize)?;
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    install(ControllerOptions::default())
}
