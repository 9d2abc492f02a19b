use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use anyhow::{anyhow, Context};
use js_sys::{Float32Array, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsCast, JsValue};
use web_sys::{HtmlCanvasElement, Window};

use super::dom::{self, EventListener};
use crate::config::ParticleSettings;
use crate::particles::{ParticleCloud, Spin};

const CAMERA_NEAR: f64 = 0.1;
const CAMERA_FAR: f64 = 1_000.0;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = THREE)]
    type Scene;

    #[wasm_bindgen(constructor, js_namespace = THREE, catch)]
    fn new() -> Result<Scene, JsValue>;

    #[wasm_bindgen(method)]
    fn add(this: &Scene, object: &Points);

    #[wasm_bindgen(js_namespace = THREE)]
    type PerspectiveCamera;

    #[wasm_bindgen(constructor, js_namespace = THREE, catch)]
    fn new(fov: f64, aspect: f64, near: f64, far: f64) -> Result<PerspectiveCamera, JsValue>;

    #[wasm_bindgen(method, getter)]
    fn position(this: &PerspectiveCamera) -> Vector3;

    #[wasm_bindgen(method, setter)]
    fn set_aspect(this: &PerspectiveCamera, aspect: f64);

    #[wasm_bindgen(method, js_name = updateProjectionMatrix)]
    fn update_projection_matrix(this: &PerspectiveCamera);

    #[wasm_bindgen(js_namespace = THREE)]
    type Vector3;

    #[wasm_bindgen(method, setter)]
    fn set_z(this: &Vector3, z: f64);

    #[wasm_bindgen(js_namespace = THREE)]
    type Euler;

    #[wasm_bindgen(method, setter)]
    fn set_x(this: &Euler, x: f64);

    #[wasm_bindgen(method, setter)]
    fn set_y(this: &Euler, y: f64);

    #[wasm_bindgen(js_namespace = THREE)]
    type WebGLRenderer;

    #[wasm_bindgen(constructor, js_namespace = THREE, catch)]
    fn new(parameters: &JsValue) -> Result<WebGLRenderer, JsValue>;

    #[wasm_bindgen(method, js_name = setSize)]
    fn set_size(this: &WebGLRenderer, width: f64, height: f64);

    #[wasm_bindgen(method, js_name = setPixelRatio)]
    fn set_pixel_ratio(this: &WebGLRenderer, ratio: f64);

    #[wasm_bindgen(method, catch)]
    fn render(this: &WebGLRenderer, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), JsValue>;

    #[wasm_bindgen(method)]
    fn dispose(this: &WebGLRenderer);

    #[wasm_bindgen(js_namespace = THREE)]
    type BufferGeometry;

    #[wasm_bindgen(constructor, js_namespace = THREE, catch)]
    fn new() -> Result<BufferGeometry, JsValue>;

    #[wasm_bindgen(method, js_name = setAttribute)]
    fn set_attribute(this: &BufferGeometry, name: &str, attribute: &BufferAttribute);

    #[wasm_bindgen(method)]
    fn dispose(this: &BufferGeometry);

    #[wasm_bindgen(js_namespace = THREE)]
    type BufferAttribute;

    #[wasm_bindgen(constructor, js_namespace = THREE, catch)]
    fn new(array: &Float32Array, item_size: u32) -> Result<BufferAttribute, JsValue>;

    #[wasm_bindgen(js_namespace = THREE)]
    type PointsMaterial;

    #[wasm_bindgen(constructor, js_namespace = THREE, catch)]
    fn new(parameters: &JsValue) -> Result<PointsMaterial, JsValue>;

    #[wasm_bindgen(method)]
    fn dispose(this: &PointsMaterial);

    #[wasm_bindgen(js_namespace = THREE)]
    type Points;

    #[wasm_bindgen(constructor, js_namespace = THREE, catch)]
    fn new(geometry: &BufferGeometry, material: &PointsMaterial) -> Result<Points, JsValue>;

    #[wasm_bindgen(method, getter)]
    fn rotation(this: &Points) -> Euler;
}

#[derive(Clone, Debug)]
pub struct Three {
    additive_blending: JsValue,
}

impl Three {
    pub fn detect(global: &Object) -> Option<Self> {
        let three = Reflect::get(global, &JsValue::from_str("THREE")).ok()?;
        if three.is_undefined() || three.is_null() {
            return None;
        }

        let has_scene = Reflect::get(&three, &JsValue::from_str("Scene"))
            .map(|scene| scene.is_function())
            .unwrap_or(false);
        if !has_scene {
            return None;
        }

        let additive_blending = Reflect::get(&three, &JsValue::from_str("AdditiveBlending"))
            .ok()
            .filter(|value| !value.is_undefined())?;

        Some(Self { additive_blending })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MaterialParameters {
    size: f64,
    vertex_colors: bool,
    transparent: bool,
    opacity: f64,
}

fn js_error(context: &'static str) -> impl FnOnce(JsValue) -> anyhow::Error {
    move |error| anyhow!("{context}: {error:?}")
}

fn renderer_parameters(canvas: &HtmlCanvasElement) -> anyhow::Result<JsValue> {
    let parameters = Object::new();
    Reflect::set(&parameters, &"canvas".into(), canvas).map_err(js_error("renderer canvas"))?;
    Reflect::set(&parameters, &"alpha".into(), &JsValue::TRUE).map_err(js_error("renderer alpha"))?;
    Reflect::set(&parameters, &"antialias".into(), &JsValue::TRUE)
        .map_err(js_error("renderer antialias"))?;
    Ok(parameters.into())
}

fn material_parameters(settings: &ParticleSettings, blending: &JsValue) -> anyhow::Result<JsValue> {
    let parameters = serde_wasm_bindgen::to_value(&MaterialParameters {
        size: settings.size,
        vertex_colors: true,
        transparent: true,
        opacity: settings.opacity,
    })
    .context("material parameters")?;
    Reflect::set(&parameters, &"blending".into(), blending).map_err(js_error("material blending"))?;
    Ok(parameters)
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

pub struct ParticleBackground {
    window: Window,
    renderer: Rc<WebGLRenderer>,
    geometry: BufferGeometry,
    material: PointsMaterial,
    frame: FrameCallback,
    frame_id: Rc<Cell<Option<i32>>>,
    resize: Option<EventListener>,
}

impl ParticleBackground {
    pub fn mount(
        three: &Three,
        window: &Window,
        canvas: HtmlCanvasElement,
        settings: &ParticleSettings,
        mobile: bool,
    ) -> anyhow::Result<Self> {
        let (width, height) = dom::viewport_size();

        let scene = Scene::new().map_err(js_error("scene"))?;
        let camera = Rc::new(
            PerspectiveCamera::new(settings.field_of_view, width / height, CAMERA_NEAR, CAMERA_FAR)
                .map_err(js_error("camera"))?,
        );
        camera.position().set_z(settings.camera_distance);

        let renderer = Rc::new(
            WebGLRenderer::new(&renderer_parameters(&canvas)?).map_err(js_error("renderer"))?,
        );
        renderer.set_size(width, height);
        renderer.set_pixel_ratio(dom::device_pixel_ratio());

        let count = settings.count_for(mobile) as usize;
        let cloud = ParticleCloud::generate(count, settings.spread, &settings.palette, js_sys::Math::random);

        let geometry = BufferGeometry::new().map_err(js_error("geometry"))?;
        let positions = BufferAttribute::new(&Float32Array::from(cloud.positions.as_slice()), 3)
            .map_err(js_error("position attribute"))?;
        let colors = BufferAttribute::new(&Float32Array::from(cloud.colors.as_slice()), 3)
            .map_err(js_error("color attribute"))?;
        geometry.set_attribute("position", &positions);
        geometry.set_attribute("color", &colors);

        let material = PointsMaterial::new(&material_parameters(settings, &three.additive_blending)?)
            .map_err(js_error("material"))?;
        let points = Points::new(&geometry, &material).map_err(js_error("points"))?;
        scene.add(&points);

        let frame: FrameCallback = Rc::new(RefCell::new(None));
        let frame_id = Rc::new(Cell::new(None));

        let next_frame = frame.clone();
        let next_id = frame_id.clone();
        let frame_window = window.clone();
        let frame_renderer = renderer.clone();
        let frame_camera = camera.clone();
        let (spin_x, spin_y) = (settings.spin_x, settings.spin_y);
        let mut spin = Spin::default();

        *frame.borrow_mut() = Some(Closure::<dyn FnMut()>::new(move || {
            if !canvas.is_connected() {
                log::debug!("particle canvas detached, animation stopped");
                next_id.set(None);
                return;
            }

            let Spin { x, y } = spin.advance(spin_x, spin_y);
            let rotation = points.rotation();
            rotation.set_x(x);
            rotation.set_y(y);

            if let Err(error) = frame_renderer.render(&scene, &frame_camera) {
                log::warn!("particle frame failed, animation stopped: {error:?}");
                next_id.set(None);
                return;
            }

            if let Some(callback) = next_frame.borrow().as_ref() {
                next_id.set(
                    frame_window
                        .request_animation_frame(callback.as_ref().unchecked_ref())
                        .ok(),
                );
            }
        }));

        if let Some(callback) = frame.borrow().as_ref() {
            frame_id.set(
                window
                    .request_animation_frame(callback.as_ref().unchecked_ref())
                    .ok(),
            );
        }

        let resize_renderer = renderer.clone();
        let resize = EventListener::new(window, "resize", move |_| {
            let (width, height) = dom::viewport_size();
            camera.set_aspect(width / height);
            camera.update_projection_matrix();
            resize_renderer.set_size(width, height);
        });

        log::info!("particle background running with {} particles", cloud.len());

        Ok(Self {
            window: window.clone(),
            renderer,
            geometry,
            material,
            frame,
            frame_id,
            resize,
        })
    }

    pub fn teardown(&mut self) {
        if let Some(id) = self.frame_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        self.frame.borrow_mut().take();
        self.resize = None;

        self.geometry.dispose();
        self.material.dispose();
        self.renderer.dispose();
    }
}
