//! Browser wiring: shared controller, HTTP service and `<img>` loader.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlImageElement;

use crate::api::HttpQueryService;
use crate::config::ViewConfig;
use crate::graph::{Error, GraphQuery, ImageLoader, LoadRequest, QueryRequest, QueryService, Transition, ViewController};

/// Controller shared between the page, the canvas and image callbacks.
pub type SharedView = Rc<RefCell<ViewController<HtmlImageElement>>>;

/// Reactive mirrors of the controller state the page chrome displays.
#[derive(Clone, Copy)]
pub struct ViewSignals {
	/// Bumped on every committed graph.
	pub revision: RwSignal<u64>,
	pub classes: RwSignal<Vec<String>>,
	pub status: RwSignal<String>,
	/// Thumbnails stored in the cache so far.
	pub thumbnails: RwSignal<usize>,
}

impl ViewSignals {
	pub fn new() -> Self {
		Self {
			revision: RwSignal::new(0),
			classes: RwSignal::new(Vec::new()),
			status: RwSignal::new(String::new()),
			thumbnails: RwSignal::new(0),
		}
	}
}

/// Everything a query needs, cloned into each spawned task.
#[derive(Clone)]
pub struct Session {
	pub view: SharedView,
	pub service: HttpQueryService,
	pub config: Rc<ViewConfig>,
	pub signals: ViewSignals,
}

impl Session {
	pub fn new(config: ViewConfig, signals: ViewSignals) -> Result<Self, Error> {
		let service = HttpQueryService::new(&config.api_base_url)?;
		Ok(Self {
			view: Rc::new(RefCell::new(ViewController::new(&config))),
			service,
			config: Rc::new(config),
			signals,
		})
	}

	/// Fetches the class list in the background.
	pub fn load_classes(&self) {
		let session = self.clone();
		spawn_local(async move {
			let response = session.service.get(&QueryRequest::distinct_classes()).await;
			let result = session
				.view
				.borrow_mut()
				.accept_classes(response)
				.map(|classes| classes.to_vec());
			match result {
				Ok(classes) => session.signals.classes.set(classes),
				Err(err) => session.signals.status.set(err.to_string()),
			}
		});
	}

	/// Runs `query` in the background and commits its graph.
	pub fn load_graph(&self, query: GraphQuery) {
		let ticket = self.view.borrow_mut().begin(&query);
		self.signals.status.set(format!("loading {}", query.endpoint()));
		let session = self.clone();
		spawn_local(async move {
			let response = session.service.get(&query.request()).await;
			let loader = HtmlImageLoader {
				view: Rc::downgrade(&session.view),
				config: session.config.clone(),
				thumbnails: session.signals.thumbnails,
			};
			let transition = session.view.borrow_mut().finish(ticket, &query, response, &loader);
			match transition {
				Transition::Normalized { nodes, links, .. } => {
					session.signals.status.set(format!("{nodes} nodes, {links} links"));
					session.signals.revision.update(|r| *r += 1);
				}
				Transition::Rejected(err) => session.signals.status.set(err.to_string()),
				Transition::Superseded => {}
			}
		});
	}
}

/// Loads thumbnails through `HtmlImageElement` and reports back to the view.
struct HtmlImageLoader {
	view: Weak<RefCell<ViewController<HtmlImageElement>>>,
	config: Rc<ViewConfig>,
	thumbnails: RwSignal<usize>,
}

impl HtmlImageLoader {
	fn report(
		view: &Weak<RefCell<ViewController<HtmlImageElement>>>,
		thumbnails: RwSignal<usize>,
		request: &LoadRequest,
		result: Result<HtmlImageElement, Error>,
	) {
		let Some(view) = view.upgrade() else {
			return;
		};
		if view.borrow_mut().image_loaded(request, result) {
			thumbnails.update(|n| *n += 1);
		}
	}
}

impl ImageLoader for HtmlImageLoader {
	fn load(&self, request: LoadRequest) {
		let img = match HtmlImageElement::new() {
			Ok(img) => img,
			Err(e) => {
				let err = Error::ImageLoadFailure {
					id: request.id.clone(),
					reason: format!("cannot create image element: {e:?}"),
				};
				log::warn!("{err}");
				// `load` runs inside the controller's commit, so report once it returns.
				let (view, thumbnails) = (self.view.clone(), self.thumbnails);
				spawn_local(async move {
					Self::report(&view, thumbnails, &request, Err(err));
				});
				return;
			}
		};
		let src = self.config.asset_url(&request.url);

		let (view_ok, img_ok, request_ok) = (self.view.clone(), img.clone(), request.clone());
		let thumbnails = self.thumbnails;
		let on_load = Closure::once_into_js(move || {
			Self::report(&view_ok, thumbnails, &request_ok, Ok(img_ok));
		});
		let (view_err, src_err) = (self.view.clone(), src.clone());
		let on_error = Closure::once_into_js(move || {
			let err = Error::ImageLoadFailure {
				id: request.id.clone(),
				reason: format!("could not load {src_err}"),
			};
			Self::report(&view_err, thumbnails, &request, Err(err));
		});
		img.set_onload(Some(on_load.unchecked_ref()));
		img.set_onerror(Some(on_error.unchecked_ref()));
		img.set_src(&src);
	}
}
