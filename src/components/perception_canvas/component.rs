//! Leptos component wrapping the perception map canvas.
//!
//! The component owns a [`MapSession`] behind a shared cell, wires canvas
//! mouse/wheel events and window key events into it, and redraws every
//! `requestAnimationFrame`. Toolbar state is mirrored into a signal after
//! each change so buttons stay in step with the session.
//!
//! Graph mutations run as local tasks. Only one may hold the session at a
//! time; anything arriving while a save is in flight is dropped with a
//! warning.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use chrono::Utc;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, Element, Event, FileReader, HtmlAnchorElement, HtmlCanvasElement,
	HtmlElement, KeyboardEvent, MouseEvent, WheelEvent, Window,
};

use super::browser_store::BrowserStore;
use super::config::MapConfig;
use super::filter::ViewMode;
use super::geometry::{Point, Size};
use super::interaction::{KeyInput, Tool, key_down_command};
use super::prefs::ThemeMode;
use super::render;
use super::session::MapSession;
use super::theme::Theme;
use super::types::{DomainId, LensId};

type SharedSession = Rc<RefCell<Option<MapSession<BrowserStore>>>>;
type Outcome = Result<(), Box<dyn Error>>;
type Task<'a> = Pin<Box<dyn Future<Output = Outcome> + 'a>>;

const CONFIRM_IMPORT: &str = "Importing replaces the current map. Continue?";

#[derive(Clone, Debug, PartialEq)]
struct LensChip {
	id: LensId,
	name: String,
	active: bool,
}

/// Snapshot of everything the toolbar displays.
#[derive(Clone, Debug, PartialEq)]
struct Status {
	tool: Tool,
	zoom: f64,
	grabbing: bool,
	can_undo: bool,
	can_redo: bool,
	view_mode: ViewMode,
	focused: Option<DomainId>,
	domain_filters: BTreeSet<DomainId>,
	lenses: Vec<LensChip>,
	theme: ThemeMode,
	content_nodes: usize,
	top_tag: Option<String>,
	selected: Option<String>,
}

impl Status {
	fn of(session: &MapSession<BrowserStore>) -> Self {
		let filters = session.filters();
		let summary = session.summary();
		Self {
			tool: session.tool(),
			zoom: session.camera().zoom(),
			grabbing: session.camera().is_panning() || session.interaction().drag().is_some(),
			can_undo: session.history().can_undo(),
			can_redo: session.history().can_redo(),
			view_mode: session.view_mode(),
			focused: session.camera().focused_domain(),
			domain_filters: filters.domains.clone(),
			lenses: session
				.graph()
				.lenses()
				.iter()
				.map(|lens| LensChip {
					id: lens.id.clone(),
					name: lens.name.clone(),
					active: filters.lenses.contains(&lens.id),
				})
				.collect(),
			theme: session.preferences().theme,
			content_nodes: summary.content_nodes,
			top_tag: summary.top_meta_tags.into_iter().next().map(|(tag, _)| tag),
			selected: session.selected().map(|n| n.data.title.clone()),
		}
	}

	fn cursor(&self) -> &'static str {
		if self.grabbing {
			"grabbing"
		} else if self.tool == Tool::Hand {
			"grab"
		} else {
			"default"
		}
	}
}

/// Handle shared by every event handler.
#[derive(Clone)]
struct Shell {
	session: SharedSession,
	status: RwSignal<Option<Status>>,
}

impl Shell {
	fn sync(&self, session: &MapSession<BrowserStore>) {
		let next = Status::of(session);
		if self.status.with_untracked(|current| current.as_ref() != Some(&next)) {
			self.status.set(Some(next));
		}
	}

	/// Runs a synchronous change against the session, if it is free.
	fn with(&self, f: impl FnOnce(&mut MapSession<BrowserStore>)) {
		let Ok(mut guard) = self.session.try_borrow_mut() else {
			debug!("perception-map: session busy, input skipped");
			return;
		};
		if let Some(session) = guard.as_mut() {
			f(session);
			self.sync(session);
		}
	}

	/// Spawns a persisted change. Dropped when another change is still saving.
	#[allow(
		clippy::await_holding_refcell_ref,
		reason = "the borrow marks the session busy until the save completes"
	)]
	fn mutate<F>(&self, what: &'static str, f: F)
	where
		F: for<'a> FnOnce(&'a mut MapSession<BrowserStore>) -> Task<'a> + 'static,
	{
		let shell = self.clone();
		spawn_local(async move {
			let Ok(mut guard) = shell.session.try_borrow_mut() else {
				warn!("perception-map: {} dropped, a previous change is still saving", what);
				return;
			};
			let Some(session) = guard.as_mut() else {
				return;
			};
			if let Err(e) = f(session).await {
				warn!("perception-map: {} failed: {}", what, e);
			}
			shell.sync(session);
		});
	}
}

fn window_size(window: &Window) -> Size {
	let dimension = |v: Result<JsValue, JsValue>, fallback: f64| {
		v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
	};
	Size::new(
		dimension(window.inner_width(), 800.0),
		dimension(window.inner_height(), 600.0),
	)
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Point> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?;
	let rect = canvas.get_bounding_client_rect();
	Some(Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Keys typed into form fields are not shortcuts.
fn is_editing(ev: &Event) -> bool {
	ev.target()
		.and_then(|t| t.dyn_into::<HtmlElement>().ok())
		.is_some_and(|el| {
			matches!(el.tag_name().as_str(), "INPUT" | "TEXTAREA" | "SELECT") || el.is_content_editable()
		})
}

/// Starts a browser download of `href` under `filename`.
fn download(filename: &str, href: &str) {
	let Some(document) = web_sys::window().and_then(|w| w.document()) else {
		return;
	};
	let Some(anchor) = document
		.create_element("a")
		.ok()
		.and_then(|el| el.dyn_into::<HtmlAnchorElement>().ok())
	else {
		warn!("perception-map: could not create download link for {}", filename);
		return;
	};
	anchor.set_href(href);
	anchor.set_download(filename);
	anchor.click();
}

fn alert(message: &str) {
	if let Some(window) = web_sys::window() {
		let _ = window.alert_with_message(message);
	}
}

/// Renders the perception map, filling the window.
///
/// Pass a `config` to override the defaults (zoom bounds, history limit,
/// storage prefix and so on).
#[component]
pub fn PerceptionCanvas(#[prop(optional)] config: MapConfig) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let file_ref = NodeRef::<leptos::html::Input>::new();
	let shell = Shell {
		session: Rc::new(RefCell::new(None)),
		status: RwSignal::new(None),
	};
	let status = shell.status;
	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let listeners: Rc<RefCell<Vec<Closure<dyn FnMut(Event)>>>> = Rc::new(RefCell::new(Vec::new()));

	let shell_init = shell.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if animate.borrow().is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		let size = window_size(&window);
		canvas.set_width(size.width as u32);
		canvas.set_height(size.height as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			warn!("perception-map: canvas 2d context unavailable");
			return;
		};

		let (shell_open, config) = (shell_init.clone(), config.clone());
		spawn_local(async move {
			let store = BrowserStore::open(&config.storage_prefix);
			let mut session = MapSession::open(store, config).await;
			session.set_viewport(size);
			shell_open.sync(&session);
			*shell_open.session.borrow_mut() = Some(session);
		});

		let (shell_resize, canvas_resize) = (shell_init.clone(), canvas.clone());
		let on_resize = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
			let Some(win) = web_sys::window() else {
				return;
			};
			let size = window_size(&win);
			canvas_resize.set_width(size.width as u32);
			canvas_resize.set_height(size.height as u32);
			shell_resize.with(|s| s.set_viewport(size));
		});

		let shell_keydown = shell_init.clone();
		let on_keydown = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
			if is_editing(&ev) {
				return;
			}
			let Some(kev) = ev.dyn_ref::<KeyboardEvent>() else {
				return;
			};
			let (key, ctrl, meta, shift, repeat) = (
				kev.key(),
				kev.ctrl_key(),
				kev.meta_key(),
				kev.shift_key(),
				kev.repeat(),
			);
			let input = KeyInput {
				key: &key,
				ctrl,
				meta,
				shift,
				repeat,
			};
			if key_down_command(&input).is_none() {
				return;
			}
			ev.prevent_default();
			shell_keydown.mutate("shortcut", move |s| {
				Box::pin(async move {
					let input = KeyInput {
						key: &key,
						ctrl,
						meta,
						shift,
						repeat,
					};
					if let Some(command) = s.key_down(&input).await? {
						debug!("perception-map: {:?}", command);
					}
					Outcome::Ok(())
				})
			});
		});

		let shell_keyup = shell_init.clone();
		let on_keyup = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
			let Some(kev) = ev.dyn_ref::<KeyboardEvent>() else {
				return;
			};
			let key = kev.key();
			let input = KeyInput {
				key: &key,
				..Default::default()
			};
			shell_keyup.with(|s| {
				s.key_up(&input);
			});
		});

		for (name, listener) in [("resize", on_resize), ("keydown", on_keydown), ("keyup", on_keyup)] {
			let _ = window.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
			listeners.borrow_mut().push(listener);
		}

		let (shell_anim, animate_inner) = (shell_init.clone(), animate.clone());
		let last_frame: Cell<Option<f64>> = Cell::new(None);
		*animate.borrow_mut() = Some(Closure::new(move |now: f64| {
			let dt = last_frame
				.replace(Some(now))
				.map_or(0.0, |prev| (now - prev) / 1000.0);
			if let Ok(mut guard) = shell_anim.session.try_borrow_mut() {
				if let Some(session) = guard.as_mut() {
					if session.tick(dt) {
						shell_anim.sync(session);
					}
					let theme = Theme::for_mode(session.preferences().theme);
					let size = session.viewport();
					render::render(&*session, &ctx, &theme, size.width, size.height);
				}
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(win) = web_sys::window() {
					let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}
		}));
		if let Some(ref cb) = *animate.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
		info!("perception-map: canvas ready at {}x{}", size.width, size.height);
	});

	let shell_md = shell.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(point) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		shell_md.with(|s| {
			s.pointer_down(point, ev.button());
		});
	};

	let shell_mm = shell.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(point) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		shell_mm.with(|s| {
			s.pointer_move(point);
		});
	};

	let shell_mu = shell.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some(point) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		shell_mu.mutate("drop", move |s| {
			Box::pin(async move {
				s.pointer_up(point).await?;
				Outcome::Ok(())
			})
		});
	};

	let shell_ml = shell.clone();
	let on_mouseleave = move |_: MouseEvent| {
		shell_ml.with(|s| s.pointer_cancel());
	};

	let shell_wh = shell.clone();
	let on_wheel = move |ev: WheelEvent| {
		let modifier = ev.ctrl_key() || ev.meta_key();
		if modifier {
			ev.prevent_default();
		}
		shell_wh.with(|s| {
			s.camera_mut().wheel(ev.delta_y(), modifier);
		});
	};

	let view_modes = std::iter::once(ViewMode::All)
		.chain(DomainId::ALL.into_iter().map(ViewMode::Domain))
		.map(|mode| {
			let shell = shell.clone();
			view! {
				<button
					class:active=move || status.with(|s| s.as_ref().is_some_and(|s| s.view_mode == mode))
					on:click=move |_| shell.with(|s| s.set_view_mode(mode))
				>
					{mode.label()}
				</button>
			}
		})
		.collect_view();

	let domain_filters = DomainId::ALL
		.into_iter()
		.map(|domain| {
			let shell = shell.clone();
			view! {
				<button
					class="chip"
					class:active=move || status.with(|s| s.as_ref().is_some_and(|s| s.domain_filters.contains(&domain)))
					on:click=move |_| shell.with(|s| s.filters_mut().toggle_domain(domain))
				>
					{domain.label()}
				</button>
			}
		})
		.collect_view();

	let tools = [Tool::Select, Tool::Hand]
		.into_iter()
		.map(|tool| {
			let shell = shell.clone();
			view! {
				<button
					class:active=move || status.with(|s| s.as_ref().is_some_and(|s| s.tool == tool))
					on:click=move |_| shell.with(|s| s.select_tool(tool))
				>
					{tool.label()}
				</button>
			}
		})
		.collect_view();

	let shell_lens = shell.clone();
	let on_lens_click = move |ev: MouseEvent| {
		let lens = ev
			.target()
			.and_then(|t| t.dyn_into::<Element>().ok())
			.and_then(|el| el.get_attribute("data-lens"));
		if let Some(lens) = lens {
			shell_lens.with(|s| s.filters_mut().toggle_lens(lens));
		}
	};

	let (shell_zoom_out, shell_zoom_in, shell_reset) = (shell.clone(), shell.clone(), shell.clone());
	let (shell_undo, shell_redo, shell_unfocus) = (shell.clone(), shell.clone(), shell.clone());
	let (shell_new, shell_delete, shell_theme) = (shell.clone(), shell.clone(), shell.clone());
	let (shell_json, shell_png, shell_clear) = (shell.clone(), shell.clone(), shell.clone());

	let on_export_json = move |_: MouseEvent| {
		shell_json.with(|s| match s.export_json(Utc::now()) {
			Ok((filename, body)) => {
				let encoded = String::from(js_sys::encode_uri_component(&body));
				download(&filename, &format!("data:application/json;charset=utf-8,{encoded}"));
			}
			Err(e) => warn!("perception-map: export failed: {}", e),
		});
	};

	let on_export_png = move |_: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		shell_png.with(|s| match canvas.to_data_url() {
			Ok(url) => download(&s.export_png_filename(Utc::now()), &url),
			Err(e) => warn!("perception-map: image export failed: {:?}", e),
		});
	};

	let on_import_pick = move |_: MouseEvent| {
		if let Some(input) = file_ref.get() {
			input.click();
		}
	};

	let shell_import = shell.clone();
	let on_import_change = move |_: Event| {
		let Some(input) = file_ref.get() else {
			return;
		};
		let file = input.files().and_then(|files| files.get(0));
		input.set_value("");
		let Some(file) = file else {
			return;
		};
		let confirmed = web_sys::window()
			.and_then(|w| w.confirm_with_message(CONFIRM_IMPORT).ok())
			.unwrap_or(false);
		if !confirmed {
			return;
		}
		let Ok(reader) = FileReader::new() else {
			warn!("perception-map: FileReader unavailable");
			return;
		};
		let (shell, reader_done) = (shell_import.clone(), reader.clone());
		let onload = Closure::once_into_js(move || {
			let Some(text) = reader_done.result().ok().and_then(|r| r.as_string()) else {
				alert("Import failed: the file could not be read.");
				return;
			};
			shell.mutate("import", move |s| {
				Box::pin(async move {
					if let Err(e) = s.import(&text).await {
						alert(&format!("Import failed: {e}"));
						return Err(e.into());
					}
					Outcome::Ok(())
				})
			});
		});
		reader.set_onload(Some(onload.unchecked_ref()));
		if let Err(e) = reader.read_as_text(&file) {
			warn!("perception-map: could not read {}: {:?}", file.name(), e);
		}
	};

	let has = move |f: fn(&Status) -> bool| status.with(|s| s.as_ref().is_some_and(f));

	view! {
		<div class="perception-map">
			<canvas
				node_ref=canvas_ref
				class="perception-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style=move || {
					let cursor = status.with(|s| s.as_ref().map_or("default", Status::cursor));
					format!("display: block; cursor: {cursor};")
				}
			/>
			<div class="map-toolbar">
				<div class="group">{view_modes}</div>
				<div class="group">
					<button on:click=move |_| shell_zoom_out.with(|s| s.camera_mut().zoom_out())>"−"</button>
					<span class="zoom">
						{move || status.with(|s| s.as_ref().map_or(100.0, |s| s.zoom * 100.0)).round()}
						"%"
					</span>
					<button on:click=move |_| shell_zoom_in.with(|s| s.camera_mut().zoom_in())>"+"</button>
					<button on:click=move |_| shell_reset.with(|s| s.camera_mut().reset_view())>"Reset"</button>
					<button
						disabled=move || !has(|s| s.focused.is_some())
						on:click=move |_| shell_unfocus.with(|s| {
							s.exit_focus();
						})
					>
						"Exit focus"
					</button>
				</div>
				<div class="group">{tools}</div>
				<div class="group">
					<button
						disabled=move || !has(|s| s.can_undo)
						on:click=move |_| shell_undo.mutate("undo", |s| Box::pin(async move {
							s.undo().await?;
							Outcome::Ok(())
						}))
					>
						"Undo"
					</button>
					<button
						disabled=move || !has(|s| s.can_redo)
						on:click=move |_| shell_redo.mutate("redo", |s| Box::pin(async move {
							s.redo().await?;
							Outcome::Ok(())
						}))
					>
						"Redo"
					</button>
				</div>
				<div class="group">
					<button on:click=move |_| shell_new.mutate("new node", |s| Box::pin(async move {
						s.create_node_at_center(Utc::now()).await?;
						Outcome::Ok(())
					}))>
						"New node"
					</button>
					<button
						disabled=move || !has(|s| s.selected.is_some())
						on:click=move |_| shell_delete.mutate("delete node", |s| Box::pin(async move {
							let Some(id) = s.selected().map(|n| n.id.clone()) else {
								return Outcome::Ok(());
							};
							s.delete_node(&id).await?;
							Outcome::Ok(())
						}))
					>
						"Delete node"
					</button>
				</div>
				<div class="group">
					<button on:click=on_export_json>"Export JSON"</button>
					<button on:click=on_export_png>"Export PNG"</button>
					<button on:click=on_import_pick>"Import"</button>
					<input
						node_ref=file_ref
						type="file"
						accept=".json,application/json"
						style="display: none;"
						on:change=on_import_change
					/>
				</div>
				<div class="group">
					<button on:click=move |_| shell_theme.mutate("theme", |s| Box::pin(async move {
						let next = s.preferences().theme.toggled();
						s.set_theme(next).await;
						Outcome::Ok(())
					}))>
						{move || match status.with(|s| s.as_ref().map(|s| s.theme)) {
							Some(ThemeMode::Light) => "Dark theme",
							_ => "Light theme",
						}}
					</button>
				</div>
			</div>
			<div class="map-filters">
				<div class="group">{domain_filters}</div>
				<div class="group" on:click=on_lens_click>
					{move || {
						status.with(|s| {
							s.as_ref()
								.map(|s| s.lenses.clone())
								.unwrap_or_default()
								.into_iter()
								.map(|chip| view! {
									<button class="chip" class:active=chip.active data-lens=chip.id>
										{chip.name}
									</button>
								})
								.collect_view()
						})
					}}
				</div>
				<button on:click=move |_| shell_clear.with(|s| s.filters_mut().clear())>"Clear filters"</button>
			</div>
			<div class="map-status">
				{move || status.with(|s| match s {
					Some(s) => {
						let focus = s.focused.map_or(String::new(), |d| format!(" · focused on {}", d.label()));
						let selected = s.selected.as_ref().map_or(String::new(), |t| format!(" · selected: {t}"));
						let top = s.top_tag.as_ref().map_or(String::new(), |t| format!(" · most used tag: {t}"));
						format!("{} content nodes{top}{focus}{selected}", s.content_nodes)
					}
					None => "Loading map…".to_string(),
				})}
			</div>
		</div>
	}
}
