use leptos::prelude::*;

use crate::components::force_graph::ForceGraphCanvas;
use crate::config::ViewConfig;
use crate::graph::GraphQuery;
use crate::session::{Session, ViewSignals};

/// How a single class is laid out.
#[derive(Clone, Copy, Debug, PartialEq)]
enum ClassLayout {
	Ring,
	Star,
}

/// User intent handed from the controls to the session.
#[derive(Clone, Debug, PartialEq)]
enum Command {
	FetchClasses,
	Load(GraphQuery),
	Similarity(f64),
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let config = ViewConfig::from_document();
	let initial_threshold = config.default_weight_threshold;
	let signals = ViewSignals::new();
	let session = match Session::new(config, signals) {
		Ok(session) => session,
		Err(err) => {
			log::error!("cannot start session: {err}");
			return view! { <p class="error">{err.to_string()}</p> }.into_any();
		}
	};

	let command = RwSignal::new(None::<Command>);
	let layout = RwSignal::new(ClassLayout::Ring);
	let weight = RwSignal::new(initial_threshold);
	let folder = RwSignal::new(String::new());

	let session_cmd = session.clone();
	Effect::new(move |_| {
		let Some(cmd) = command.get() else {
			return;
		};
		match cmd {
			Command::FetchClasses => session_cmd.load_classes(),
			Command::Load(query) => session_cmd.load_graph(query),
			Command::Similarity(threshold) => {
				let accepted = session_cmd.view.borrow_mut().set_weight_threshold(threshold);
				if accepted {
					let query = session_cmd.view.borrow().weighted_query();
					session_cmd.load_graph(query);
				} else {
					signals.status.set(format!("invalid weight threshold {threshold}"));
				}
			}
		}
	});

	let class_buttons = move || {
		signals
			.classes
			.get()
			.into_iter()
			.map(|label| {
				let class_label = label.clone();
				let on_click = move |_| {
					let class_label = class_label.clone();
					let query = match layout.get_untracked() {
						ClassLayout::Ring => GraphQuery::ClassRing { class_label },
						ClassLayout::Star => GraphQuery::ClassStar { class_label },
					};
					command.set(Some(Command::Load(query)));
				};
				view! { <button on:click=on_click>{label}</button> }
			})
			.collect_view()
	};

	view! {
		<div class="fullscreen-graph">
			<ForceGraphCanvas view=session.view.clone() revision=signals.revision fullscreen=true />
			<div class="graph-overlay">
				<h1>"Image Graph Explorer"</h1>
				<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>
				<div class="controls">
					<button on:click=move |_| command.set(Some(Command::FetchClasses))>
						"Fetch classes"
					</button>
					<select on:change=move |ev| {
						layout.set(if event_target_value(&ev) == "star" { ClassLayout::Star } else { ClassLayout::Ring });
					}>
						<option value="ring">"Ring"</option>
						<option value="star">"Star"</option>
					</select>
					<button on:click=move |_| command.set(Some(Command::Load(GraphQuery::FullCorpus)))>
						"All images"
					</button>
				</div>
				<div class="classes">{class_buttons}</div>
				<div class="controls">
					<input
						type="number"
						step="0.05"
						min="0"
						prop:value=move || weight.get().to_string()
						on:input=move |ev| {
							if let Ok(value) = event_target_value(&ev).parse::<f64>() {
								weight.set(value);
							}
						}
					/>
					<button on:click=move |_| command.set(Some(Command::Similarity(weight.get_untracked())))>
						"Similarity edges"
					</button>
				</div>
				<div class="controls">
					<input
						type="text"
						placeholder="folder path"
						prop:value=move || folder.get()
						on:input=move |ev| folder.set(event_target_value(&ev))
					/>
					<button on:click=move |_| {
						let folder_path = folder.get_untracked();
						if !folder_path.is_empty() {
							command.set(Some(Command::Load(GraphQuery::Prebuilt { folder_path })));
						}
					}>
						"Analyze folder"
					</button>
				</div>
				<p class="status">{move || signals.status.get()}</p>
				<p class="status">{move || format!("{} thumbnails loaded", signals.thumbnails.get())}</p>
			</div>
		</div>
	}
	.into_any()
}
