//! Per-node thumbnail cache.
//!
//! The cache never performs I/O itself. [`ImageCache::ensure`] registers a
//! pending load and hands back a [`LoadRequest`]; whoever runs the load
//! reports back through [`ImageCache::complete`]. Completions may arrive in
//! any order, including after the graph they were issued for was replaced.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use super::error::Error;
use super::model::Node;

/// Entries kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 2048;

/// One outstanding image load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
	pub id: String,
	pub url: String,
	/// Graph generation the load was issued for.
	pub generation: u64,
}

/// Runs image loads and eventually reports each one back to the view.
pub trait ImageLoader {
	/// Starts loading `request.url`. Must not complete synchronously.
	fn load(&self, request: LoadRequest);
}

struct Entry<H> {
	handle: H,
	last_used: Cell<u64>,
}

/// Outcome of reporting a finished load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
	/// Handle stored; the renderer should repaint.
	Inserted,
	/// Load belonged to a superseded graph whose node is gone.
	Stale,
	/// Load failed; the node keeps its fallback marker.
	Failed,
}

pub struct ImageCache<H> {
	entries: HashMap<String, Entry<H>>,
	pending: HashSet<String>,
	failed: HashSet<String>,
	live: HashSet<String>,
	/// Number of `entries` whose id is in `live`.
	live_cached: usize,
	generation: u64,
	capacity: usize,
	clock: Cell<u64>,
	revision: u64,
}

impl<H> Default for ImageCache<H> {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}

impl<H> ImageCache<H> {
	/// Cache holding at most `capacity` handles outside the current graph.
	pub fn new(capacity: usize) -> Self {
		Self {
			entries: HashMap::new(),
			pending: HashSet::new(),
			failed: HashSet::new(),
			live: HashSet::new(),
			live_cached: 0,
			generation: 0,
			capacity,
			clock: Cell::new(0),
			revision: 0,
		}
	}

	/// Switches to a new graph generation whose node ids are `live`.
	pub fn begin_generation<'a>(&mut self, generation: u64, live: impl IntoIterator<Item = &'a str>) {
		self.generation = generation;
		self.live = live.into_iter().map(str::to_owned).collect();
		self.live_cached = self.entries.keys().filter(|id| self.live.contains(*id)).count();
		self.evict();
	}

	/// Registers a load for `node` unless it is cached, in flight, or has
	/// already failed.
	pub fn ensure(&mut self, node: &Node) -> Option<LoadRequest> {
		if self.entries.contains_key(&node.id)
			|| self.pending.contains(&node.id)
			|| self.failed.contains(&node.id)
		{
			return None;
		}
		self.pending.insert(node.id.clone());
		Some(LoadRequest {
			id: node.id.clone(),
			url: node.display_url.clone(),
			generation: self.generation,
		})
	}

	/// Records the result of `request`.
	pub fn complete(&mut self, request: &LoadRequest, result: Result<H, Error>) -> Completion {
		self.pending.remove(&request.id);
		let handle = match result {
			Ok(handle) => handle,
			Err(err) => {
				log::debug!("{err}");
				self.failed.insert(request.id.clone());
				return Completion::Failed;
			}
		};
		if request.generation != self.generation && !self.live.contains(&request.id) {
			log::debug!(
				"discarding stale image {} from generation {}",
				request.id,
				request.generation
			);
			return Completion::Stale;
		}
		let entry = Entry {
			handle,
			last_used: Cell::new(self.tick()),
		};
		if self.entries.insert(request.id.clone(), entry).is_none() && self.live.contains(&request.id) {
			self.live_cached += 1;
		}
		self.revision += 1;
		self.evict();
		Completion::Inserted
	}

	/// Cached handle for `id`, if loaded.
	pub fn lookup(&self, id: &str) -> Option<&H> {
		let entry = self.entries.get(id)?;
		entry.last_used.set(self.tick());
		Some(&entry.handle)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.entries.contains_key(id)
	}

	pub fn is_pending(&self, id: &str) -> bool {
		self.pending.contains(id)
	}

	pub fn pending_count(&self) -> usize {
		self.pending.len()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Bumped on every insertion.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	fn tick(&self) -> u64 {
		let now = self.clock.get() + 1;
		self.clock.set(now);
		now
	}

	// Entries of the current graph are never evicted, so the cache may sit
	// above capacity while a large graph is displayed.
	fn evict(&mut self) {
		let excess = self.entries.len().saturating_sub(self.capacity);
		let evictable = self.entries.len() - self.live_cached;
		if excess == 0 || evictable == 0 {
			return;
		}
		let mut candidates: Vec<(u64, &String)> = self
			.entries
			.iter()
			.filter(|(id, _)| !self.live.contains(*id))
			.map(|(id, entry)| (entry.last_used.get(), id))
			.collect();
		candidates.sort_unstable();
		let victims: Vec<String> = candidates
			.into_iter()
			.take(excess)
			.map(|(_, id)| id.clone())
			.collect();
		for id in victims {
			self.entries.remove(&id);
		}
	}

	/// Non-live entries the next eviction may remove.
	#[cfg(test)]
	fn evictable(&self) -> usize {
		self.entries.len() - self.live_cached
	}
}
