//! Canonical image graph: normalization, sizing, thumbnail cache and the
//! view controller that ties them to a Query Service.

pub mod builder;
pub mod cache;
pub mod controller;
pub mod error;
pub mod model;
pub mod query;
pub mod sizing;

pub use builder::{GraphModelBuilder, GraphSource};
pub use cache::{Completion, ImageCache, ImageLoader, LoadRequest};
pub use controller::{LoadPhase, RequestTicket, Transition, ViewController, ViewState};
pub use error::{Error, Result};
pub use model::{Graph, Link, LinkStyle, Node, NodeKind};
pub use query::{GraphQuery, QueryRequest, QueryService};
pub use sizing::{LayoutParams, LayoutSizer, ViewportMetrics};
