pub mod confidence;
pub use confidence::PatternConfidenceStore;

pub mod fallback;
pub use fallback::FallbackMatcher;

pub mod feedback;
pub use feedback::{DecayReport, FeedbackLoop, FeedbackReceipt};

pub mod graph;
pub use graph::RelationshipGraphBuilder;

pub mod grouping_service;
pub use grouping_service::{GroupingError, GroupingService};

pub mod grouping_service_impl;
pub use grouping_service_impl::SeriesGroupingService;

pub mod merger;
pub use merger::SeasonMerger;

pub mod scheduler;
pub use scheduler::Scheduler;
