pub use super::anime::Entity as Anime;
pub use super::anime_relations::Entity as AnimeRelations;
pub use super::grouping_feedback::Entity as GroupingFeedback;
pub use super::grouping_patterns::Entity as GroupingPatterns;
pub use super::job_leases::Entity as JobLeases;
