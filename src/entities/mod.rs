pub mod prelude;

pub mod anime;
pub mod anime_relations;
pub mod grouping_feedback;
pub mod grouping_patterns;
pub mod job_leases;
