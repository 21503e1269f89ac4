pub mod anime;
pub mod feedback;
pub mod season;
