pub mod anime;
pub mod feedback;
pub mod lease;
pub mod pattern;
