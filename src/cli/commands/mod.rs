mod decay;
mod feedback;
mod group;
mod import;
mod parse;
mod patterns;
mod stats;

pub use decay::cmd_decay;
pub use feedback::cmd_feedback;
pub use group::cmd_group;
pub use import::cmd_import;
pub use parse::cmd_parse;
pub use patterns::cmd_patterns;
pub use stats::cmd_stats;
