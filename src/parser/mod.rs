pub mod title;

pub use title::{clean_title, normalize_for_matching, parse, search_term};
