//! Parse command handler

use crate::parser;

pub fn cmd_parse(title: &str, english: Option<&str>) {
    let descriptor = parser::parse(title, english);

    println!("Title: {title}");
    if let Some(english) = english {
        println!("English: {english}");
    }
    println!("{:-<70}", "");
    println!("Series: {}", descriptor.series_name);
    println!("Key:    {}", descriptor.key());
    println!(
        "Season: {}",
        descriptor
            .season_number
            .map_or_else(|| "unknown".to_string(), |n| n.to_string())
    );
    if let Some(name) = &descriptor.season_name {
        println!("Name:   {name}");
    }
}
