//! CLI module - Command-line interface for Seasonarr
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

use crate::domain::{FeedbackAction, FeedbackConfidence, PatternKey, PatternType};

/// Seasonarr - Adaptive anime series grouping
/// Groups catalog entries into ordered seasons and learns from corrections
#[derive(Parser)]
#[command(name = "seasonarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as background daemon with the decay scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Group one or more anime into their series
    #[command(alias = "g")]
    Group {
        /// Anchor anime IDs
        #[arg(required = true, value_parser = clap::value_parser!(i32).range(0..))]
        ids: Vec<i32>,
        /// Print the groups as JSON
        #[arg(long)]
        json: bool,
        /// Anchors grouped at the same time
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Show how a title is read into series name and season
    #[command(alias = "p")]
    Parse {
        /// Primary title
        title: String,
        /// English title
        #[arg(long)]
        english: Option<String>,
    },

    /// Submit a correction for a grouping
    #[command(alias = "fb")]
    Feedback {
        /// Anime the correction is about
        #[arg(value_parser = clap::value_parser!(i32).range(0..))]
        anime_id: i32,
        /// merge, split or confirm
        action: FeedbackAction,
        /// Pattern that produced the grouping, as type:value (repeatable)
        #[arg(long = "pattern")]
        patterns: Vec<PatternKey>,
        /// Also attribute the patterns of the current grouping of this anime
        #[arg(long)]
        from_group: bool,
        /// low, medium or high
        #[arg(long)]
        confidence: Option<FeedbackConfidence>,
        /// Group the anime was in
        #[arg(long)]
        source_group: Option<String>,
        /// Group the anime should be in
        #[arg(long)]
        target_group: Option<String>,
    },

    /// List learned patterns and their confidence
    #[command(alias = "ls")]
    Patterns {
        /// Only this pattern type
        #[arg(long = "type")]
        pattern_type: Option<PatternType>,
    },

    /// Decay patterns that have not been used recently
    Decay {
        /// Days without use before a pattern decays
        #[arg(long)]
        days: Option<i64>,
    },

    /// Show feedback trends
    Stats {
        /// Window in days
        #[arg(long, default_value = "30")]
        days: i64,
    },

    /// Import catalog entries and relations from a JSON file
    Import {
        /// Path to the catalog file
        path: String,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_anime_ids_are_rejected() {
        assert!(Cli::try_parse_from(["seasonarr", "group", "--", "-3"]).is_err());
        assert!(Cli::try_parse_from(["seasonarr", "group", "1", "--", "-3"]).is_err());
        assert!(Cli::try_parse_from(["seasonarr", "feedback", "--", "-1", "split"]).is_err());
    }

    #[test]
    fn group_accepts_several_ids() {
        let cli = Cli::try_parse_from(["seasonarr", "group", "1", "2", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Group { ids, json, .. }) => {
                assert_eq!(ids, vec![1, 2]);
                assert!(json);
            }
            _ => panic!("expected the group command"),
        }
    }

    #[test]
    fn feedback_parses_action_and_patterns() {
        let cli = Cli::try_parse_from([
            "seasonarr",
            "feedback",
            "12",
            "split",
            "--pattern",
            "title_pattern:series x",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Feedback {
                anime_id,
                action,
                patterns,
                ..
            }) => {
                assert_eq!(anime_id, 12);
                assert_eq!(action, FeedbackAction::Split);
                assert_eq!(patterns.len(), 1);
            }
            _ => panic!("expected the feedback command"),
        }
    }
}
