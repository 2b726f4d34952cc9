pub mod analyze;
pub mod config;
pub mod rules;
pub mod stats;

pub use analyze::{run_analyze, AnalyzeArgs};
pub use config::{handle_config_command, ConfigCommand};
pub use rules::{handle_rules_command, RulesCommand};
pub use stats::{run_stats, StatsArgs};
