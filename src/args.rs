//! Commandline argument parser using clap for the ghost hunter tools

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Talk to the DWM1001-DEV UWB board of a ghost hunter.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct HunterArgs {
    #[command(subcommand)]
    /// Which task to perform, board diagnostics or position polling
    pub command: CommandTask,

    /// Serial device of the DWM1001-DEV. A selector is shown if omitted
    #[arg(short = 'd', long = "device", global = true)]
    pub device: Option<PathBuf>,

    /// Run against a simulated board instead of real hardware
    #[arg(long = "dummy", global = true)]
    pub dummy: bool,
}

/// Subcommands of the `hunter` binary.
#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Configure and reset the board, then read its config and location
    #[command(about)]
    Diagnostics(DiagnosticsCommand),

    /// Poll the board for its location and log movement
    #[command(about)]
    Poll(PollCommand),
}

/// Options of `hunter diagnostics`.
#[derive(Debug, Args, Clone)]
#[command(about)]
pub struct DiagnosticsCommand {
    /// RON file with the tag configuration to apply; the built-in default
    /// is used if omitted
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Only reset and query the board, leave its configuration alone
    #[arg(long = "skip-set")]
    pub skip_set: bool,

    /// Write the configuration the board reports to this RON file
    #[arg(short = 'o', long = "out")]
    pub outfile: Option<PathBuf>,
}

/// Options of `hunter poll`.
#[derive(Debug, Args, Clone)]
#[command(about)]
pub struct PollCommand {
    /// Time between location queries, in milliseconds
    #[arg(short = 'i', long = "interval", default_value_t = 200)]
    pub interval_ms: u64,

    /// Movement smaller than this is treated as jitter, in millimeters
    #[arg(short = 't', long = "tolerance", default_value_t = 100.0)]
    pub tolerance_mm: f64,

    /// Stop after this many reports
    #[arg(short = 'n', long = "count")]
    pub count: Option<usize>,
}

/// Live chart of the anchors and the tag.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct MonitorArgs {
    /// Serial device of the DWM1001-DEV. A selector is shown if omitted
    #[arg(short = 'd', long = "device")]
    pub device: Option<PathBuf>,

    /// Run against a simulated board instead of real hardware
    #[arg(long = "dummy")]
    pub dummy: bool,

    /// Time between location queries, in milliseconds
    #[arg(short = 'i', long = "interval", default_value_t = 200)]
    pub interval_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definitions_are_consistent() {
        HunterArgs::command().debug_assert();
        MonitorArgs::command().debug_assert();
    }

    #[test]
    fn poll_defaults() {
        let args = HunterArgs::parse_from(["hunter", "poll", "--dummy"]);
        assert!(args.dummy);
        match args.command {
            CommandTask::Poll(cmd) => {
                assert_eq!(cmd.interval_ms, 200);
                assert_eq!(cmd.tolerance_mm, 100.0);
                assert_eq!(cmd.count, None);
            }
            other => panic!("parsed {:?}", other),
        }
    }

    #[test]
    fn diagnostics_with_device() {
        let args = HunterArgs::parse_from([
            "hunter",
            "--device",
            "/dev/ttyACM0",
            "diagnostics",
            "-c",
            "tag.ron",
            "--skip-set",
        ]);
        assert_eq!(args.device, Some(PathBuf::from("/dev/ttyACM0")));
        match args.command {
            CommandTask::Diagnostics(cmd) => {
                assert_eq!(cmd.config, Some(PathBuf::from("tag.ron")));
                assert!(cmd.skip_set);
                assert!(cmd.outfile.is_none());
            }
            other => panic!("parsed {:?}", other),
        }
    }
}
