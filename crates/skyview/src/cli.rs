use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use viewconfig::{AntialiasSetting, Size};

#[derive(Parser, Debug)]
#[command(
    name = "skyview",
    author,
    version,
    about = "Cubemap skybox viewer with fixed-resolution capture",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file to load instead of the one in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<Size>,

    /// Image applied to the cube.
    #[arg(long, value_name = "PATH")]
    pub texture: Option<PathBuf>,

    /// Directory holding `posx`, `negx`, `posy`, `negy`, `posz`, `negz` face images.
    #[arg(long, value_name = "DIR")]
    pub skybox: Option<PathBuf>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<AntialiasSetting>,

    /// Resolution of screenshots and video frames (e.g. `1920x1080`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub capture_size: Option<Size>,

    /// Advance video frames by a fixed step (e.g. `40ms`) instead of the live clock.
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub fixed_step: Option<Duration>,

    /// Write one screenshot to PATH after the first frame, then exit.
    #[arg(long, value_name = "PATH", conflicts_with = "record")]
    pub screenshot: Option<PathBuf>,

    /// Record video frames into DIR after the first frame, then exit.
    #[arg(long, value_name = "DIR")]
    pub record: Option<PathBuf>,

    /// Number of frames written by a video capture.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub frames: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the configuration file.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the path of the configuration file that would be loaded.
    Where,
    /// Print the default configuration as TOML.
    Default,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<Size, String> {
    let size = Size::parse(value)?;
    if size.width == 0 || size.height == 0 {
        return Err(format!("size '{value}' must be non-zero"));
    }
    Ok(size)
}

pub fn parse_antialias(value: &str) -> Result<AntialiasSetting, String> {
    if value.trim().is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    viewconfig::parse_antialias(value)
        .map_err(|err| format!("{err}; use auto/off or 2/4/8/16"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_capture_flags() {
        let cli = Cli::try_parse_from([
            "skyview",
            "--capture-size",
            "320x240",
            "--fixed-step",
            "40ms",
            "--record",
            "out",
            "--frames",
            "12",
        ])
        .unwrap();
        assert_eq!(cli.run.capture_size, Some(Size::new(320, 240)));
        assert_eq!(cli.run.fixed_step, Some(Duration::from_millis(40)));
        assert_eq!(cli.run.record, Some(PathBuf::from("out")));
        assert_eq!(cli.run.frames, Some(12));
        assert!(cli.command.is_none());
    }

    #[test]
    fn screenshot_and_record_conflict() {
        let result = Cli::try_parse_from(["skyview", "--screenshot", "a.png", "--record", "dir"]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_frames_and_sizes() {
        assert!(Cli::try_parse_from(["skyview", "--frames", "0"]).is_err());
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("wide").is_err());
    }

    #[test]
    fn antialias_accepts_names_and_counts() {
        assert_eq!(parse_antialias("auto").unwrap(), AntialiasSetting::Auto);
        assert_eq!(parse_antialias("off").unwrap(), AntialiasSetting::Off);
        assert_eq!(parse_antialias("4").unwrap(), AntialiasSetting::Samples4);
        assert!(parse_antialias("3").is_err());
        assert!(parse_antialias(" ").is_err());
    }

    #[test]
    fn config_subcommands_parse() {
        let cli = Cli::try_parse_from(["skyview", "config", "where"]).unwrap();
        match cli.command {
            Some(Command::Config(ConfigCommand { action })) => {
                assert_eq!(action, ConfigAction::Where)
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
