//! TOML configuration for the skyview viewer.
//!
//! Every section is optional; a file containing only `version = 1` yields the
//! stock viewer (800x600 window, 50 degree field of view, 200ms stall
//! threshold, 800x600 captures, 48 video frames and the default key map).

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;
pub const CONFIG_FILE_NAME: &str = "skyview.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ViewerConfig {
    pub version: u32,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub clock: ClockSection,
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub scene: SceneSection,
    #[serde(default = "default_bindings")]
    pub bindings: Vec<BindingEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WindowSection {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_window_size")]
    pub size: Size,
    #[serde(default = "default_true")]
    pub vsync: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_antialias",
        serialize_with = "serialize_antialias"
    )]
    pub antialias: AntialiasSetting,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CameraSection {
    /// Vertical field of view in degrees.
    #[serde(default = "default_fov_y")]
    pub fov_y: f32,
    #[serde(default = "default_distance")]
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClockSection {
    #[serde(
        default = "default_stall_threshold",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub stall_threshold: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CaptureSection {
    #[serde(default = "default_capture_size")]
    pub size: Size,
    #[serde(default = "default_screenshot")]
    pub screenshot: PathBuf,
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,
    #[serde(default = "default_video_frames")]
    pub video_frames: u32,
    /// When set, every captured video frame advances the clock by exactly this step.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub fixed_step: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SceneSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<PathBuf>,
    /// Directory holding `posx`, `negx`, `posy`, `negy`, `posz` and `negz` images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skybox: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skybox_faces: Option<SkyboxFaces>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SkyboxFaces {
    pub posx: PathBuf,
    pub negx: PathBuf,
    pub posy: PathBuf,
    pub negy: PathBuf,
    pub posz: PathBuf,
    pub negz: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BindingEntry {
    pub key: String,
    #[serde(default)]
    pub on: KeyTrigger,
    pub command: CommandName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTrigger {
    #[default]
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandName {
    ToggleWireframe,
    TogglePoints,
    Screenshot,
    CaptureVideo,
    TogglePause,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    #[default]
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

/// Pixel dimensions written as `"WIDTHxHEIGHT"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let (width, height) = trimmed
            .split_once(['x', 'X', '×'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, e.g. 800x600, got '{trimmed}'"))?;
        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in size '{trimmed}'"))?;
        let height: u32 = height
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in size '{trimmed}'"))?;
        Ok(Self { width, height })
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl TryFrom<String> for Size {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Size> for String {
    fn from(value: Size) -> Self {
        value.to_string()
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            window: WindowSection::default(),
            camera: CameraSection::default(),
            clock: ClockSection::default(),
            capture: CaptureSection::default(),
            scene: SceneSection::default(),
            bindings: default_bindings(),
        }
    }
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            size: default_window_size(),
            vsync: true,
            antialias: AntialiasSetting::Auto,
        }
    }
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            fov_y: default_fov_y(),
            distance: default_distance(),
        }
    }
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            stall_threshold: default_stall_threshold(),
        }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            size: default_capture_size(),
            screenshot: default_screenshot(),
            video_dir: default_video_dir(),
            video_frames: default_video_frames(),
            fixed_step: None,
        }
    }
}

fn default_title() -> String {
    "Skyview".to_string()
}

fn default_window_size() -> Size {
    Size::new(800, 600)
}

fn default_true() -> bool {
    true
}

fn default_fov_y() -> f32 {
    50.0
}

fn default_distance() -> f32 {
    6.0
}

fn default_stall_threshold() -> Duration {
    Duration::from_millis(200)
}

fn default_capture_size() -> Size {
    Size::new(800, 600)
}

fn default_screenshot() -> PathBuf {
    PathBuf::from("screenshot.png")
}

fn default_video_dir() -> PathBuf {
    PathBuf::from("video_frames")
}

fn default_video_frames() -> u32 {
    48
}

pub fn default_bindings() -> Vec<BindingEntry> {
    let entry = |key: &str, on, command| BindingEntry {
        key: key.to_string(),
        on,
        command,
    };
    vec![
        entry("W", KeyTrigger::Press, CommandName::ToggleWireframe),
        entry("P", KeyTrigger::Press, CommandName::TogglePoints),
        entry("S", KeyTrigger::Release, CommandName::Screenshot),
        entry("V", KeyTrigger::Release, CommandName::CaptureVideo),
        entry("Space", KeyTrigger::Release, CommandName::TogglePause),
    ]
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration_opt(deserializer).map(|d| d.unwrap_or_else(default_stall_threshold))
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn serialize_duration_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => serialize_duration(duration, serializer),
        None => serializer.serialize_none(),
    }
}

fn deserialize_antialias<'de, D>(deserializer: D) -> Result<AntialiasSetting, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Str(raw) => parse_antialias(&raw).map_err(de::Error::custom),
        Helper::Num(value) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            parse_antialias(&value.to_string()).map_err(de::Error::custom)
        }
    }
}

fn serialize_antialias<S>(value: &AntialiasSetting, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        AntialiasSetting::Auto => serializer.serialize_str("auto"),
        AntialiasSetting::Off => serializer.serialize_str("off"),
        other => serializer.serialize_u32(other.samples().unwrap_or(1)),
    }
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl ViewerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ViewerConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        validate_size("window.size", self.window.size)?;
        validate_size("capture.size", self.capture.size)?;

        if !(1.0..180.0).contains(&self.camera.fov_y) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_y must be between 1 and 180 degrees, got {}",
                self.camera.fov_y
            )));
        }

        if !(self.camera.distance.is_finite() && self.camera.distance > 0.0) {
            return Err(ConfigError::Invalid(
                "camera.distance must be greater than zero".into(),
            ));
        }

        if self.clock.stall_threshold.is_zero() {
            return Err(ConfigError::Invalid(
                "clock.stall_threshold must be greater than zero".into(),
            ));
        }

        if self.capture.video_frames == 0 {
            return Err(ConfigError::Invalid(
                "capture.video_frames must be at least 1".into(),
            ));
        }

        if let Some(step) = self.capture.fixed_step {
            if step.is_zero() {
                return Err(ConfigError::Invalid(
                    "capture.fixed_step must be greater than zero".into(),
                ));
            }
        }

        if self.scene.skybox.is_some() && self.scene.skybox_faces.is_some() {
            return Err(ConfigError::Invalid(
                "scene.skybox and scene.skybox_faces are mutually exclusive".into(),
            ));
        }

        let mut seen = HashSet::new();
        for binding in &self.bindings {
            let key = binding.key.trim();
            if key.is_empty() {
                return Err(ConfigError::Invalid(
                    "bindings contain an entry with an empty key".into(),
                ));
            }
            if !seen.insert((key.to_ascii_lowercase(), binding.on)) {
                return Err(ConfigError::Invalid(format!(
                    "key '{key}' is bound more than once for {:?}",
                    binding.on
                )));
            }
        }

        Ok(())
    }
}

fn validate_size(field: &str, size: Size) -> Result<(), ConfigError> {
    if size.width == 0 || size.height == 0 {
        return Err(ConfigError::Invalid(format!(
            "{field} dimensions must be greater than zero, got {size}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[window]
title = "Sky"
size = "1280x720"
vsync = false
antialias = 4

[camera]
fov_y = 60

[clock]
stall_threshold = "250ms"

[capture]
size = "1920x1080"
screenshot = "shots/latest.png"
video_dir = "frames"
video_frames = 24
fixed_step = "40ms"

[scene]
texture = "assets/crate.png"
skybox = "assets/skybox"

[[bindings]]
key = "F"
command = "toggle-wireframe"

[[bindings]]
key = "Enter"
on = "release"
command = "screenshot"
"#;

    #[test]
    fn parses_sample_config() {
        let config = ViewerConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.window.title, "Sky");
        assert_eq!(config.window.size, Size::new(1280, 720));
        assert!(!config.window.vsync);
        assert_eq!(config.window.antialias, AntialiasSetting::Samples4);
        assert_eq!(config.camera.fov_y, 60.0);
        assert_eq!(config.clock.stall_threshold, Duration::from_millis(250));
        assert_eq!(config.capture.size, Size::new(1920, 1080));
        assert_eq!(config.capture.video_frames, 24);
        assert_eq!(config.capture.fixed_step, Some(Duration::from_millis(40)));
        assert_eq!(config.scene.skybox.as_deref(), Some(Path::new("assets/skybox")));
        assert_eq!(config.bindings.len(), 2);
        assert_eq!(config.bindings[0].on, KeyTrigger::Press);
        assert_eq!(config.bindings[1].command, CommandName::Screenshot);
    }

    #[test]
    fn minimal_config_matches_stock_viewer() {
        let config = ViewerConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config.window.size, Size::new(800, 600));
        assert_eq!(config.camera.fov_y, 50.0);
        assert_eq!(config.clock.stall_threshold, Duration::from_millis(200));
        assert_eq!(config.capture.size, Size::new(800, 600));
        assert_eq!(config.capture.screenshot, PathBuf::from("screenshot.png"));
        assert_eq!(config.capture.video_dir, PathBuf::from("video_frames"));
        assert_eq!(config.capture.video_frames, 48);
        assert!(config.capture.fixed_step.is_none());
        assert_eq!(config.bindings, default_bindings());
    }

    #[test]
    fn default_config_renders_and_parses_back() {
        let rendered = ViewerConfig::default().to_toml_string().unwrap();
        let parsed = ViewerConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.capture.video_frames, 48);
        assert_eq!(parsed.window.antialias, AntialiasSetting::Auto);
        assert_eq!(parsed.bindings.len(), 5);
    }

    #[test]
    fn rejects_wrong_version() {
        let err = ViewerConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_video_frames() {
        let err = ViewerConfig::from_toml_str(
            r#"
version = 1

[capture]
video_frames = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_capture_size() {
        let err = ViewerConfig::from_toml_str(
            r#"
version = 1

[capture]
size = "0x600"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_size() {
        let err = ViewerConfig::from_toml_str(
            r#"
version = 1

[window]
size = "800by600"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_duplicate_bindings() {
        let err = ViewerConfig::from_toml_str(
            r#"
version = 1

[[bindings]]
key = "w"
command = "toggle-wireframe"

[[bindings]]
key = "W"
command = "toggle-points"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_both_skybox_forms() {
        let err = ViewerConfig::from_toml_str(
            r#"
version = 1

[scene]
skybox = "sky"

[scene.skybox_faces]
posx = "a.png"
negx = "b.png"
posy = "c.png"
negy = "d.png"
posz = "e.png"
negz = "f.png"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ViewerConfig::load(Path::new("/nonexistent/skyview.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "version = 1\n[capture]\nvideo_frames = 12\nfixed_step = \"40ms\"\n",
        )
        .unwrap();
        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.capture.video_frames, 12);
        assert_eq!(config.capture.fixed_step, Some(Duration::from_millis(40)));
        assert_eq!(config.window.size, Size::new(800, 600));
    }

    #[test]
    fn parses_size_variants() {
        assert_eq!(Size::parse("640X480").unwrap(), Size::new(640, 480));
        assert_eq!(Size::parse(" 32 x 16 ").unwrap(), Size::new(32, 16));
        assert!(Size::parse("640").is_err());
    }
}
