use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use renderer::{
    CaptureSettings, CaptureSize, CubemapFaces, Renderer, RendererConfig, RunPolicy, SceneAssets,
};
use tracing_subscriber::EnvFilter;
use viewconfig::ViewerConfig;

use crate::bindings::{binding_table, map_antialias};
use crate::cli::{Cli, Command, ConfigAction, RunArgs};
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved skyview paths");

    match cli.command {
        Some(Command::Config(command)) => run_config_command(&paths, command.action),
        None => run_viewer(&paths, &cli.run),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_config_command(paths: &AppPaths, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Where => {
            println!("{}", paths.config_file().display());
        }
        ConfigAction::Default => {
            let rendered = ViewerConfig::default()
                .to_toml_string()
                .context("failed to render default configuration")?;
            print!("{rendered}");
        }
    }
    Ok(())
}

fn run_viewer(paths: &AppPaths, args: &RunArgs) -> Result<()> {
    let mut config = load_config(paths, args.config.as_deref())?;
    apply_overrides(&mut config, args);
    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;

    let renderer_config = build_renderer_config(&config, run_policy(args))?;
    Renderer::new(renderer_config).run()
}

/// Loads an explicit `--config` file, else the discovered one, else defaults.
///
/// Relative scene paths inside a file resolve against that file's directory.
fn load_config(paths: &AppPaths, explicit: Option<&Path>) -> Result<ViewerConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let discovered = paths.config_file();
            if !discovered.is_file() {
                tracing::debug!(path = %discovered.display(), "no config file; using defaults");
                return Ok(ViewerConfig::default());
            }
            discovered
        }
    };

    let mut config = ViewerConfig::load(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    if let Some(base) = path.parent() {
        resolve_scene_paths(&mut config, base);
    }
    tracing::info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn resolve_scene_paths(config: &mut ViewerConfig, base: &Path) {
    let resolve = |path: &mut PathBuf| {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    };
    let scene = &mut config.scene;
    if let Some(texture) = scene.texture.as_mut() {
        resolve(texture);
    }
    if let Some(skybox) = scene.skybox.as_mut() {
        resolve(skybox);
    }
    if let Some(faces) = scene.skybox_faces.as_mut() {
        for face in [
            &mut faces.posx,
            &mut faces.negx,
            &mut faces.posy,
            &mut faces.negy,
            &mut faces.posz,
            &mut faces.negz,
        ] {
            resolve(face);
        }
    }
}

/// Command-line flags win over file values.
fn apply_overrides(config: &mut ViewerConfig, args: &RunArgs) {
    if let Some(size) = args.size {
        config.window.size = size;
    }
    if let Some(antialias) = args.antialias {
        config.window.antialias = antialias;
    }
    if let Some(texture) = &args.texture {
        config.scene.texture = Some(texture.clone());
    }
    if let Some(skybox) = &args.skybox {
        config.scene.skybox = Some(skybox.clone());
        config.scene.skybox_faces = None;
    }
    if let Some(size) = args.capture_size {
        config.capture.size = size;
    }
    if let Some(step) = args.fixed_step {
        config.capture.fixed_step = Some(step);
    }
    if let Some(path) = &args.screenshot {
        config.capture.screenshot = path.clone();
    }
    if let Some(dir) = &args.record {
        config.capture.video_dir = dir.clone();
    }
    if let Some(frames) = args.frames {
        config.capture.video_frames = frames;
    }
}

fn run_policy(args: &RunArgs) -> RunPolicy {
    if args.screenshot.is_some() {
        RunPolicy::Screenshot
    } else if args.record.is_some() {
        RunPolicy::Video
    } else {
        RunPolicy::Interactive
    }
}

fn build_renderer_config(config: &ViewerConfig, run: RunPolicy) -> Result<RendererConfig> {
    let skybox = if let Some(dir) = &config.scene.skybox {
        Some(
            CubemapFaces::from_directory(dir)
                .with_context(|| format!("failed to locate skybox faces in {}", dir.display()))?,
        )
    } else {
        config.scene.skybox_faces.as_ref().map(|faces| CubemapFaces {
            positive_x: faces.posx.clone(),
            negative_x: faces.negx.clone(),
            positive_y: faces.posy.clone(),
            negative_y: faces.negy.clone(),
            positive_z: faces.posz.clone(),
            negative_z: faces.negz.clone(),
        })
    };

    let bindings = binding_table(&config.bindings).context("invalid key bindings")?;

    Ok(RendererConfig {
        title: config.window.title.clone(),
        window_size: (config.window.size.width, config.window.size.height),
        vsync: config.window.vsync,
        antialiasing: map_antialias(config.window.antialias),
        fov_y_degrees: config.camera.fov_y,
        camera_distance: config.camera.distance,
        stall_threshold: config.clock.stall_threshold,
        capture: CaptureSettings {
            size: CaptureSize::new(config.capture.size.width, config.capture.size.height),
            screenshot_path: config.capture.screenshot.clone(),
            video_dir: config.capture.video_dir.clone(),
            video_frames: config.capture.video_frames,
            fixed_step: config.capture.fixed_step,
        },
        scene: SceneAssets {
            texture: config.scene.texture.clone(),
            skybox,
        },
        bindings,
        run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use viewconfig::Size;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(dir.path().to_path_buf());
        let config = load_config(&paths, None).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(dir.path().to_path_buf());
        let missing = dir.path().join("nope.toml");
        assert!(load_config(&paths, Some(&missing)).is_err());
    }

    #[test]
    fn scene_paths_resolve_against_config_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("skyview.toml"),
            "version = 1\n[scene]\ntexture = \"crate.png\"\n",
        )
        .unwrap();
        let paths = AppPaths::from_raw(dir.path().to_path_buf());
        let config = load_config(&paths, None).unwrap();
        assert_eq!(config.scene.texture, Some(dir.path().join("crate.png")));
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = ViewerConfig::default();
        config.scene.skybox_faces = Some(viewconfig::SkyboxFaces {
            posx: "a".into(),
            negx: "b".into(),
            posy: "c".into(),
            negy: "d".into(),
            posz: "e".into(),
            negz: "f".into(),
        });
        let args = RunArgs {
            size: Some(Size::new(1024, 768)),
            skybox: Some(PathBuf::from("sky")),
            capture_size: Some(Size::new(64, 32)),
            fixed_step: Some(Duration::from_millis(40)),
            record: Some(PathBuf::from("frames")),
            frames: Some(3),
            ..RunArgs::default()
        };
        apply_overrides(&mut config, &args);
        config.validate().unwrap();

        assert_eq!(config.window.size, Size::new(1024, 768));
        assert_eq!(config.scene.skybox, Some(PathBuf::from("sky")));
        assert!(config.scene.skybox_faces.is_none());
        assert_eq!(config.capture.size, Size::new(64, 32));
        assert_eq!(config.capture.fixed_step, Some(Duration::from_millis(40)));
        assert_eq!(config.capture.video_dir, PathBuf::from("frames"));
        assert_eq!(config.capture.video_frames, 3);
        assert_eq!(run_policy(&args), RunPolicy::Video);
    }

    #[test]
    fn default_config_maps_to_renderer_defaults() {
        let mapped = build_renderer_config(&ViewerConfig::default(), RunPolicy::Interactive).unwrap();
        let expected = RendererConfig::default();
        assert_eq!(mapped.window_size, expected.window_size);
        assert_eq!(mapped.stall_threshold, expected.stall_threshold);
        assert_eq!(mapped.capture, expected.capture);
        assert_eq!(mapped.bindings.len(), expected.bindings.len());
        assert_eq!(mapped.antialiasing, expected.antialiasing);
        assert!(mapped.scene.skybox.is_none());
    }

    #[test]
    fn skybox_directory_without_faces_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = ViewerConfig::default();
        config.scene.skybox = Some(dir.path().to_path_buf());
        let err = build_renderer_config(&config, RunPolicy::Interactive).unwrap_err();
        assert!(format!("{err:#}").contains("skybox"));
    }

    #[test]
    fn skybox_directory_resolves_all_faces() {
        let dir = TempDir::new().unwrap();
        for stem in ["posx", "negx", "posy", "negy", "posz", "negz"] {
            fs::write(dir.path().join(format!("{stem}.png")), b"").unwrap();
        }
        let mut config = ViewerConfig::default();
        config.scene.skybox = Some(dir.path().to_path_buf());
        let mapped = build_renderer_config(&config, RunPolicy::Screenshot).unwrap();
        let faces = mapped.scene.skybox.unwrap();
        assert_eq!(faces.negative_z, dir.path().join("negz.png"));
        assert_eq!(mapped.run, RunPolicy::Screenshot);
    }
}
