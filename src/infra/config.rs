use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::ingest::IngestOptions;
use crate::core::select::DEFAULT_CONFIDENCE_FLOOR;
use crate::core::weight::WeightTable;
use crate::infra::store::JsonStore;

/// Config file names probed in the working directory, first hit wins
pub const CONFIG_FILES: [&str; 4] =
    ["feedbalance.toml", "feedbalance.yaml", "feedbalance.json", ".feedbalance.toml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Directory holding classified videos, analyses and recommendations
    pub store_dir: String,

    /// Significance weight per source phase
    pub weights: WeightTable,

    /// Classification worker pool, retries and timeouts
    pub ingest: IngestOptions,

    /// Recommendation selection
    pub recommend: RecommendConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig
{
    pub limit: usize,
    pub confidence_floor: f64,
}

impl Default for RecommendConfig
{
    fn default() -> Self
    {
        Self { limit: 10, confidence_floor: DEFAULT_CONFIDENCE_FLOOR }
    }
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            store_dir: ".feedbalance".to_string(),
            weights: WeightTable::default(),
            ingest: IngestOptions::default(),
            recommend: RecommendConfig::default(),
        }
    }
}

impl Config
{
    /// Store directory with `~` and `$VAR` expanded
    pub fn store_path(&self) -> Result<PathBuf>
    {
        let expanded = shellexpand::full(&self.store_dir)
            .with_context(|| format!("Failed to expand store_dir {:?}", self.store_dir))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    pub fn open_store(&self) -> Result<JsonStore>
    {
        let path = self.store_path()?;
        JsonStore::open(&path)
            .with_context(|| format!("Failed to open store at {}", path.display()))
    }
}

/// Load defaults, then the explicit or first discovered config file, then
/// `FEEDBALANCE_*` environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<Config>
{
    load_config_from(explicit, Path::new("."))
}

fn load_config_from(
    explicit: Option<&Path>,
    dir: &Path,
) -> Result<Config>
{
    // Missing keys fall back to the serde defaults
    let mut builder = config::Config::builder();

    match explicit
    {
        Some(path) =>
        {
            if !path.exists()
            {
                anyhow::bail!("Config file {} does not exist", path.display());
            }
            builder = builder.add_source(config::File::from(path));
        }
        None =>
        {
            // Load from config files in priority order
            for name in &CONFIG_FILES
            {
                let path = dir.join(name);
                if path.exists()
                {
                    tracing::debug!(path = %path.display(), "using config file");
                    builder = builder.add_source(config::File::from(path));
                    break;
                }
            }
        }
    }

    // Nested keys use a double underscore: FEEDBALANCE_INGEST__WORKERS=6
    builder = builder.add_source(
        config::Environment::with_prefix("FEEDBALANCE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::create_dir_all(&args.path)
        .with_context(|| format!("Failed to create {}", args.path.display()))?;
    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_any_file()
    {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(None, dir.path()).unwrap();
        assert_eq!(cfg.store_dir, ".feedbalance");
        assert_eq!(cfg.recommend.limit, 10);
        assert_eq!(cfg.ingest.workers, 4);
        assert_eq!(cfg.weights.watch_history, 100);
    }

    #[test]
    fn partial_file_overrides_only_its_keys()
    {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path()
                .join("feedbalance.toml"),
            "store_dir = \"/tmp/fb\"\n[weights]\nsearch = 90\n[ingest]\nworkers = 2\n",
        )
        .unwrap();

        let cfg = load_config_from(None, dir.path()).unwrap();
        assert_eq!(cfg.store_dir, "/tmp/fb");
        assert_eq!(cfg.weights.search, 90);
        assert_eq!(cfg.weights.home_feed, 50);
        assert_eq!(cfg.ingest.workers, 2);
        assert_eq!(cfg.ingest.max_attempts, 3);
    }

    #[test]
    fn explicit_path_must_exist()
    {
        let dir = TempDir::new().unwrap();
        let missing = dir
            .path()
            .join("nope.toml");
        assert!(load_config_from(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn default_config_survives_toml_round_trip()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force()
    {
        let dir = TempDir::new().unwrap();
        let ctx = AppContext { quiet: true, no_color: true };
        let args = || InitArgs { path: dir.path().to_path_buf(), force: false };

        init(args(), &ctx).unwrap();
        assert!(init(args(), &ctx).is_err());
        init(InitArgs { force: true, ..args() }, &ctx).unwrap();
    }
}
