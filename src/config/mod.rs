mod file_config;

pub use file_config::{FileConfig, InputConfig, LoadConfig, WindowConfig};

use crate::etl::{
    DateWindow, PipelineOptions, DEFAULT_ARTIST_DELIMITER, DEFAULT_MAX_RANK, DEFAULT_WINDOW_DAYS,
    MAX_WINDOW_DAYS,
};
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

/// CLI arguments that take part in config resolution.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub input_dir: Option<PathBuf>,
    pub warehouse_db: Option<PathBuf>,
    pub window_start: Option<NaiveDate>,
    pub window_days: u32,
    pub max_rank: u32,
    pub artist_delimiter: char,
    pub clear_target: bool,
    pub dry_run: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            warehouse_db: None,
            window_start: None,
            window_days: DEFAULT_WINDOW_DAYS,
            max_rank: DEFAULT_MAX_RANK,
            artist_delimiter: DEFAULT_ARTIST_DELIMITER,
            clear_target: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input_dir: PathBuf,
    pub warehouse_db: PathBuf,
    pub window_start: Option<NaiveDate>,
    pub window_days: u32,
    pub max_rank: u32,
    pub artist_delimiter: char,
    pub clear_target: bool,
    pub dry_run: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present, except the two load
    /// flags, which are enabled when either side enables them.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let input_dir = file
            .input_dir
            .map(PathBuf::from)
            .or_else(|| cli.input_dir.clone())
            .ok_or_else(|| {
                anyhow!("input_dir must be specified on the command line or in config file")
            })?;
        if !input_dir.exists() {
            bail!("Input directory does not exist: {:?}", input_dir);
        }
        if !input_dir.is_dir() {
            bail!("input_dir is not a directory: {:?}", input_dir);
        }

        let warehouse_db = file
            .warehouse_db
            .map(PathBuf::from)
            .or_else(|| cli.warehouse_db.clone())
            .ok_or_else(|| {
                anyhow!("warehouse_db must be specified on the command line or in config file")
            })?;

        let window = file.window.unwrap_or_default();
        let window_start = match window.start {
            Some(raw) => Some(parse_date(&raw)?),
            None => cli.window_start,
        };
        let window_days = window.days.unwrap_or(cli.window_days);
        if window_days == 0 || window_days > MAX_WINDOW_DAYS {
            bail!("window days must be between 1 and {}", MAX_WINDOW_DAYS);
        }
        if let Some(start) = window_start {
            DateWindow::new(start, window_days)?;
        }

        let input = file.input.unwrap_or_default();
        let max_rank = input.max_rank.unwrap_or(cli.max_rank);
        if max_rank == 0 {
            bail!("max_rank must be at least 1");
        }
        let artist_delimiter = match input.artist_delimiter {
            Some(raw) => parse_delimiter(&raw)?,
            None => cli.artist_delimiter,
        };
        if artist_delimiter.is_whitespace() {
            bail!("artist delimiter cannot be whitespace");
        }

        let load = file.load.unwrap_or_default();
        let clear_target = cli.clear_target || load.clear_target.unwrap_or(false);
        let dry_run = cli.dry_run || load.dry_run.unwrap_or(false);

        Ok(Self {
            input_dir,
            warehouse_db,
            window_start,
            window_days,
            max_rank,
            artist_delimiter,
            clear_target,
            dry_run,
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            input_dir: self.input_dir.clone(),
            window_start: self.window_start,
            window_days: self.window_days,
            max_rank: self.max_rank,
            artist_delimiter: self.artist_delimiter,
            clear_target: self.clear_target,
            dry_run: self.dry_run,
        }
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date {:?}, expected YYYY-MM-DD", s))
}

fn parse_delimiter(s: &str) -> Result<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => bail!("artist delimiter must be a single character, got {:?}", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_with_dir(dir: &TempDir) -> CliConfig {
        CliConfig {
            input_dir: Some(dir.path().to_path_buf()),
            warehouse_db: Some(dir.path().join("warehouse.db")),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            window_start: Some(NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()),
            window_days: 14,
            max_rank: 50,
            artist_delimiter: ';',
            dry_run: true,
            ..cli_with_dir(&temp_dir)
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.input_dir, temp_dir.path());
        assert_eq!(config.warehouse_db, temp_dir.path().join("warehouse.db"));
        assert_eq!(config.window_start.unwrap().to_string(), "2025-12-01");
        assert_eq!(config.window_days, 14);
        assert_eq!(config.max_rank, 50);
        assert_eq!(config.artist_delimiter, ';');
        assert!(config.dry_run);
        assert!(!config.clear_target);
    }

    #[test]
    fn test_resolve_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&cli_with_dir(&temp_dir), None).unwrap();

        assert!(config.window_start.is_none());
        assert_eq!(config.window_days, 30);
        assert_eq!(config.max_rank, 200);
        assert_eq!(config.artist_delimiter, ',');
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            input_dir: Some(PathBuf::from("/should/be/overridden")),
            warehouse_db: Some(PathBuf::from("/cli/warehouse.db")),
            window_days: 10,
            max_rank: 100,
            ..Default::default()
        };

        let file_config = FileConfig {
            input_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            window: Some(WindowConfig {
                start: Some("2025-12-24".to_string()),
                days: Some(7),
            }),
            input: Some(InputConfig {
                max_rank: None,
                artist_delimiter: Some("|".to_string()),
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(config.input_dir, temp_dir.path());
        assert_eq!(config.window_start.unwrap().to_string(), "2025-12-24");
        assert_eq!(config.window_days, 7);
        assert_eq!(config.artist_delimiter, '|');
        // CLI value used when TOML doesn't specify
        assert_eq!(config.warehouse_db, PathBuf::from("/cli/warehouse.db"));
        assert_eq!(config.max_rank, 100);
    }

    #[test]
    fn test_resolve_flags_enabled_by_either_side() {
        let temp_dir = TempDir::new().unwrap();
        let file_config = FileConfig {
            load: Some(LoadConfig {
                clear_target: Some(true),
                dry_run: Some(false),
            }),
            ..Default::default()
        };
        let cli = CliConfig {
            dry_run: true,
            ..cli_with_dir(&temp_dir)
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        assert!(config.clear_target);
        assert!(config.dry_run);
    }

    #[test]
    fn test_resolve_missing_input_dir_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("input_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_input_dir_error() {
        let cli = CliConfig {
            input_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            warehouse_db: Some(PathBuf::from("warehouse.db")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_input_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            input_dir: Some(temp_file.path().to_path_buf()),
            warehouse_db: Some(PathBuf::from("warehouse.db")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_rejects_bad_values() {
        let temp_dir = TempDir::new().unwrap();

        let zero_days = CliConfig {
            window_days: 0,
            ..cli_with_dir(&temp_dir)
        };
        assert!(AppConfig::resolve(&zero_days, None).is_err());

        let bad_date = FileConfig {
            window: Some(WindowConfig {
                start: Some("24/12/2025".to_string()),
                days: None,
            }),
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli_with_dir(&temp_dir), Some(bad_date)).unwrap_err();
        assert!(err.to_string().contains("expected YYYY-MM-DD"));

        let long_delimiter = FileConfig {
            input: Some(InputConfig {
                max_rank: None,
                artist_delimiter: Some(", ".to_string()),
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_with_dir(&temp_dir), Some(long_delimiter)).is_err());
    }

    #[test]
    fn test_resolve_rejects_oversized_window() {
        let temp_dir = TempDir::new().unwrap();

        for days in [MAX_WINDOW_DAYS + 1, u32::MAX] {
            let cli = CliConfig {
                window_days: days,
                ..cli_with_dir(&temp_dir)
            };
            let err = AppConfig::resolve(&cli, None).unwrap_err();
            assert!(err.to_string().contains("window days must be between"));
        }

        let from_file = FileConfig {
            window: Some(WindowConfig {
                start: None,
                days: Some(MAX_WINDOW_DAYS + 1),
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_with_dir(&temp_dir), Some(from_file)).is_err());

        let at_limit = CliConfig {
            window_days: MAX_WINDOW_DAYS,
            ..cli_with_dir(&temp_dir)
        };
        assert_eq!(
            AppConfig::resolve(&at_limit, None).unwrap().window_days,
            MAX_WINDOW_DAYS
        );
    }

    #[test]
    fn test_resolve_rejects_window_past_calendar_range() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            window_start: Some(NaiveDate::MAX),
            window_days: 2,
            ..cli_with_dir(&temp_dir)
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_pipeline_options_carry_settings() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            clear_target: true,
            ..cli_with_dir(&temp_dir)
        };
        let options = AppConfig::resolve(&cli, None).unwrap().pipeline_options();
        assert_eq!(options.input_dir, temp_dir.path());
        assert!(options.clear_target);
        assert_eq!(options.window_days, 30);
    }
}
