use crate::datecode::{DateBounds, DateCode, FilenameConvention, MAX_DATECODE_WIDTH};
use anyhow::{Context, Result};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use structopt::StructOpt;

fn is_default<T: Default + PartialEq>(t: &T) -> bool {
    t == &T::default()
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(try_from = "usize")]
pub struct ChunkSize(pub usize);

impl std::fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl Default for ChunkSize {
    fn default() -> Self {
        ChunkSize(64 * 1024)
    }
}

impl FromStr for ChunkSize {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let suffix = s.chars().last();
        let n = if let Some(suffix) = suffix {
            match suffix {
                'k' | 'M' | 'G' => usize::from_str(s.trim_end_matches(suffix))
                    .with_context(|| format!("Could not parse int in {:?}", s))?
                    .checked_mul(match suffix {
                        'k' => 1024,
                        'M' => 1024 * 1024,
                        _ => 1024 * 1024 * 1024,
                    })
                    .context("chunk size overflows")?,
                _ => usize::from_str(s)
                    .with_context(|| format!("Could not parse int in {:?}", s))?,
            }
        } else {
            return Err(anyhow::format_err!("empty byte input"));
        };
        ChunkSize::try_from(n)
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = anyhow::Error;
    fn try_from(n: usize) -> Result<Self, Self::Error> {
        if n == 0 {
            return Err(anyhow::format_err!("chunk size must be positive"));
        }
        Ok(ChunkSize(n))
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(try_from = "usize")]
pub struct DatecodeWidth(pub usize);

impl std::fmt::Display for DatecodeWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl Default for DatecodeWidth {
    fn default() -> Self {
        DatecodeWidth(FilenameConvention::default().width)
    }
}
impl FromStr for DatecodeWidth {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatecodeWidth::try_from(usize::from_str(s).context("Could not parse int")?)
    }
}

impl TryFrom<usize> for DatecodeWidth {
    type Error = anyhow::Error;
    fn try_from(n: usize) -> Result<Self, Self::Error> {
        if n == 0 || n > MAX_DATECODE_WIDTH {
            return Err(anyhow::format_err!(
                "date code width must be between 1 and {}, got {}",
                MAX_DATECODE_WIDTH,
                n
            ));
        }
        Ok(DatecodeWidth(n))
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
pub struct DatecodeDelimiter(pub char);

impl std::fmt::Display for DatecodeDelimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl Default for DatecodeDelimiter {
    fn default() -> Self {
        DatecodeDelimiter(FilenameConvention::default().delimiter)
    }
}
impl FromStr for DatecodeDelimiter {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(DatecodeDelimiter(c)),
            _ => Err(anyhow::format_err!(
                "delimiter must be a single character, got {:?}",
                s
            )),
        }
    }
}

/// # flr configuration
///
/// Serves both as the command line definition (structopt) and as the
/// format of the JSON config file and the `FLR_CONFIG` environment variable.
#[derive(StructOpt, Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
#[structopt(
    name = "flr-cat",
    rename_all = "kebab-case",
    about = env!("CARGO_PKG_DESCRIPTION"),
    after_help = "Settings are read from --config-file, then FLR_CONFIG (JSON), \
                  then the command line; later sources win."
)]
pub struct ReaderConfig {
    /// Directory containing the date-coded files.
    #[serde(default, skip_serializing_if = "is_default")]
    #[structopt(parse(from_os_str))]
    pub directory: PathBuf,

    /// Lowest date code to include (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[structopt(long, require_equals = true, parse(from_str))]
    pub min_datecode: Option<DateCode>,

    /// Highest date code to include (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[structopt(long, require_equals = true, parse(from_str))]
    pub max_datecode: Option<DateCode>,

    /// Number of digits the date code at the start of each file name has.
    #[serde(default, skip_serializing_if = "is_default")]
    #[structopt(default_value, long, require_equals = true, hidden_short_help = true)]
    pub datecode_width: DatecodeWidth,

    /// Character separating the date code from the rest of the file name.
    #[serde(default, skip_serializing_if = "is_default")]
    #[structopt(default_value, long, require_equals = true, hidden_short_help = true)]
    pub datecode_delimiter: DatecodeDelimiter,

    /// Bytes read per chunk.
    ///
    /// Allowed suffixes on command line: k M G
    #[serde(default, skip_serializing_if = "is_default")]
    #[structopt(default_value, long, require_equals = true, hidden_short_help = true)]
    pub chunk_size: ChunkSize,

    #[serde(skip)] // CLI only
    #[structopt(long, require_equals = true)]
    pub config_file: Option<PathBuf>,

    #[serde(skip)] // CLI only
    #[structopt(long, help = "Print the matching files instead of their contents")]
    pub list: bool,
}

impl ReaderConfig {
    pub fn bounds(&self) -> DateBounds {
        DateBounds::new(self.min_datecode.clone(), self.max_datecode.clone())
    }

    pub fn convention(&self) -> FilenameConvention {
        FilenameConvention {
            width: self.datecode_width.0,
            delimiter: self.datecode_delimiter.0,
        }
    }
}

static FLR_CONFIG: &str = "FLR_CONFIG";

fn json_merge(a: &mut Value, b: &Value) {
    match (a, b) {
        (&mut Value::Object(ref mut a), Value::Object(b)) => {
            for (k, v) in b {
                json_merge(a.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (a, b) => {
            *a = b.clone();
        }
    }
}

fn read_config_file(path: &Path) -> Result<Value> {
    let path_str = path.to_string_lossy();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config file {path_str}"))?;
    let mut s = String::new();
    json_comments::StripComments::new(raw.as_bytes())
        .read_to_string(&mut s)
        .context("strip comments")?;
    // deserialize once for the error message; the merged value is what gets used
    serde_json::from_str::<ReaderConfig>(&s)
        .with_context(|| format!("Error in config file {path_str}: {s}"))?;
    serde_json::from_str(&s).context("Could not parse config json")
}

fn read_config_env() -> Result<Value> {
    match std::env::var(FLR_CONFIG).ok() {
        Some(val) => {
            serde_json::from_str(&val).context("could not parse config from env FLR_CONFIG")
        }
        None => Ok(Value::Object(Default::default())),
    }
}

/// Builds the effective config from a config file (if given), `FLR_CONFIG` and `args`.
pub fn parse_args<I>(args: I) -> Result<ReaderConfig>
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    let arg_matches = ReaderConfig::from_iter(args);
    merge_with_env(arg_matches, read_config_env()?)
}

fn merge_with_env(arg_matches: ReaderConfig, env_config: Value) -> Result<ReaderConfig> {
    let args_config = serde_json::to_value(&arg_matches)?;
    let mut merged = match &arg_matches.config_file {
        Some(path) => read_config_file(path)?,
        None => Value::Object(Default::default()),
    };
    json_merge(&mut merged, &env_config);
    json_merge(&mut merged, &args_config);
    debug!("Merged config: {}", merged);

    let mut res: ReaderConfig = serde_json::from_value(merged.clone()).with_context(|| {
        format!(
            "Error parsing merged config: {}",
            serde_json::to_string_pretty(&merged).unwrap_or_default()
        )
    })?;
    // readd values with [serde(skip)]
    res.config_file = arg_matches.config_file;
    res.list = arg_matches.list;
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cli(args: &[&str]) -> Result<ReaderConfig> {
        let args = std::iter::once("flr-cat").chain(args.iter().copied());
        merge_with_env(ReaderConfig::from_iter_safe(args)?, json!({}))
    }

    #[test]
    fn chunk_size_suffixes() -> Result<()> {
        assert_eq!("4096".parse::<ChunkSize>()?, ChunkSize(4096));
        assert_eq!("64k".parse::<ChunkSize>()?, ChunkSize(65536));
        assert_eq!("1M".parse::<ChunkSize>()?, ChunkSize(1 << 20));
        assert!("".parse::<ChunkSize>().is_err());
        assert!("0".parse::<ChunkSize>().is_err());
        assert!("lots".parse::<ChunkSize>().is_err());
        Ok(())
    }

    #[test]
    fn delimiter_is_single_char() {
        assert_eq!("-".parse::<DatecodeDelimiter>().ok(), Some(DatecodeDelimiter('-')));
        assert!("".parse::<DatecodeDelimiter>().is_err());
        assert!("__".parse::<DatecodeDelimiter>().is_err());
    }

    #[test]
    fn defaults_from_command_line() -> Result<()> {
        let c = cli(&["/data/recordings"])?;
        assert_eq!(c.directory, PathBuf::from("/data/recordings"));
        assert_eq!(c.bounds(), DateBounds::unbounded());
        assert_eq!(c.convention(), FilenameConvention::default());
        assert_eq!(c.chunk_size, ChunkSize::default());
        assert!(!c.list);
        Ok(())
    }

    #[test]
    fn bounds_from_command_line() -> Result<()> {
        let c = cli(&[
            "--min-datecode=20140215",
            "--max-datecode=20140216",
            "--chunk-size=4k",
            "--list",
            "dir",
        ])?;
        assert_eq!(
            c.bounds(),
            DateBounds::new(Some("20140215".into()), Some("20140216".into()))
        );
        assert_eq!(c.chunk_size, ChunkSize(4096));
        assert!(c.list);
        Ok(())
    }

    #[test]
    fn env_config_coerces_numbers_and_yields_to_args() -> Result<()> {
        let args =
            ReaderConfig::from_iter_safe(["flr-cat", "--max-datecode=20221231", "dir"])?;
        let env = json!({
            "min_datecode": 20220101,
            "max_datecode": 20230101,
            "datecode_delimiter": "-",
        });
        let c = merge_with_env(args, env)?;
        assert_eq!(
            c.bounds(),
            DateBounds::new(Some("20220101".into()), Some("20221231".into()))
        );
        assert_eq!(c.convention().delimiter, '-');
        Ok(())
    }

    #[test]
    fn config_file_is_lowest_priority() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("flr.jsonc");
        std::fs::write(
            &path,
            r#"{
                // comments are allowed
                "min_datecode": "20140214",
                "chunk_size": 1024,
                "datecode_width": 6
            }"#,
        )?;
        let args = ReaderConfig::from_iter_safe([
            "flr-cat".to_string(),
            format!("--config-file={}", path.display()),
            "--min-datecode=20140215".to_string(),
            "dir".to_string(),
        ])?;
        let c = merge_with_env(args, json!({ "chunk_size": 2048 }))?;
        assert_eq!(c.min_datecode, Some(DateCode::from("20140215")));
        assert_eq!(c.chunk_size, ChunkSize(2048));
        assert_eq!(c.datecode_width, DatecodeWidth(6));
        assert_eq!(c.config_file, Some(path));
        Ok(())
    }

    #[test]
    fn missing_config_file() -> Result<()> {
        let args = ReaderConfig::from_iter_safe([
            "flr-cat",
            "--config-file=/nonexistent/flr.jsonc",
            "dir",
        ])?;
        let err = merge_with_env(args, json!({})).unwrap_err();
        assert!(format!("{:#}", err).contains("Could not read config file"));
        Ok(())
    }

    #[test]
    fn datecode_width_is_capped() {
        assert_eq!("6".parse::<DatecodeWidth>().ok(), Some(DatecodeWidth(6)));
        assert!("0".parse::<DatecodeWidth>().is_err());
        assert!("10000000".parse::<DatecodeWidth>().is_err());
        let args = ["flr-cat", "--datecode-width=10000000", "d"];
        assert!(ReaderConfig::from_iter_safe(args).is_err());
    }

    #[test]
    fn env_and_file_values_are_validated() -> Result<()> {
        for env in [
            json!({ "datecode_width": 0 }),
            json!({ "datecode_width": 10_000_000 }),
            json!({ "chunk_size": 0 }),
        ] {
            let args = ReaderConfig::from_iter_safe(["flr-cat", "dir"])?;
            assert!(merge_with_env(args, env.clone()).is_err(), "{}", env);
        }

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("flr.json");
        std::fs::write(&path, r#"{ "datecode_width": 0 }"#)?;
        let args = ReaderConfig::from_iter_safe([
            "flr-cat".to_string(),
            format!("--config-file={}", path.display()),
            "dir".to_string(),
        ])?;
        let err = merge_with_env(args, json!({})).unwrap_err();
        assert!(format!("{:#}", err).contains("Error in config file"));
        Ok(())
    }
}
