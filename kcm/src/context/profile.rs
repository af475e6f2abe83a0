use config::{Config, File, FileFormat};
use std::env;

const KCMDUMP_ENV_CONFIG: &str = "KCMDUMP_CONFIG";
const DEFAULT_PROFILE_PATH: &str = "/etc/kcmdump.conf";

#[derive(Debug, Default)]
pub struct Profile {
    files: Vec<ProfileFile>,
}

macro_rules! get_value {
    ($fn:ident, $type:ident) => {
        pub fn $fn(&self, key: &str) -> Option<$type> {
            for file in &self.files {
                if let Ok(value) = file.config.$fn(key) {
                    return Some(value);
                }
            }
            None
        }
    };
}

impl Profile {
    pub fn new() -> anyhow::Result<Self> {
        Self::from_files(&Self::default_config_files())
    }

    /// Layers the given INI files, earlier files taking precedence. Files
    /// that do not exist are skipped.
    pub fn from_files(files: &[String]) -> anyhow::Result<Self> {
        let mut profile_files = vec![];
        for file in files.iter().filter(|f| !f.is_empty()) {
            profile_files.push(ProfileFile::new(file)?);
        }
        Ok(Self {
            files: profile_files,
        })
    }

    fn default_config_files() -> Vec<String> {
        let filepath = env::var(KCMDUMP_ENV_CONFIG).unwrap_or(DEFAULT_PROFILE_PATH.to_owned());
        filepath.split(':').map(|f| f.to_owned()).collect()
    }

    get_value!(get_string, String);

    get_value!(get_bool, bool);
}

#[derive(Debug)]
struct ProfileFile {
    config: Config,
}

impl ProfileFile {
    fn new(filename: &str) -> anyhow::Result<Self> {
        let expanded_filename = match (filename.starts_with("~/"), env::var("HOME")) {
            (true, Ok(home_env)) => format!("{}{}", home_env, &filename[1..]),
            _ => filename.to_owned(),
        };
        let config = Config::builder()
            .add_source(File::new(&expanded_filename, FileFormat::Ini).required(false))
            .build()
            .map_err(|e| anyhow::anyhow!("{} while reading profile {}", e, expanded_filename))?;
        Ok(Self { config })
    }
}
