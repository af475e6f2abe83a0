use crate::{Context, Error, KcmRecord};
use std::{
    fmt,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

const CCACHE_SUFFIX: &str = ".ccache";

/// File name of a generated cache: `{first principal}_{disambiguator}.ccache`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcacheName(String);

impl CcacheName {
    pub fn new(
        record: &KcmRecord,
        container_index: usize,
        secret_index: usize,
    ) -> anyhow::Result<Self> {
        let principal = record
            .principals
            .first()
            .ok_or(Error::KCM_NO_PRINCIPAL)?;
        let principal: String = principal
            .chars()
            .map(|c| match c {
                '/' | '\0' => '_',
                c => c,
            })
            .collect();
        Ok(Self(format!(
            "{}_{}{}",
            principal,
            Self::disambiguator(container_index, secret_index),
            CCACHE_SUFFIX
        )))
    }

    /// Positional suffix `i * j + j` for secret `j` of container `i`.
    ///
    /// This is best-effort: every first secret gets `0`, and `(1, 1)` and
    /// `(0, 2)` both get `2`, so two caches of the same principal can share a
    /// name. `FileSink` in no-clobber mode refuses to overwrite in that case.
    pub fn disambiguator(container_index: usize, secret_index: usize) -> usize {
        container_index
            .saturating_mul(secret_index)
            .saturating_add(secret_index)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CcacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination of the generated caches.
pub trait Sink {
    /// Stores `bytes` under `name` and returns where they ended up.
    fn write(&mut self, name: &CcacheName, bytes: &[u8]) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
    no_clobber: bool,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>, no_clobber: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            no_clobber,
        }
    }

    pub fn from_context(context: &Context) -> Self {
        Self::new(&context.output_dir, context.no_clobber)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn io_failure(err: io::Error, action: &str, path: &Path) -> anyhow::Error {
    anyhow::Error::new(err)
        .context(Error::KCM_IO_FAILURE)
        .context(format!("{} while {}", path.display(), action))
}

impl Sink for FileSink {
    fn write(&mut self, name: &CcacheName, bytes: &[u8]) -> anyhow::Result<String> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| io_failure(e, "creating output directory", &self.output_dir))?;
        let path = self.output_dir.join(name.as_str());

        let mut options = OpenOptions::new();
        options.write(true);
        if self.no_clobber {
            options.create_new(true);
        } else {
            options.create(true).truncate(true);
        }
        let mut file = options.open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists if self.no_clobber => anyhow::Error::new(e)
                .context(Error::KCM_OUTPUT_EXISTS)
                .context(format!("{} while creating credentials cache", path.display())),
            _ => io_failure(e, "creating credentials cache", &path),
        })?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| io_failure(e, "writing credentials cache", &path))?;

        Ok(path.display().to_string())
    }
}

/// Keeps the generated caches in memory, in the order they were written.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub ccaches: Vec<(CcacheName, Vec<u8>)>,
}

impl Sink for MemorySink {
    fn write(&mut self, name: &CcacheName, bytes: &[u8]) -> anyhow::Result<String> {
        self.ccaches.push((name.clone(), bytes.to_vec()));
        Ok(format!("MEMORY:{}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(principals: &[&str]) -> KcmRecord {
        KcmRecord {
            kdc_offset: 0,
            principal_presence: 1,
            realm: "CORP.LOCAL".to_owned(),
            name_type: 1,
            principals: principals.iter().map(|p| p.to_string()).collect(),
            creds: vec![],
        }
    }

    fn name(principals: &[&str], container_index: usize, secret_index: usize) -> CcacheName {
        CcacheName::new(&record(principals), container_index, secret_index).unwrap()
    }

    #[test]
    fn test_name_uses_first_principal() {
        assert_eq!(name(&["user"], 0, 0).as_str(), "user_0.ccache");
        assert_eq!(name(&["HTTP", "web.corp.local"], 3, 2).as_str(), "HTTP_8.ccache");
    }

    #[test]
    fn test_name_without_principal() {
        let err = CcacheName::new(&record(&[]), 0, 0).unwrap_err();
        assert_eq!(Error::find(&err), Some(Error::KCM_NO_PRINCIPAL));
    }

    #[test]
    fn test_name_stays_in_output_dir() {
        assert_eq!(name(&["../etc/passwd"], 0, 1).as_str(), ".._etc_passwd_1.ccache");
    }

    #[test]
    fn test_disambiguator_collisions_are_reproduced() {
        assert_eq!(CcacheName::disambiguator(0, 0), 0);
        assert_eq!(CcacheName::disambiguator(5, 0), 0);
        assert_eq!(CcacheName::disambiguator(1, 1), 2);
        assert_eq!(CcacheName::disambiguator(0, 2), 2);
        assert_eq!(CcacheName::disambiguator(2, 3), 9);
    }

    #[test]
    fn test_file_sink_writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");
        let mut sink = FileSink::new(&output_dir, false);
        let name = name(&["user"], 0, 0);

        let location = sink.write(&name, b"first").unwrap();
        assert_eq!(location, output_dir.join("user_0.ccache").display().to_string());
        sink.write(&name, b"2nd").unwrap();
        assert_eq!(fs::read(output_dir.join("user_0.ccache")).unwrap(), b"2nd");
    }

    #[test]
    fn test_file_sink_no_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path(), true);
        let name = name(&["user"], 0, 0);

        sink.write(&name, b"first").unwrap();
        let err = sink.write(&name, b"second").unwrap_err();
        assert_eq!(Error::find(&err), Some(Error::KCM_OUTPUT_EXISTS));
        assert_eq!(fs::read(dir.path().join("user_0.ccache")).unwrap(), b"first");
    }

    #[test]
    fn test_file_sink_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let mut sink = FileSink::new(blocker.join("out"), false);
        let err = sink.write(&name(&["user"], 0, 0), b"data").unwrap_err();
        assert_eq!(Error::find(&err), Some(Error::KCM_IO_FAILURE));
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::default();
        sink.write(&name(&["a"], 0, 0), b"1").unwrap();
        sink.write(&name(&["b"], 0, 1), b"2").unwrap();
        let names: Vec<&str> = sink.ccaches.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a_0.ccache", "b_1.ccache"]);
    }
}
