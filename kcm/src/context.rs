mod profile;

pub use self::profile::Profile;
use nix::unistd::{Uid, User};

const DEFAULT_BASE_DN: &str = "cn=kcm";
const DEFAULT_OUTPUT_DIR: &str = ".";
const DEFAULT_STORE_TYPE: &str = "LDIF";

pub struct Conf;

macro_rules! conf {
    ($name:ident, $value:expr) => {
        pub const $name: &'static str = $value;
    };
}

impl Conf {
    conf!(KCMDUMP, "kcmdump");
    conf!(BASE_DN, "base_dn");
    conf!(DEFAULT_STORE_TYPE, "default_store_type");
    conf!(NO_CLOBBER, "no_clobber");
    conf!(OUTPUT_DIR, "output_dir");
}

/// Settings shared by the secret stores, the dumper and the binary.
#[derive(Debug)]
pub struct Context {
    pub profile: Profile,
    pub base_dn: String,
    pub output_dir: String,
    pub no_clobber: bool,
    pub default_store_type: String,
}

impl Context {
    pub fn init() -> anyhow::Result<Self> {
        Self::with_profile(Profile::new()?)
    }

    pub fn with_profile(profile: Profile) -> anyhow::Result<Self> {
        let base_dn = Self::get_string(&profile, Conf::BASE_DN)
            .unwrap_or_else(|| DEFAULT_BASE_DN.to_owned());
        let output_dir = Self::expand_path_tokens(
            Self::get_string(&profile, Conf::OUTPUT_DIR)
                .as_deref()
                .unwrap_or(DEFAULT_OUTPUT_DIR),
        )?;
        let no_clobber = Self::get_bool(&profile, Conf::NO_CLOBBER, false);
        let default_store_type = Self::get_string(&profile, Conf::DEFAULT_STORE_TYPE)
            .map(|store_type| store_type.to_ascii_uppercase())
            .unwrap_or_else(|| DEFAULT_STORE_TYPE.to_owned());

        Ok(Self {
            profile,
            base_dn,
            output_dir,
            no_clobber,
            default_store_type,
        })
    }

    fn get_bool(profile: &Profile, name: &str, default: bool) -> bool {
        profile
            .get_bool(&format!("{}.{}", Conf::KCMDUMP, name))
            .unwrap_or(default)
    }

    fn get_string(profile: &Profile, name: &str) -> Option<String> {
        profile.get_string(&format!("{}.{}", Conf::KCMDUMP, name))
    }

    pub fn set_base_dn(&mut self, base_dn: &str) {
        self.base_dn = base_dn.to_owned();
    }

    pub fn set_output_dir(&mut self, output_dir: &str) -> anyhow::Result<()> {
        self.output_dir = Self::expand_path_tokens(output_dir)?;
        Ok(())
    }

    pub fn expand_path_tokens(path: &str) -> anyhow::Result<String> {
        let mut buf = String::new();
        let mut path_remained = path;
        while !path_remained.is_empty() {
            let token_begin = match path_remained.find("%{") {
                Some(token_begin) => {
                    buf.push_str(&path_remained[..token_begin]);
                    token_begin
                }
                None => {
                    buf.push_str(path_remained);
                    break;
                }
            };
            let token_end = match path_remained[token_begin..].find('}') {
                Some(token_end) => token_begin + token_end,
                None => Err(anyhow::anyhow!("Invalid argument"))?,
            };
            let token_value = Self::expand_token(&path_remained[token_begin + 2..token_end])?;
            buf.push_str(&token_value);
            path_remained = &path_remained[token_end + 1..];
        }
        Ok(buf)
    }

    fn expand_token(token: &str) -> anyhow::Result<String> {
        let token_value = match token {
            "euid" => Uid::effective().to_string(),
            "username" => User::from_uid(Uid::effective())?
                .map(|u| u.name)
                .unwrap_or_else(|| Uid::effective().to_string()),
            "uid" | "USERID" => Uid::current().to_string(),
            _ => Err(anyhow::anyhow!("Invalid argument"))?,
        };
        Ok(token_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_files() {
        let context = Context::with_profile(Profile::default()).unwrap();
        assert_eq!(context.base_dn, "cn=kcm");
        assert_eq!(context.output_dir, ".");
        assert!(!context.no_clobber);
        assert_eq!(context.default_store_type, "LDIF");
    }

    #[test]
    fn test_missing_profile_file_is_skipped() {
        let profile = Profile::from_files(&["/nonexistent/kcmdump.conf".to_owned()]).unwrap();
        let context = Context::with_profile(profile).unwrap();
        assert_eq!(context.base_dn, "cn=kcm");
    }

    #[test]
    fn test_profile_values() {
        let mut file = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
        writeln!(file, "[kcmdump]").unwrap();
        writeln!(file, "base_dn = cn=persistent,cn=kcm").unwrap();
        writeln!(file, "output_dir = /tmp/out").unwrap();
        writeln!(file, "no_clobber = true").unwrap();
        writeln!(file, "default_store_type = memory").unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let context = Context::with_profile(Profile::from_files(&[path]).unwrap()).unwrap();
        assert_eq!(context.base_dn, "cn=persistent,cn=kcm");
        assert_eq!(context.output_dir, "/tmp/out");
        assert!(context.no_clobber);
        assert_eq!(context.default_store_type, "MEMORY");
    }

    #[test]
    fn test_expand_path_tokens() {
        let uid = Uid::current().to_string();
        assert_eq!(
            Context::expand_path_tokens("/tmp/kcm_%{uid}/out").unwrap(),
            format!("/tmp/kcm_{}/out", uid)
        );
        assert_eq!(Context::expand_path_tokens("plain").unwrap(), "plain");
        assert!(Context::expand_path_tokens("/tmp/%{uid").is_err());
        assert!(Context::expand_path_tokens("/tmp/%{bogus}").is_err());
    }
}
