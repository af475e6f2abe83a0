use super::{dn::Dn, downcast_data, Ops, Secret, SecretStore, StoreData};
use crate::{Context, Error};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::{
    fs,
    sync::{Arc, Mutex},
};
use tracing::debug;

const ATTR_DN: &str = "dn";
const ATTR_TYPE: &str = "type";
const ATTR_SECRET: &str = "secret";
const TYPE_CONTAINER: &str = "container";

pub(super) const LDIF_OPS: &Ops = &Ops {
    prefix: "LDIF",
    resolve,
    secrets_iter,
    add_secret,
};

#[derive(Debug)]
pub(super) struct LdifData {
    pub(super) name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LdifValue {
    Text(String),
    Base64(String),
}

impl LdifValue {
    fn decode(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            Self::Text(text) => Ok(text.as_bytes().to_vec()),
            Self::Base64(encoded) => STANDARD.decode(encoded).map_err(|e| {
                anyhow::Error::from(Error::KCM_STORE_FORMAT)
                    .context(format!("{} while decoding base64 value", e))
            }),
        }
    }
}

#[derive(Debug)]
struct LdifEntry {
    dn: String,
    parsed_dn: Dn,
    attributes: Vec<(String, LdifValue)>,
}

impl LdifEntry {
    fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LdifValue> + 'a {
        self.attributes
            .iter()
            .filter(move |(attr, _)| attr == name)
            .map(|(_, value)| value)
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.values(name).next().is_some()
    }

    fn is_container(&self) -> bool {
        self.values(ATTR_TYPE).any(|value| match value.decode() {
            Ok(value) => value.eq_ignore_ascii_case(TYPE_CONTAINER.as_bytes()),
            Err(_) => false,
        })
    }
}

impl LdifData {
    // The store reads the text form of the secrets database, as printed by
    //
    //     ldbsearch -H /var/lib/sss/secrets/secrets.ldb -b cn=kcm
    //
    // Records are separated by blank lines and start with a `dn` line. Every
    // other line is `attr: value`, or `attr:: base64` for binary values such
    // as `secret`. A line starting with a single space continues the previous
    // line, and lines starting with `#` are comments.
    fn parse(content: &str) -> anyhow::Result<Vec<LdifEntry>> {
        let mut entries = vec![];
        let mut lines: Vec<(usize, String)> = vec![];
        for (number, line) in content.lines().enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(continuation) = line.strip_prefix(' ') {
                if let Some((_, last)) = lines.last_mut() {
                    last.push_str(continuation);
                    continue;
                }
            }
            if line.is_empty() {
                if let Some(entry) = Self::parse_entry(&lines)? {
                    entries.push(entry);
                }
                lines.clear();
                continue;
            }
            lines.push((number + 1, line.to_owned()));
        }
        if let Some(entry) = Self::parse_entry(&lines)? {
            entries.push(entry);
        }
        Ok(entries)
    }

    fn parse_entry(lines: &[(usize, String)]) -> anyhow::Result<Option<LdifEntry>> {
        let mut dn = None;
        let mut attributes = vec![];
        for (number, line) in lines.iter().filter(|(_, line)| !line.starts_with('#')) {
            let (name, value) = Self::parse_line(*number, line)?;
            if name == "version" && dn.is_none() {
                continue;
            }
            if name == ATTR_DN {
                if dn.is_some() {
                    Err(anyhow::Error::from(Error::KCM_STORE_FORMAT)
                        .context(format!("second dn in record at line {}", number)))?
                }
                let value = String::from_utf8(value.decode()?).map_err(|_| {
                    anyhow::Error::from(Error::KCM_STORE_FORMAT)
                        .context(format!("dn is not valid UTF-8 at line {}", number))
                })?;
                dn = Some(value);
                continue;
            }
            if dn.is_none() {
                Err(anyhow::Error::from(Error::KCM_STORE_FORMAT)
                    .context(format!("attribute before dn at line {}", number)))?
            }
            attributes.push((name, value));
        }
        Ok(dn.map(|dn| LdifEntry {
            parsed_dn: Dn::parse(&dn),
            dn,
            attributes,
        }))
    }

    fn parse_line(number: usize, line: &str) -> anyhow::Result<(String, LdifValue)> {
        let (name, rest) = line.split_once(':').ok_or_else(|| {
            anyhow::Error::from(Error::KCM_STORE_FORMAT)
                .context(format!("missing ':' at line {}", number))
        })?;
        // Attribute options such as `;binary` do not change the value.
        let name = name
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let value = if let Some(encoded) = rest.strip_prefix(':') {
            LdifValue::Base64(encoded.trim().to_owned())
        } else if rest.starts_with('<') {
            Err(anyhow::Error::from(Error::KCM_STORE_FORMAT)
                .context(format!("URL values are not supported at line {}", number)))?
        } else {
            LdifValue::Text(rest.trim_start().to_owned())
        };
        Ok((name, value))
    }

    // Containers are the entries below the base DN with `type: container`.
    // The secrets of a container are all entries at or below it carrying a
    // `secret` attribute, so a secret nested in two containers is visited
    // once for each of them.
    fn secrets(&self, context: &Context) -> anyhow::Result<Vec<anyhow::Result<Secret>>> {
        let content = fs::read_to_string(&self.name)
            .map_err(|e| anyhow::anyhow!("{} while reading {}", e, self.name))?;
        let entries = Self::parse(&content)?;
        let base_dn = Dn::parse(&context.base_dn);

        let containers: Vec<&LdifEntry> = entries
            .iter()
            .filter(|entry| entry.parsed_dn.is_within(&base_dn) && entry.is_container())
            .collect();
        debug!(
            store = %self.name,
            entries = entries.len(),
            containers = containers.len(),
            "scanned LDIF secret store"
        );

        let mut secrets = vec![];
        for (container_index, container) in containers.iter().enumerate() {
            let children = entries.iter().filter(|entry| {
                entry.parsed_dn.is_within(&container.parsed_dn) && entry.has_attribute(ATTR_SECRET)
            });
            for (secret_index, entry) in children.enumerate() {
                let data = entry
                    .values(ATTR_SECRET)
                    .next()
                    .map(LdifValue::decode)
                    .unwrap_or_else(|| Ok(vec![]))
                    .map_err(|e| e.context(format!("{} while reading secret", entry.dn)));
                secrets.push(data.map(|data| Secret {
                    container_index,
                    secret_index,
                    container_dn: container.dn.clone(),
                    dn: entry.dn.clone(),
                    data,
                }));
            }
        }
        Ok(secrets)
    }
}

fn resolve(_: &Context, name: &str) -> anyhow::Result<Arc<Mutex<SecretStore>>> {
    let data = LdifData {
        name: name.to_owned(),
    };
    let store = SecretStore {
        ops: LDIF_OPS,
        data: StoreData::LdifData(data),
    };
    Ok(Arc::new(Mutex::new(store)))
}

fn secrets_iter<'a>(
    context: &Context,
    store: &'a mut SecretStore,
) -> anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<Secret>> + 'a>> {
    let secrets = downcast_data!(&store.data, LdifData).secrets(context)?;
    Ok(Box::new(secrets.into_iter()))
}

fn add_secret(store: &mut SecretStore, _: &str, _: &[u8]) -> anyhow::Result<()> {
    Err(anyhow::Error::from(Error::KCM_STORE_READONLY)
        .context(format!("{} is an LDIF dump", store.get_name())))
}
