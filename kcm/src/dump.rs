use crate::{ccache, CcacheName, Context, KcmRecord, Secret, SecretLocator, SecretStore, Sink};
use tracing::{info, warn};

/// A secret that was turned into a credentials cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpEntry {
    pub locator: SecretLocator,
    pub principal: String,
    pub credentials: usize,
    pub name: CcacheName,
    /// Where the sink stored the cache; `None` when only listing.
    pub location: Option<String>,
}

/// A secret that could not be read, decoded or written.
#[derive(Debug)]
pub struct DumpFailure {
    pub locator: Option<SecretLocator>,
    pub error: anyhow::Error,
}

#[derive(Debug, Default)]
pub struct DumpReport {
    pub entries: Vec<DumpEntry>,
    pub failures: Vec<DumpFailure>,
}

impl DumpReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Converts every secret of `store` and hands the caches to `sink`.
///
/// A secret that fails is logged, recorded in the report and skipped; only a
/// store that cannot be traversed at all makes the whole call fail.
pub fn dump(
    context: &Context,
    store: &mut SecretStore,
    sink: &mut dyn Sink,
) -> anyhow::Result<DumpReport> {
    run(context, store, Some(sink))
}

/// Decodes every secret of `store` and reports the caches `dump` would
/// write, without encoding or writing anything.
pub fn list(context: &Context, store: &mut SecretStore) -> anyhow::Result<DumpReport> {
    run(context, store, None)
}

/// Decodes one secret, names its cache and encodes it.
pub fn transcode(secret: &Secret) -> anyhow::Result<(KcmRecord, CcacheName, Vec<u8>)> {
    let (record, name) = decode(secret)?;
    let bytes = ccache::encode(&record);
    Ok((record, name, bytes))
}

fn decode(secret: &Secret) -> anyhow::Result<(KcmRecord, CcacheName)> {
    let record = KcmRecord::decode(&secret.data)?;
    let name = CcacheName::new(&record, secret.container_index, secret.secret_index)?;
    Ok((record, name))
}

fn run(
    context: &Context,
    store: &mut SecretStore,
    mut sink: Option<&mut dyn Sink>,
) -> anyhow::Result<DumpReport> {
    let store_name = store.get_full_name();
    let secrets = store
        .secrets_iter(context)
        .map_err(|e| e.context(format!("{} while traversing secret store", store_name)))?;

    let mut report = DumpReport::default();
    for secret in secrets {
        let secret = match secret {
            Ok(secret) => secret,
            Err(error) => {
                warn!(store = %store_name, "skipping unreadable secret: {:#}", error);
                report.failures.push(DumpFailure {
                    locator: None,
                    error,
                });
                continue;
            }
        };
        match process(&secret, &mut sink) {
            Ok(entry) => {
                match &entry.location {
                    Some(location) => info!(
                        principal = %entry.principal,
                        credentials = entry.credentials,
                        "wrote {}",
                        location
                    ),
                    None => info!(principal = %entry.principal, "found {}", entry.name),
                }
                report.entries.push(entry);
            }
            Err(error) => {
                warn!(
                    store = %store_name,
                    dn = %secret.dn,
                    "skipping secret: {:#}",
                    error
                );
                report.failures.push(DumpFailure {
                    locator: Some(secret.locator()),
                    error,
                });
            }
        }
    }
    Ok(report)
}

fn process(secret: &Secret, sink: &mut Option<&mut dyn Sink>) -> anyhow::Result<DumpEntry> {
    let (record, name) = decode(secret)?;
    let location = match sink {
        Some(sink) => Some(sink.write(&name, &ccache::encode(&record))?),
        None => None,
    };
    Ok(DumpEntry {
        locator: secret.locator(),
        principal: record.default_principal().unparse_name(),
        credentials: record.creds.len(),
        name,
        location,
    })
}
