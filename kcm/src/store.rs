mod dn;
mod ldif_data;
mod memory_data;

use self::{
    ldif_data::{LdifData, LDIF_OPS},
    memory_data::{MemoryData, MEMORY_OPS},
};
use crate::{Context, Error};
use std::sync::{Arc, Mutex};

const OPS_LIST: [&Ops; 2] = [LDIF_OPS, MEMORY_OPS];

/// Raw value of one `secret` attribute, with its position in the traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub container_index: usize,
    pub secret_index: usize,
    pub container_dn: String,
    pub dn: String,
    pub data: Vec<u8>,
}

/// Locator used when reporting a secret that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretLocator {
    pub container_index: usize,
    pub secret_index: usize,
    pub dn: String,
}

impl Secret {
    pub fn locator(&self) -> SecretLocator {
        SecretLocator {
            container_index: self.container_index,
            secret_index: self.secret_index,
            dn: self.dn.clone(),
        }
    }
}

/// A database holding KCM caches, resolved by name as `TYPE:residual`.
#[derive(Debug)]
pub struct SecretStore {
    ops: &'static Ops,
    data: StoreData,
}

impl SecretStore {
    pub fn resolve(context: &Context, name: &str) -> anyhow::Result<Arc<Mutex<Self>>> {
        let (prefix, residual) = match name.split_once(':') {
            None => (context.default_store_type.as_str(), name),
            // Use the default type when prefix is a drive letter
            Some((p, _)) if p.len() == 1 && p.as_bytes()[0].is_ascii_alphabetic() => {
                (context.default_store_type.as_str(), name)
            }
            Some((prefix, residual)) => (prefix, residual),
        };
        match OPS_LIST
            .iter()
            .find(|ops| ops.prefix.eq_ignore_ascii_case(prefix))
        {
            Some(ops) => (ops.resolve)(context, residual),
            None => Err(anyhow::Error::from(Error::KCM_STORE_UNKNOWN_TYPE)
                .context(format!("{} while resolving secret store {}", prefix, name))),
        }
    }

    pub fn get_type(&self) -> &str {
        self.ops.prefix
    }

    pub fn get_name(&self) -> &str {
        self.data.name()
    }

    pub fn get_full_name(&self) -> String {
        format!("{}:{}", self.get_type(), self.get_name())
    }

    /// Walks every container under the context's base DN and yields the
    /// secrets found below each one, in store order. Each call starts a new
    /// traversal.
    pub fn secrets_iter<'a>(
        &'a mut self,
        context: &Context,
    ) -> anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<Secret>> + 'a>> {
        (self.ops.secrets_iter)(context, self)
    }

    pub fn add_secret(&mut self, container_dn: &str, data: &[u8]) -> anyhow::Result<()> {
        (self.ops.add_secret)(self, container_dn, data)
    }
}

#[derive(Debug)]
struct Ops {
    prefix: &'static str,
    resolve: fn(&Context, &str) -> anyhow::Result<Arc<Mutex<SecretStore>>>,
    secrets_iter: for<'a> fn(
        &Context,
        &'a mut SecretStore,
    ) -> anyhow::Result<
        Box<dyn Iterator<Item = anyhow::Result<Secret>> + 'a>,
    >,
    add_secret: fn(&mut SecretStore, &str, &[u8]) -> anyhow::Result<()>,
}

#[derive(Debug)]
enum StoreData {
    LdifData(LdifData),
    MemoryData(MemoryData),
}

impl StoreData {
    fn name(&self) -> &str {
        match self {
            Self::LdifData(data) => &data.name,
            Self::MemoryData(data) => &data.name,
        }
    }
}

macro_rules! downcast_data {
    ($data:expr, $data_type:ident) => {
        match $data {
            StoreData::$data_type(data) => data,
            _ => unreachable!(),
        }
    };
}

pub(self) use downcast_data;
