use super::{dn::Dn, downcast_data, Ops, Secret, SecretStore, StoreData};
use crate::Context;
use once_cell::sync::Lazy;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

pub(super) const MEMORY_OPS: &Ops = &Ops {
    prefix: "MEMORY",
    resolve,
    secrets_iter,
    add_secret,
};

static MEMORY_STORES: Lazy<Mutex<HashMap<String, Arc<Mutex<SecretStore>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug)]
pub(super) struct MemoryData {
    pub(super) name: String,
    containers: Vec<MemoryContainer>,
}

#[derive(Debug)]
struct MemoryContainer {
    dn: String,
    parsed_dn: Dn,
    secrets: Vec<Vec<u8>>,
}

fn resolve(_: &Context, name: &str) -> anyhow::Result<Arc<Mutex<SecretStore>>> {
    let mut stores = MEMORY_STORES
        .lock()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let store = stores
        .entry(name.to_owned())
        .or_insert_with(|| Arc::new(Mutex::new(create_memory_store(name))));
    Ok(Arc::clone(store))
}

fn create_memory_store(name: &str) -> SecretStore {
    let data = MemoryData {
        name: name.to_owned(),
        containers: vec![],
    };
    SecretStore {
        ops: MEMORY_OPS,
        data: StoreData::MemoryData(data),
    }
}

fn secrets_iter<'a>(
    context: &Context,
    store: &'a mut SecretStore,
) -> anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<Secret>> + 'a>> {
    let base_dn = Dn::parse(&context.base_dn);
    let containers = downcast_data!(&store.data, MemoryData)
        .containers
        .iter()
        .filter(move |container| container.parsed_dn.is_within(&base_dn));
    Ok(Box::new(containers.enumerate().flat_map(
        |(container_index, container)| {
            container
                .secrets
                .iter()
                .enumerate()
                .map(move |(secret_index, data)| {
                    Ok(Secret {
                        container_index,
                        secret_index,
                        container_dn: container.dn.clone(),
                        dn: format!("cn={},{}", secret_index, container.dn),
                        data: data.clone(),
                    })
                })
        },
    )))
}

fn add_secret(store: &mut SecretStore, container_dn: &str, data: &[u8]) -> anyhow::Result<()> {
    let parsed_dn = Dn::parse(container_dn);
    let containers = &mut downcast_data!(&mut store.data, MemoryData).containers;
    let index = match containers.iter().position(|c| c.parsed_dn == parsed_dn) {
        Some(index) => index,
        None => {
            containers.push(MemoryContainer {
                dn: container_dn.to_owned(),
                parsed_dn,
                secrets: vec![],
            });
            containers.len() - 1
        }
    };
    containers[index].secrets.push(data.to_vec());
    Ok(())
}
