mod credential;

pub use self::credential::{KcmCredential, UUID_SIZE};
use crate::{Cursor, NameType, Principal};
use nom::number::Endianness;
use tracing::debug;

/// A credential cache as stored by the SSSD KCM responder in its secrets
/// database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KcmRecord {
    pub kdc_offset: u32,
    pub principal_presence: u8,
    pub realm: String,
    pub name_type: u32,
    pub principals: Vec<String>,
    pub creds: Vec<KcmCredential>,
}

impl KcmRecord {
    /// Decodes one secret payload. The whole record is decoded or nothing is:
    /// a short buffer fails with `Error::KCM_TRUNCATED_INPUT`.
    pub fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut cursor = Cursor::new(bytes, Endianness::Little);
        let record = Self::read(&mut cursor)?;
        if cursor.remaining() > 0 {
            debug!(
                trailing = cursor.remaining(),
                "ignoring bytes after the last KCM credential"
            );
        }
        Ok(record)
    }

    // The KCM responder marshals a cache with the following grammar, all
    // integers little-endian:
    //
    // ccache ::=
    //     kdc offset (32 bits)
    //     principal presence (8 bits)
    //     realm (data)
    //     name type (32 bits)
    //     count of components (32 bits)
    //     component1 (data)
    //     component2 (data)
    //     ...
    //     count of credentials (32 bits)
    //     cred1
    //     cred2
    //     ...
    // data ::=
    //     length (32 bits)
    //     value (length bytes)
    //
    // There are no tags, so the fields must be read in exactly this order.
    pub fn read(cursor: &mut Cursor) -> anyhow::Result<Self> {
        let kdc_offset = cursor.read_u32()?;
        let principal_presence = cursor.read_u8()?;
        let realm = cursor.read_string()?;
        let name_type = cursor.read_u32()?;

        let principals_len = cursor.read_u32()?;
        let principals = cursor.read_array(principals_len, |cursor| cursor.read_string())?;

        let creds_len = cursor.read_u32()?;
        let creds = cursor.read_array(creds_len, KcmCredential::read)?;

        let record = Self {
            kdc_offset,
            principal_presence,
            realm,
            name_type,
            principals,
            creds,
        };
        debug!(
            realm = %record.realm,
            principals = record.principals.len(),
            creds = record.creds.len(),
            "decoded KCM record"
        );
        Ok(record)
    }

    pub fn default_principal(&self) -> Principal {
        Principal {
            realm: self.realm.clone(),
            components: self.principals.clone(),
            name_type: NameType(self.name_type),
        }
    }
}
