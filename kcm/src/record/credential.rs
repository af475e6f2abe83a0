use crate::Cursor;

pub const UUID_SIZE: usize = 16;

/// One ticket held by a KCM cache.
///
/// `blob` is already a marshalled MIT ccache credential; it is carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KcmCredential {
    pub uuid: [u8; UUID_SIZE],
    pub blob: Vec<u8>,
}

impl KcmCredential {
    // cred ::=
    //     uuid (16 bytes)
    //     blob (data)
    pub(super) fn read(cursor: &mut Cursor) -> anyhow::Result<Self> {
        let uuid = cursor.read_fixed::<UUID_SIZE>()?;
        let blob = cursor.read_data()?.to_vec();
        Ok(Self { uuid, blob })
    }
}
