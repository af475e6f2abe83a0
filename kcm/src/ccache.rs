use crate::{KcmRecord, Principal};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

/// Header written at the top of every generated cache: file format version 4
/// followed by a single delta-time header field (tag 1, length 8) holding
/// `-1` seconds and `0` microseconds.
pub const CCACHE_HEADER: [u8; 16] = [
    0x05, 0x04, // version
    0x00, 0x0c, // header length
    0x00, 0x01, // tag: FCC_TAG_DELTATIME
    0x00, 0x08, // field length
    0xff, 0xff, 0xff, 0xff, // time offset
    0x00, 0x00, 0x00, 0x00, // usec offset
];

const DATA_LENGTH_SIZE: usize = 4;

/// Exact number of bytes `encode` produces for `record`.
pub fn encoded_len(record: &KcmRecord) -> usize {
    CCACHE_HEADER.len()
        + 2 * DATA_LENGTH_SIZE
        + DATA_LENGTH_SIZE
        + record.realm.len()
        + record
            .principals
            .iter()
            .map(|principal| DATA_LENGTH_SIZE + principal.len())
            .sum::<usize>()
        + record.creds.iter().map(|cred| cred.blob.len()).sum::<usize>()
}

pub fn encode(record: &KcmRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(record));
    // Writing into a Vec cannot fail.
    let _ = write_ccache(&mut buf, record);
    buf
}

// After the header, a version 4 file holds the default principal and then the
// credentials, all integers big-endian:
//
// principal ::=
//     name type (32 bits)
//     count of components (32 bits)
//     realm (data)
//     component1 (data)
//     component2 (data)
//     ...
//
// The KCM blobs are already marshalled as ccache credentials, so they are
// appended as they are; the file has no credential count and simply ends
// after the last one.
pub fn write_ccache<W: Write>(writer: &mut W, record: &KcmRecord) -> io::Result<()> {
    writer.write_all(&CCACHE_HEADER)?;
    write_principal(writer, &record.default_principal())?;
    for cred in &record.creds {
        writer.write_all(&cred.blob)?;
    }
    Ok(())
}

fn write_principal<W: Write>(writer: &mut W, principal: &Principal) -> io::Result<()> {
    writer.write_u32::<BigEndian>(principal.name_type.0)?;
    writer.write_u32::<BigEndian>(principal.components.len() as u32)?;
    write_data(writer, principal.realm.as_bytes())?;
    for component in &principal.components {
        write_data(writer, component.as_bytes())?;
    }
    Ok(())
}

fn write_data<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    writer.write_u32::<BigEndian>(data.len() as u32)?;
    writer.write_all(data)
}
