use base64::{engine::general_purpose::STANDARD, Engine};
use kcm::{
    ccache, dump, Context, Error, FileSink, KcmRecord, MemorySink, Profile, SecretStore,
    CCACHE_HEADER, UUID_SIZE,
};
use std::{fs, io::Write};

/// Little-endian KCM payload writer.
#[derive(Default)]
struct Payload(Vec<u8>);

impl Payload {
    fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    fn u32(mut self, value: u32) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn data(self, value: &[u8]) -> Self {
        let mut payload = self.u32(value.len() as u32);
        payload.0.extend_from_slice(value);
        payload
    }

    fn raw(mut self, value: &[u8]) -> Self {
        self.0.extend_from_slice(value);
        self
    }
}

fn kcm_payload(
    kdc_offset: u32,
    realm: &str,
    name_type: u32,
    principals: &[&str],
    blobs: &[Vec<u8>],
) -> Vec<u8> {
    let mut payload = Payload::default()
        .u32(kdc_offset)
        .u8(1)
        .data(realm.as_bytes())
        .u32(name_type)
        .u32(principals.len() as u32);
    for principal in principals {
        payload = payload.data(principal.as_bytes());
    }
    payload = payload.u32(blobs.len() as u32);
    for blob in blobs {
        payload = payload.raw(&[0xab; UUID_SIZE]).data(blob);
    }
    payload.0
}

/// xorshift32, so the generated inputs are the same on every run.
struct Rng(u32);

impl Rng {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    fn below(&mut self, bound: u32) -> u32 {
        self.next() % bound
    }

    fn string(&mut self, max_len: u32) -> String {
        (0..self.below(max_len + 1))
            .map(|_| char::from(b'a' + self.below(26) as u8))
            .collect()
    }

    fn bytes(&mut self, max_len: u32) -> Vec<u8> {
        (0..self.below(max_len + 1))
            .map(|_| self.next() as u8)
            .collect()
    }
}

#[test]
fn test_single_principal_single_credential() {
    let input = kcm_payload(0, "CORP.LOCAL", 1, &["user"], &[vec![0x01, 0x02]]);
    let record = KcmRecord::decode(&input).unwrap();
    let output = ccache::encode(&record);

    let mut expected = CCACHE_HEADER.to_vec();
    expected.extend_from_slice(&[0, 0, 0, 1]);
    expected.extend_from_slice(&[0, 0, 0, 1]);
    expected.extend_from_slice(&[0, 0, 0, 0x0a]);
    expected.extend_from_slice(b"CORP.LOCAL");
    expected.extend_from_slice(&[0, 0, 0, 4]);
    expected.extend_from_slice(b"user");
    expected.extend_from_slice(&[0x01, 0x02]);
    assert_eq!(output, expected);
}

#[test]
fn test_generated_records_frame_and_length() {
    let mut rng = Rng(0x4b43_4d21);
    for _ in 0..200 {
        let realm = rng.string(20);
        let principals: Vec<String> = (0..rng.below(4)).map(|_| rng.string(12)).collect();
        let principal_refs: Vec<&str> = principals.iter().map(String::as_str).collect();
        let blobs: Vec<Vec<u8>> = (0..rng.below(4)).map(|_| rng.bytes(64)).collect();
        let name_type = rng.below(11);
        let input = kcm_payload(rng.next(), &realm, name_type, &principal_refs, &blobs);

        let record = KcmRecord::decode(&input).unwrap();
        assert_eq!(record.realm, realm);
        assert_eq!(record.principals, principals);
        let output = ccache::encode(&record);

        let expected_len = 16
            + 4
            + 4
            + (4 + realm.len())
            + principals.iter().map(|p| 4 + p.len()).sum::<usize>()
            + blobs.iter().map(Vec::len).sum::<usize>();
        assert_eq!(output.len(), expected_len);
        assert_eq!(ccache::encoded_len(&record), expected_len);
        assert_eq!(&output[..16], &CCACHE_HEADER);
        assert_eq!(&output[16..20], &name_type.to_be_bytes());
        assert_eq!(&output[20..24], &(principals.len() as u32).to_be_bytes());
        assert_eq!(&output[24..28], &(realm.len() as u32).to_be_bytes());
        assert_eq!(&output[28..28 + realm.len()], realm.as_bytes());
        assert!(output.ends_with(&blobs.concat()));
    }
}

#[test]
fn test_every_truncation_fails() {
    let input = kcm_payload(
        3,
        "CORP.LOCAL",
        1,
        &["HTTP", "web.corp.local"],
        &[vec![1, 2, 3], vec![], vec![4]],
    );
    assert!(KcmRecord::decode(&input).is_ok());
    for len in 0..input.len() {
        let err = KcmRecord::decode(&input[..len]).unwrap_err();
        assert_eq!(
            Error::find(&err),
            Some(Error::KCM_TRUNCATED_INPUT),
            "prefix of {} bytes",
            len
        );
    }
}

#[test]
fn test_blobs_with_zero_bytes_pass_through() {
    let blobs = vec![vec![0; 7], vec![0, 0xff, 0, 0xff], vec![]];
    let input = kcm_payload(0, "CORP.LOCAL", 1, &["user"], &blobs);
    let output = ccache::encode(&KcmRecord::decode(&input).unwrap());
    assert!(output.ends_with(&[0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0, 0xff]));
}

#[test]
fn test_empty_principals_and_credentials() {
    let input = kcm_payload(0, "", 1, &[], &[]);
    let output = ccache::encode(&KcmRecord::decode(&input).unwrap());
    let mut expected = CCACHE_HEADER.to_vec();
    expected.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(output, expected);
}

#[test]
fn test_memory_store_to_memory_sink() {
    let context = Context::with_profile(Profile::default()).unwrap();
    let store = SecretStore::resolve(&context, "MEMORY:transcode-memory").unwrap();
    let mut store = store.lock().unwrap();
    let secret = kcm_payload(0, "CORP.LOCAL", 1, &["user"], &[vec![0x01, 0x02]]);
    store
        .add_secret("cn=1000,cn=persistent,cn=kcm", &secret)
        .unwrap();

    let mut sink = MemorySink::default();
    let report = dump::dump(&context, &mut store, &mut sink).unwrap();
    assert!(report.is_success());
    assert_eq!(sink.ccaches.len(), 1);
    let (name, bytes) = &sink.ccaches[0];
    assert_eq!(name.as_str(), "user_0.ccache");
    assert_eq!(
        bytes,
        &ccache::encode(&KcmRecord::decode(&secret).unwrap())
    );
}

#[test]
fn test_ldif_store_to_files() {
    let user = kcm_payload(0, "CORP.LOCAL", 1, &["user"], &[vec![0x01, 0x02]]);
    let service = kcm_payload(0, "CORP.LOCAL", 3, &["HTTP", "web"], &[vec![0x03]]);
    let ldif = format!(
        "\
dn: cn=persistent,cn=kcm
cn: persistent

dn: cn=1000,cn=persistent,cn=kcm
type: container

dn: cn=aaa,cn=1000,cn=persistent,cn=kcm
secret:: {}

dn: cn=bbb,cn=1000,cn=persistent,cn=kcm
secret:: {}

dn: cn=ccc,cn=1000,cn=persistent,cn=kcm
secret:: {}
",
        STANDARD.encode(&user),
        STANDARD.encode(&user[..10]),
        STANDARD.encode(&service),
    );
    let dir = tempfile::tempdir().unwrap();
    let mut file = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
    file.write_all(ldif.as_bytes()).unwrap();
    file.flush().unwrap();

    let mut context = Context::with_profile(Profile::default()).unwrap();
    let output_dir = dir.path().join("caches");
    context
        .set_output_dir(&output_dir.to_string_lossy())
        .unwrap();
    let store = SecretStore::resolve(&context, &format!("LDIF:{}", file.path().display())).unwrap();
    let mut store = store.lock().unwrap();
    let mut sink = FileSink::from_context(&context);
    let report = dump::dump(&context, &mut store, &mut sink).unwrap();

    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        Error::find(&report.failures[0].error),
        Some(Error::KCM_TRUNCATED_INPUT)
    );

    let user_cache = fs::read(output_dir.join("user_0.ccache")).unwrap();
    assert_eq!(user_cache, ccache::encode(&KcmRecord::decode(&user).unwrap()));
    let service_cache = fs::read(output_dir.join("HTTP_2.ccache")).unwrap();
    assert!(service_cache.starts_with(&CCACHE_HEADER));
    assert!(service_cache.ends_with(&[0, 0, 0, 3, b'w', b'e', b'b', 0x03]));
}
