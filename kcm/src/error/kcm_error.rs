use super::{error, Error};

impl Error {
    error!(KCM_TRUNCATED_INPUT, 0x4b43_4d01, "KCM record is truncated");
    error!(
        KCM_INVALID_ENCODING,
        0x4b43_4d02, "KCM record contains a string that is not valid UTF-8"
    );
    error!(KCM_IO_FAILURE, 0x4b43_4d03, "Credentials cache I/O operation failed");
    error!(KCM_NO_PRINCIPAL, 0x4b43_4d04, "KCM record has no principal name");
    error!(KCM_STORE_UNKNOWN_TYPE, 0x4b43_4d05, "Unknown secret store type");
    error!(KCM_STORE_FORMAT, 0x4b43_4d06, "Bad format in secret store");
    error!(KCM_STORE_READONLY, 0x4b43_4d07, "Secret store is read-only");
    error!(KCM_OUTPUT_EXISTS, 0x4b43_4d08, "Credentials cache file already exists");
}
