pub mod ccache;
mod context;
mod cursor;
pub mod dump;
pub mod error;
mod principal;
mod record;
mod sink;
pub mod store;

pub use self::{
    ccache::CCACHE_HEADER,
    context::{Conf, Context, Profile},
    cursor::Cursor,
    dump::{DumpEntry, DumpFailure, DumpReport},
    error::{Error, ErrorCode},
    principal::{NameType, Principal},
    record::{KcmCredential, KcmRecord, UUID_SIZE},
    sink::{CcacheName, FileSink, MemorySink, Sink},
    store::{Secret, SecretLocator, SecretStore},
};
use std::process::ExitCode;

pub fn prefix_progname_to_error_if_needed(progname: &str, result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {:#}", progname, err);
            ExitCode::FAILURE
        }
    }
}
