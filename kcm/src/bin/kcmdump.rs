use clap::Parser;
use kcm::{dump, prefix_progname_to_error_if_needed, Context, FileSink, SecretStore};
use once_cell::sync::Lazy;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const PROGNAME: &str = "kcmdump";

static ARGS: Lazy<Args> = Lazy::new(Args::parse);

#[derive(Parser)]
#[command(name = PROGNAME, version)]
struct Args {
    /// writes the credentials caches into this directory (Default is current directory)
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<String>,
    /// only walks containers under this DN (Default is cn=kcm)
    #[arg(short = 'b', long = "base-dn")]
    base_dn: Option<String>,
    /// refuses to overwrite existing credentials caches
    #[arg(short = 'n', long = "no-clobber", default_value_t = false)]
    no_clobber: bool,
    /// lists the caches that would be written without writing them
    #[arg(short = 'l', long = "list", default_value_t = false)]
    list: bool,
    /// log level for diagnostics on stderr
    #[arg(long = "log-level", default_value = "warn")]
    log_level: String,

    /// secrets database, as TYPE:residual or a path
    database: String,
}

fn main() -> ExitCode {
    init_tracing();
    prefix_progname_to_error_if_needed(PROGNAME, run())
}

fn init_tracing() {
    let log_level: tracing::Level = ARGS.log_level.parse().unwrap_or(tracing::Level::WARN);
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    tracing_subscriber::registry().with(stderr_layer).init();
}

fn run() -> anyhow::Result<()> {
    let mut context =
        Context::init().map_err(|e| anyhow::anyhow!("{} while initializing kcmdump", e))?;
    if let Some(base_dn) = &ARGS.base_dn {
        context.set_base_dn(base_dn);
    }
    if let Some(output_dir) = &ARGS.output_dir {
        context.set_output_dir(output_dir)?;
    }
    if ARGS.no_clobber {
        context.no_clobber = true;
    }

    let store = SecretStore::resolve(&context, &ARGS.database)
        .map_err(|e| anyhow::anyhow!("{:#} while resolving {}", e, ARGS.database))?;
    let mut store = store.lock().map_err(|e| anyhow::anyhow!("{}", e))?;

    let report = if ARGS.list {
        let report = dump::list(&context, &mut store)?;
        println!("{:30} {}", "Principal name", "Cache name");
        println!("{:30} {}", "--------------", "----------");
        for entry in &report.entries {
            println!("{:30} {}", entry.principal, entry.name);
        }
        report
    } else {
        let mut sink = FileSink::from_context(&context);
        dump::dump(&context, &mut store, &mut sink)?
    };

    if report.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} of {} secrets could not be dumped",
            report.failures.len(),
            report.failures.len() + report.entries.len()
        ))
    }
}
