//! asic: locate, download and reshape clearinghouse settlement files.
//! Results go to stdout as JSON lines; diagnostics go to stderr through tracing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use asic::download::{download_files, preprocess_downloads, LocalLayout};
use asic::metadata::{classify, probe};
use asic::reshape::recipe_for;
use asic::transport::{ftp, FtpConnector, MirrorConnector, ReconnectingSession, Transport};
use asic::{AsicConfig, AsicError, ConfigSources, ListRequest, RemoteCatalog, YearMonth};

/// Settlement-file identity tool.
///
/// ## Examples
///
///   asic list --month 2023-10 --file adem --version tx2
///   asic list --month 2023-10 --file aenc --agent enbc --latest
///   asic download ./data --month 202310 --file trsd --preprocess
///   asic inspect /PUBLICOK/SIC/COMERCIA/2023-10/adem1001.Tx2
///
/// `list` and `download` read ASIC_FTP_HOST, ASIC_FTP_USER and ASIC_FTP_PASSWORD,
/// or a local copy of the server tree given by --mirror-root.
#[derive(Parser, Debug)]
#[command(name = "asic", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Local tree laid out like the remote server; used instead of FTP when set
    #[arg(long, env = "ASIC_MIRROR_ROOT", global = true)]
    mirror_root: Option<PathBuf>,

    /// Clearinghouse FTP host (explicit TLS)
    #[arg(long, env = "ASIC_FTP_HOST", global = true)]
    ftp_host: Option<String>,

    #[arg(long, env = "ASIC_FTP_PORT", default_value_t = ftp::DEFAULT_PORT, global = true)]
    ftp_port: u16,

    #[arg(long, env = "ASIC_FTP_USER", global = true)]
    ftp_user: Option<String>,

    #[arg(long, env = "ASIC_FTP_PASSWORD", hide_env_values = true, global = true)]
    ftp_password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Registered file kinds with their templates
    Kinds,
    /// Registered extensions and their normalized versions
    Extensions,
    /// Classify remote paths without listing anything
    Inspect {
        paths: Vec<String>,
        /// Only try this kind
        #[arg(long)]
        kind: Option<String>,
    },
    /// List matching files for the requested months
    List(Selection),
    /// Retrieve matching files into DESTINATION
    Download {
        destination: PathBuf,
        #[command(flatten)]
        selection: Selection,
        /// Also write a reshaped CSV per file
        #[arg(long)]
        preprocess: bool,
        #[arg(long, value_enum, default_value = "mirror")]
        layout: Layout,
    },
}

#[derive(Args, Debug)]
struct Selection {
    /// Month to query, YYYY-MM or YYYYMM (repeatable)
    #[arg(long = "month", short = 'm', required = true)]
    months: Vec<String>,
    /// File kind (repeatable; default all kinds)
    #[arg(long = "file", short = 'f')]
    kinds: Vec<String>,
    /// Extension such as tx2 or .txf (repeatable; default any)
    #[arg(long = "version")]
    extensions: Vec<String>,
    /// Agent code for agent-restricted kinds
    #[arg(long, env = "ASIC_AGENT")]
    agent: Option<String>,
    /// Keep only the latest revision of each file
    #[arg(long)]
    latest: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Layout {
    Mirror,
    ByVersion,
}

impl From<Layout> for LocalLayout {
    fn from(l: Layout) -> Self {
        match l { Layout::Mirror => LocalLayout::Mirror, Layout::ByVersion => LocalLayout::ByVersion }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose { 0 => "warn", 1 => "info", _ => "debug" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        let code = e.downcast_ref::<AsicError>().map(|a| a.exit_code()).unwrap_or(1);
        std::process::exit(code);
    }
}

fn request(cfg: &AsicConfig, sel: &Selection) -> anyhow::Result<ListRequest> {
    let months = sel.months.iter().map(|m| YearMonth::parse(m)).collect::<Result<Vec<_>, _>>()?;
    Ok(ListRequest {
        months,
        kinds: cfg.kinds.resolve(&sel.kinds)?,
        extensions: sel.extensions.clone(),
        agent: sel.agent.clone(),
        latest: sel.latest,
    })
}

struct Remote {
    mirror_root: Option<PathBuf>,
    ftp_host: Option<String>,
    ftp_port: u16,
    ftp_user: Option<String>,
    ftp_password: Option<String>,
}

fn catalog(remote: Remote) -> anyhow::Result<RemoteCatalog<Box<dyn Transport>>> {
    let transport: Box<dyn Transport> = match (remote.mirror_root, remote.ftp_host) {
        (Some(root), _) => Box::new(ReconnectingSession::new(MirrorConnector::new(root))),
        (None, Some(host)) => {
            let user = remote.ftp_user.ok_or_else(|| AsicError::invalid("ftp user", "", "set --ftp-user or ASIC_FTP_USER"))?;
            let secret = remote.ftp_password.ok_or_else(|| AsicError::invalid("ftp password", "", "set ASIC_FTP_PASSWORD"))?;
            Box::new(ReconnectingSession::new(FtpConnector::new(host, remote.ftp_port, user, secret)))
        }
        (None, None) => return Err(AsicError::invalid("remote", "", "set ASIC_FTP_HOST or --mirror-root").into()),
    };
    Ok(RemoteCatalog::new(transport))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = AsicConfig::load(&ConfigSources::from_env())?;
    let remote = Remote {
        mirror_root: cli.mirror_root,
        ftp_host: cli.ftp_host,
        ftp_port: cli.ftp_port,
        ftp_user: cli.ftp_user,
        ftp_password: cli.ftp_password,
    };
    match cli.command {
        Command::Kinds => {
            for e in cfg.kinds.entries() {
                let d = &e.descriptor;
                println!("{}", serde_json::json!({
                    "kind": d.kind(),
                    "visibility": d.visibility(),
                    "location_template": d.location_template().as_str(),
                    "name_template": d.name_template().as_str(),
                    "description": d.description(),
                    "reshape": recipe_for(d.kind()).is_some(),
                }));
            }
        }
        Command::Extensions => {
            for e in cfg.extensions.entries() {
                println!("{}", serde_json::to_string(e)?);
            }
        }
        Command::Inspect { paths, kind } => {
            for p in &paths {
                let found = match &kind {
                    Some(k) => {
                        let entry = cfg.kinds.entry_for(k).ok_or_else(|| AsicError::UnknownKind { kind: k.to_ascii_lowercase() })?;
                        classify(&[entry], &cfg.extensions, p)?
                    }
                    None => probe(&cfg.kinds, &cfg.extensions, p)?,
                };
                match found {
                    Some(f) => println!("{}", serde_json::to_string(&f)?),
                    None => info!(target: "asic", "{} matches no registered kind", p),
                }
            }
        }
        Command::List(sel) => {
            let req = request(&cfg, &sel)?;
            let mut cat = catalog(remote)?;
            for f in cat.list_supported_files(&cfg, &req)? {
                println!("{}", serde_json::to_string(&f)?);
            }
        }
        Command::Download { destination, selection, preprocess, layout } => {
            let req = request(&cfg, &selection)?;
            let mut cat = catalog(remote)?;
            let files = cat.list_supported_files(&cfg, &req)?;
            let downloaded = download_files(cat.transport_mut(), &files, &destination, layout.into())?;
            for (f, local) in &downloaded {
                println!("{}", serde_json::json!({ "remote_path": f.remote_path, "local_path": local }));
            }
            if preprocess {
                let written = preprocess_downloads(&downloaded, &destination)?;
                info!(target: "asic", "wrote {} reshaped tables", written.len());
            }
            info!(target: "asic", "downloaded {} files into {}", downloaded.len(), destination.display());
        }
    }
    Ok(())
}
