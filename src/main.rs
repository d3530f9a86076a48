use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tablon::board::Board;
use tablon::config::{self, BoardConfig};
use tablon::gesture::{GestureEngine, replay};
use tablon::imaging::RustBackend;
use tablon::output;
use tablon::pipeline::Pipeline;
use tablon::session::Session;
use tablon::storage::{FsObjectStore, SqliteMetadataStore};
use tablon::types::UploadFile;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoardPipeline = Pipeline<RustBackend, FsObjectStore, SqliteMetadataStore>;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "tablon")]
#[command(about = "Community bulletin board: browse, post, and take down image notices")]
#[command(long_about = "\
Community bulletin board: browse, post, and take down image notices

Images are grouped into a fixed set of categories. Uploads are downscaled to
a 1200px long edge, encoded as AVIF, stored under the storage root, and
indexed in a SQLite database.

Layout of the config directory:

  ./
  ├── config.toml        # Optional; overrides stock defaults
  ├── session.json       # Admin flag and theme, written on every change
  ├── tablon.db          # Metadata index
  └── media/             # Stored images, one directory per category
      └── campo/
          └── 4f1c….avif

Posting and removing images requires signing in with the configured
passcode ('tablon login <passcode>').

Set RUST_LOG (e.g. RUST_LOG=tablon=debug) to adjust log output on stderr.

Run 'tablon gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding config.toml; relative paths in it resolve from here
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show every category with its images, newest first
    List,
    /// Compress and post images to a category (in the order given)
    Upload {
        category: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Take an image down by its id
    Remove { category: String, id: i64 },
    /// Sign in as admin with the configured passcode
    Login { passcode: String },
    /// Drop admin rights
    Logout,
    /// Switch between light and dark theme
    Theme,
    /// Replay a JSON gesture script and print the transform after each step
    Gestures { script: PathBuf },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tablon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config_dir)?;
    let dir = cli.config_dir.as_path();

    match cli.command {
        Command::List => {
            let pipeline = open_pipeline(dir, &config)?;
            pipeline.fetch_board().await?;
            output::print_board(&pipeline.board().borrow());
        }
        Command::Upload { category, files } => {
            let session = open_session(dir, &config)?;
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                uploads.push(read_upload(path).await?);
            }

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_upload_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let pipeline = open_pipeline(dir, &config)?
                .with_access(session.access())
                .with_events(tx);
            let result = pipeline.upload_batch(&category, uploads).await;
            // Closes the channel so the printer drains and exits
            drop(pipeline);
            printer
                .join()
                .map_err(|_| "progress printer panicked".to_string())?;

            let report = result?;
            output::print_batch_report(&report);
            if !report.is_clean() {
                let failed = report.failed.len();
                return Err(format!("{failed} of {} uploads failed", files.len()).into());
            }
        }
        Command::Remove { category, id } => {
            let session = open_session(dir, &config)?;
            let pipeline = open_pipeline(dir, &config)?.with_access(session.access());
            pipeline.fetch_all(std::slice::from_ref(&category)).await?;

            let record = pipeline
                .board()
                .borrow()
                .images(&category)
                .and_then(|images| images.iter().find(|r| r.id == id).cloned())
                .ok_or_else(|| format!("No image #{id} in '{category}'"))?;
            pipeline.remove(&category, &record).await?;
            println!("Removed #{id} from {category}");
        }
        Command::Login { passcode } => {
            let mut session = open_session(dir, &config)?;
            session.sign_in(&passcode, &config.session.passcode)?;
            output::print_session(&session.prefs());
        }
        Command::Logout => {
            let mut session = open_session(dir, &config)?;
            session.sign_out()?;
            output::print_session(&session.prefs());
        }
        Command::Theme => {
            let mut session = open_session(dir, &config)?;
            session.toggle_theme()?;
            output::print_session(&session.prefs());
        }
        Command::Gestures { script } => {
            let json = tokio::fs::read_to_string(&script).await?;
            let steps = replay::parse_script(&json)?;
            let mut engine = GestureEngine::new(config.gestures.settings());
            let transforms = replay::replay(&mut engine, &steps);
            output::print_replay(&steps, &transforms);
        }
        // Printed before loading config
        Command::GenConfig => {}
    }

    Ok(())
}

fn open_session(dir: &Path, config: &BoardConfig) -> Result<Session, tablon::session::SessionError> {
    Session::load(dir.join(&config.session.prefs_path))
}

/// Wire the board to the on-disk stores. Starts read-only.
fn open_pipeline(
    dir: &Path,
    config: &BoardConfig,
) -> Result<BoardPipeline, tablon::storage::MetadataError> {
    let board = Board::new(config.board_categories()).with_notice_ttl(config.notices.ttl());
    let objects = FsObjectStore::new(
        dir.join(&config.storage.root),
        &config.storage.public_base_url,
    );
    let metadata = SqliteMetadataStore::open(&dir.join(&config.storage.database))?;
    Ok(Pipeline::new(RustBackend::new(), objects, metadata, Rc::new(RefCell::new(board)))
        .with_params(config.compression.params()))
}

/// Read a picked file, declaring its media type from the extension.
async fn read_upload(path: &Path) -> Result<UploadFile, std::io::Error> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content_type = image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    Ok(UploadFile::new(name, content_type, bytes))
}
