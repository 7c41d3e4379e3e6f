use std::ffi::OsString;
use std::fs;
use std::path::Path;

use anyhow::Context as _;
use bookfinder_api::ApiClient;
use bookfinder_application::AppContext;
use bookfinder_core::{MemoryStore, PreferenceStore, Settings};
use bookfinder_storage::Storage;
use bookfinder_ui::Ui;
use directories::ProjectDirs;

const USAGE: &str = "\
usage: bookfinder [options]

  --api-url URL           recommendation server (env BOOKFINDER_API_URL)
  --history-limit N       search history entries to keep (1-500, default 50)
  --suggestion-limit N    suggestions shown under the search field (0 = all)
  --no-confirm            clear history without asking
  --ephemeral             keep preferences in memory only
  --log-level LEVEL       off, error, warn, info, debug or trace
  -h, --help              show this help";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let env_api_url = std::env::var("BOOKFINDER_API_URL").ok();
    let Some(mut settings) = parse_args(std::env::args_os().skip(1), env_api_url)? else {
        println!("{USAGE}");
        return Ok(());
    };
    settings.normalize();

    let project_dirs =
        ProjectDirs::from("dev", "bookfinder", "bookfinder").context("resolve project dirs")?;
    let data_dir = project_dirs.data_dir();
    fs::create_dir_all(data_dir)
        .with_context(|| format!("create data dir {}", data_dir.display()))?;

    init_logging(&data_dir.join("bookfinder.log"), &settings.log_level)?;
    log::info!(
        "starting bookfinder against {} (history {}, ephemeral {})",
        settings.api_url,
        settings.history_limit,
        settings.ephemeral
    );

    let store: Box<dyn PreferenceStore> = if settings.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(Storage::open(&data_dir.join("bookfinder.db"))?)
    };

    let api = ApiClient::new(&settings.api_url)
        .with_context(|| format!("invalid api url {}", settings.api_url))?;
    let ctx = AppContext::new(settings, store);

    let mut ui = Ui::new(ctx, api)?;
    ui.run()?;
    log::info!("bye");
    Ok(())
}

fn init_logging(path: &Path, level: &str) -> anyhow::Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("init logger")
}

/// `Ok(None)` means help was requested.
fn parse_args(
    args: impl IntoIterator<Item = OsString>,
    env_api_url: Option<String>,
) -> anyhow::Result<Option<Settings>> {
    let mut settings = Settings::default();
    if let Some(url) = env_api_url.filter(|url| !url.trim().is_empty()) {
        settings.api_url = url;
    }

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy();
        match arg_str.as_ref() {
            "-h" | "--help" => return Ok(None),
            "--api-url" => {
                let value = args.next().context("missing value for --api-url")?;
                settings.api_url = value.to_string_lossy().to_string();
            }
            "--history-limit" => {
                let value = args.next().context("missing value for --history-limit")?;
                let value_str = value.to_string_lossy();
                settings.history_limit = value_str
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("invalid --history-limit value: {value_str}"))?;
            }
            "--suggestion-limit" => {
                let value = args
                    .next()
                    .context("missing value for --suggestion-limit")?;
                let value_str = value.to_string_lossy();
                let limit = value_str
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("invalid --suggestion-limit value: {value_str}"))?;
                settings.suggestion_limit = Some(limit);
            }
            "--no-confirm" => settings.confirm_clear = false,
            "--ephemeral" => settings.ephemeral = true,
            "--log-level" => {
                let value = args.next().context("missing value for --log-level")?;
                settings.log_level = value.to_string_lossy().to_string();
            }
            other => anyhow::bail!("unknown arg: {other}\n\n{USAGE}"),
        }
    }

    Ok(Some(settings))
}
