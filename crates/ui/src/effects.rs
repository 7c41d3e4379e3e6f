//! Runs commands from the application layer on a tokio runtime.
//!
//! The terminal loop stays synchronous; finished requests come back over a
//! channel that the loop drains between input polls.

use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::Context as _;
use bookfinder_api::{ApiClient, Cover};
use bookfinder_application::{ApiEvent, Command};
use tokio::runtime::Runtime;

#[derive(Debug)]
pub(crate) enum Incoming {
    Api(ApiEvent),
    Cover { url: String, cover: Cover },
}

pub(crate) struct Effects {
    runtime: Runtime,
    api: ApiClient,
    tx: Sender<Incoming>,
    rx: Receiver<Incoming>,
}

impl Effects {
    pub fn new(api: ApiClient) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("bookfinder-net")
            .enable_all()
            .build()
            .context("start network runtime")?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            runtime,
            api,
            tx,
            rx,
        })
    }

    pub fn dispatch(&self, command: Command) {
        log::debug!("dispatch {command:?}");
        match command {
            Command::OpenUrl(url) => {
                if let Err(err) = open_url(&url) {
                    log::warn!("open {url}: {err:#}");
                }
            }
            Command::LoadCatalog => {
                self.spawn(|api| async move { ApiEvent::CatalogLoaded(api.catalog().await) });
            }
            Command::LoadPopular => {
                self.spawn(|api| async move { ApiEvent::PopularLoaded(api.popular().await) });
            }
            Command::FetchSuggestions { seq, query } => {
                self.spawn(move |api| async move {
                    ApiEvent::SuggestionsLoaded {
                        seq,
                        result: api.search(&query).await,
                    }
                });
            }
            Command::FetchRecommendations { seq, title } => {
                self.spawn(move |api| async move {
                    ApiEvent::RecommendationsLoaded {
                        seq,
                        result: api.recommend(&title).await,
                    }
                });
            }
            Command::FetchDetails { seq, title } => {
                self.spawn(move |api| async move {
                    ApiEvent::DetailsLoaded {
                        seq,
                        result: api.book_details(&title).await,
                    }
                });
            }
        }
    }

    fn spawn<F, Fut>(&self, job: F)
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = ApiEvent> + Send + 'static,
    {
        let fut = job(self.api.clone());
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            // The receiver only disappears when the UI is shutting down.
            let _ = tx.send(Incoming::Api(fut.await));
        });
    }

    pub fn fetch_cover(&self, url: String) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let cover = api.cover(&url).await;
            let _ = tx.send(Incoming::Cover { url, cover });
        });
    }

    pub fn try_recv(&self) -> Option<Incoming> {
        self.rx.try_recv().ok()
    }
}

fn open_url(url: &str) -> anyhow::Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = std::process::Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        std::process::Command::new("xdg-open")
    };
    cmd.arg(url)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("spawn browser")?;
    Ok(())
}
