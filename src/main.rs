//! dataview command-line client.
//!
//! Plays the part of the browser page: folder tree, download progress,
//! large-file confirmation and the paged content view.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use dataview::config::{self, Settings};
use dataview::{
    format_size, ConfirmPrompt, EventSink, FetchTarget, FolderTreeModel, HttpSource, LoadState,
    PageView, StreamFetcher, ViewerEvent, ViewerSession,
};

#[derive(Parser)]
#[command(
    name = "dataview",
    version,
    about = "Stream and page through large remote data files"
)]
struct Cli {
    /// Base URL of the data API
    #[arg(long, env = "DATAVIEW_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Characters per page
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List folders and their files
    Tree,
    /// Load a file and print one page of it
    View {
        folder: String,
        file: String,
        /// Page to print (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Skip the large-file confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Load a file and page through it interactively
    Browse {
        folder: String,
        file: String,
        /// Skip the large-file confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = config::load_settings().await;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    if let Some(page_size) = cli.page_size.filter(|size| *size > 0) {
        settings.page_size = page_size;
    }

    let source =
        HttpSource::with_user_agent(&settings.base_url, settings.timeout(), &settings.user_agent)?;

    match cli.command {
        Command::Tree => print_tree(&source, &settings).await,
        Command::View {
            folder,
            file,
            page,
            yes,
        } => view(source, &settings, FetchTarget::new(folder, file), page, yes).await,
        Command::Browse { folder, file, yes } => {
            browse(source, &settings, FetchTarget::new(folder, file), yes).await
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "dataview=debug" } else { "dataview=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn print_tree(source: &HttpSource, settings: &Settings) -> Result<()> {
    let tree = FolderTreeModel::load(source, &settings.folders).await;

    println!("{}/", style(tree.root_name()).bold());
    for folder in tree.folders() {
        println!("  {}/", style(&folder.name).bold());
        for file in &folder.files {
            let size = file.size.map(format_size).unwrap_or_default();
            println!("    {:<60} {:>10}", file.name, style(size).dim());
        }
    }
    Ok(())
}

type TerminalSession = ViewerSession<HttpSource, TerminalSink>;

fn open_session(source: HttpSource, settings: &Settings, assume_yes: bool) -> TerminalSession {
    let bar = ProgressBar::new_spinner();
    bar.set_style(spinner_style());

    let prompt = TerminalPrompt {
        bar: bar.clone(),
        assume_yes,
    };
    let fetcher =
        StreamFetcher::new(source, Arc::new(prompt)).with_max_safe_size(settings.max_safe_size);
    ViewerSession::new(fetcher, TerminalSink { bar }, settings.page_size)
}

async fn load(session: &mut TerminalSession, target: FetchTarget) -> Result<Option<PageView>> {
    let label = target.to_string();
    match session.load(target).await {
        Some(page) => Ok(Some(page)),
        None if session.state() == LoadState::Failed => bail!("Could not load {}", label),
        None => Ok(None),
    }
}

async fn view(
    source: HttpSource,
    settings: &Settings,
    target: FetchTarget,
    page: usize,
    assume_yes: bool,
) -> Result<()> {
    let mut session = open_session(source, settings, assume_yes);
    let Some(mut current) = load(&mut session, target).await? else {
        return Ok(());
    };

    while current.page_number < page && !current.is_last_page {
        match session.next_page() {
            Some(next) => current = next,
            None => break,
        }
    }
    if current.page_number < page {
        warn!(
            "Requested page {} but the file only has {}",
            page, current.total_pages
        );
    }

    print_page(&Term::stdout(), &current)?;
    Ok(())
}

async fn browse(
    source: HttpSource,
    settings: &Settings,
    target: FetchTarget,
    assume_yes: bool,
) -> Result<()> {
    let mut session = open_session(source, settings, assume_yes);
    let Some(mut current) = load(&mut session, target).await? else {
        return Ok(());
    };

    let term = Term::stdout();
    loop {
        term.clear_screen()?;
        print_page(&term, &current)?;
        term.write_line(&format!(
            "{}",
            style("[n]ext  [p]revious  [q]uit").dim()
        ))?;

        let next = match term.read_char()? {
            'n' | ' ' => session.next_page(),
            'p' | 'b' => session.previous_page(),
            'q' | '\u{1b}' => break,
            _ => continue,
        };
        if let Some(page) = next {
            current = page;
        }
    }
    Ok(())
}

fn print_page(term: &Term, page: &PageView) -> std::io::Result<()> {
    if page.show_controls() {
        let previous = if page.is_first_page {
            style("Previous").dim()
        } else {
            style("Previous").bold()
        };
        let next = if page.is_last_page {
            style("Next").dim()
        } else {
            style("Next").bold()
        };
        term.write_line(&format!("{}  {}  {}", previous, page.label(), next))?;
    }
    term.write_line(&page.text)
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{bar:40.cyan/blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Renders session events on stderr.
struct TerminalSink {
    bar: ProgressBar,
}

impl EventSink for TerminalSink {
    fn emit(&self, event: ViewerEvent) {
        match event {
            ViewerEvent::StateChanged { state } => match state {
                LoadState::Probing => {
                    self.bar.enable_steady_tick(Duration::from_millis(100));
                    self.bar.set_message("Checking file size...");
                }
                LoadState::AwaitingConfirmation => self.bar.set_message("Waiting for confirmation"),
                LoadState::Streaming => self.bar.set_message("Downloading..."),
                LoadState::Decoding => self.bar.set_message("Decoding..."),
                LoadState::Idle | LoadState::Ready | LoadState::Failed => {
                    self.bar.finish_and_clear()
                }
            },
            ViewerEvent::Progress { update, message } => {
                if let Some(total) = update.total_bytes {
                    if self.bar.length() != Some(total) {
                        self.bar.set_style(bar_style());
                        self.bar.set_length(total);
                    }
                    self.bar.set_position(update.received_bytes.min(total));
                }
                self.bar.set_message(message);
            }
            ViewerEvent::LoadFailed { message, .. } => {
                self.bar
                    .suspend(|| eprintln!("{}", style(message).red()));
            }
            ViewerEvent::LoadComplete { .. } | ViewerEvent::PageChanged { .. } => {}
        }
    }
}

/// Large-file confirmation on the terminal.
struct TerminalPrompt {
    bar: ProgressBar,
    assume_yes: bool,
}

impl ConfirmPrompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        self.bar.suspend(|| {
            let term = Term::stderr();
            if term.write_str(&format!("{} [y/N] ", message)).is_err() {
                return false;
            }
            match term.read_line() {
                Ok(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
                Err(_) => false,
            }
        })
    }
}
