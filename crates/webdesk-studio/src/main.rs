//! webdesk studio: renders a scheme window headlessly and prints the tree.
//!
//! Every `gui-file-view` in the rendered window is pointed at the given
//! directory, mounted as `local:///`, so listings come from disk.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use webdesk_engine::logging::{init_logging, LoggingConfig};
use webdesk_ui::event::{EventDetail, GuiEvent};
use webdesk_ui::fileview;
use webdesk_ui::prelude::*;

mod local;

use local::{FileLoader, LocalVfs, MOUNTPOINT};

#[derive(Parser)]
#[command(name = "webdesk-studio")]
#[command(about = "Render a webdesk scheme without a browser", long_about = None)]
struct Cli {
    /// Scheme file to load
    #[arg(default_value = "crates/webdesk-studio/ui/main.html")]
    scheme: PathBuf,

    /// Template to render (`data-id` of an application-window)
    #[arg(short, long, default_value = "MainWindow")]
    window: String,

    /// Directory mounted as local:/// for file views
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Path file views open, relative to the mount
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Logger filter, e.g. "debug" or "webdesk_ui::scheme=trace"
    #[arg(long)]
    log: Option<String>,

    /// Shorthand for debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut logging = if cli.verbose { LoggingConfig::verbose() } else { LoggingConfig::default() };
    logging.env_filter = cli.log.clone();
    init_logging(logging);

    let root = tokio::fs::canonicalize(&cli.root)
        .await
        .with_context(|| format!("cannot mount {}", cli.root.display()))?;
    let services = Services::new()
        .with_vfs(Rc::new(LocalVfs::new(&root)))
        .with_loader(Rc::new(FileLoader));

    let mut scheme = Scheme::new(cli.scheme.to_string_lossy());
    scheme
        .load(&FileLoader)
        .await
        .with_context(|| format!("failed to load scheme {}", cli.scheme.display()))?;

    let mut gui = Gui::new(ElementRegistry::with_defaults(), services);
    let mut window = Window::new(1, cli.window.clone());
    let content = scheme
        .render(&mut gui, &mut window, &cli.window, None, None, &ParseArgs::default())
        .with_context(|| format!("failed to render {}", cli.window))?;
    log::info!("rendered {} ({:?})", cli.window, window.properties);

    let start = format!("{}{}", MOUNTPOINT, cli.path.trim_start_matches('/'));
    let views = gui.document.query_selector_all(content, "gui-file-view");
    for &view in &views {
        gui.listen(view, "chdir", Rc::new(report_chdir));
        gui.instance(view).call(&mut gui, ElementCall::Chdir { path: Some(start.clone()) })?;
    }
    if views.is_empty() {
        log::info!("no file views in {}", cli.window);
    }

    let gui = gui.into_shared();
    fileview::drive_tasks(&gui).await;

    let gui = gui.borrow();
    println!("{}", gui.document.to_html(content));
    Ok(())
}

fn report_chdir(_gui: &mut Gui, ev: &GuiEvent) {
    if let EventDetail::Chdir { path, result } = &ev.detail {
        match result {
            Ok(s) => log::info!("{}: {} dirs, {} files, {} hidden, {} bytes", path, s.directories, s.files, s.hidden, s.size),
            Err(e) => log::error!("{}: {}", path, e),
        }
    }
}
