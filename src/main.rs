use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use webdriver_marker::{ChromeDriver, ConnectionMode, Marker, PreferenceOverrides, Selector};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page to open before highlighting
    #[arg(short, long)]
    url: String,

    /// Element to highlight as strategy=value (css, id, name, xpath, className, tagName, linkText, partialLinkText, js)
    #[arg(short, long = "select", required = true)]
    selectors: Vec<Selector>,

    /// JSON file with instance preferences, e.g. {"background": "green", "showFor": 5000}
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Background colour for this run
    #[arg(long)]
    background: Option<String>,

    /// Border shorthand for this run
    #[arg(long)]
    border: Option<String>,

    /// Milliseconds a timed highlight stays visible
    #[arg(long, allow_negative_numbers = true)]
    show_for: Option<i64>,

    /// Let the page remove each highlight after --show-for
    #[arg(long)]
    timed: bool,

    /// Milliseconds to wait before removing highlights and exiting
    #[arg(long, default_value_t = 2000)]
    hold: u64,

    /// Remove persistent highlights before exiting
    #[arg(long)]
    remove: bool,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Pass --no-sandbox to Chrome
    #[arg(long)]
    no_sandbox: bool,

    /// Chrome executable to launch
    #[arg(long)]
    chrome_path: Option<String>,

    /// Attach to a Chrome started with --remote-debugging-port instead of launching one
    #[arg(long, conflicts_with_all = ["chrome_path", "headless", "no_sandbox"])]
    debug_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let instance = match &args.prefs {
        Some(path) => PreferenceOverrides::from_file(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => PreferenceOverrides::default(),
    };

    let local = PreferenceOverrides {
        background: args.background.clone(),
        border: args.border.clone(),
        show_for: args.show_for,
    };
    let local = (!local.is_empty()).then_some(local);

    let mode = match args.debug_port {
        Some(port) => ConnectionMode::DebugPort(port),
        None => ConnectionMode::Sandboxed {
            chrome_path: args.chrome_path.clone(),
            no_sandbox: args.no_sandbox,
            headless: args.headless,
        },
    };

    let driver = ChromeDriver::new(mode).await?;
    driver.navigate(&args.url).await?;
    log::info!("Opened {}", driver.current_url().await?);

    let result = run(&driver, &args, instance, local.as_ref()).await;

    if args.debug_port.is_none() {
        driver.close().await?;
    }

    result
}

async fn run(
    driver: &ChromeDriver,
    args: &Args,
    instance: PreferenceOverrides,
    local: Option<&PreferenceOverrides>,
) -> anyhow::Result<()> {
    let mut marker = Marker::with_preferences(driver, instance);

    if args.timed {
        for selector in &args.selectors {
            marker.highlight_element_for(selector, local).await?;
        }
    } else {
        marker.highlight_elements(&args.selectors, local).await?;
    }

    tokio::time::sleep(Duration::from_millis(args.hold)).await;

    if args.remove && !args.timed {
        marker.remove_highlights(&args.selectors).await?;
        // Restores land on the page's next tick
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Ok(())
}
