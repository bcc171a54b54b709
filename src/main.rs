use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use folio_search::{
    classify, load_config, scan_channel, ControllerSettings, GoogleBooksService, LookupError,
    ScanEvent, ScanSender, SearchController, SearchService, SearchState, SortOption,
};

const HELP: &str = "\
commands:
  <text>                          search for title, author or ISBN
  :sort relevance|newest|popularity
  :translations on|off
  :scan <code>                    look up a barcode through the scanner channel
  :scanfail <code> <reason>       simulate a failed scan
  :retry                          retry the last query
  :clear                          back to idle
  :state                          print the current state
  :help | :quit";

#[derive(Debug, PartialEq)]
enum Command {
    Search(String),
    Sort(SortOption),
    Translations(bool),
    Scan(String),
    ScanFail { code: String, reason: String },
    Retry,
    Clear,
    State,
    Help,
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Search(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "sort" => match arg.parse::<SortOption>() {
            Ok(sort) => Command::Sort(sort),
            Err(e) => Command::Invalid(e.to_string()),
        },
        "translations" => match arg {
            "on" | "yes" | "true" => Command::Translations(true),
            "off" | "no" | "false" => Command::Translations(false),
            other => Command::Invalid(format!("expected on|off, got '{}'", other)),
        },
        "scan" if !arg.is_empty() => Command::Scan(arg.to_string()),
        "scanfail" => match arg.split_once(char::is_whitespace) {
            Some((code, reason)) => Command::ScanFail {
                code: code.to_string(),
                reason: reason.trim().to_string(),
            },
            None => Command::Invalid("usage: :scanfail <code> <reason>".to_string()),
        },
        "retry" => Command::Retry,
        "clear" => Command::Clear,
        "state" => Command::State,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command ':{}'", other)),
    }
}

fn render_state(state: &SearchState) -> String {
    match state {
        SearchState::Idle => "(idle)".to_string(),
        SearchState::Searching { query } => format!("searching for \"{}\"...", query),
        SearchState::Results { items } if items.is_empty() => "no results".to_string(),
        SearchState::Results { items } => {
            let mut out = format!("{} result(s)", items.len());
            for (i, book) in items.iter().take(10).enumerate() {
                let year = book
                    .published_year()
                    .map(|y| format!(" ({})", y))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "\n  {:>2}. {} by {}{}",
                    i + 1,
                    book.title,
                    book.author_line(),
                    year
                ));
            }
            out
        }
        SearchState::Failed { message, .. } => format!("! {}", message),
    }
}

/// What a failed scan lookup tells the user. The raw error only goes to the log.
fn scan_failure_reason(err: &LookupError) -> &'static str {
    classify(err).user_message()
}

/// Stand-in for a camera scanner: resolve the code and report through the channel.
fn simulate_scan(service: Arc<dyn SearchService>, scanner: ScanSender, code: String) {
    tokio::spawn(async move {
        let event = match service
            .search(&code, SortOption::Relevance, true)
            .await
        {
            Ok(items) => ScanEvent::success(code, items),
            Err(e) => {
                warn!(code = %code, error = %e, "scan lookup failed");
                ScanEvent::failure(code, scan_failure_reason(&e))
            }
        };
        if let Err(e) = scanner.send(event).await {
            warn!("{}", e);
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the interactive output stays readable.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,folio_search=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config();

    let http_client = reqwest::Client::builder()
        .timeout(config.resolve_http_timeout())
        .connect_timeout(config.resolve_connect_timeout())
        .build()
        .context("building http client")?;

    let service: Arc<dyn SearchService> = Arc::new(
        GoogleBooksService::from_config(http_client, &config).context("configuring lookup")?,
    );
    let settings = ControllerSettings::from(&config);
    info!(
        retry_delay_ms = settings.retry_delay.as_millis() as u64,
        requery_debounce_ms = settings.requery_debounce.as_millis() as u64,
        "starting folio-search"
    );

    let controller = SearchController::with_settings(Arc::clone(&service), settings);
    controller.subscribe(Box::new(|state: &SearchState| {
        println!("{}", render_state(state));
    }));

    let (scanner, scan_rx) = scan_channel();
    let bridge = controller.attach_scanner(scan_rx);

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Search(text) => {
                if controller.search(&text).is_none() {
                    println!("(empty query ignored)");
                }
            }
            Command::Sort(sort) => {
                if controller.set_sort_by(sort).is_skipped() {
                    println!("sort: {}", sort);
                }
            }
            Command::Translations(on) => {
                if controller.set_include_translations(on).is_skipped() {
                    println!("translations: {}", if on { "on" } else { "off" });
                }
            }
            Command::Scan(code) => simulate_scan(Arc::clone(&service), scanner.clone(), code),
            Command::ScanFail { code, reason } => {
                if let Err(e) = scanner.send(ScanEvent::failure(code, reason)).await {
                    warn!("{}", e);
                }
            }
            Command::Retry => {
                let _ = controller.retry();
            }
            Command::Clear => controller.clear(),
            Command::State => {
                let params = controller.params();
                println!(
                    "{} | query \"{}\" | sort {} | translations {}",
                    render_state(&controller.state()),
                    controller.query(),
                    params.sort_by,
                    if params.include_translations { "on" } else { "off" }
                );
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Invalid(msg) => println!("? {}", msg),
        }
    }

    drop(scanner);
    bridge.await.context("scan bridge")?;
    Ok(())
}
