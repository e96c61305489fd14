use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use atty::Stream;
use clap::{Parser, Subcommand};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;
use vocabar_rs::config::DOCUMENT_URL;
use vocabar_rs::{
    Activation, CloseTrigger, DocumentSource, HostPage, Key, Page, PopupCard, Reader, TokenRef,
    VocabDocument, mount, render_terminal,
};

#[derive(Parser, Debug)]
#[command(
    name = "vocabar",
    about = "Read Arabic texts with clickable French glosses",
    version
)]
pub struct Cli {
    /// Vocabulary document: a file path or an http(s) URL.
    #[arg(long, global = true, default_value = DOCUMENT_URL)]
    source: DocumentSource,

    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the texts contained in the document.
    Texts,
    /// Resolve words the same way a click inside a text does.
    Lookup {
        /// Text whose aliases and local dictionary apply.
        #[arg(short, long)]
        text: String,
        /// One or more words to look up.
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Export a text as a standalone HTML page.
    Render {
        #[arg(short, long)]
        text: String,
        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Read a text in the terminal and open words by their P.T reference.
    Read {
        #[arg(short, long)]
        text: String,
        /// Accept `h P.T` hover activations.
        #[arg(long)]
        hover: bool,
    },
    /// Serve the reader over HTTP.
    #[cfg(feature = "web")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(match cli.command {
        #[cfg(feature = "web")]
        Command::Serve { .. } => "info",
        _ => "warn",
    });
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    #[cfg(feature = "web")]
    if let Command::Serve { addr } = cli.command {
        let config = vocabar_rs::web::WebConfig {
            addr,
            source: cli.source,
        };
        return runtime
            .block_on(vocabar_rs::web::serve(config))
            .map_err(Into::into);
    }

    let document = runtime
        .block_on(cli.source.load())
        .map_err(|err| format!("failed to load {}: {err}", cli.source))?;
    match cli.command {
        Command::Texts => handle_texts(&document, cli.json),
        Command::Lookup { text, words } => handle_lookup(&document, text, words, cli.json),
        Command::Render { text, out } => handle_render(&document, text, out),
        Command::Read { text, hover } => handle_read(&document, text, hover, cli.json),
        #[cfg(feature = "web")]
        Command::Serve { .. } => Ok(()),
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn handle_texts(document: &VocabDocument, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload: Vec<_> = document
            .texts
            .iter()
            .map(|(id, text)| {
                json!({
                    "id": id,
                    "title": text.title,
                    "phrases": text.phrases.len(),
                    "aliases": text.aliases.len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    if document.texts.is_empty() {
        println!("No texts in document.");
        return Ok(());
    }
    let width = document
        .text_ids()
        .map(|id| id.chars().count())
        .max()
        .unwrap_or(2)
        .max("ID".len());
    println!("{:<width$}  {:>7}  {}", "ID", "PHRASES", "TITLE", width = width);
    println!("{:-<width$}  {:->7}  {}", "", "", "-----", width = width);
    for (id, text) in &document.texts {
        println!(
            "{:<width$}  {:>7}  {}",
            id,
            text.phrases.len(),
            text.title,
            width = width
        );
    }
    Ok(())
}

fn handle_lookup(
    document: &VocabDocument,
    text: String,
    words: Vec<String>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let host = HostPage::new(Some(text));
    let mounted = mount(&host, Ok(document))?;
    let rows: Vec<_> = words
        .iter()
        .map(|word| (word.as_str(), mounted.lookup(word, None)))
        .collect();

    if as_json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(word, resolution)| {
                json!({
                    "word": word,
                    "key": resolution.key,
                    "source": resolution.source,
                    "card": PopupCard::new(resolution.key.clone(), &resolution.entry),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let width = rows
        .iter()
        .map(|(word, _)| word.chars().count())
        .max()
        .unwrap_or(4)
        .max("WORD".len());
    println!("{:<width$}  {}", "WORD", "TRANSLATION", width = width);
    println!("{:-<width$}  {}", "", "-----------", width = width);
    for (word, resolution) in &rows {
        println!(
            "{:<width$}  {}",
            word,
            resolution.entry.translation,
            width = width
        );
    }
    Ok(())
}

fn handle_render(
    document: &VocabDocument,
    text: String,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let host = HostPage::new(Some(text));
    let page = Page::build(&host, Ok(document)).ok_or("no container to render into")?;
    if let Some(message) = page.container.error() {
        return Err(message.into());
    }
    let html = page.to_html()?;
    match out {
        Some(path) => {
            std::fs::write(&path, html)?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}

const READ_HELP: &str = "Commands: P.T open word · Enter reopen focused word · h P.T hover · \
/word free lookup · x close · b backdrop · esc escape · q quit";

fn handle_read(
    document: &VocabDocument,
    text: String,
    hover: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let host = HostPage::new(Some(text));
    let mut reader = Reader::mount(document, &host)?.with_hover(hover);
    if let Some(view) = reader.view() {
        println!("{}", render_terminal(view));
    }
    println!("{READ_HELP}");

    let stdin = io::stdin();
    let mut focused: Option<TokenRef> = None;
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        let card = match input {
            "q" | "quit" => break,
            "x" => {
                reader.close(CloseTrigger::CloseButton);
                None
            }
            "b" => {
                reader.close(CloseTrigger::Backdrop);
                None
            }
            "esc" => reader.handle_key(focused, Key::Escape).cloned(),
            "" => reader.handle_key(focused, Key::Enter).cloned(),
            _ => {
                if let Some(word) = input.strip_prefix('/') {
                    Some(reader.lookup_word(word).clone())
                } else {
                    let (how, reference) = match input.strip_prefix("h ") {
                        Some(rest) => (Activation::Hover, rest),
                        None => (Activation::Click, input),
                    };
                    match reference.parse::<TokenRef>() {
                        Ok(at) => {
                            focused = Some(at);
                            let card = reader.activate(at, how).cloned();
                            if card.is_none() && how == Activation::Click {
                                println!("{at} is not a clickable word.");
                            }
                            card
                        }
                        Err(err) => {
                            println!("{err}\n{READ_HELP}");
                            None
                        }
                    }
                }
            }
        };
        match card {
            Some(card) => print_card(&card, as_json)?,
            None if !reader.popup().is_some_and(|popup| popup.is_open()) => {
                println!("(popup closed)")
            }
            None => {}
        }
    }
    Ok(())
}

fn print_card(card: &PopupCard, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(card)?);
        return Ok(());
    }
    let mut body = format!("**{}**\n\n{}\n", card.word, card.translation);
    if let Some(meta) = &card.meta {
        body.push_str(&format!("\n*{meta}*\n"));
    }
    if let Some(note) = &card.note {
        body.push_str(&format!("\n{note}\n"));
    }
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, &body, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{}", body.replace('*', ""));
    }
    Ok(())
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.clamp(40, 80) as usize
}
