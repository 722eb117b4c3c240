use async_trait::async_trait;
use clap::{Arg, Command};
use cli_clipboard::{ClipboardContext, ClipboardProvider};
use std::sync::Arc;
use tolk::language;
use tolk::ui::ClipboardError;
use tolk::{Catalog, Clipboard, CopyFeedback, Language, Tooltip};
use tolk_mt::{GeminiProvider, MachineTranslator, MockMode, MockTranslator};

/// The desktop clipboard
struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            ClipboardContext::new()
                .and_then(|mut ctx| ctx.set_contents(text))
                .map_err(|e| ClipboardError(e.to_string()))
        })
        .await
        .map_err(|e| ClipboardError(e.to_string()))?
    }
}

fn resolve(query: &str) -> Result<Language, Box<dyn std::error::Error>> {
    language::find(query).ok_or_else(|| {
        let known: Vec<_> = tolk::LANGUAGES.iter().map(|l| l.code).collect();
        format!("Unknown language '{}'. Known: {}", query, known.join(", ")).into()
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("tolk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Translate text with Gemini")
        .arg(
            Arg::new("text")
                .help("Text to translate")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("target")
                .help("Target language code or name (e.g., en, French)")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("source")
                .long("source")
                .short('s')
                .help("Source language code or name (default: he)"),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use mock translator instead of Gemini")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("lite")
                .long("lite")
                .help("Use the lite Gemini model")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("copy")
                .long("copy")
                .short('c')
                .help("Copy the translation to the clipboard")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Show request details")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let text = matches
        .get_one::<String>("text")
        .ok_or("missing text argument")?;
    let target = resolve(
        matches
            .get_one::<String>("target")
            .ok_or("missing target argument")?,
    )?;
    let source = match matches.get_one::<String>("source") {
        Some(query) => resolve(query)?,
        None => language::default_source(),
    };
    let verbose = matches.get_flag("verbose");

    let translator: Box<dyn MachineTranslator> = if matches.get_flag("mock") {
        Box::new(MockTranslator::new(MockMode::Suffix))
    } else {
        if std::env::var("GEMINI_API_KEY").is_err() {
            eprintln!("❌ GEMINI_API_KEY environment variable not set");
            eprintln!("   Set it with: export GEMINI_API_KEY=your_api_key");
            eprintln!("   Or use --mock to use mock translator");
            return Err("Missing API key".into());
        }
        let provider = GeminiProvider::from_env()?;
        Box::new(if matches.get_flag("lite") {
            provider.lite()
        } else {
            provider
        })
    };

    if verbose {
        eprintln!("📝 Source: \"{}\"", text);
        eprintln!("🌍 {} → {}", source, target);
        eprintln!("🤖 Provider: {}", translator.provider_name());
        eprintln!();
    }

    match translator.translate(text, source.name, target.name).await {
        Ok(translated) => {
            println!("{}", translated);
            if matches.get_flag("copy") {
                let catalog = Catalog::builtin();
                let locale = catalog.default_locale();
                let feedback = CopyFeedback::new(
                    Arc::new(SystemClipboard),
                    Tooltip::new(),
                    catalog.localize(locale, "tolk-copy", &[]),
                    catalog.localize(locale, "tolk-copied", &[]),
                );
                if feedback.copy(Some(&translated)).await {
                    eprintln!("📋 {}", feedback.label());
                } else {
                    eprintln!("⚠️  Could not copy to the clipboard");
                }
            }
            Ok(())
        }
        Err(e) => {
            let catalog = Catalog::builtin();
            eprintln!("❌ {}", e.user_message(&catalog, catalog.default_locale()));
            if verbose {
                eprintln!("   {}", e);
            }
            Err(e.into())
        }
    }
}
