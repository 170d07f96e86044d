use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cr_chat::{Dialog, GenerationParams, Generator, GeneratorConfig, Role, Turn};
use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Run a fixed set of demonstration dialogs through the chat generator.
#[derive(Parser)]
#[clap(name = "chat-demo")]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Checkpoint directory holding `params.json` and the weight file.
    ckpt_dir: PathBuf,
    /// Tokenizer JSON file.
    tokenizer_path: PathBuf,
    /// Sampling temperature, 0 for greedy decoding.
    #[clap(long, default_value_t = 1.0)]
    temperature: f32,
    /// Nucleus sampling threshold.
    #[clap(long, default_value_t = 1.0)]
    top_p: f32,
    #[clap(long, default_value_t = 512)]
    max_seq_len: usize,
    #[clap(long, default_value_t = 8)]
    max_batch_size: usize,
    /// Tokens to generate per dialog. Defaults to the remaining context.
    #[clap(long)]
    max_gen_len: Option<usize>,
    /// Sampling seed.
    #[clap(long, default_value_t = 1)]
    seed: u64,
    /// Log level, may be "off", "trace", "debug", "info", "warn" or "error".
    #[clap(long)]
    log: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.log.as_deref());

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger(level: Option<&str>) {
    let level = level
        .and_then(|log| match log.to_lowercase().as_str() {
            "off" | "none" => Some(LevelFilter::Off),
            "trace" => Some(LevelFilter::Trace),
            "debug" => Some(LevelFilter::Debug),
            "info" => Some(LevelFilter::Info),
            "warn" => Some(LevelFilter::Warn),
            "error" => Some(LevelFilter::Error),
            _ => None,
        })
        .unwrap_or(LevelFilter::Warn);
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialize logger: {e}");
    }
}

fn run(cli: &Cli) -> cr_chat::Result<()> {
    let config = GeneratorConfig {
        max_seq_len: cli.max_seq_len,
        max_batch_size: cli.max_batch_size,
        seed: cli.seed,
        ..Default::default()
    };
    let mut generator = Generator::build(&cli.ckpt_dir, &cli.tokenizer_path, config)?;

    let params = GenerationParams {
        max_gen_len: cli.max_gen_len,
        temperature: cli.temperature,
        top_p: cli.top_p,
        ..Default::default()
    };
    let dialogs = dialogs();
    let results = generator.chat_completion(&dialogs, &params)?;

    for (dialog, result) in dialogs.iter().zip(&results) {
        for turn in dialog {
            println!("{}: {}\n", capitalize(turn.role()), turn.content());
        }
        println!(
            "> {}: {}",
            capitalize(result.generation.role()),
            result.generation.content()
        );
        println!("\n==================================\n");
    }
    Ok(())
}

fn capitalize(role: Role) -> &'static str {
    match role {
        Role::System => "System",
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

fn dialogs() -> Vec<Dialog> {
    vec![
        vec![
            Turn::user("Hi, I am Dr Joe, how can I help you today?"),
            Turn::assistant(
                "Hi Dr Joe, I've been experiencing some sensitivity in my teeth, \
                 especially when I drink hot or cold beverages.",
            ),
            Turn::user(
                "I'm sorry to hear that. How long have you been experiencing this sensitivity?",
            ),
        ],
        vec![
            Turn::user(
                "I'm sorry to hear that. How long have you been experiencing this sensitivity?",
            ),
            Turn::assistant("It started a few weeks ago, but it seems to be getting worse."),
            Turn::user(
                "Have there been any changes in your diet or oral hygiene routine recently?",
            ),
        ],
        vec![
            Turn::user(
                "Have there been any changes in your diet or oral hygiene routine recently?",
            ),
            Turn::assistant(
                "Not really, though I've probably been drinking more coffee than usual.",
            ),
            Turn::user(
                "Okay, let's take a look. I'll do a thorough examination of your teeth and gums. \
                 [After examination] It looks like you have some enamel wear, which is likely \
                 causing the sensitivity. This can happen from acidic foods and drinks like coffee.",
            ),
        ],
        vec![
            Turn::user(
                "Okay, let's take a look. I'll do a thorough examination of your teeth and gums. \
                 [After examination] It looks like you have some enamel wear, which is likely \
                 causing the sensitivity. This can happen from acidic foods and drinks like coffee.",
            ),
            Turn::assistant("Is there something I can do to reduce the sensitivity?"),
            Turn::user(
                "Yes, there are a few things we can do. First, I recommend using a toothpaste \
                 designed for sensitive teeth. It can help protect the enamel and reduce \
                 sensitivity. Also, try to limit acidic drinks like coffee, and when you do have \
                 them, don't brush immediately after, wait for at least 30 minutes.",
            ),
        ],
    ]
}
