//! CLI: encode, tokenize, decode, pair composition, answer extraction, REPL.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qa::{AnswerOptions, PrecomputedLogits, QaConfig, QuestionAnswerer};
use tokenize::{Normalization, Tokenizer};
use tracing::info;

#[derive(Parser)]
#[command(name = "qa")]
#[command(about = "WordPiece tokenizer and extractive QA helpers")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vocabulary file (overrides the config)
    #[arg(long, global = true)]
    vocab: Option<PathBuf>,

    /// Treat the vocabulary as cased (no lower-casing or accent stripping)
    #[arg(long, global = true)]
    cased: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ids of a text
    Encode {
        text: String,
        /// wrap in [CLS] ... [SEP]
        #[arg(long)]
        framed: bool,
    },

    /// Print the subword pieces of a text
    Tokenize { text: String },

    /// Turn ids back into text
    Decode {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<u32>,
    },

    /// Print the [CLS] question [SEP] context [SEP] model input as JSON
    Pair {
        #[arg(long)]
        question: String,
        #[arg(long)]
        context: String,
        #[arg(long)]
        max_len: Option<usize>,
    },

    /// Extract the answer using start/end scores written by an inference runtime
    Answer {
        #[arg(long)]
        question: String,
        #[arg(long)]
        context: String,
        /// JSON file with `start` and `end` score arrays
        #[arg(long)]
        logits: PathBuf,
        /// use independent argmax instead of the best span inside the context
        #[arg(long)]
        unconstrained: bool,
    },

    /// Interactive tokenization
    Repl,
}

fn main() -> Result<()> {
    qa::init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => QaConfig::load(path)?,
        None => QaConfig::default(),
    };
    if let Some(vocab) = &cli.vocab {
        config.vocab_path = vocab.clone();
    }
    if cli.cased {
        config.vocabulary.normalization = Normalization::cased();
    }

    let tokenizer = config
        .tokenizer()
        .with_context(|| format!("loading vocabulary {}", config.vocab_path.display()))?;
    info!(
        tokens = tokenizer.vocabulary().len(),
        path = %config.vocab_path.display(),
        "tokenizer ready"
    );

    match cli.command {
        Commands::Encode { text, framed } => {
            let ids = if framed {
                tokenizer.encode_framed(&text)
            } else {
                tokenizer.encode(&text)
            };
            println!("{}", serde_json::to_string(&ids)?);
        }
        Commands::Tokenize { text } => {
            println!("{}", tokenizer.tokenize(&text).join(" "));
        }
        Commands::Decode { ids } => {
            println!("{}", tokenizer.decode(&ids)?);
        }
        Commands::Pair { question, context, max_len } => {
            let pair = match max_len {
                Some(n) => tokenizer.encode_pair_truncated(&question, &context, n),
                None => tokenizer.encode_pair(&question, &context),
            };
            println!("{}", serde_json::to_string_pretty(&pair)?);
        }
        Commands::Answer { question, context, logits, unconstrained } => {
            let text = std::fs::read_to_string(&logits)
                .with_context(|| format!("reading logits {}", logits.display()))?;
            let engine = PrecomputedLogits::from_json(&text)?;
            let options = AnswerOptions {
                constrain_to_context: !unconstrained,
                ..config.answer
            };
            let qa = QuestionAnswerer::new(tokenizer, engine, options);
            let answer = qa.answer(&question, &context)?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Repl => repl(&tokenizer)?,
    }
    Ok(())
}

fn repl(tokenizer: &Tokenizer) -> Result<()> {
    println!("Type text to tokenize, ':decode 1 2 3' to decode, 'quit' to exit");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let s = line.trim();
        if s.is_empty() {
            continue;
        }
        if s.eq_ignore_ascii_case("quit") || s.eq_ignore_ascii_case("exit") {
            break;
        }
        if let Some(rest) = s.strip_prefix(":decode") {
            let ids: Result<Vec<u32>, _> = rest.split_whitespace().map(str::parse).collect();
            match ids {
                Ok(ids) => match tokenizer.decode(&ids) {
                    Ok(text) => println!("{text}"),
                    Err(e) => println!("error: {e}"),
                },
                Err(e) => println!("error: {e}"),
            }
        } else {
            let ids = tokenizer.encode(s);
            let pieces = tokenizer.tokenize(s);
            println!("{}", pieces.join(" "));
            println!("{ids:?}");
        }
        stdout.flush()?;
    }
    Ok(())
}
