//! es3save CLI - decrypt and re-encrypt ES3 game saves
//!
//! Saves are decrypted to pretty-printed JSON for editing and encrypted
//! back with AES-128-CBC and PBKDF2-HMAC-SHA1, as the game expects.

use clap::{Parser, Subcommand};
use std::error::Error as StdError;
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use es3save::document::export_file_name;
use es3save::file_ops::{self, OutputFormat};
use es3save::passphrase::{
    ConstantPassphraseReader, DefaultPassphraseReader, PassphraseReader, ReaderPassphraseReader,
    TerminalPassphraseReader,
};

#[derive(Parser)]
#[command(name = "es3save")]
#[command(version)]
#[command(about = "Decrypt, edit and re-encrypt ES3 game saves.", long_about = None)]
struct Cli {
    /// Read the password from stdin instead of using the game's default
    #[arg(long, global = true, conflicts_with = "ask_passphrase")]
    passphrase_stdin: bool,

    /// Prompt for the password on the terminal
    #[arg(long, global = true)]
    ask_passphrase: bool,

    /// Custom password; the game's default password is used when unset
    #[arg(
        long,
        global = true,
        env = "ES3SAVE_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD"
    )]
    password: Option<String>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decrypt a save to JSON
    #[command(alias = "d")]
    Decrypt {
        /// Path to the encrypted save
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the decrypted content to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Write the decrypted text as stored instead of pretty-printed JSON
        #[arg(long)]
        raw: bool,
    },

    /// Encrypt a JSON document into a save
    #[command(alias = "e")]
    Encrypt {
        /// Path to the JSON document
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the save to [default: input with a .save extension]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Replace the content of an existing save, while validating that the
    /// password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the edited JSON document
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing save to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut reader = get_passphrase_reader(&cli);

    let result = match cli.command {
        Commands::Decrypt { input, output, raw } => {
            let format = if raw {
                OutputFormat::Raw
            } else {
                OutputFormat::Pretty
            };
            file_ops::decrypt_file(&input, &output, &mut *reader, format)
        }
        Commands::Encrypt { input, output } => {
            let output =
                output.unwrap_or_else(|| PathBuf::from(export_file_name(&input.to_string_lossy())));
            debug!(output = %output.display(), "resolved output path");
            file_ops::encrypt_file(&input, &output, &mut *reader)
        }
        Commands::Update { input, output } => file_ops::update_file(&input, &output, &mut *reader),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", error_chain(&e));
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn get_passphrase_reader(cli: &Cli) -> Box<dyn PassphraseReader> {
    if cli.passphrase_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else if cli.ask_passphrase {
        Box::new(TerminalPassphraseReader::new())
    } else if let Some(password) = &cli.password {
        Box::new(ConstantPassphraseReader::new(password.clone().into_bytes()))
    } else {
        Box::new(DefaultPassphraseReader)
    }
}

/// Render an error and its sources as "outer: inner: ...".
fn error_chain(err: &dyn StdError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
