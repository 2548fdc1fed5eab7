//! Strongbox - envelope encryption and signatures from the command line

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;
use strongbox_cli::{build_engine, commands, BlobKind, KeyKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "strongbox")]
#[command(about = "Hybrid RSA/AES-GCM encryption, password encryption and RSA signatures")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true, env = "STRONGBOX_DEBUG")]
    debug: bool,

    /// Replace real cryptography with insecure placeholders (development only!)
    #[arg(long, global = true, env = "STRONGBOX_MOCK_CRYPTO")]
    mock_crypto: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a key pair into <OUT>.public.json and <OUT>.private.json
    Keygen {
        #[arg(long, value_enum)]
        kind: KeyKind,
        /// Output path prefix
        #[arg(long)]
        out: PathBuf,
        /// Namespace of the generated key-set id
        #[arg(long, default_value = "strongbox", env = "STRONGBOX_KEY_NAMESPACE")]
        namespace: String,
    },
    /// Encrypt stdin for the holder of a public key; prints base64
    Encrypt {
        #[arg(long)]
        key: PathBuf,
        /// Embed the key-set id in the blob
        #[arg(long)]
        with_key_id: bool,
    },
    /// Decrypt a base64 blob from stdin with a private key
    Decrypt {
        #[arg(long)]
        key: PathBuf,
    },
    /// Encrypt stdin under a password; prints base64
    EncryptPassword {
        #[arg(long, env = "STRONGBOX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Decrypt a base64 password blob from stdin
    DecryptPassword {
        #[arg(long, env = "STRONGBOX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign stdin with a private key; prints the base64 signature
    Sign {
        #[arg(long)]
        key: PathBuf,
        /// Embed the key-set id in the signature
        #[arg(long)]
        with_key_id: bool,
    },
    /// Verify a base64 signature over stdin; exits 1 when it does not match
    Verify {
        #[arg(long)]
        key: PathBuf,
        #[arg(long)]
        signature: String,
    },
    /// Print the key-set id embedded in a base64 blob
    KeyId {
        #[arg(long, value_enum)]
        kind: BlobKind,
        blob: String,
    },
}

fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .context("reading stdin")?;
    Ok(input)
}

fn read_stdin_text() -> anyhow::Result<String> {
    String::from_utf8(read_stdin()?).context("stdin is not UTF-8")
}

fn write_stdout(bytes: &[u8]) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so stdout stays pipeable
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("strongbox={0},strongbox_cli={0},strongbox_crypto={0}", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let engine = build_engine(args.mock_crypto);

    match args.command {
        Command::Keygen {
            kind,
            out,
            namespace,
        } => {
            let (public, private) = commands::keygen(kind, &namespace, &out).await?;
            println!("{}\n{}", public.display(), private.display());
        }
        Command::Encrypt { key, with_key_id } => {
            let blob = commands::encrypt(&engine, &key, &read_stdin()?, with_key_id)?;
            println!("{}", blob);
        }
        Command::Decrypt { key } => {
            let plaintext = commands::decrypt(&engine, &key, &read_stdin_text()?)?;
            write_stdout(&plaintext)?;
        }
        Command::EncryptPassword { password } => {
            let blob = commands::encrypt_with_password(&engine, &password, &read_stdin()?)?;
            println!("{}", blob);
        }
        Command::DecryptPassword { password } => {
            let plaintext = commands::decrypt_with_password(&engine, &password, &read_stdin_text()?)?;
            write_stdout(&plaintext)?;
        }
        Command::Sign { key, with_key_id } => {
            let signature = commands::sign(&engine, &key, &read_stdin()?, with_key_id)?;
            println!("{}", signature);
        }
        Command::Verify { key, signature } => {
            if commands::verify(&engine, &key, &read_stdin()?, &signature)? {
                println!("valid");
            } else {
                println!("invalid");
                std::process::exit(1);
            }
        }
        Command::KeyId { kind, blob } => {
            println!("{}", commands::key_id(kind, &blob)?);
        }
    }

    Ok(())
}
