use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncWriteExt;

use ctrseek::{DecryptError, WarmWorker, WorkerConfig};

/// Decrypt a byte range of an `IV || AES-CTR ciphertext` file to stdout.
#[derive(Parser, Debug)]
#[command(name = "ctrseek")]
struct Args {
    /// Encrypted file (16-byte IV followed by the ciphertext payload)
    file: PathBuf,

    /// Base64-encoded AES-128 or AES-256 key (falls back to CTRSEEK_KEY)
    #[arg(long, env = "CTRSEEK_KEY", hide_env_values = true)]
    key: String,

    /// First payload byte to decrypt (default: 0)
    #[arg(long)]
    start: Option<u64>,

    /// Last payload byte to decrypt, inclusive (default: end of file)
    #[arg(long)]
    end: Option<u64>,

    /// Chunk size in bytes (overrides CTRSEEK_CHUNK_SIZE)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Issue the same request this many times through the warm worker
    #[arg(long, default_value_t = 1)]
    repeat: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("ctrseek: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), DecryptError> {
    let mut config = WorkerConfig::from_env();
    if let Some(chunk_size) = args.chunk_size {
        config = config.with_chunk_size(chunk_size);
    }

    let worker = WarmWorker::spawn(config)?;
    let mut stdout = tokio::io::stdout();

    for _ in 0..args.repeat.max(1) {
        let mut stream = worker
            .open_decrypt_read(&args.file, args.key.as_str(), args.start, args.end)
            .await?;
        log::debug!(
            "Decrypting {:?} of {} payload bytes",
            stream.range(),
            stream.payload_len()
        );

        while let Some(chunk) = stream.next().await {
            stdout.write_all(&chunk?).await?;
        }
    }
    stdout.flush().await?;

    log::info!("Worker stats: {:?}", worker.stats().await?);
    worker.shutdown()
}
