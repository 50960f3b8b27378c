//! towa-letter: Command-line tool for sealing and opening letters.
//!
//! Letters are sealed under the answer to a personal question and filed
//! under a discovery key derived from the recipient's name and birth date.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;

use towa_core::new_v7;
use towa_crypto::{
    decode_envelope, derive_identity_key, encode_envelope, seal_letter, Attachment, DerivationPool,
    KdfParams, LetterContent, LetterError, PoolConfig, SealOptions,
};

#[derive(Parser)]
#[command(name = "towa-letter")]
#[command(author, version, about = "Seal and open answer-gated letters")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seal an HTML letter (plus attachments) under a question and answer
    Seal {
        /// HTML file with the letter body
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the encoded envelope
        #[arg(short, long)]
        output: PathBuf,

        /// Security question shown to the recipient
        #[arg(short, long)]
        question: String,

        /// Answer that opens the letter
        #[arg(short, long)]
        answer: String,

        /// Files to attach (can specify multiple)
        #[arg(long, num_args = 1..)]
        attach: Vec<PathBuf>,

        /// Recipient name, to print the discovery key
        #[arg(long, requires = "dob")]
        name: Option<String>,

        /// Recipient birth date, to print the discovery key
        #[arg(long, requires = "name")]
        dob: Option<String>,

        /// Argon2id time cost
        #[arg(long, default_value_t = KdfParams::default().iterations)]
        iterations: u32,

        /// Argon2id memory cost in KiB
        #[arg(long, default_value_t = KdfParams::default().memory_kib)]
        memory_kib: u32,

        /// Argon2id parallelism
        #[arg(long, default_value_t = KdfParams::default().parallelism)]
        parallelism: u32,
    },

    /// Try one answer against one or more envelopes
    Open {
        /// Envelope files (can specify multiple)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output file for the letter HTML
        #[arg(short, long)]
        output: PathBuf,

        /// Answer to try
        #[arg(short, long)]
        answer: String,

        /// Directory to write attachments into
        #[arg(long)]
        attachments_dir: Option<PathBuf>,
    },

    /// Show the public header of an envelope
    Inspect {
        /// Envelope file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the discovery key for a recipient
    Identity {
        /// Recipient name
        #[arg(long)]
        name: String,

        /// Recipient birth date (any separators)
        #[arg(long)]
        dob: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", error_message(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

/// Letter failures that are not user-facing print only an incident id;
/// the detail goes to the log under the same id.
fn error_message(err: &(dyn std::error::Error + 'static)) -> String {
    match err.downcast_ref::<LetterError>() {
        Some(letter_err) if !letter_err.is_user_facing() => {
            let incident = new_v7().to_string();
            error!(
                subsystem = "cli",
                component = "towa-letter",
                incident = %incident,
                detail = %letter_err.log_detail(),
                "Letter operation failed"
            );
            letter_err.user_message(&incident)
        }
        Some(letter_err) => letter_err.user_message(""),
        None => err.to_string(),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seal {
            input,
            output,
            question,
            answer,
            attach,
            name,
            dob,
            iterations,
            memory_kib,
            parallelism,
        } => {
            let params = KdfParams::new(iterations, memory_kib, parallelism);
            let recipient = name.zip(dob);
            cmd_seal(
                &input,
                &output,
                &question,
                &answer,
                &attach,
                recipient.as_ref().map(|(n, d)| (n.as_str(), d.as_str())),
                params,
            )?;
        }
        Commands::Open {
            input,
            output,
            answer,
            attachments_dir,
        } => {
            cmd_open(&input, &output, &answer, attachments_dir.as_deref())?;
        }
        Commands::Inspect { input } => {
            cmd_inspect(&input)?;
        }
        Commands::Identity { name, dob } => {
            cmd_identity(&name, &dob)?;
        }
    }

    Ok(())
}

fn cmd_seal(
    input_path: &Path,
    output_path: &Path,
    question: &str,
    answer: &str,
    attachment_paths: &[PathBuf],
    recipient: Option<(&str, &str)>,
    params: KdfParams,
) -> Result<(), Box<dyn std::error::Error>> {
    let html = std::fs::read_to_string(input_path)?;

    let mut content = LetterContent::new(html);
    for path in attachment_paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or("Attachment path has no file name")?;
        content = content.with_attachment(Attachment {
            filename,
            content_type: "application/octet-stream".to_string(),
            data: std::fs::read(path)?,
        });
    }

    let options = SealOptions::default().with_kdf_params(params);
    let sealed = seal_letter(&content, question, answer, &options)?;
    let encoded = encode_envelope(&sealed.envelope)?;
    std::fs::write(output_path, &encoded)?;

    let output = serde_json::json!({
        "output": output_path.to_string_lossy(),
        "envelope_size": encoded.len(),
        "attachments": content.attachments.len(),
        "bucket_id": sealed.bucket_id.to_string(),
        "discovery_key": recipient.map(|(name, dob)| derive_identity_key(name, dob).to_string()),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_open(
    input_paths: &[PathBuf],
    output_path: &Path,
    answer: &str,
    attachments_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut envelopes = Vec::with_capacity(input_paths.len());
    for path in input_paths {
        envelopes.push(decode_envelope(&std::fs::read(path)?)?);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let pool = DerivationPool::new(PoolConfig::from_env());
    let (index, plaintext) = runtime.block_on(pool.open_any(envelopes, answer))?;

    // Plaintext that is not letter JSON is written out as-is.
    let content: LetterContent = serde_json::from_slice(&plaintext).unwrap_or_else(|_| {
        LetterContent::new(String::from_utf8_lossy(&plaintext).into_owned())
    });

    std::fs::write(output_path, &content.html)?;

    let mut written = Vec::new();
    if let Some(dir) = attachments_dir {
        std::fs::create_dir_all(dir)?;
        for attachment in &content.attachments {
            let name = Path::new(&attachment.filename)
                .file_name()
                .ok_or("Attachment has no file name")?;
            let path = dir.join(name);
            std::fs::write(&path, &attachment.data)?;
            written.push(path.to_string_lossy().to_string());
        }
    }

    let output = serde_json::json!({
        "input": input_paths[index].to_string_lossy(),
        "output": output_path.to_string_lossy(),
        "candidates": input_paths.len(),
        "attachments": content.attachments.len(),
        "attachments_written": written,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_inspect(input_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let envelope = decode_envelope(&std::fs::read(input_path)?)?;

    let output = serde_json::json!({
        "file": input_path.to_string_lossy(),
        "version": envelope.version,
        "question": envelope.question,
        "kdf_params": envelope.kdf_params,
        "content_size": envelope.encrypted_content.len(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_identity(name: &str, dob: &str) -> Result<(), Box<dyn std::error::Error>> {
    let output = serde_json::json!({
        "discovery_key": derive_identity_key(name, dob).to_string(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
