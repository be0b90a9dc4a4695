use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use zipreel::{ArchiveReader, Category, Composer};

#[derive(Parser, Debug)]
#[command(name = "zipreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a video from a zip archive of media files.
    Process(ProcessArgs),
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Input zip archive.
    archive: PathBuf,

    /// Output video file name.
    #[arg(long, default_value = "generated_video.mp4")]
    output: String,

    /// Directory generated videos are written into.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// List the archive's categorized contents and exit without composing.
    #[arg(long)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Process(args) => {
            if args.list {
                cmd_list(&args)
            } else {
                cmd_process(&args)
            }
        }
    }
}

fn cmd_list(args: &ProcessArgs) -> anyhow::Result<()> {
    let reader = ArchiveReader::new();
    let entries = reader.list_entries(&args.archive)?;

    println!("{}: {} entries", args.archive.display(), entries.len());
    for category in Category::ALL {
        let matching: Vec<_> = entries
            .iter()
            .filter(|e| !e.is_directory && Category::of_path(Path::new(&e.name)) == category)
            .collect();
        if matching.is_empty() {
            continue;
        }
        println!("{} ({}):", category.label(), matching.len());
        for entry in matching {
            println!(
                "  {} ({} bytes, modified {})",
                entry.name, entry.uncompressed_size, entry.modified
            );
        }
    }
    Ok(())
}

fn cmd_process(args: &ProcessArgs) -> anyhow::Result<()> {
    let composer = Composer::new(&args.output_dir)?;
    let result = composer.compose_from_archive(&args.archive, &args.output)?;

    println!("Video generated successfully: {}", result.output_path.display());
    println!("  size: {} bytes", result.byte_size);
    println!("  source entries: {}", result.source_entry_count);
    Ok(())
}
