use clap::{Parser, Subcommand};
use gitdex::commands::{
    cmd_add, cmd_checkout_file, cmd_config, cmd_hash_object, cmd_init, cmd_read_index,
    cmd_write_tree, current_root, ConfigAction,
};
use gitdex::IndexError;
use std::path::PathBuf;

/// Plumbing CLI over the staging index: the narrow command surface
/// needed to exercise `add`/`read-index`/`write-tree`/`checkout --file`
/// without any higher-level porcelain.
#[derive(Parser)]
#[command(name = "gitdex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Staging index plumbing: init, hash-object, add, read-index, write-tree, checkout, config")]
struct Cli {
    /// Repository root (defaults to the current directory).
    #[arg(short = 'C', long = "root", global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new repository
    Init,
    /// Compute (and optionally store) a blob's object id
    HashObject {
        file: PathBuf,
        #[arg(short = 'w', long = "write")]
        write: bool,
    },
    /// Stage a file's current content
    Add { file: PathBuf },
    /// List staged entries
    ReadIndex,
    /// Build a tree object from the staged entries
    WriteTree,
    /// Restore a single staged file to the working tree
    Checkout {
        #[arg(long = "file")]
        file: bool,
        path: String,
    },
    /// Get or set a config value (user.name, user.email, core.filemode)
    Config { key: String, value: Option<String> },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let root = cli
        .root
        .or_else(|| current_root().ok())
        .expect("could not determine repository root");

    if let Err(e) = run(&root, cli.command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(root: &std::path::Path, command: Commands) -> Result<(), IndexError> {
    match command {
        Commands::Init => cmd_init(root),
        Commands::HashObject { file, write } => {
            let id = cmd_hash_object(root, &file, write)?;
            println!("{id}");
            Ok(())
        }
        Commands::Add { file } => cmd_add(root, &file),
        Commands::ReadIndex => {
            for (name, id, mode) in cmd_read_index(root)? {
                println!("{mode:o} {id} {name}");
            }
            Ok(())
        }
        Commands::WriteTree => {
            let id = cmd_write_tree(root)?;
            println!("{id}");
            Ok(())
        }
        Commands::Checkout { file, path } => {
            if !file {
                eprintln!("error: only `checkout --file <path>` is supported");
                std::process::exit(1);
            }
            cmd_checkout_file(root, &path)
        }
        Commands::Config { key, value } => match value {
            Some(v) => cmd_config(root, &key, ConfigAction::Set(v)),
            None => {
                if let Some(v) = cmd_config(root, &key, ConfigAction::Get)? {
                    println!("{v}");
                }
                Ok(())
            }
        },
    }
}
