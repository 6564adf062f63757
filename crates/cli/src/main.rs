use antigravity_shatter::ShatterEngine;
use antigravity_vault::VaultEngine;
use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

#[derive(Parser, Debug)]
#[command(
    name = "antigravity",
    about = "File sharding (SHATTER) and folder encryption (VAULT) from the command line",
    long_about = "antigravity drives the two core engines of the Antigravity toolkit:\n\n\
                  • SHATTER splits a file into authenticated encrypted chunks under a manifest.\n\
                  • VAULT encrypts every file in a folder in place and renames files/directories.\n\n\
                  Quick start:\n\
                  1. antigravity shatter secret.pdf              # produces secret.pdf_sharded/\n\
                  2. antigravity reassemble secret.pdf_sharded/secret.pdf.shatter_manifest\n\
                  3. antigravity vault-encrypt ./project          # locks a whole folder"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split a file into encrypted chunks under `<name>_sharded/`
    Shatter {
        /// File to shatter
        file: PathBuf,
        /// Directory to write `<name>_sharded` into (default: alongside the input file)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Securely erase the original file once sharding succeeds
        #[arg(long)]
        delete_original: bool,
    },

    /// Reassemble a file from its manifest
    Reassemble {
        /// Path to the `.shatter_manifest` file
        manifest: PathBuf,
        /// Directory to write the reassembled file into (default: one level above the sharded dir)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Delete chunks, manifest, and the sharded directory once reassembly succeeds
        #[arg(long)]
        delete_source: bool,
    },

    /// Recursively find `.shatter_manifest` files under a directory
    Scan {
        /// Directory to search
        dir: PathBuf,
    },

    /// Lock every file and name under a folder with a passphrase
    VaultEncrypt {
        /// Folder to encrypt
        folder: PathBuf,
    },

    /// Unlock a folder previously locked with `vault-encrypt`
    VaultDecrypt {
        /// Folder to decrypt
        folder: PathBuf,
    },

    /// Report (never delete) orphaned `.agv.tmp` files left by an interrupted vault-encrypt
    VaultFindOrphans {
        /// Folder to scan
        folder: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt::init();
    });

    let cli = Cli::parse();
    match cli.command {
        Commands::Shatter {
            file,
            out_dir,
            delete_original,
        } => shatter_command(&file, out_dir.as_deref(), delete_original),
        Commands::Reassemble {
            manifest,
            out_dir,
            delete_source,
        } => reassemble_command(&manifest, out_dir.as_deref(), delete_source),
        Commands::Scan { dir } => scan_command(&dir),
        Commands::VaultEncrypt { folder } => vault_encrypt_command(&folder),
        Commands::VaultDecrypt { folder } => vault_decrypt_command(&folder),
        Commands::VaultFindOrphans { folder } => vault_find_orphans_command(&folder),
    }
}

fn read_passphrase(prompt: &str) -> Result<String> {
    let passphrase = rpassword::prompt_password(prompt)?;
    if passphrase.is_empty() {
        return Err(eyre!("passphrase must not be empty"));
    }
    Ok(passphrase)
}

fn print_progress(fraction: f64, status: &str) {
    println!("[{:>5.1}%] {status}", fraction * 100.0);
}

fn shatter_command(file: &std::path::Path, out_dir: Option<&std::path::Path>, delete_original: bool) -> Result<()> {
    let passphrase = read_passphrase("Shatter passphrase: ")?;
    let engine = ShatterEngine::default();
    let mut cb = print_progress;
    let sharded_dir = engine.shatter(file, &passphrase, out_dir, delete_original, Some(&mut cb))?;
    println!("Wrote {}", sharded_dir.display());
    Ok(())
}

fn reassemble_command(manifest: &std::path::Path, out_dir: Option<&std::path::Path>, delete_source: bool) -> Result<()> {
    let passphrase = read_passphrase("Reassemble passphrase: ")?;
    let engine = ShatterEngine::default();
    let mut cb = print_progress;
    let output_path = engine.reassemble(manifest, &passphrase, out_dir, delete_source, Some(&mut cb))?;
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn scan_command(dir: &std::path::Path) -> Result<()> {
    let found = ShatterEngine::scan_for_manifests(dir)?;
    if found.is_empty() {
        println!("No manifests found under {}", dir.display());
    } else {
        for path in found {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn vault_encrypt_command(folder: &std::path::Path) -> Result<()> {
    let orphans = VaultEngine::find_orphan_temp_files(folder)?;
    warn_about_orphans(&orphans);

    let passphrase = read_passphrase("Vault passphrase: ")?;
    let engine = VaultEngine::default();
    let mut cb = print_progress;
    engine.vault_encrypt(folder, &passphrase, Some(&mut cb))?;
    println!("Locked {}", folder.display());
    Ok(())
}

fn vault_decrypt_command(folder: &std::path::Path) -> Result<()> {
    let passphrase = read_passphrase("Vault passphrase: ")?;
    let engine = VaultEngine::default();
    let mut cb = print_progress;
    engine.vault_decrypt(folder, &passphrase, Some(&mut cb))?;
    println!("Unlocked {}", folder.display());
    Ok(())
}

fn vault_find_orphans_command(folder: &std::path::Path) -> Result<()> {
    let orphans = VaultEngine::find_orphan_temp_files(folder)?;
    if orphans.is_empty() {
        println!("No orphaned .agv.tmp files found under {}", folder.display());
    } else {
        for path in &orphans {
            println!("{}", path.display());
        }
        println!(
            "{} orphaned temp file(s) found. The plaintext they were derived from was left untouched; \
             delete the .tmp files by hand once you've confirmed the originals are intact.",
            orphans.len()
        );
    }
    Ok(())
}

fn warn_about_orphans(orphans: &[PathBuf]) {
    if orphans.is_empty() {
        return;
    }
    println!(
        "Warning: {} orphaned .agv.tmp file(s) from a previous interrupted run were found. \
         Run `antigravity vault-find-orphans {}` for details before continuing.",
        orphans.len(),
        orphans[0].parent().map_or_else(|| ".".to_string(), |p| p.display().to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
