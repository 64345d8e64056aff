//! carrytree command-line client
//!
//! Three subcommands wrap the library:
//!
//! - `build "[a,b,c]"` builds a tree and saves it to `merkle.tree`
//! - `inclusion <item>` loads that file and prints an inclusion proof
//! - `consistency "[a,b]" "[a,b,c,d]"` prints a consistency proof and saves
//!   both trees to `merkle.trees`

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use carrytree_merkle::{consistency_proof, is_ordered_prefix, load, save, save_all, Tree};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carrytree", about = "Carry-forward Merkle trees and their proofs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a tree from a bracketed list and save it
    Build {
        /// Leaf items, e.g. "[alice,bob,carlol]"
        leaves: String,

        /// Output tree file
        #[arg(long, env = "CARRYTREE_TREE", default_value = "merkle.tree")]
        out: PathBuf,
    },

    /// Prove that an item is part of a saved tree
    Inclusion {
        /// Item to look up
        item: String,

        /// Tree file written by `build`
        #[arg(long, env = "CARRYTREE_TREE", default_value = "merkle.tree")]
        tree: PathBuf,
    },

    /// Prove that one list is a prefix of another
    Consistency {
        /// Older leaf list, e.g. "[a,b]"
        older: String,

        /// Newer leaf list, e.g. "[a,b,c,d]"
        newer: String,

        /// Output file holding both trees
        #[arg(long, env = "CARRYTREE_TREES", default_value = "merkle.trees")]
        out: PathBuf,
    },
}

fn main() {
    // Logs go to stderr; stdout carries the answers
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build { leaves, out } => run_build(&leaves, &out),
        Commands::Inclusion { item, tree } => run_inclusion(&item, &tree),
        Commands::Consistency { older, newer, out } => run_consistency(&older, &newer, &out),
    };

    match result {
        Ok(line) => println!("{}", line),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Split a bracketed, comma-separated list such as `[a,b,c]`
fn parse_list(input: &str) -> anyhow::Result<Vec<String>> {
    let Some(inner) = input
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        bail!("list must be enclosed in brackets, e.g. [a,b,c]: {}", input);
    };

    if inner.is_empty() {
        bail!("list must contain at least one item");
    }

    let items: Vec<String> = inner.split(',').map(str::to_string).collect();
    if let Some(item) = items.iter().skip(1).find(|item| item.starts_with(' ')) {
        bail!("items must be separated by ',' without spaces: {:?}", item);
    }

    Ok(items)
}

fn format_hashes<S: AsRef<str>>(hashes: &[S]) -> String {
    let quoted: Vec<String> = hashes
        .iter()
        .map(|h| format!("'{}'", h.as_ref()))
        .collect();
    format!("[{}]", quoted.join(", "))
}

fn run_build(leaves: &str, out: &Path) -> anyhow::Result<String> {
    let leaves = parse_list(leaves)?;
    let tree = Tree::build(&leaves).context("failed to build tree")?;
    save(&tree, out).with_context(|| format!("failed to save tree to {}", out.display()))?;

    tracing::info!(leaves = leaves.len(), path = %out.display(), "tree saved");
    Ok(format!("Root:[{}]", tree.root().hash()))
}

fn run_inclusion(item: &str, tree_path: &Path) -> anyhow::Result<String> {
    let tree = load(tree_path)
        .with_context(|| format!("failed to load tree from {}", tree_path.display()))?;
    let proof = tree.inclusion_proof(item)?;

    if proof.found && !proof.is_empty() {
        Ok(format!(
            "yes {} Root:[{}]",
            format_hashes(&proof.hashes()),
            tree.root().hash()
        ))
    } else {
        Ok("no".to_string())
    }
}

fn run_consistency(older: &str, newer: &str, out: &Path) -> anyhow::Result<String> {
    let older_leaves = parse_list(older)?;
    let newer_leaves = parse_list(newer)?;

    let older_tree = Tree::build(&older_leaves)?;
    let newer_tree = Tree::build(&newer_leaves)?;

    save_all(&[&older_tree, &newer_tree], out)
        .with_context(|| format!("failed to save trees to {}", out.display()))?;

    if older_leaves.len() > newer_leaves.len() || !is_ordered_prefix(&older_leaves, &newer_leaves)
    {
        return Ok("no".to_string());
    }

    let proof = consistency_proof(&older_tree, &newer_tree)?;
    Ok(format!(
        "yes olderRoot:[{}] {} newerRoot:[{}]",
        older_tree.root().hash(),
        format_hashes(&proof.hashes()),
        newer_tree.root().hash()
    ))
}
