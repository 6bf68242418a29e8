//! Man page generator for wiregpio
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Default to ./man directory
    let output_dir = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("man")
    };

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let subcommands: Vec<clap::Command> = cmd.get_subcommands().cloned().collect();
    let man = clap_mangen::Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;

    let output_path = output_dir.join("wiregpio.1");
    fs::write(&output_path, buffer)?;

    println!("Man page generated at: {}", output_path.display());

    // One page per subcommand, named like git's (wiregpio-scan.1)
    for sub in &subcommands {
        let name = format!("wiregpio-{}", sub.get_name());
        let mut buffer = Vec::new();
        clap_mangen::Man::new(sub.clone())
            .title(name.as_str())
            .render(&mut buffer)?;
        fs::write(output_dir.join(format!("{}.1", name)), buffer)?;
    }
    println!("Generated {} subcommand pages", subcommands.len());
    println!("\nTo view the man page:");
    println!("  man -l {}", output_path.display());

    Ok(())
}
