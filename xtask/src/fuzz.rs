use clap::Subcommand;
use duct::cmd;

#[derive(Subcommand)]
pub enum Fuzz {
    /// Run efibootmgr line parser
    Line,

    /// Run pseudo UTF-16 decoder
    Decode,

    /// Run full efibootmgr output parser and boot order reconciliation
    Output,
}

pub fn fuzz_parsers(command: Fuzz) -> anyhow::Result<()> {
    let mut args = vec!["fuzz", "run"];
    match command {
        Fuzz::Line => args.push("line"),
        Fuzz::Decode => args.push("decode"),
        Fuzz::Output => args.push("output"),
    }

    cmd!("cargo", "install", "cargo-fuzz").run()?; // will not install if its already installed
    cmd("cargo", args).run()?;
    Ok(())
}
