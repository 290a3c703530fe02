//! `extplan completions` command

use anyhow::Result;
use clap::CommandFactory;

use crate::cli::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let mut out = std::io::stdout().lock();

    clap_complete::generate(args.shell, &mut cmd, "extplan", &mut out);

    Ok(())
}
