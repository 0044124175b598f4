use anyhow::Result;

use crate::args::Cli;

mod analyze;

pub fn dispatch(cli: Cli) -> Result<()> {
    analyze::run(&cli)
}
