mod commands;
mod export;
mod terminal;

use commands::{CommandLine, run};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);
    print::banner(commands.quiet);

    let outcome = run::run(&commands).await;
    print::end_of_program();
    outcome
}
