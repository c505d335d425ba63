mod app;
mod color;
mod config;
mod continuum;
mod data;
mod error;
mod normalize;
mod state;
mod ui;

use std::io;

use app::App;
use clap::Parser;
use config::Args;
use ui::prompt::Console;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    log::debug!("{args:?}");

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());
    App::new(args).run(&mut console)
}
