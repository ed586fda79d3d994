mod actions;
mod cli;
mod config;
mod detector;
mod engine;
mod ipc;
mod landmarks;
mod logging;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
