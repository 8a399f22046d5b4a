use std::env;

use anyhow::{Context, bail};
use log::info;
use np_learner::{config::RunConfig, sinusoid_learner};

const USAGE: &str = "usage: np-learner <train|eval> [config.json]";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let mut args = env::args().skip(1);
    let Some(mode) = args.next() else {
        bail!(USAGE);
    };

    let config = match args.next() {
        Some(path) => RunConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => RunConfig::default(),
    };

    let mut learner = sinusoid_learner(&config)?;
    info!(
        "checkpoints at {}, results at {}",
        learner.checkpoint_dir().display(),
        learner.result_dir().display()
    );

    match mode.as_str() {
        "train" => learner.run_train(&config.train)?,
        "eval" => {
            let loss = learner.run_eval(&config.eval)?;
            println!("{loss}");
        }
        other => bail!("unknown mode '{other}', {USAGE}"),
    }

    Ok(())
}
