use std::{env, path::Path, process};

use fedsim::{simulation, RunConfig};

fn main() {
    env_logger::init();

    let cfg = match env::args().nth(1) {
        Some(path) => RunConfig::load(Path::new(&path)),
        None => Ok(RunConfig::default()),
    };

    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("fedsim: {e}");
            process::exit(1);
        }
    };

    match simulation::run(&cfg) {
        Ok(history) => {
            if let Some(last) = history.last() {
                println!(
                    "round {}: mean loss {:.4}, mean accuracy {:.4}",
                    last.round,
                    last.mean_loss(),
                    last.mean_accuracy()
                );
            }
        }
        Err(e) => {
            eprintln!("fedsim: {e}");
            process::exit(1);
        }
    }
}
