use crate::colony::Colony;
use crate::config::Config;
use crate::report::RunReport;
use anyhow::{Context, Result};
use glob::glob;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Runs colonies inside a directory holding a `config.toml` and stores one
/// result file per run.
pub struct Manager {
    run_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(run_dir: P) -> Result<Self> {
        let run_dir = run_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(run_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { run_dir, cfg })
    }

    pub fn run_colony(&self) -> Result<()> {
        let result_idx = self
            .count_result_files()
            .context("failed to count result files")?;

        let seed = match self.cfg.colony.seed {
            Some(seed) => seed,
            None => ChaCha12Rng::try_from_os_rng()?.random(),
        };
        log::info!("seed = {seed}");

        let mut colony = Colony::new(&self.cfg, seed).context("failed to construct colony")?;
        let report = colony.run();
        log::info!("best cost = {:.6}", report.best_cost);

        let result_file = self.result_file(result_idx);
        report
            .save(&result_file)
            .with_context(|| format!("failed to save {result_file:?}"))?;
        log::info!("saved {result_file:?}");

        Ok(())
    }

    pub fn show_result(&self, result_idx: usize) -> Result<()> {
        let result_file = self.result_file(result_idx);
        let report = RunReport::load(&result_file)
            .with_context(|| format!("failed to load {result_file:?}"))?;

        log::info!(
            "seed = {}, alpha = {:.6}, beta = {:.6}",
            report.seed,
            report.alpha,
            report.beta
        );
        log::info!("best cost = {:.6}", report.best_cost);
        log::info!("best path = {:?}", report.best_path);
        for (rank, ant) in report.top_ants.iter().enumerate() {
            log::info!(
                "top {} ({:?}): cost = {:.6}, {} points",
                rank + 1,
                ant.outcome,
                ant.cost,
                ant.path.len()
            );
        }

        Ok(())
    }

    pub fn clean_results(&self) -> Result<()> {
        for result_file in self.result_files()? {
            fs::remove_file(&result_file)
                .with_context(|| format!("failed to remove {result_file:?}"))?;
            log::info!("removed {result_file:?}");
        }
        Ok(())
    }

    fn result_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.run_dir.join("result-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let files = glob(pattern)
            .context("failed to glob result files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        Ok(files)
    }

    fn count_result_files(&self) -> Result<usize> {
        Ok(self.result_files()?.len())
    }

    fn result_file(&self, result_idx: usize) -> PathBuf {
        self.run_dir.join(format!("result-{result_idx:04}.msgpack"))
    }
}
