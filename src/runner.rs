//! Benchmark runner: dataset loading, ef sweeps, recall accounting, and
//! CSV records.
//!
//! The runner drives one index variant over a dataset directory laid out
//! as `base.fvecs` / `base.lens` / `query.fvecs` / `query.lens` /
//! `groundtruth-<metric>.ivecs`, sweeping the query-time `ef` and
//! recording per-sweep timing, recall, and the index's metric counters.

use crate::dataset::{read_groundtruth, SequenceDataset};
use crate::error::{Error, Result};
use crate::hnsw::HnswParams;
use crate::index::{IndexVariant, VssIndex};
use crate::metric::SimMetric;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One row of the search sweep.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    /// Beam width used for this sweep.
    pub ef: usize,
    /// Total search time over all queries, microseconds.
    pub time: u64,
    /// Groundtruth ids recovered.
    pub hit: usize,
    /// Groundtruth ids expected.
    pub total: usize,
    /// Number of queries run.
    pub q_num: usize,
    /// Index counters captured after the sweep.
    pub counters: Vec<(&'static str, u64)>,
}

/// Loads a dataset directory and sweeps one index variant over it.
pub struct Runner {
    index_name: String,
    metric: SimMetric,
    variant: IndexVariant,
    params: HnswParams,
    base: SequenceDataset,
    query: SequenceDataset,
    groundtruth: Vec<Vec<u32>>,
    efs: Vec<usize>,
    log_dir: PathBuf,
}

impl Runner {
    /// Load base, query, and groundtruth files for the given metric and
    /// index variant.
    pub fn new(dim: usize, data_dir: impl AsRef<Path>, index_name: &str, metric_name: &str) -> Result<Self> {
        let metric: SimMetric = metric_name.parse()?;
        let variant: IndexVariant = index_name.parse()?;
        let data_dir = data_dir.as_ref();

        let base = SequenceDataset::load(dim, data_dir.join("base.fvecs"), data_dir.join("base.lens"))?;
        let query = SequenceDataset::load(dim, data_dir.join("query.fvecs"), data_dir.join("query.lens"))?;
        let groundtruth = read_groundtruth(data_dir.join(format!("groundtruth-{}.ivecs", metric.name())))?;

        if groundtruth.len() != query.seq_count() {
            return Err(Error::invalid_arg(
                "groundtruth",
                format!("{} records for {} queries", groundtruth.len(), query.seq_count()),
            ));
        }
        if groundtruth.is_empty() {
            return Err(Error::invalid_arg("groundtruth", "no records"));
        }

        let efs = match variant {
            IndexVariant::BruteForce => vec![0],
            _ => vec![10, 20, 50, 100, 200, 500, 1000],
        };

        Ok(Self {
            index_name: index_name.to_string(),
            metric,
            variant,
            params: HnswParams::with_m(16).with_ef_construction(200),
            base,
            query,
            groundtruth,
            efs,
            log_dir: PathBuf::from("log"),
        })
    }

    /// Override the graph construction parameters.
    pub fn with_params(mut self, params: HnswParams) -> Self {
        self.params = params;
        self
    }

    /// Override the ef sweep values.
    pub fn with_efs(mut self, efs: Vec<usize>) -> Self {
        self.efs = efs;
        self
    }

    /// Override the CSV output directory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Build the index, sweep every ef, print a summary, and write the
    /// CSV record file. Returns the sweep rows.
    pub fn run(&self) -> Result<Vec<QueryRecord>> {
        let begin = Instant::now();
        let mut index = VssIndex::build(&self.base, self.metric, self.variant, self.params)?;
        println!("Build Time: {} us", begin.elapsed().as_micros());
        println!();

        let k = self.groundtruth[0].len();
        let mut records = Vec::with_capacity(self.efs.len());
        for &ef in &self.efs {
            index.reset_metrics();
            records.push(self.run_search_once(&mut index, k, ef)?);
        }

        for r in &records {
            println!("EF: {}", r.ef);
            println!(
                "Tot Time: {} us, Avg Time: {:.2} us",
                r.time,
                r.time as f64 / r.q_num as f64
            );
            println!("Recall: {}/{} = {:.4}", r.hit, r.total, r.hit as f64 / r.total as f64);
            println!();
        }

        let csv_path = self.save_records(&records)?;
        println!("Query records written to {}", csv_path.display());

        Ok(records)
    }

    fn run_search_once(&self, index: &mut VssIndex<'_>, k: usize, ef: usize) -> Result<QueryRecord> {
        let mut time = 0u64;
        let mut hit = 0;
        let mut total = 0;
        let mut q_num = 0;

        for i in 0..self.query.seq_count() {
            let q = self.query.sequence(i);

            let begin = Instant::now();
            let result = index.search(q, k, ef)?;
            time += begin.elapsed().as_micros() as u64;

            debug_assert!(result.len() <= k);
            let gt = &self.groundtruth[i];
            hit += result.iter().filter(|n| gt.contains(&n.sid)).count();
            total += gt.len();
            q_num += 1;
        }

        Ok(QueryRecord {
            ef,
            time,
            hit,
            total,
            q_num,
            counters: index.metrics(),
        })
    }

    fn save_records(&self, records: &[QueryRecord]) -> Result<PathBuf> {
        fs::create_dir_all(&self.log_dir).map_err(Error::io_err(&self.log_dir, "create log directory"))?;

        let stamp = chrono::Local::now().format("%y%m%d-%H%M%S");
        let csv_path = self.log_dir.join(format!("{}-search-{}.csv", self.index_name, stamp));
        let mut file = fs::File::create(&csv_path).map_err(Error::io_err(&csv_path, "create"))?;

        let mut header = String::from("ef,time,hit,total,q_num");
        for (name, _) in &records[0].counters {
            header.push(',');
            header.push_str(name);
        }
        writeln!(file, "{}", header).map_err(Error::io_err(&csv_path, "write header"))?;

        for r in records {
            let mut row = format!("{},{},{},{},{}", r.ef, r.time, r.hit, r.total, r.q_num);
            for &(_, value) in &r.counters {
                row.push(',');
                row.push_str(&value.to_string());
            }
            writeln!(file, "{}", row).map_err(Error::io_err(&csv_path, "write row"))?;
        }

        Ok(csv_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};

    fn write_fvecs(path: &Path, dim: usize, vectors: &[Vec<f32>]) {
        let mut out = Vec::new();
        for v in vectors {
            out.write_i32::<LittleEndian>(dim as i32).unwrap();
            for &x in v {
                out.write_f32::<LittleEndian>(x).unwrap();
            }
        }
        fs::write(path, out).unwrap();
    }

    fn write_lens(path: &Path, lens: &[i32]) {
        let mut out = Vec::new();
        for &l in lens {
            out.write_i32::<LittleEndian>(l).unwrap();
        }
        fs::write(path, out).unwrap();
    }

    fn write_ivecs(path: &Path, records: &[Vec<i32>]) {
        let mut out = Vec::new();
        for record in records {
            out.write_i32::<LittleEndian>(record.len() as i32).unwrap();
            for &id in record {
                out.write_i32::<LittleEndian>(id).unwrap();
            }
        }
        fs::write(path, out).unwrap();
    }

    fn seed_data_dir(dir: &Path) {
        // Two base sequences of two 2-d vectors each, one query equal to
        // the first sequence
        write_fvecs(
            &dir.join("base.fvecs"),
            2,
            &[vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0], vec![6.0, 5.0]],
        );
        write_lens(&dir.join("base.lens"), &[2, 2]);
        write_fvecs(&dir.join("query.fvecs"), 2, &[vec![0.0, 0.0], vec![1.0, 0.0]]);
        write_lens(&dir.join("query.lens"), &[2]);
        write_ivecs(&dir.join("groundtruth-dtw.ivecs"), &[vec![0]]);
    }

    #[test]
    fn test_runner_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        seed_data_dir(dir.path());

        let runner = Runner::new(2, dir.path(), "brute_force", "dtw")
            .unwrap()
            .with_log_dir(dir.path().join("log"));
        let records = runner.run().unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.q_num, 1);
        assert_eq!(r.total, 1);
        // The query is sequence 0 itself
        assert_eq!(r.hit, 1);

        // A timestamped CSV appeared in the log directory
        let logs: Vec<_> = fs::read_dir(dir.path().join("log")).unwrap().collect();
        assert_eq!(logs.len(), 1);
        let name = logs[0].as_ref().unwrap().file_name().into_string().unwrap();
        assert!(name.starts_with("brute_force-search-"));
        assert!(name.ends_with(".csv"));

        let content = fs::read_to_string(logs[0].as_ref().unwrap().path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), "ef,time,hit,total,q_num,dist_comps");
        assert!(lines.next().unwrap().starts_with("0,"));
    }

    #[test]
    fn test_runner_graph_variant_sweeps() {
        let dir = tempfile::tempdir().unwrap();
        seed_data_dir(dir.path());

        let runner = Runner::new(2, dir.path(), "seq", "dtw")
            .unwrap()
            .with_params(HnswParams::with_m(4).with_seed(9))
            .with_efs(vec![5, 50])
            .with_log_dir(dir.path().join("log"));
        let records = runner.run().unwrap();

        assert_eq!(records.len(), 2);
        for r in &records {
            assert_eq!(r.q_num, 1);
            assert_eq!(r.hit, 1, "ef={} missed the identical sequence", r.ef);
        }
    }

    #[test]
    fn test_runner_rejects_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        seed_data_dir(dir.path());

        assert!(matches!(
            Runner::new(2, dir.path(), "my_hnsw", "dtw"),
            Err(Error::UnknownVariant(_))
        ));
        assert!(matches!(
            Runner::new(2, dir.path(), "set", "euclid"),
            Err(Error::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_runner_rejects_groundtruth_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        seed_data_dir(dir.path());
        write_ivecs(&dir.path().join("groundtruth-dtw.ivecs"), &[vec![0], vec![1]]);

        assert!(matches!(
            Runner::new(2, dir.path(), "brute_force", "dtw"),
            Err(Error::InvalidArgument { .. })
        ));
    }
}
