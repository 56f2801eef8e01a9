//! Benchmark entry point: build one index variant over a dataset
//! directory and sweep search quality against groundtruth.

use std::process::exit;
use vseq::Runner;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 || args.len() > 5 {
        eprintln!("Usage: {} <dim> <data_dir> <index_name> [metric]", args[0]);
        eprintln!("  index_name: brute_force | set | seq");
        eprintln!("  metric:     maxsim | dtw | sdtw (default dtw)");
        exit(1);
    }

    let dim: usize = match args[1].parse() {
        Ok(dim) if dim > 0 => dim,
        _ => {
            eprintln!("Invalid dimension: {}", args[1]);
            exit(1);
        }
    };
    let metric = args.get(4).map(String::as_str).unwrap_or("dtw");

    let runner = match Runner::new(dim, &args[2], &args[3], metric) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    if let Err(e) = runner.run() {
        eprintln!("{}", e);
        exit(1);
    }
}
