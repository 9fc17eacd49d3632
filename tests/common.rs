use std::{fmt::Write as _, fs, path::Path};

/// Payload sizes swept by the benchmark harness, in bytes.
pub fn harness_sizes() -> Vec<u64> {
    (10..5_000)
        .step_by(10)
        .chain((5_000..200_000).step_by(1000))
        .collect()
}

/// Write a processing-time CSV in the format produced by the benchmark
/// harness. Latency grows linearly with the payload size.
pub fn write_harness_csv(path: &Path, algos: &[(&str, f64)]) {
    let mut csv = String::from("algo,size(bytes),avg_proc_time(ms),std_err(ms),std_dev(ms)\n");
    for (algo, ms_per_kb) in algos {
        for size in harness_sizes() {
            let avg = size as f64 / 1000.0 * ms_per_kb;
            let std_dev = avg / 10.0;
            writeln!(csv, "{algo},{size},{avg:.4},{:.4},{std_dev:.4}", std_dev / 100.0).unwrap();
        }
    }
    fs::write(path, csv).unwrap();
}
