use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

fn main() {
    let out_dir = env::var_os("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("config.rs");

    let ecg_analyze_every: u32 = env::var("ECG_ANALYZE_EVERY")
        .ok()
        .map(|p| p.parse::<u32>().unwrap())
        .unwrap_or(32);

    let probe_attempts: u32 = env::var("PROBE_ATTEMPTS")
        .ok()
        .map(|p| p.parse::<u32>().unwrap())
        .unwrap_or(10);

    let probe_interval_ms: u16 = env::var("PROBE_INTERVAL_MS")
        .ok()
        .map(|p| p.parse::<u16>().unwrap())
        .unwrap_or(1000);

    let bench_period_ms: u16 = env::var("BENCH_PERIOD_MS")
        .ok()
        .map(|p| p.parse::<u16>().unwrap())
        .unwrap_or(500);

    let bench_wave_cycles: u32 = env::var("BENCH_WAVE_CYCLES")
        .ok()
        .map(|p| p.parse::<u32>().unwrap())
        .unwrap_or(40);

    let bench_decimate: usize = env::var("BENCH_DECIMATE")
        .ok()
        .map(|p| p.parse::<usize>().unwrap())
        .unwrap_or(4);

    assert!(ecg_analyze_every > 0, "ECG_ANALYZE_EVERY must be at least 1");
    assert!(probe_attempts > 0, "PROBE_ATTEMPTS must be at least 1");
    assert!(bench_decimate > 0, "BENCH_DECIMATE must be at least 1");

    let fd = fs::File::create(&dest_path).unwrap();
    writeln!(&fd, "pub const ECG_ANALYZE_EVERY: u32 = {ecg_analyze_every};").unwrap();
    writeln!(&fd, "pub const PROBE_ATTEMPTS: u32 = {probe_attempts};").unwrap();
    writeln!(&fd, "pub const PROBE_INTERVAL_MS: u16 = {probe_interval_ms};").unwrap();
    writeln!(&fd, "pub const BENCH_PERIOD_MS: u16 = {bench_period_ms};").unwrap();
    writeln!(&fd, "pub const BENCH_WAVE_CYCLES: u32 = {bench_wave_cycles};").unwrap();
    writeln!(&fd, "pub const BENCH_DECIMATE: usize = {bench_decimate};").unwrap();

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=ECG_ANALYZE_EVERY");
    println!("cargo:rerun-if-env-changed=PROBE_ATTEMPTS");
    println!("cargo:rerun-if-env-changed=PROBE_INTERVAL_MS");
    println!("cargo:rerun-if-env-changed=BENCH_PERIOD_MS");
    println!("cargo:rerun-if-env-changed=BENCH_WAVE_CYCLES");
    println!("cargo:rerun-if-env-changed=BENCH_DECIMATE");
}
