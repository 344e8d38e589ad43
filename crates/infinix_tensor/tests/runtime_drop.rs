#![cfg(target_os = "linux")]

mod utils;

use infinix_core::{device::Device, error::Result};
use infinix_tensor::Runtime;
use std::{fs, thread, time::Duration};

/// Live CPU stream workers of this process. Thread names are cut to 15 bytes
/// in `comm`.
fn stream_threads() -> usize {
    let Ok(tasks) = fs::read_dir("/proc/self/task") else {
        return 0;
    };
    tasks
        .filter_map(|task| task.ok())
        .filter_map(|task| fs::read_to_string(task.path().join("comm")).ok())
        .filter(|comm| comm.starts_with("infinix-cpu"))
        .count()
}

fn wait_for_stream_threads(expected: usize) -> usize {
    let mut count = stream_threads();
    for _ in 0..200 {
        if count == expected {
            break;
        }
        thread::sleep(Duration::from_millis(5));
        count = stream_threads();
    }
    count
}

// Runs in its own test binary so no other test owns stream threads.
#[test]
fn dropped_runtimes_release_their_streams() -> Result<()> {
    utils::init_logger();
    Runtime::init()?;
    let before = stream_threads();

    let runtimes = (0..8)
        .map(|_| {
            let runtime = Runtime::new();
            runtime.init_thread_context(Device::CPU, 0)?;
            Ok(runtime)
        })
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(wait_for_stream_threads(before + 8), before + 8);

    let kept = runtimes[0].clone();
    drop(runtimes);
    assert_eq!(wait_for_stream_threads(before + 1), before + 1);
    assert!(kept.current_thread_context().is_ok());

    drop(kept);
    assert_eq!(wait_for_stream_threads(before), before);
    Ok(())
}
