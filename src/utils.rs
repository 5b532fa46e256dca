use log::info;
use std::time::Instant;

/// Runs `f` and logs how long it took under `label`.
pub(crate) fn timed<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    info!("'{}' took {:.4?}", label, start.elapsed());
    result
}
