//! Kernel logger — мост `log` → консоль
//!
//! Подсистемы пишут через `log::{debug, info, ...}` с целями
//! `sched`, `proc`, `lock`, `syscall`; записи уходят в `kprintln!`.
//! Subsystems log through the `log` facade under the `sched`, `proc`,
//! `lock` and `syscall` targets; records end up in `kprintln!`.

use log::{LevelFilter, Log, Metadata, Record};

struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            crate::kprintln!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Установить логгер один раз; повторный вызов только меняет уровень.
/// Install the logger once; later calls only change the level.
pub fn init(level: LevelFilter) {
    // Err: уже установлен / already installed.
    log::set_logger(&LOGGER).ok();
    log::set_max_level(level);
}
