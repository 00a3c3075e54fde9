//! Kernel-space drivers
//!
//! Только консоль — отладочный вывод и дамп процессов.
//! Console only: debug output and the process dump.
//!   - console — приёмник `fmt::Write`, регистрируется при загрузке
//!               `fmt::Write` sink registered at boot (UART, host stdout, ...)

pub mod console;

/// Макрос для отладочного вывода.
/// Debug print macro.
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::drivers::console::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! kprintln {
    ()           => ($crate::kprint!("\n"));
    ($($arg:tt)*) => ($crate::kprint!("{}\n", format_args!($($arg)*)));
}
