//! Console — приёмник отладочного вывода
//!
//! Ядро не знает, куда печатать: платформа регистрирует `fmt::Write`
//! (COM1 на железе, stdout на хосте). Без приёмника вывод теряется.
//! The kernel does not know where to print: the platform registers a
//! `fmt::Write` sink (COM1 on hardware, stdout on the host). With no sink
//! registered, output is dropped.

use core::fmt;
use spin::Mutex;

/// Приёмник консоли / Console sink.
pub type Sink = dyn fmt::Write + Send;

static CONSOLE: Mutex<Option<&'static mut Sink>> = Mutex::new(None);

/// Зарегистрировать приёмник, вернув предыдущий.
/// Register the sink, returning the previous one.
pub fn init(sink: &'static mut Sink) -> Option<&'static mut Sink> {
    CONSOLE.lock().replace(sink)
}

/// Внутренняя функция для макроса kprint!
/// Internal function for kprint! macro
pub fn _print(args: fmt::Arguments) {
    if let Some(sink) = CONSOLE.lock().as_mut() {
        sink.write_fmt(args).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;
    use std::string::String;

    static CAPTURED: Mutex<String> = Mutex::new(String::new());

    struct Capture;

    impl fmt::Write for Capture {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            CAPTURED.lock().push_str(s);
            Ok(())
        }
    }

    #[test]
    fn prints_into_registered_sink() {
        let prev = init(Box::leak(Box::new(Capture)));

        crate::kprintln!("pid {} {}", 7, "runble");
        crate::kprint!("tail");
        assert!(CONSOLE.lock().take().is_some());
        crate::kprint!("lost");

        if let Some(p) = prev {
            init(p);
        }
        let out = CAPTURED.lock();
        assert!(out.contains("pid 7 runble\ntail"));
        assert!(!out.contains("lost"));
    }
}
