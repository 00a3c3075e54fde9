//! Время / Time — sleep, uptime.

use mlfq_kernel::syscall::{SYS_SLEEP, SYS_UPTIME};

use crate::{call, Error, Result, Sys};

/// Проспать `ticks` тиков / Sleep for `ticks` ticks.
pub async fn sleep(sys: Sys, ticks: u32) -> Result<()> {
    call(sys, SYS_SLEEP, ticks as usize, 0, Error::Interrupted)
        .await
        .map(drop)
}

/// Тики с последнего сброса (блокировка и буст сбрасывают счётчик).
/// Ticks since the last reset (locking and boosting reset the counter).
pub async fn uptime(sys: Sys) -> Result<u32> {
    call(sys, SYS_UPTIME, 0, 0, Error::InvalidArg)
        .await
        .map(|t| t as u32)
}
