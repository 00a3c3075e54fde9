//! libmlfq — типизированные обёртки над точками входа ядра
//!
//! Тонкий слой над нумерованными syscall'ами: отрицательные коды
//! превращаются в [`Error`].
//! Thin layer over the numbered syscalls: negative sentinels become
//! [`Error`] values.
//!
//! Использование / Usage:
//!   use libmlfq::{process, sched};
//!   let child = process::fork(sys, |sys| async move { sched::yield_now(sys).await })?;
//!   let reaped = process::wait(sys).await?;

#![cfg_attr(not(test), no_std)]

pub mod process;
pub mod sched;
pub mod time;

pub use mlfq_kernel::{Pid, Sys};

/// Ошибки syscall / Syscall errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Нет свободного слота или памяти / No free slot or memory.
    NoResources,
    /// Нет детей для wait / No children to wait for.
    NoChildren,
    /// Нет такого pid / No such pid.
    NotFound,
    InvalidArg,
    /// Блокировка занята / Lock held by another process.
    Busy,
    /// Прервано kill / Interrupted by kill.
    Interrupted,
    /// Неизвестный номер syscall / Unknown syscall number.
    NoSys,
    Unknown(isize),
}

pub type Result<T> = core::result::Result<T, Error>;

/// `-1` → `on_failure`, прочие отрицательные → по коду.
/// `-1` maps to `on_failure`, other negatives by code.
pub(crate) fn check(ret: isize, on_failure: Error) -> Result<isize> {
    match ret {
        r if r >= 0 => Ok(r),
        mlfq_kernel::error::FAILURE => Err(on_failure),
        mlfq_kernel::error::ENOSYS => Err(Error::NoSys),
        r => Err(Error::Unknown(r)),
    }
}

pub(crate) async fn call(
    sys: Sys,
    number: usize,
    arg0: usize,
    arg1: usize,
    on_failure: Error,
) -> Result<isize> {
    check(mlfq_kernel::syscall::dispatch(sys, number, arg0, arg1).await, on_failure)
}

/// Сырой вызов по номеру / Raw call by number.
pub async fn syscall(sys: Sys, number: usize, arg0: usize, arg1: usize) -> Result<isize> {
    call(sys, number, arg0, arg1, Error::Unknown(mlfq_kernel::error::FAILURE)).await
}
