//! Планирование / Scheduling — yield, уровень, приоритет, блокировка.

use mlfq_kernel::syscall::{
    SYS_GET_LEVEL, SYS_SCHEDULER_LOCK, SYS_SCHEDULER_UNLOCK, SYS_SET_PRIORITY, SYS_YIELD,
};

use crate::{call, Error, Pid, Result, Sys};

pub async fn yield_now(sys: Sys) {
    // yield не отказывает / yield never fails
    call(sys, SYS_YIELD, 0, 0, Error::InvalidArg).await.ok();
}

/// Текущий уровень MLFQ / Current MLFQ level.
pub async fn level(sys: Sys) -> Result<usize> {
    call(sys, SYS_GET_LEVEL, 0, 0, Error::InvalidArg)
        .await
        .map(|l| l as usize)
}

pub async fn set_priority(sys: Sys, target: Pid, priority: i32) -> Result<()> {
    call(
        sys,
        SYS_SET_PRIORITY,
        target.0 as usize,
        priority as isize as usize,
        Error::InvalidArg,
    )
    .await
    .map(drop)
}

/// Монопольный CPU. С неверным паролем не возвращается: ядро завершает
/// вызывающего.
/// Monopolize the CPU. With a wrong password this never returns: the kernel
/// terminates the caller.
pub async fn lock(sys: Sys, password: i32) -> Result<()> {
    call(sys, SYS_SCHEDULER_LOCK, password as isize as usize, 0, Error::Busy)
        .await
        .map(drop)
}

pub async fn unlock(sys: Sys, password: i32) -> Result<()> {
    call(sys, SYS_SCHEDULER_UNLOCK, password as isize as usize, 0, Error::InvalidArg)
        .await
        .map(drop)
}
