//! Ошибки ядра / Kernel errors
//!
//! Каждая операция возвращает отдельную ошибку, а не молча падает.
//! Every operation reports a distinct error instead of failing silently.
//! Нарушения инвариантов сюда не входят: это `panic!` / invariant violations
//! are not errors, they halt the kernel.

use core::fmt;

/// Общий отрицательный код неудачи / Generic failure sentinel.
pub const FAILURE: isize = -1;

/// Неизвестный номер syscall / Unknown syscall number.
pub const ENOSYS: isize = -38;

/// Ошибки таблицы очередей / Queue table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// Уровень вне диапазона / Level outside `0..NLEVEL`.
    InvalidLevel,
    /// Уровень заполнен / Level already holds `NPROC` entries.
    Full,
    /// Процесс не RUNNABLE / Process is not RUNNABLE.
    NotRunnable,
    /// Уровень пуст / Level is empty.
    Empty,
    /// Pid нет ни в одной очереди / Pid is not queued anywhere.
    NotFound,
}

impl QueueError {
    pub const fn code(self) -> isize {
        match self {
            Self::InvalidLevel => -3,
            Self::Full => -2,
            Self::NotRunnable => -1,
            Self::Empty => -4,
            Self::NotFound => -5,
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidLevel => "invalid queue level",
            Self::Full => "queue level at capacity",
            Self::NotRunnable => "process not runnable",
            Self::Empty => "queue level empty",
            Self::NotFound => "pid not queued",
        };
        f.write_str(msg)
    }
}

/// Ошибки эксклюзивной блокировки / Exclusive scheduling lock errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// Неверный пароль — вызывающий завершается / Wrong credential, caller dies.
    BadCredential,
    /// Слот уже занят / Slot is already held.
    Busy,
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadCredential => f.write_str("wrong scheduler lock password"),
            Self::Busy => f.write_str("scheduler lock already held"),
        }
    }
}

/// Ошибки жизненного цикла процессов / Process lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcError {
    /// Нет свободного PCB / No UNUSED registry slot.
    NoSlot,
    /// Внешний аллокатор отказал / External memory collaborator refused.
    NoMemory,
    /// Нет детей для wait / Caller has no children.
    NoChildren,
    /// Pid не найден / Pid not found.
    NoSuchProcess,
    /// Приоритет вне 0..=MAX_PRIORITY / Priority out of range.
    InvalidPriority,
    /// Вызывающий убит / Caller was killed while waiting.
    Killed,
}

impl fmt::Display for ProcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NoSlot => "process table full",
            Self::NoMemory => "out of memory",
            Self::NoChildren => "no children",
            Self::NoSuchProcess => "no such process",
            Self::InvalidPriority => "priority out of range",
            Self::Killed => "killed",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_codes_are_distinct() {
        let codes = [
            QueueError::InvalidLevel.code(),
            QueueError::Full.code(),
            QueueError::NotRunnable.code(),
            QueueError::Empty.code(),
            QueueError::NotFound.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(*a < 0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(QueueError::InvalidLevel.code(), -3);
        assert_eq!(QueueError::Full.code(), -2);
        assert_eq!(QueueError::NotRunnable.code(), -1);
    }
}
