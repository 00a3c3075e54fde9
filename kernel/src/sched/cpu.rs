//! Per-CPU state
//!
//! Каждый CPU исполняет свой цикл планировщика. Узнать текущий процесс
//! можно только с выключенными прерываниями: `push_off` возвращает guard,
//! который восстанавливает их при drop. Вложенность считается в `ncli`.
//! Each CPU runs its own scheduler loop. The current process may only be
//! looked up with interrupts off: `push_off` hands out a guard that restores
//! them on drop. Nesting is counted in `ncli`.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::proc::Slot;

const IDLE: usize = usize::MAX;

pub struct Cpu {
    id: usize,
    current: AtomicUsize,
    ncli: AtomicU32,
    /// Были ли прерывания включены до первого push_off.
    intena: AtomicBool,
    interrupts: AtomicBool,
}

impl Cpu {
    pub const fn new(id: usize) -> Self {
        Self {
            id,
            current: AtomicUsize::new(IDLE),
            ncli: AtomicU32::new(0),
            intena: AtomicBool::new(false),
            interrupts: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// sti
    pub fn enable_interrupts(&self) {
        if self.ncli.load(Ordering::Relaxed) != 0 {
            panic!("cpu{}: sti inside push_off", self.id);
        }
        self.interrupts.store(true, Ordering::Relaxed);
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts.load(Ordering::Relaxed)
    }

    /// Выключить прерывания с учётом вложенности.
    /// Disable interrupts, counting nesting depth.
    pub fn push_off(&self) -> IrqGuard<'_> {
        let was = self.interrupts.swap(false, Ordering::Relaxed);
        if self.ncli.fetch_add(1, Ordering::Relaxed) == 0 {
            self.intena.store(was, Ordering::Relaxed);
        }
        IrqGuard { cpu: self }
    }

    fn pop_off(&self) {
        if self.interrupts_enabled() {
            panic!("cpu{}: pop_off - interruptible", self.id);
        }
        match self.ncli.load(Ordering::Relaxed) {
            0 => panic!("cpu{}: pop_off without push_off", self.id),
            1 => {
                self.ncli.store(0, Ordering::Relaxed);
                if self.intena.load(Ordering::Relaxed) {
                    self.interrupts.store(true, Ordering::Relaxed);
                }
            }
            n => self.ncli.store(n - 1, Ordering::Relaxed),
        }
    }

    /// Текущий процесс. Требует выключенных прерываний.
    /// Current process. Interrupts must be off.
    pub fn current(&self, _irq: &IrqGuard<'_>) -> Option<Slot> {
        if self.interrupts_enabled() {
            panic!("cpu{}: current() called with interrupts enabled", self.id);
        }
        match self.current.load(Ordering::Acquire) {
            IDLE => None,
            slot => Some(slot),
        }
    }

    /// Без guard и без гарантий: только для аварийного дампа.
    /// No guard and no guarantees; for the fault-path dump only.
    pub(crate) fn peek(&self) -> Option<Slot> {
        match self.current.load(Ordering::Relaxed) {
            IDLE => None,
            slot => Some(slot),
        }
    }

    pub(crate) fn set_current(&self, slot: Option<Slot>) {
        self.current.store(slot.unwrap_or(IDLE), Ordering::Release);
    }
}

/// Прерывания выключены, пока guard жив.
/// Interrupts stay off while the guard lives.
pub struct IrqGuard<'a> {
    cpu: &'a Cpu,
}

impl Drop for IrqGuard<'_> {
    fn drop(&mut self) {
        self.cpu.pop_off();
    }
}
