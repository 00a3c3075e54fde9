//! MLFQ Kernel — ядро с многоуровневой очередью с обратной связью
//!
//! Три независимые таблицы со своими блокировками: реестр процессов,
//! таблица очередей и слот эксклюзивной блокировки. Цикл планировщика
//! на каждом CPU выбирает процесс и опрашивает его контекст.
//! Three independent tables, each behind its own lock: the process registry,
//! the queue table and the exclusive lock slot. A scheduler loop per CPU
//! picks a process and polls its execution context.
//!
//! Порядок блокировок (внешняя первой) / Lock order (outermost first):
//!
//! ```text
//!   contexts[slot] → clock → procs → queues → lock_slot
//!   images[slot], console — листовые / leaf locks
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// Box, Vec для контекстов и образов / Box, Vec for contexts and images
extern crate alloc;

pub mod config;
pub mod drivers;
pub mod error;
pub mod klog;
pub mod param;
pub mod proc;
pub mod sched;
pub mod syscall;
pub mod task;

use alloc::boxed::Box;
use core::future::Future;

use heapless::Vec;
use spin::{Mutex, Once};

pub use config::KernelConfig;
pub use proc::image::{Bare, Image};
pub use proc::{Channel, Pcb, Pid, ProcFlags, ProcState, Slot};
pub use sched::cpu::Cpu;
pub use sched::scheduler::Dispatch;
pub use task::{Body, Sys};

use param::{NCPU, NLEVEL, NPROC};
use proc::ProcTable;
use sched::clock::Clock;
use sched::lock::LockSlot;
use sched::queue::QueueTable;

/// Экземпляр ядра / A kernel instance.
///
/// Обычно `static`; тесты создают по экземпляру через `Box::leak`.
/// Usually a `static`; tests leak one instance each.
pub struct Kernel {
    config: KernelConfig,
    pub(crate) procs: Mutex<ProcTable>,
    pub(crate) queues: Mutex<QueueTable>,
    pub(crate) lock_slot: Mutex<LockSlot>,
    pub(crate) clock: Mutex<Clock>,
    cpus: [Cpu; NCPU],
    /// Контекст исполнения; держится CPU на время poll.
    /// Execution context; held by the CPU for the duration of a poll.
    pub(crate) contexts: [Mutex<Option<Body>>; NPROC],
    pub(crate) images: [Mutex<Option<Box<dyn Image>>>; NPROC],
    pub(crate) root: Once<Slot>,
}

impl Kernel {
    pub const fn new(config: KernelConfig) -> Self {
        const NO_BODY: Mutex<Option<Body>> = Mutex::new(None);
        const NO_IMAGE: Mutex<Option<Box<dyn Image>>> = Mutex::new(None);
        const OFFLINE: Cpu = Cpu::new(0);

        let mut cpus = [OFFLINE; NCPU];
        let mut id = 0;
        while id < NCPU {
            cpus[id] = Cpu::new(id);
            id += 1;
        }

        Self {
            config,
            procs: Mutex::new(ProcTable::new()),
            queues: Mutex::new(QueueTable::new()),
            lock_slot: Mutex::new(LockSlot::new()),
            clock: Mutex::new(Clock::new()),
            cpus,
            contexts: [NO_BODY; NPROC],
            images: [NO_IMAGE; NPROC],
            root: Once::new(),
        }
    }

    /// Загрузка: логгер, затем корневой процесс.
    /// Boot: logger first, then the root process.
    pub fn boot<F, Fut>(&'static self, image: Box<dyn Image>, entry: F) -> Pid
    where
        F: FnOnce(Sys) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // 0. Логгер / Logger
        klog::init(self.config.log_level);
        kprintln!("mlfq kernel booting...");
        kprintln!(
            "[sched] {} levels, quanta {:?}, boost every {} ticks",
            NLEVEL,
            self.config.quantum,
            self.config.boost_interval
        );

        // 1. Первый процесс / First process
        let pid = self.userinit(image, entry);
        kprintln!("[proc] init is pid {}", pid);
        pid
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn cpu(&self, id: usize) -> &Cpu {
        &self.cpus[id]
    }

    /// Тики с последнего сброса / Ticks since the last reset.
    pub fn uptime(&self) -> u32 {
        self.clock.lock().ticks()
    }

    pub fn jiffies(&self) -> u64 {
        self.clock.lock().jiffies()
    }

    /// Копия PCB живого процесса / Copy of a live process's PCB.
    pub fn pcb(&self, pid: Pid) -> Option<Pcb> {
        let procs = self.procs.lock();
        procs.find(pid).map(|slot| procs[slot])
    }

    /// Pid'ы уровня в порядке хранения / Pids of a level in storage order.
    pub fn queued(&self, level: usize) -> Vec<Pid, NPROC> {
        let procs = self.procs.lock();
        let queues = self.queues.lock();
        queues.level(level).iter().map(|&s| procs[s].pid).collect()
    }

    pub fn lock_holder(&self) -> Option<Pid> {
        let procs = self.procs.lock();
        let slot = self.lock_slot.lock().holder();
        slot.map(|s| procs[s].pid)
    }

    pub fn count(&self, state: ProcState) -> usize {
        self.procs.lock().count(state)
    }

    /// Проверить инварианты таблиц под их блокировками.
    /// Check the cross-table invariants under their locks.
    pub fn audit(&self) -> Result<(), &'static str> {
        let procs = self.procs.lock();
        let queues = self.queues.lock();
        let lock = self.lock_slot.lock();

        let mut seen = [false; NPROC];
        for level in 0..NLEVEL {
            for &slot in queues.level(level) {
                if seen[slot] {
                    return Err("slot queued twice");
                }
                seen[slot] = true;
                if procs[slot].state() != ProcState::Runnable {
                    return Err("queued process is not runnable");
                }
                if procs[slot].level != level {
                    return Err("queued process disagrees on its level");
                }
            }
        }
        if let Some(holder) = lock.holder() {
            if seen[holder] {
                return Err("lock holder is also queued");
            }
            if !procs[holder].is_locked() {
                return Err("lock holder is not flagged");
            }
        }
        if procs
            .live()
            .any(|(slot, p)| p.is_locked() && lock.holder() != Some(slot))
        {
            return Err("stale lock flag");
        }
        Ok(())
    }
}
