//! Scheduler Loop — цикл планировщика на каждом CPU
//!
//! Итерация: включить прерывания, проверить слот блокировки, иначе обойти
//! уровни сверху вниз. На каждом уровне снимаем головы: мёртвые записи
//! выбрасываются, убитые завершаются, исчерпавшие квант понижаются,
//! первая годная запись исполняется.
//!
//! One iteration: enable interrupts, consult the lock slot, otherwise walk
//! the levels top to bottom. At each level heads are popped: dead entries
//! are dropped, killed ones are terminated, those out of quantum are
//! demoted, and the first eligible one is dispatched.

use core::future::Future;
use core::task::{Context, Poll, Waker};

use heapless::Vec;
use log::{debug, trace, warn};

use super::cpu::Cpu;
use super::lock::Release;
use crate::param::{BOTTOM, NLEVEL, NPROC, TOP};
use crate::proc::lifecycle::wakeup_locked;
use crate::proc::{Channel, Pid, ProcState, ProcTable, Slot};
use crate::sched::queue::QueueTable;
use crate::Kernel;

/// Итог одной итерации / Outcome of one scheduler iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Процесс исполнялся до следующей приостановки.
    /// The process ran until its next suspension.
    Ran(Pid),
    /// Убитый процесс завершён в этой безопасной точке.
    /// A killed process was terminated at this checkpoint.
    Terminated(Pid),
    /// Запускать некого / Nothing to run.
    Idle,
}

enum Pick {
    Run(Slot, Pid),
    Terminate(Slot, Pid),
    Idle,
}

impl Kernel {
    /// Цикл планировщика CPU `cpu`. Не возвращается.
    /// Scheduler loop of CPU `cpu`. Never returns.
    pub fn run(&'static self, cpu: usize) -> ! {
        debug!(target: "sched", "cpu{}: scheduler online", cpu);
        loop {
            if self.schedule_once(cpu) == Dispatch::Idle {
                core::hint::spin_loop();
            }
        }
    }

    /// Одна итерация цикла планировщика / One scheduler loop iteration.
    pub fn schedule_once(&'static self, cpu: usize) -> Dispatch {
        let c = self.cpu(cpu);
        c.enable_interrupts();

        let pick = {
            let _irq = c.push_off();
            self.pick(cpu)
        };

        match pick {
            Pick::Idle => {
                self.clock_interrupt(cpu, None);
                Dispatch::Idle
            }
            Pick::Terminate(slot, pid) => {
                c.set_current(Some(slot));
                let mut ctx = self.contexts[slot].lock();
                self.terminate(slot);
                *ctx = None;
                c.set_current(None);
                Dispatch::Terminated(pid)
            }
            Pick::Run(slot, pid) => {
                self.dispatch(c, slot, pid);
                Dispatch::Ran(pid)
            }
        }
    }

    /// Выбрать процесс и пометить его RUNNING на `cpu`.
    fn pick(&self, cpu: usize) -> Pick {
        let mut procs = self.procs.lock();
        let mut queues = self.queues.lock();
        let mut lock_slot = self.lock_slot.lock();

        while let Some(holder) = lock_slot.holder() {
            let p = &procs[holder];
            if p.state() == ProcState::Running {
                // Держатель исполняется на другом CPU.
                return Pick::Idle;
            }
            if !p.is_dispatchable() {
                debug!(target: "sched", "pid {}: lock holder gone, releasing", p.pid);
                lock_slot.release(&mut procs, &mut queues, Release::Readmit);
                continue;
            }
            return Pick::Run(holder, Self::mark_running(&mut procs, holder, cpu));
        }
        drop(lock_slot);

        for level in TOP..NLEVEL {
            while let Ok(slot) = queues.dequeue(&procs, level) {
                let p = &mut procs[slot];
                if p.state() != ProcState::Runnable {
                    warn!(target: "sched", "pid {} queued while {:?}, dropped", p.pid, p.state());
                    continue;
                }
                if p.is_killed() {
                    return Pick::Terminate(slot, Self::mark_running(&mut procs, slot, cpu));
                }
                if p.exec_time >= self.config().quantum(level) {
                    Self::demote(&mut procs, &mut queues, slot, level);
                    continue;
                }
                return Pick::Run(slot, Self::mark_running(&mut procs, slot, cpu));
            }
        }
        Pick::Idle
    }

    fn mark_running(procs: &mut ProcTable, slot: Slot, cpu: usize) -> Pid {
        let p = &mut procs[slot];
        p.set_state(ProcState::Running);
        p.cpu = Some(cpu);
        p.pid
    }

    /// Квант исчерпан: сбросить execTime, спуститься на уровень ниже;
    /// на нижнем уровне потерять единицу приоритета.
    /// Quantum used up: reset execTime and move one level down; at the
    /// lowest level lose one priority step instead.
    fn demote(procs: &mut ProcTable, queues: &mut QueueTable, slot: Slot, level: usize) {
        let p = &mut procs[slot];
        p.exec_time = 0;
        let next = if level < BOTTOM {
            level + 1
        } else {
            p.priority = p.priority.saturating_sub(1);
            BOTTOM
        };
        trace!(target: "sched", "pid {}: demoted to level {} (priority {})", p.pid, next, p.priority);
        if let Err(e) = queues.enqueue(procs, slot, next) {
            warn!(target: "sched", "pid {}: demotion failed: {}", procs[slot].pid, e);
        }
    }

    /// Опросить контекст процесса до его приостановки.
    ///
    /// Контекст держится на время poll; CPU, выбравший тот же процесс после
    /// его yield, ждёт здесь, пока этот poll не вернётся.
    /// Polls the context until the process suspends. The context stays
    /// locked for the whole poll; a CPU that picked the same process after
    /// its yield waits here until this poll returns.
    fn dispatch(&self, c: &Cpu, slot: Slot, pid: Pid) {
        c.set_current(Some(slot));
        let mut ctx = self.contexts[slot].lock();

        // Планировщик сам решает, когда опрашивать / the scheduler decides when to poll.
        let mut cx = Context::from_waker(Waker::noop());
        let outcome = match &mut *ctx {
            Some(body) => body.as_mut().poll(&mut cx),
            None => panic!("pid {}: dispatched without a context", pid),
        };

        match outcome {
            Poll::Ready(()) => {
                // Тело вернулось: выход от его имени / body returned: exit for it.
                self.terminate(slot);
                *ctx = None;
            }
            Poll::Pending => {
                let procs = self.procs.lock();
                let p = &procs[slot];
                if p.pid == pid && p.state() == ProcState::Running && p.cpu == Some(c.id()) {
                    panic!("sched: pid {} suspended while still running", pid);
                }
                let dead = p.pid != pid || matches!(p.state(), ProcState::Zombie | ProcState::Unused);
                drop(procs);
                if dead {
                    *ctx = None;
                }
            }
        }
        trace!(target: "sched", "cpu{}: pid {} off cpu", c.id(), pid);
        c.set_current(None);
    }

    /// Прерывание таймера на `cpu`.
    ///
    /// Учёт тика текущему процессу. На CPU 0 ещё: тик часов, пробуждение
    /// спящих по тикам и буст по расписанию.
    /// Timer interrupt on `cpu`: charge the tick to the current process.
    /// CPU 0 also advances the clock, wakes tick sleepers and boosts on
    /// schedule.
    pub(crate) fn clock_interrupt(&self, cpu: usize, current: Option<Slot>) {
        if cpu != 0 {
            if let Some(slot) = current {
                self.procs.lock()[slot].exec_time += 1;
            }
            return;
        }

        let mut clock = self.clock.lock();
        clock.tick();

        let mut procs = self.procs.lock();
        if let Some(slot) = current {
            procs[slot].exec_time += 1;
        }
        let mut queues = self.queues.lock();
        wakeup_locked(&mut procs, &mut queues, Channel::Ticks);

        if clock.ticks() >= self.config().boost_interval {
            self.boost_locked(&mut procs, &mut queues);
            clock.reset();
        }
    }

    /// Буст приоритетов: всё, что ниже верхнего уровня, поднимается наверх
    /// со свежими полями. Вызывающий сбрасывает `ticks`.
    /// Priority boost: everything below the top level moves up with fresh
    /// fields. The caller resets `ticks`.
    pub(crate) fn boost_locked(&self, procs: &mut ProcTable, queues: &mut QueueTable) {
        self.lock_slot
            .lock()
            .release(procs, queues, Release::Readmit);

        let top: Vec<Slot, NPROC> = queues.level(TOP).iter().copied().collect();
        for slot in top {
            procs[slot].refresh();
        }

        let mut moved = 0;
        for level in TOP + 1..NLEVEL {
            while let Ok(slot) = queues.dequeue(procs, level) {
                let stamp = procs.stamp();
                procs[slot].refresh();
                procs[slot].arrived_time = stamp;
                if let Err(e) = queues.enqueue(procs, slot, TOP) {
                    warn!(target: "sched", "pid {}: boost failed: {}", procs[slot].pid, e);
                }
                moved += 1;
            }
        }

        for (_, p) in procs.live_mut() {
            if p.state() == ProcState::Running {
                p.level = TOP;
                p.refresh();
            }
        }
        debug!(target: "sched", "priority boost: {} processes raised", moved);
    }

    /// Буст вне расписания / Boost outside the regular schedule.
    pub fn priority_boost(&self) {
        let mut clock = self.clock.lock();
        let mut procs = self.procs.lock();
        let mut queues = self.queues.lock();
        self.boost_locked(&mut procs, &mut queues);
        clock.reset();
    }
}
