//! Task — контекст исполнения процесса и его дескриптор `Sys`
//!
//! Контекст процесса — закреплённый future. Диспетчеризация = один `poll`.
//! Каждая точка приостановки сначала публикует новое состояние под
//! блокировкой реестра, затем ровно один раз возвращает `Pending`;
//! следующий `poll` продолжает выполнение сразу после `.await`.
//!
//! A process's execution context is a pinned future and dispatch is one
//! `poll`. Every suspension point first publishes the new state under the
//! registry lock, then returns `Pending` exactly once; the next poll resumes
//! right after the `.await`.
//!
//! ```ignore
//! kernel.userinit(Box::new(Bare), |sys| async move {
//!     let child = sys.fork(|sys| async move { sys.spin().await });
//!     sys.wait().await;
//! });
//! ```

use alloc::boxed::Box;
use core::convert::Infallible;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::error::{LockError, FAILURE};
use crate::proc::lifecycle::WaitStep;
use crate::proc::{Channel, Pid, Slot};
use crate::Kernel;

/// Контекст исполнения / Execution context.
pub type Body = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

// ── Suspension ──────────────────────────────────────────────────────────────

/// Отдать CPU планировщику один раз / Give the CPU to the scheduler once.
#[must_use = "state is already published; the caller has to .await"]
pub struct Suspend {
    yielded: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}

pub(crate) fn suspend() -> Suspend {
    Suspend { yielded: false }
}

// ── Sys ─────────────────────────────────────────────────────────────────────

/// Дескриптор процесса, захватываемый его телом.
/// Process handle captured by its body.
///
/// Методы — точки входа ядра. Возвращают целое: pid, `0` при успехе или
/// отрицательный код. Kernel entry points; each returns an integer: a pid,
/// `0` on success, or a negative sentinel.
#[derive(Clone, Copy)]
pub struct Sys {
    kernel: &'static Kernel,
    slot: Slot,
    pid: Pid,
}

impl Sys {
    pub(crate) fn new(kernel: &'static Kernel, slot: Slot, pid: Pid) -> Self {
        Self { kernel, slot, pid }
    }

    pub fn kernel(&self) -> &'static Kernel {
        self.kernel
    }

    pub fn getpid(&self) -> Pid {
        self.pid
    }

    fn killed(&self) -> bool {
        self.kernel.procs.lock()[self.slot].is_killed()
    }

    fn running_cpu(&self) -> usize {
        match self.kernel.procs.lock()[self.slot].cpu {
            Some(cpu) => cpu,
            None => panic!("pid {}: running without a cpu", self.pid),
        }
    }

    /// Пользовательский код до следующего прерывания таймера: тик часов,
    /// затем принудительный yield.
    /// User code until the next timer interrupt: one clock tick, then the
    /// forced yield.
    pub async fn spin(&self) {
        let cpu = self.running_cpu();
        let c = self.kernel.cpu(cpu);
        // Обработчик видит текущий процесс только с выключенными прерываниями.
        let current = {
            let irq = c.push_off();
            c.current(&irq)
        };
        self.kernel.clock_interrupt(cpu, current);
        self.yield_now().await;
    }

    /// `n` тиков подряд / `n` ticks in a row.
    pub async fn compute(&self, n: u32) {
        for _ in 0..n {
            self.spin().await;
        }
    }

    /// Добровольно отдать CPU / Voluntary yield.
    pub async fn yield_now(&self) {
        self.kernel.yield_now(self.slot);
        suspend().await;
    }

    /// Уснуть на `chan`, отпустив `external` уже под блокировкой реестра.
    /// После пробуждения вызывающий сам заново берёт свою блокировку.
    ///
    /// Sleep on `chan`, dropping `external` once the registry lock is held.
    /// The caller re-acquires its own lock after waking.
    pub fn sleep_on<G>(&self, chan: Channel, external: G) -> Suspend {
        self.kernel.sleep_on(self.slot, chan, external);
        suspend()
    }

    /// Проспать `n` тиков; `-1`, если убит во сне.
    /// Sleep for `n` ticks; `-1` if killed while waiting.
    pub async fn sleep(&self, n: u32) -> isize {
        let start = self.kernel.jiffies();
        loop {
            if let Some(ret) = self.sleep_step(start, n) {
                return ret;
            }
            suspend().await;
        }
    }

    fn sleep_step(&self, start: u64, n: u32) -> Option<isize> {
        let clock = self.kernel.clock.lock();
        if clock.jiffies() - start >= u64::from(n) {
            return Some(0);
        }
        if self.killed() {
            return Some(FAILURE);
        }
        self.kernel.sleep_on(self.slot, Channel::Ticks, clock);
        None
    }

    /// Дождаться зомби-ребёнка; `-1`, если детей нет или вызывающий убит.
    /// Wait for a ZOMBIE child; `-1` with no children or when killed.
    pub async fn wait(&self) -> isize {
        loop {
            match self.kernel.wait_step(self.slot) {
                WaitStep::Reaped(pid) => return pid.as_isize(),
                WaitStep::Failed(_) => return FAILURE,
                WaitStep::Blocked => suspend().await,
            }
        }
    }

    /// Создать ребёнка с телом `entry`; pid ребёнка или `-1`.
    /// Create a child running `entry`; the child's pid or `-1`.
    pub fn fork<F, Fut>(&self, entry: F) -> isize
    where
        F: FnOnce(Sys) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        match self.kernel.fork(self.slot, entry) {
            Ok(pid) => pid.as_isize(),
            Err(_) => FAILURE,
        }
    }

    /// Завершиться. Не возвращается.
    /// Terminate. Never returns.
    pub async fn exit(&self) -> Infallible {
        self.kernel.terminate(self.slot);
        core::future::pending::<Infallible>().await
    }

    pub fn kill(&self, pid: Pid) -> isize {
        match self.kernel.kill(pid) {
            Ok(()) => 0,
            Err(_) => FAILURE,
        }
    }

    /// Текущий уровень очереди / Current queue level.
    pub fn get_level(&self) -> isize {
        self.kernel.procs.lock()[self.slot].level as isize
    }

    pub fn set_priority(&self, pid: Pid, priority: i32) -> isize {
        match self.kernel.set_priority(pid, priority) {
            Ok(()) => 0,
            Err(_) => FAILURE,
        }
    }

    /// Занять CPU монопольно. Неверный пароль завершает вызывающего.
    /// Monopolize the CPU. A wrong password terminates the caller.
    pub async fn scheduler_lock(&self, password: i32) -> isize {
        match self.kernel.lock_acquire(self.slot, password) {
            Ok(()) => {
                suspend().await;
                0
            }
            Err(LockError::Busy) => FAILURE,
            Err(LockError::BadCredential) => match self.exit().await {},
        }
    }

    /// Снять блокировку. Неверный пароль завершает вызывающего.
    /// Release the lock. A wrong password terminates the caller.
    pub async fn scheduler_unlock(&self, password: i32) -> isize {
        match self.kernel.lock_release(self.slot, password) {
            Ok(()) => 0,
            Err(_) => match self.exit().await {},
        }
    }

    /// Тики с последнего сброса / Ticks since the last reset.
    pub fn uptime(&self) -> u32 {
        self.kernel.uptime()
    }

    pub fn procdump(&self) {
        self.kernel.procdump();
    }
}
