//! Общие помощники интеграционных тестов / Shared integration-test helpers.

#![allow(dead_code)]

use std::future::Future;

use mlfq_kernel::{Bare, Body, Channel, Dispatch, Image, Kernel, KernelConfig, Pid, Sys};

/// Пароль блокировки по умолчанию / Default lock password.
pub const PASSWORD: i32 = mlfq_kernel::param::LOCK_PASSWORD;

/// Тело процесса до запуска / A process body before it starts.
pub type Program = Box<dyn FnOnce(Sys) -> Body + Send>;

pub fn program<F, Fut>(f: F) -> Program
where
    F: FnOnce(Sys) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |sys| Box::pin(f(sys)) as Body)
}

pub fn kernel() -> &'static Kernel {
    kernel_with(KernelConfig::new())
}

pub fn kernel_with(config: KernelConfig) -> &'static Kernel {
    Box::leak(Box::new(Kernel::new(config)))
}

/// Корень форкает `programs` по порядку, собирает их и засыпает навсегда.
/// The root forks `programs` in order, reaps them, then parks for good.
pub fn boot(k: &'static Kernel, programs: Vec<Program>) -> Pid {
    boot_with_image(k, Box::new(Bare), programs)
}

pub fn boot_with_image(k: &'static Kernel, image: Box<dyn Image>, programs: Vec<Program>) -> Pid {
    k.userinit(image, move |sys| async move {
        for p in programs {
            assert!(sys.fork(p) > 0);
        }
        while sys.wait().await > 0 {}
        park(sys).await;
    })
}

/// Уснуть на ключе, который никто не будит / Sleep on a key nobody wakes.
pub async fn park(sys: Sys) {
    loop {
        sys.sleep_on(Channel::Key(usize::MAX), ()).await;
    }
}

/// `n` итераций CPU 0 / `n` iterations of CPU 0.
pub fn drive(k: &'static Kernel, n: usize) -> Vec<Dispatch> {
    (0..n).map(|_| k.schedule_once(0)).collect()
}

/// Крутить CPU 0, пока `done` не станет истиной; паника после `limit` шагов.
/// Drive CPU 0 until `done` holds; panics after `limit` steps.
pub fn drive_until(k: &'static Kernel, limit: usize, mut done: impl FnMut(&Kernel) -> bool) -> Vec<Dispatch> {
    let mut trace = Vec::new();
    while !done(k) {
        assert!(trace.len() < limit, "no progress after {} iterations", limit);
        trace.push(k.schedule_once(0));
        assert_eq!(k.audit(), Ok(()));
    }
    trace
}

/// Pid'ы, получившие CPU / Pids that got the CPU, in order.
pub fn ran(trace: &[Dispatch]) -> Vec<u32> {
    trace
        .iter()
        .filter_map(|d| match d {
            Dispatch::Ran(pid) => Some(pid.0),
            _ => None,
        })
        .collect()
}

/// Все дети корня собраны / Every child of the root has been reaped.
pub fn only_root_left(k: &Kernel) -> bool {
    use mlfq_kernel::ProcState::*;
    [Embryo, Runnable, Running, Zombie]
        .iter()
        .all(|&s| k.count(s) == 0)
        && k.count(Sleeping) == 1
}
