//! mlfq-init — первый процесс и хостовый загрузчик демо
//!
//! Регистрирует stdout как консоль, загружает ядро и крутит CPU 0,
//! пока init не соберёт всю нагрузку: счётный процесс, соня, держатель
//! блокировки и «вежливый» процесс с низким приоритетом.
//! Registers stdout as the console, boots the kernel and drives CPU 0 until
//! init has reaped the whole workload.

use std::fmt;
use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};

use libmlfq::{process, sched, time, Sys};
use log::LevelFilter;
use mlfq_kernel::drivers::console;
use mlfq_kernel::param::LOCK_PASSWORD;
use mlfq_kernel::{kprintln, Bare, Channel, Kernel, KernelConfig};

static KERNEL: Kernel = Kernel::new(KernelConfig::new().with_log_level(LevelFilter::Debug));

/// init собрал всех детей / init has reaped every child.
static DONE: AtomicBool = AtomicBool::new(false);

#[cfg(feature = "smp")]
const CPUS: usize = 4;

struct Stdout;

impl fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        std::io::stdout().write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

async fn cruncher(sys: Sys) {
    let mut last = None;
    for _ in 0..40 {
        let level = sched::level(sys).await.ok();
        if level != last {
            kprintln!("[cruncher] pid {} now on level {:?}", sys.getpid(), level);
            last = level;
        }
        sys.spin().await;
    }
}

async fn sleeper(sys: Sys) {
    for round in 0..5 {
        if time::sleep(sys, 3).await.is_err() {
            return;
        }
        let uptime = time::uptime(sys).await;
        kprintln!("[sleeper] round {} at uptime {:?}", round, uptime);
    }
}

async fn locker(sys: Sys) {
    sys.compute(2).await;
    match sched::lock(sys, LOCK_PASSWORD).await {
        Ok(()) => {
            kprintln!("[locker] pid {} holds the scheduler lock", sys.getpid());
            sys.compute(5).await;
            if let Err(e) = sched::unlock(sys, LOCK_PASSWORD).await {
                kprintln!("[locker] unlock failed: {:?}", e);
            }
        }
        Err(e) => kprintln!("[locker] lock refused: {:?}", e),
    }
    sys.compute(2).await;
}

async fn nice(sys: Sys) {
    if let Err(e) = sched::set_priority(sys, sys.getpid(), 0).await {
        kprintln!("[nice] set_priority: {:?}", e);
    }
    sys.compute(30).await;
}

async fn init(sys: Sys) {
    for (name, res) in [
        ("cruncher", process::fork(sys, cruncher)),
        ("sleeper", process::fork(sys, sleeper)),
        ("locker", process::fork(sys, locker)),
        ("nice", process::fork(sys, nice)),
    ] {
        match res {
            Ok(pid) => kprintln!("[init] {} is pid {}", name, pid),
            Err(e) => kprintln!("[init] fork {} failed: {:?}", name, e),
        }
    }

    sys.procdump();
    while let Ok(pid) = process::wait(sys).await {
        kprintln!("[init] reaped pid {}", pid);
    }
    DONE.store(true, Ordering::SeqCst);

    // init не выходит / init never exits
    loop {
        sys.sleep_on(Channel::Key(0), ()).await;
    }
}

fn main() {
    console::init(Box::leak(Box::new(Stdout)));
    KERNEL.boot(Box::new(Bare), init);

    #[cfg(feature = "smp")]
    for cpu in 1..CPUS {
        std::thread::spawn(move || {
            KERNEL.run(cpu);
        });
    }

    while !DONE.load(Ordering::SeqCst) {
        KERNEL.schedule_once(0);
    }
    kprintln!("[init] workload done after {} ticks", KERNEL.jiffies());
    KERNEL.procdump();
}
