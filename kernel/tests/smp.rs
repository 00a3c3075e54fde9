//! Несколько CPU на потоках хоста / Several CPUs on host threads.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::*;
use mlfq_kernel::{Bare, Kernel};

const CPUS: usize = 4;
const WORKERS: usize = 16;

fn worker(i: usize) -> Program {
    program(move |sys| async move {
        match i % 4 {
            0 => sys.compute(25).await,
            1 => {
                for _ in 0..5 {
                    sys.sleep(2).await;
                    sys.spin().await;
                }
            }
            2 => {
                sys.fork(|sys| async move { sys.compute(6).await });
                sys.yield_now().await;
                sys.wait().await;
            }
            _ => {
                sys.compute(3).await;
                if sys.scheduler_lock(PASSWORD).await == 0 {
                    sys.compute(4).await;
                    sys.scheduler_unlock(PASSWORD).await;
                }
                sys.compute(3).await;
            }
        }
    })
}

fn cpu_loop(k: &'static Kernel, cpu: usize, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::SeqCst) {
        k.schedule_once(cpu);
    }
}

#[test]
fn concurrent_cpus_keep_the_tables_consistent() {
    let k = kernel();
    let reaped = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let r = Arc::clone(&reaped);
    k.userinit(Box::new(Bare), move |sys| async move {
        for i in 0..WORKERS {
            assert!(sys.fork(worker(i)) > 0);
        }
        while sys.wait().await > 0 {
            r.fetch_add(1, Ordering::SeqCst);
        }
        park(sys).await;
    });

    let cpus: Vec<_> = (0..CPUS)
        .map(|cpu| {
            let stop = Arc::clone(&stop);
            thread::spawn(move || cpu_loop(k, cpu, stop))
        })
        .collect();

    let deadline = Instant::now() + Duration::from_secs(30);
    let mut audit = Ok(());
    while reaped.load(Ordering::SeqCst) < WORKERS && Instant::now() < deadline {
        audit = audit.and(k.audit());
        thread::yield_now();
    }
    stop.store(true, Ordering::SeqCst);
    for t in cpus {
        t.join().expect("cpu thread panicked");
    }

    assert_eq!(audit, Ok(()));
    assert_eq!(reaped.load(Ordering::SeqCst), WORKERS);
    assert_eq!(k.lock_holder(), None);
    assert!(only_root_left(k));
}
