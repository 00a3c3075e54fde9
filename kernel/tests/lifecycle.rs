//! fork / exit / wait / kill / sleep глазами процессов.

mod common;

use std::sync::atomic::{AtomicIsize, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use common::*;
use mlfq_kernel::param::MAX_PRIORITY;
use mlfq_kernel::syscall::{self, SYS_GETPID, SYS_GET_LEVEL, SYS_KILL, SYS_SET_PRIORITY, SYS_WAIT};
use mlfq_kernel::{Bare, Channel, Dispatch, Image, Kernel, Pid, ProcState};
use spin::Mutex;

/// Образ, считающий закрытия и освобождения / An image counting closes and drops.
struct Tracked {
    closed: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl Image for Tracked {
    fn duplicate(&self) -> Option<Box<dyn Image>> {
        Some(Box::new(Tracked {
            closed: Arc::clone(&self.closed),
            dropped: Arc::clone(&self.dropped),
        }))
    }

    fn close_files(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Памяти на копию нет / No memory for a copy.
struct Starved;

impl Image for Starved {
    fn duplicate(&self) -> Option<Box<dyn Image>> {
        None
    }
}

#[test]
fn wait_reclaims_exactly_once() {
    let k = kernel();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    k.userinit(Box::new(Bare), move |sys| async move {
        let child = sys.fork(|_| async {});
        let first = sys.wait().await;
        let second = sys.wait().await;
        log.lock().extend([child, first, second]);
        park(sys).await;
    });
    drive_until(k, 20, |_| !seen.lock().is_empty());

    let seen = seen.lock();
    assert!(seen[0] > 1);
    assert_eq!(seen[1], seen[0]);
    assert_eq!(seen[2], -1);
    assert!(k.pcb(Pid(seen[0] as u32)).is_none());
}

#[test]
fn exit_closes_files_and_reap_frees_the_image() {
    let k = kernel();
    let closed = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));
    let image = Tracked {
        closed: Arc::clone(&closed),
        dropped: Arc::clone(&dropped),
    };
    boot_with_image(k, Box::new(image), vec![program(|sys| async move { sys.compute(2).await })]);

    drive_until(k, 20, |k| k.count(ProcState::Zombie) == 1);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert_eq!(dropped.load(Ordering::SeqCst), 0);

    drive_until(k, 20, only_root_left);
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_duplicate_rolls_the_fork_back() {
    let k = kernel();
    let ret = Arc::new(AtomicIsize::new(0));
    let r = Arc::clone(&ret);
    k.userinit(Box::new(Starved), move |sys| async move {
        r.store(sys.fork(|_| async {}), Ordering::SeqCst);
        park(sys).await;
    });
    k.schedule_once(0);

    assert_eq!(ret.load(Ordering::SeqCst), -1);
    assert_eq!(k.count(ProcState::Embryo), 0);
    assert_eq!(k.count(ProcState::Runnable), 0);
    assert_eq!(k.count(ProcState::Sleeping), 1);
}

#[test]
fn fork_fails_when_the_table_is_full() {
    let k = kernel();
    let made = Arc::new(AtomicUsize::new(0));
    let m = Arc::clone(&made);
    k.userinit(Box::new(Bare), move |sys| async move {
        while sys.fork(|sys| async move { sys.yield_now().await }) > 0 {
            m.fetch_add(1, Ordering::SeqCst);
        }
        while sys.wait().await > 0 {}
        park(sys).await;
    });
    k.schedule_once(0);
    assert_eq!(made.load(Ordering::SeqCst), mlfq_kernel::param::NPROC - 1);

    drive_until(k, 1000, only_root_left);
    assert_eq!(k.queued(0).len(), 0);
}

#[test]
fn orphans_are_reaped_by_the_root() {
    let k = kernel();
    let grandchild = Arc::new(AtomicIsize::new(0));
    let reaped = Arc::new(Mutex::new(Vec::new()));

    let (g, log) = (Arc::clone(&grandchild), Arc::clone(&reaped));
    k.userinit(Box::new(Bare), move |sys| async move {
        sys.fork(move |sys| async move {
            g.store(sys.fork(|sys| async move { sys.compute(5).await }), Ordering::SeqCst);
        });
        loop {
            match sys.wait().await {
                -1 => break,
                pid => log.lock().push(pid),
            }
        }
        park(sys).await;
    });
    drive_until(k, 100, only_root_left);

    let mut reaped = reaped.lock().clone();
    reaped.sort();
    assert_eq!(reaped, [2, grandchild.load(Ordering::SeqCst)]);
}

#[test]
fn killing_a_sleeper_admits_it_fresh_at_the_top() {
    let k = kernel();
    boot(
        k,
        vec![program(|sys| async move {
            sys.compute(5).await;
            sys.sleep(1000).await;
        })],
    );
    let s = Pid(2);
    drive_until(k, 50, |k| k.pcb(s).map(|p| p.state()) == Some(ProcState::Sleeping));
    assert_eq!(k.pcb(s).unwrap().level, 1);

    k.kill(s).unwrap();
    let p = k.pcb(s).unwrap();
    assert_eq!(p.state(), ProcState::Runnable);
    assert_eq!((p.level, p.exec_time, p.priority), (0, 0, 3));
    assert!(k.queued(0).contains(&s));
    assert_eq!(k.audit(), Ok(()));

    // Убитый не исполняется: завершается при выборе.
    assert_eq!(k.schedule_once(0), Dispatch::Terminated(s));
    drive_until(k, 20, only_root_left);
}

#[test]
fn killed_process_sleep_returns_failure() {
    let k = kernel();
    let ret = Arc::new(AtomicIsize::new(0));
    let r = Arc::clone(&ret);
    boot(
        k,
        vec![program(move |sys| async move {
            assert_eq!(sys.kill(sys.getpid()), 0);
            r.store(sys.sleep(5).await, Ordering::SeqCst);
        })],
    );
    drive_until(k, 20, only_root_left);
    assert_eq!(ret.load(Ordering::SeqCst), -1);
}

#[test]
fn kill_of_unknown_pid_fails() {
    let k = kernel();
    boot(k, Vec::new());
    assert!(k.kill(Pid(42)).is_err());
}

#[test]
fn timed_sleep_lasts_at_least_n_ticks() {
    let k = kernel();
    let elapsed = Arc::new(AtomicU32::new(0));
    let e = Arc::clone(&elapsed);
    boot(
        k,
        vec![program(move |sys| async move {
            let start = sys.kernel().jiffies();
            assert_eq!(sys.sleep(5).await, 0);
            e.store((sys.kernel().jiffies() - start) as u32, Ordering::SeqCst);
            // Разбуженный начинает с верхнего уровня.
            assert_eq!(sys.get_level(), 0);
        })],
    );
    drive_until(k, 50, only_root_left);
    assert!(elapsed.load(Ordering::SeqCst) >= 5);
}

#[test]
fn fork_after_a_wakeup_arrives_with_its_pid() {
    let k = kernel();
    let woken = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (w, r, log) = (Arc::clone(&woken), Arc::clone(&woken), Arc::clone(&seen));
    k.userinit(Box::new(Bare), move |sys| async move {
        sys.fork(move |sys| async move {
            assert_eq!(sys.sleep(1).await, 0);
            let me = sys.kernel().pcb(sys.getpid()).unwrap();
            w.store(me.arrived_time, Ordering::SeqCst);
        });
        // Пробуждение берёт метку раньше следующего fork.
        while r.load(Ordering::SeqCst) == 0 {
            sys.spin().await;
        }
        let child = sys.fork(|_| async {});
        let pcb = sys.kernel().pcb(Pid(child as u32)).unwrap();
        log.lock().extend([child as u32, pcb.arrived_time]);
        park(sys).await;
    });
    drive_until(k, 100, |_| !seen.lock().is_empty());

    assert_eq!(*seen.lock(), [3, 3]);
    assert!(woken.load(Ordering::SeqCst) >= 3);
}

#[test]
fn wakeup_admits_every_sleeper_on_the_key_fresh_at_the_top() {
    let k = kernel();
    let gate = Arc::new(Mutex::new(false));
    let finished = Arc::new(AtomicUsize::new(0));
    let (g, f) = (Arc::clone(&gate), Arc::clone(&finished));
    boot(
        k,
        vec![program(move |sys| async move {
            let me = sys.getpid();
            assert_eq!(sys.set_priority(me, 1), 0);
            sys.spin().await;
            loop {
                // Блокировка вызывающего отпускается уже под реестром.
                let pending = {
                    let open = g.lock();
                    if *open {
                        None
                    } else {
                        Some(sys.sleep_on(Channel::Key(7), open))
                    }
                };
                match pending {
                    Some(s) => s.await,
                    None => break,
                }
            }
            f.fetch_add(1, Ordering::SeqCst);
        })],
    );

    let waiter = Pid(2);
    let asleep = |k: &Kernel| k.pcb(waiter).map_or(false, |p| p.state() == ProcState::Sleeping);
    drive_until(k, 20, asleep);
    let before = k.pcb(waiter).unwrap();
    assert_eq!(before.priority, 1);
    assert!(before.exec_time > 0);

    // Чужой ключ никого не будит / another key wakes nobody.
    k.wakeup(Channel::Key(8));
    assert!(asleep(k));

    *gate.lock() = true;
    k.wakeup(Channel::Key(7));
    let after = k.pcb(waiter).unwrap();
    assert_eq!(after.state(), ProcState::Runnable);
    assert_eq!(after.level, 0);
    assert_eq!(after.exec_time, 0);
    assert_eq!(after.priority, MAX_PRIORITY);
    assert!(k.queued(0).contains(&waiter));
    assert_eq!(k.audit(), Ok(()));

    drive_until(k, 20, only_root_left);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[test]
fn set_priority_accepts_only_the_valid_range() {
    let k = kernel();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    k.userinit(Box::new(Bare), move |sys| async move {
        let me = sys.getpid();
        log.lock().extend([
            sys.set_priority(me, 4),
            sys.set_priority(me, -1),
            sys.set_priority(Pid(999), 1),
            sys.set_priority(me, 0),
        ]);
        park(sys).await;
    });
    k.schedule_once(0);

    assert_eq!(*seen.lock(), [-1, -1, -1, 0]);
    assert_eq!(k.pcb(Pid(1)).unwrap().priority, 0);
}

#[test]
fn syscall_table_routes_by_number() {
    let k = kernel();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    k.userinit(Box::new(Bare), move |sys| async move {
        let me = sys.getpid().0 as usize;
        let mut out = Vec::new();
        out.push(syscall::dispatch(sys, SYS_GETPID, 0, 0).await);
        out.push(syscall::dispatch(sys, SYS_GET_LEVEL, 0, 0).await);
        out.push(syscall::dispatch(sys, SYS_SET_PRIORITY, me, 2).await);
        out.push(syscall::dispatch(sys, SYS_KILL, 0, 0).await);
        out.push(syscall::dispatch(sys, SYS_WAIT, 0, 0).await);
        out.push(syscall::dispatch(sys, 99, 0, 0).await);
        log.lock().extend(out);
        park(sys).await;
    });
    k.schedule_once(0);

    assert_eq!(*seen.lock(), [1, 0, 0, -1, -1, mlfq_kernel::error::ENOSYS]);
}

#[test]
#[should_panic(expected = "init exiting")]
fn root_must_not_exit() {
    let k = kernel();
    k.userinit(Box::new(Bare), |_| async {});
    k.schedule_once(0);
}
