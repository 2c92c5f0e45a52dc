//! Threads sharing the heap and rendezvous through channels

mod common;

use common::{i, run, s, vm};
use garnet_bytecode::ModuleBuilder;
use garnet_core::{ChannelObject, ThreadId, ThreadState, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// `c = Channel.new` into local 0 of main
fn new_channel(m: &mut garnet_bytecode::FunctionBuilder<'_>) {
    m.get_constant("Channel").send("new", 0).set_local(0, 0);
}

/// Counter program: the thread increments `i` and delivers it
fn counter(main_increments: bool) -> impl FnOnce(&mut ModuleBuilder) {
    move |m| {
        // thread do i++; c.deliver(i) end
        let body = m
            .function("thread_body", 0, 0, |f| {
                f.get_local(1, 1)
                    .put_int(1)
                    .send("+", 1)
                    .set_local(1, 1)
                    .get_local(1, 0)
                    .get_local(1, 1)
                    .send("deliver", 1)
                    .leave();
            })
            .unwrap();
        m.function("main", 0, 2, |f| {
            new_channel(f);
            f.put_int(0).set_local(0, 1);
            f.put_self().send_with_block("thread", 0, body).pop();
            if main_increments {
                f.get_local(0, 1).put_int(1).send("+", 1).set_local(0, 1);
            }
            // Blocks main until the thread has delivered
            f.get_local(0, 0).send("receive", 0).pop();
            f.get_local(0, 1).leave();
        })
        .unwrap();
    }
}

#[test]
fn test_thread_mutates_captured_local() {
    let vm = vm();
    assert_eq!(run(&vm, counter(false)), i(1));
}

#[test]
fn test_both_threads_mutate_captured_local() {
    let vm = vm();
    assert_eq!(run(&vm, counter(true)), i(2));
}

#[test]
fn test_string_delivery() {
    let vm = vm();
    let result = run(&vm, |m| {
        // thread do s = "123"; c.deliver(s) end
        let body = m
            .function("thread_body", 0, 1, |f| {
                f.put_string("123")
                    .set_local(0, 0)
                    .get_local(1, 0)
                    .get_local(0, 0)
                    .send("deliver", 1)
                    .leave();
            })
            .unwrap();
        m.function("main", 0, 1, |f| {
            new_channel(f);
            f.put_self().send_with_block("thread", 0, body).pop();
            f.get_local(0, 0).send("receive", 0).leave();
        })
        .unwrap();
    });

    assert_eq!(result, s("123"));
}

#[test]
fn test_sequential_deliveries_arrive_in_order() {
    let vm = vm();
    let result = run(&vm, |m| {
        let body = m
            .function("thread_body", 0, 2, |f| {
                f.put_string("Hello").set_local(0, 0);
                f.put_string("World").set_local(0, 1);
                f.get_local(1, 0).get_local(0, 0).send("deliver", 1).pop();
                f.get_local(1, 0).get_local(0, 1).send("deliver", 1).leave();
            })
            .unwrap();
        m.function("main", 0, 3, |f| {
            new_channel(f);
            f.put_self().send_with_block("thread", 0, body).pop();
            f.get_local(0, 0).send("receive", 0).set_local(0, 1);
            f.get_local(0, 0).send("receive", 0).set_local(0, 2);
            f.get_local(0, 1)
                .put_string(" ")
                .send("+", 1)
                .get_local(0, 2)
                .send("+", 1)
                .leave();
        })
        .unwrap();
    });

    assert_eq!(result, s("Hello World"));
}

#[test]
fn test_delivered_instance_keeps_its_class() {
    let vm = vm();
    let result = run(&vm, |m| {
        let bar = m.function("bar", 0, 0, |f| {
            f.put_int(100).leave();
        })
        .unwrap();
        m.class("Foo", None).method("bar", bar as usize);
        let body = m
            .function("thread_body", 0, 1, |f| {
                f.get_constant("Foo").send("new", 0).set_local(0, 0);
                f.get_local(1, 0).get_local(0, 0).send("deliver", 1).leave();
            })
            .unwrap();
        m.function("main", 0, 1, |f| {
            new_channel(f);
            f.put_self().send_with_block("thread", 0, body).pop();
            f.get_local(0, 0).send("receive", 0).send("bar", 0).leave();
        })
        .unwrap();
    });

    assert_eq!(result, i(100));
}

#[test]
fn test_ivar_mutation_is_visible_across_threads() {
    let vm = vm();
    let result = run(&vm, |m| {
        // def touch; @count = 7; end
        let touch = m
            .function("touch", 0, 0, |f| {
                f.put_int(7).set_ivar("@count").put_nil().leave();
            })
            .unwrap();
        let count = m
            .function("count", 0, 0, |f| {
                f.get_ivar("@count").leave();
            })
            .unwrap();
        m.class("Box", None)
            .method("touch", touch as usize)
            .method("count", count as usize);

        // thread do b.touch; c.deliver(nil) end
        let body = m
            .function("thread_body", 0, 0, |f| {
                f.get_local(1, 1).send("touch", 0).pop();
                f.get_local(1, 0).put_nil().send("deliver", 1).leave();
            })
            .unwrap();
        m.function("main", 0, 2, |f| {
            new_channel(f);
            f.get_constant("Box").send("new", 0).set_local(0, 1);
            f.put_self().send_with_block("thread", 0, body).pop();
            f.get_local(0, 0).send("receive", 0).pop();
            f.get_local(0, 1).send("count", 0).leave();
        })
        .unwrap();
    });

    assert_eq!(result, i(7));
}

#[test]
fn test_failed_thread_records_error() {
    let vm = vm();
    let id = run(&vm, |m| {
        let body = m
            .function("thread_body", 0, 0, |f| {
                f.put_int(1).put_string("a").send("+", 1).leave();
            })
            .unwrap();
        m.function("main", 0, 0, |f| {
            f.put_self().send_with_block("thread", 0, body).leave();
        })
        .unwrap();
    });

    let id = ThreadId::from_u64(id.as_int().unwrap() as u64);
    let handle = vm.scheduler().handle(id).unwrap();
    let state = vm.scheduler().join(handle).unwrap();

    assert_eq!(
        state,
        ThreadState::Failed("TypeError: Expect argument to be Integer. got=String".to_string())
    );
    assert_eq!(vm.scheduler().active_threads(), 0);
    assert_eq!(vm.scheduler().thread_count(), 0);
}

#[test]
fn test_join_all_waits_for_every_thread() {
    let vm = vm();
    run(&vm, |m| {
        let body = m
            .function("thread_body", 0, 0, |f| {
                f.put_nil().leave();
            })
            .unwrap();
        m.function("main", 0, 0, |f| {
            f.put_self().send_with_block("thread", 0, body).pop();
            f.put_self().send_with_block("thread", 0, body).pop();
            f.put_self().send_with_block("thread", 0, body).leave();
        })
        .unwrap();
    });

    vm.scheduler().join_all().unwrap();
    assert_eq!(vm.scheduler().thread_count(), 0);
    assert_eq!(vm.scheduler().active_threads(), 0);
}

#[test]
fn test_finished_threads_leave_the_registry() {
    let vm = vm();
    // 50.times { thread { } }
    run(&vm, |m| {
        let body = m
            .function("thread_body", 0, 0, |f| {
                f.put_nil().leave();
            })
            .unwrap();
        let spawn = m
            .function("spawn_one", 1, 1, |f| {
                f.put_self().send_with_block("thread", 0, body).leave();
            })
            .unwrap();
        m.function("main", 0, 0, |f| {
            f.put_int(50).send_with_block("times", 0, spawn).leave();
        })
        .unwrap();
    });

    // Clean exits prune themselves without anyone joining
    while vm.scheduler().thread_count() > 0 {
        thread::sleep(Duration::from_millis(5));
    }

    let last = vm.scheduler().handle(ThreadId::from_u64(50)).unwrap();
    assert_eq!(vm.scheduler().join(last).unwrap(), ThreadState::Completed);
    assert!(vm.scheduler().handle(ThreadId::from_u64(51)).is_none());
}

#[test]
fn test_joined_failure_is_forgotten() {
    let vm = vm();
    let id = run(&vm, |m| {
        let body = m
            .function("thread_body", 0, 0, |f| {
                f.put_int(1).put_int(0).send("/", 1).leave();
            })
            .unwrap();
        m.function("main", 0, 0, |f| {
            f.put_self().send_with_block("thread", 0, body).leave();
        })
        .unwrap();
    });
    let handle = vm
        .scheduler()
        .handle(ThreadId::from_u64(id.as_int().unwrap() as u64))
        .unwrap();

    assert_eq!(
        vm.scheduler().join(handle).unwrap(),
        ThreadState::Failed("Error: Divided by 0".to_string())
    );
    assert_eq!(vm.scheduler().thread_count(), 0);
    assert_eq!(vm.scheduler().state(handle), Some(ThreadState::Completed));
}

#[test]
fn test_thread_without_block_raises() {
    let vm = vm();
    let result = run(&vm, |m| {
        m.function("main", 0, 0, |f| {
            f.put_self().send("thread", 0).leave();
        })
        .unwrap();
    });

    assert!(result.is_error());
    assert_eq!(
        result.error_message().as_deref(),
        Some("Error: Can't yield without a block: thread")
    );
}

#[test]
fn test_senders_are_served_in_arrival_order() {
    let channel = Arc::new(ChannelObject::new());
    let arrived = Arc::new(AtomicUsize::new(0));
    let mut senders = Vec::new();

    for n in 0..4i64 {
        let channel = channel.clone();
        let arrived_in_thread = arrived.clone();
        senders.push(thread::spawn(move || {
            arrived_in_thread.fetch_add(1, Ordering::SeqCst);
            channel.deliver(Value::int(n));
        }));
        // Senders queue one at a time so arrival order is known
        while arrived.load(Ordering::SeqCst) <= n as usize {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(20));
    }

    let received: Vec<i64> = (0..4)
        .map(|_| channel.receive().as_int().unwrap())
        .collect();
    for sender in senders {
        sender.join().unwrap();
    }

    assert_eq!(received, vec![0, 1, 2, 3]);
}

#[test]
fn test_receivers_are_served_in_arrival_order() {
    let channel = Arc::new(ChannelObject::new());
    let arrived = Arc::new(AtomicUsize::new(0));
    let mut receivers = Vec::new();

    for n in 0..4usize {
        let channel = channel.clone();
        let arrived_in_thread = arrived.clone();
        receivers.push(thread::spawn(move || {
            arrived_in_thread.fetch_add(1, Ordering::SeqCst);
            channel.receive().as_int().unwrap()
        }));
        // Receivers queue one at a time so arrival order is known
        while arrived.load(Ordering::SeqCst) <= n {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(20));
    }

    for n in 0..4i64 {
        channel.deliver(Value::int(n));
    }
    let received: Vec<i64> = receivers
        .into_iter()
        .map(|receiver| receiver.join().unwrap())
        .collect();

    assert_eq!(received, vec![0, 1, 2, 3]);
}

#[test]
fn test_rendezvous_shares_object_identity() {
    let channel = Arc::new(ChannelObject::new());
    let barrier = Arc::new(Barrier::new(2));
    let sent = Value::array(vec![i(1)]);

    let sender = {
        let channel = channel.clone();
        let barrier = barrier.clone();
        let sent = sent.clone();
        thread::spawn(move || {
            barrier.wait();
            channel.deliver(sent);
        })
    };

    barrier.wait();
    let received = channel.receive();
    sender.join().unwrap();

    assert!(received.same_object(&sent));
}
