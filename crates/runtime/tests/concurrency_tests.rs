#![cfg(feature = "arc")]

mod concurrency {
    use alder_runtime::prelude::*;
    use alder_test_utils::*;
    use std::thread;

    const THREADS: usize = 8;
    const ITERATIONS: usize = 100;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn values_can_be_shared_between_threads() {
        assert_send_sync::<Value>();
        assert_send_sync::<Class>();
        assert_send_sync::<Instance>();
        assert_send_sync::<Combo>();
        assert_send_sync::<Cons>();
        assert_send_sync::<Nameset>();
    }

    // A class with a `count` member and an `increment` method
    fn counter_class(ctx: &mut Context, scope: &Nameset) -> Class {
        let counter = Class::new();
        counter
            .bind(
                ctx,
                scope,
                Quark::PRESET,
                native(|call| {
                    let this = call.instance().expect("Missing instance");
                    this.bind(call.ctx, call.scope, quark("count"), 0.into())
                }),
            )
            .unwrap();
        counter
            .bind(
                ctx,
                scope,
                quark("increment"),
                native(|call| {
                    let this = call.instance().expect("Missing instance");
                    let count = match this.local_lookup(quark("count")) {
                        Some(Value::Int(n)) => n,
                        other => panic!("Unexpected count: {other:?}"),
                    };
                    // Give other threads a chance to interleave
                    thread::yield_now();
                    this.bind(call.ctx, call.scope, quark("count"), (count + 1).into())
                }),
            )
            .unwrap();
        counter
    }

    #[test]
    fn method_calls_on_a_shared_instance_are_serialized() {
        init_logging();
        let mut ctx = Context::new();
        let scope = Nameset::with_core_lib().unwrap();
        let counter = counter_class(&mut ctx, &scope);
        let instance = counter.construct(&mut ctx, &scope, None).unwrap();

        let handles = (0..THREADS)
            .map(|_| {
                let instance = instance.clone();
                let mut ctx = ctx.spawn();
                thread::spawn(move || {
                    let scope = Nameset::new();
                    for _ in 0..ITERATIONS {
                        instance
                            .invoke_by_name(&mut ctx, &scope, quark("increment"), None)
                            .unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        let count = instance.local_lookup(quark("count"));
        assert_eq!(count, Some(Value::Int((THREADS * ITERATIONS) as i64)));
    }

    #[test]
    fn concurrent_construction() {
        init_logging();
        let mut ctx = Context::new();
        let scope = Nameset::with_core_lib().unwrap();
        let base = Class::new();
        let counter = counter_class(&mut ctx, &scope);
        counter.set_infer(Some(base.clone()), true).unwrap();
        base.set_defer(Some(counter.clone()), false).unwrap();

        let handles = (0..THREADS)
            .map(|_| {
                let counter = counter.clone();
                let mut ctx = ctx.spawn();
                thread::spawn(move || {
                    let scope = Nameset::new();
                    (0..ITERATIONS)
                        .map(|_| counter.construct(&mut ctx, &scope, None).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            for instance in handle.join().unwrap() {
                assert!(instance.meta().unwrap().is_same_instance(&base));
                assert!(instance.super_value().is_some());
            }
        }
    }

    #[test]
    fn racing_links_dont_form_cycles() {
        init_logging();
        let a = Class::new();
        let b = Class::new();

        for _ in 0..ITERATIONS {
            thread::scope(|s| {
                s.spawn(|| a.set_defer(Some(b.clone()), false));
                s.spawn(|| b.set_defer(Some(a.clone()), false));
            });

            let a_to_b = a.defer().is_some_and(|defer| defer.is_same_instance(&b));
            let b_to_a = b.defer().is_some_and(|defer| defer.is_same_instance(&a));
            assert!(a_to_b != b_to_a, "exactly one of the links should be set");

            a.unset_defer().unwrap();
            b.unset_defer().unwrap();
        }
    }

    #[test]
    fn shared_class_members_can_be_rebound_concurrently() {
        init_logging();
        let ctx = Context::new();
        let class = Class::new();
        let names = (0..THREADS).map(|i| quark(&format!("member_{i}"))).collect::<Vec<_>>();

        thread::scope(|s| {
            for name in names.iter().copied() {
                let class = class.clone();
                let mut ctx = ctx.spawn();
                s.spawn(move || {
                    let scope = Nameset::new();
                    for i in 0..ITERATIONS {
                        class
                            .bind(&mut ctx, &scope, name, Value::Int(i as i64))
                            .unwrap();
                    }
                });
            }
        });

        for name in names {
            assert_eq!(class.local_lookup(name), Some(Value::Int(ITERATIONS as i64 - 1)));
        }
    }
}
