mod dispatch {
    use alder_runtime::{ErrorKind, Result, prelude::*};
    use alder_test_utils::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn setup() -> (Context, Nameset) {
        init_logging();
        (Context::new(), Nameset::with_core_lib().unwrap())
    }

    fn eval(ctx: &mut Context, scope: &Nameset, form: Value) -> Result<Value> {
        form.eval(ctx, scope)
    }

    // A native preset that binds each named argument as a member of the instance
    fn preset_members(names: &'static [&'static str]) -> Value {
        native(move |call| {
            let this = call.instance().expect("Missing instance");
            let args = call.args().to_vec();
            if args.len() != names.len() {
                return unexpected_args(&names.join(", "), &args);
            }
            for (name, value) in names.iter().zip(args) {
                this.bind(call.ctx, call.scope, quark(name), value)?;
            }
            Ok(Value::Null)
        })
    }

    // Defines a Point class in the scope, with x and y members and a sum method
    fn define_point(ctx: &mut Context, scope: &Nameset) -> Class {
        let point = eval(ctx, scope, call(symbol("class"), &[]))
            .map(|value| match value {
                Value::Class(class) => class,
                other => panic!("Expected a class, found {other:?}"),
            })
            .unwrap();

        point
            .bind(ctx, scope, Quark::PRESET, preset_members(&["x", "y"]))
            .unwrap();
        point
            .bind(
                ctx,
                scope,
                quark("sum"),
                native(|call| {
                    let this = call.instance().expect("Missing instance");
                    match (this.local_lookup(quark("x")), this.local_lookup(quark("y"))) {
                        (Some(Value::Int(x)), Some(Value::Int(y))) => Ok((x + y).into()),
                        _ => runtime_error!("Invalid point"),
                    }
                }),
            )
            .unwrap();
        // Methods can also be defined as closures, here `this` is resolved in the method's scope
        point
            .bind(ctx, scope, quark("get_x"), closure(&[], path("this:x")))
            .unwrap();
        // The instance's members are also available directly in the method's scope
        point
            .bind(ctx, scope, quark("get_y"), closure(&[], symbol("y")))
            .unwrap();

        scope.bind(quark("Point"), point.clone().into()).unwrap();
        point
    }

    #[test]
    fn construction_via_call_forms() {
        let (mut ctx, scope) = setup();
        define_point(&mut ctx, &scope);

        let p = eval(
            &mut ctx,
            &scope,
            call(symbol("Point"), &[1.into(), 2.into()]),
        )
        .unwrap();
        scope.bind(quark("p"), p).unwrap();

        let x = eval(&mut ctx, &scope, path("p:x")).unwrap();
        assert_eq!(x, 1.into());
        let sum = eval(&mut ctx, &scope, call(path("p:sum"), &[])).unwrap();
        assert_eq!(sum, 3.into());
        let get_x = eval(&mut ctx, &scope, call(path("p:get_x"), &[])).unwrap();
        assert_eq!(get_x, 1.into());
        let get_y = eval(&mut ctx, &scope, call(path("p:get_y"), &[])).unwrap();
        assert_eq!(get_y, 2.into());
    }

    #[test]
    fn nested_call_forms_are_evaluated_as_arguments() {
        let (mut ctx, scope) = setup();
        define_point(&mut ctx, &scope);

        let inner = call(symbol("Point"), &[3.into(), 4.into()]);
        scope
            .bind(quark("add"), closure(&["a", "b"], call(path("a:sum"), &[])))
            .unwrap();

        let result = eval(&mut ctx, &scope, call(symbol("add"), &[inner, Value::Null])).unwrap();
        assert_eq!(result, 7.into());
    }

    #[test]
    fn invoke_by_name() {
        let (mut ctx, scope) = setup();
        let point = define_point(&mut ctx, &scope);

        let p = point
            .construct_with(&mut ctx, &scope, args(&[5.into(), 6.into()]))
            .unwrap();
        let result = p.invoke_by_name(&mut ctx, &scope, quark("sum"), None).unwrap();
        assert_eq!(result, 11.into());

        let p = Value::from(p);
        let result = p
            .apply_by_name(&mut ctx, &scope, quark("get_x"), None)
            .unwrap();
        assert_eq!(result, 5.into());
    }

    #[test]
    fn builtin_operators() {
        let (mut ctx, scope) = setup();
        define_point(&mut ctx, &scope);
        scope.bind(quark("n"), 42.into()).unwrap();

        let repr = eval(&mut ctx, &scope, call(path("n:repr"), &[])).unwrap();
        assert_eq!(repr, "Int".into());
        let repr = eval(&mut ctx, &scope, call(path("Point:repr"), &[])).unwrap();
        assert_eq!(repr, "Class".into());

        let equal = eval(&mut ctx, &scope, call(path("n:=="), &[42.into()])).unwrap();
        assert_eq!(equal, true.into());
        let not_equal = eval(&mut ctx, &scope, call(path("n:!="), &[symbol("n")])).unwrap();
        assert_eq!(not_equal, false.into());

        let p = eval(&mut ctx, &scope, call(symbol("Point"), &[0.into(), 0.into()])).unwrap();
        let repr = p
            .apply_by_name(&mut ctx, &scope, Quark::REPR, None)
            .unwrap();
        assert_eq!(repr, "Instance".into());
    }

    #[test]
    fn builtin_operator_errors() {
        let (mut ctx, scope) = setup();
        scope.bind(quark("n"), 42.into()).unwrap();

        let error = eval(&mut ctx, &scope, call(path("n:=="), &[])).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::UnexpectedArgs { .. }));

        let error = eval(&mut ctx, &scope, call(path("n:missing"), &[])).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::InvalidOperator { .. }));

        let error = eval(&mut ctx, &scope, call(symbol("n"), &[])).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::InvalidOperator { .. }));

        let error = eval(&mut ctx, &scope, symbol("unbound")).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::UnboundSymbol { .. }));
    }

    #[test]
    fn class_members() {
        let (mut ctx, scope) = setup();
        let counter = Class::new();
        let double = closure(&["n"], call(symbol("twice"), &[symbol("n")]));
        counter
            .bind(&mut ctx, &scope, quark("double"), double)
            .unwrap();
        counter
            .bind(&mut ctx, &scope, quark("limit"), 10.into())
            .unwrap();
        scope.bind(quark("Counter"), counter.into()).unwrap();
        scope
            .bind(
                quark("twice"),
                native(|call| match call.args() {
                    [Value::Int(n)] => Ok((n * 2).into()),
                    unexpected => unexpected_args("|Int|", unexpected),
                }),
            )
            .unwrap();

        let limit = eval(&mut ctx, &scope, path("Counter:limit")).unwrap();
        assert_eq!(limit, 10.into());

        let doubled = eval(&mut ctx, &scope, call(path("Counter:double"), &[21.into()])).unwrap();
        assert_eq!(doubled, 42.into());
    }

    #[test]
    fn delegated_class_members() {
        let (mut ctx, scope) = setup();
        let base = Class::new();
        let delegate = Class::new();
        delegate
            .bind(&mut ctx, &scope, quark("greeting"), "hello".into())
            .unwrap();
        base.bind(&mut ctx, &scope, Quark::DEFER, delegate.into())
            .unwrap();

        let instance = base.construct(&mut ctx, &scope, None).unwrap();
        let greeting = instance
            .evaluate(&mut ctx, &scope, quark("greeting"))
            .unwrap();
        assert_eq!(greeting, "hello".into());
        assert!(instance.has_member(quark("greeting"), true));

        let defer = instance.evaluate(&mut ctx, &scope, Quark::DEFER).unwrap();
        assert!(matches!(defer, Value::Class(_)));
    }

    #[test]
    fn block_forms() {
        let (mut ctx, scope) = setup();
        scope
            .bind(
                quark("f"),
                closure(
                    &["a"],
                    block(&[call(path("a:=="), &[1.into()]), symbol("a")]),
                ),
            )
            .unwrap();

        let result = eval(&mut ctx, &scope, call(symbol("f"), &["last".into()])).unwrap();
        assert_eq!(result, "last".into());
    }

    #[test]
    fn closures_check_their_arity() {
        let (mut ctx, scope) = setup();
        scope
            .bind(quark("f"), closure(&["a", "b"], symbol("b")))
            .unwrap();

        let error = eval(&mut ctx, &scope, call(symbol("f"), &[1.into()])).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::UnexpectedArgs { .. }));
    }

    #[test]
    fn errors_in_methods_include_the_method_name() {
        let (mut ctx, scope) = setup();
        let class = Class::new();
        class
            .bind(
                &mut ctx,
                &scope,
                quark("fail"),
                native(|_| runtime_error!("failure")),
            )
            .unwrap();
        let instance = class.construct(&mut ctx, &scope, None).unwrap();

        let error = instance
            .invoke_by_name(&mut ctx, &scope, quark("fail"), None)
            .unwrap_err();
        assert_eq!(error.trace(), &[quark("fail")]);
        assert!(error.to_string().contains("while applying 'fail'"));
    }

    #[test]
    fn mute_reclasses_an_instance() {
        let (mut ctx, scope) = setup();
        let a = Class::new();
        a.bind(&mut ctx, &scope, Quark::PRESET, preset_members(&["a"]))
            .unwrap();
        let b = Class::new();
        b.bind(&mut ctx, &scope, Quark::PRESET, preset_members(&["b", "c"]))
            .unwrap();
        scope.bind(quark("B"), b.clone().into()).unwrap();

        let x = a
            .construct_with(&mut ctx, &scope, args(&[1.into()]))
            .unwrap();
        scope.bind(quark("x"), x.clone().into()).unwrap();
        assert!(x.has_member(quark("a"), false));

        eval(
            &mut ctx,
            &scope,
            call(path("x:mute"), &[symbol("B"), 2.into(), 3.into()]),
        )
        .unwrap();

        assert!(x.meta().unwrap().is_same_instance(&b));
        assert!(!x.has_member(quark("a"), false));
        assert_eq!(x.local_lookup(quark("b")), Some(2.into()));
        assert_eq!(x.local_lookup(quark("c")), Some(3.into()));
    }

    #[test]
    fn mute_expects_a_class() {
        let (mut ctx, scope) = setup();
        let x = Instance::new();

        let error = x
            .call_by_name(&mut ctx, &scope, Quark::MUTE, args(&[1.into()]))
            .unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::UnexpectedType { .. }));

        let error = x
            .call_by_name(&mut ctx, &scope, Quark::MUTE, None)
            .unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::UnexpectedArgs { .. }));
    }

    #[test]
    fn mute_fails_with_a_const_meta() {
        let (mut ctx, scope) = setup();
        let x = Instance::new();
        x.bind_const(&mut ctx, &scope, Quark::META, Class::new().into())
            .unwrap();

        let error = x
            .call_by_name(&mut ctx, &scope, Quark::MUTE, args(&[Class::new().into()]))
            .unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::ConstViolation { .. }));
    }

    #[test]
    fn objects_handle_named_invocations() {
        let (mut ctx, scope) = setup();
        scope.bind(quark("cell"), TestCell::make_value(1)).unwrap();

        let result = eval(&mut ctx, &scope, call(path("cell:add"), &[2.into()])).unwrap();
        assert_eq!(result, 3.into());
        assert_eq!(eval(&mut ctx, &scope, path("cell:get")).unwrap(), 3.into());

        // Names that the object doesn't handle fall back to the builtin operators
        let repr = eval(&mut ctx, &scope, call(path("cell:repr"), &[])).unwrap();
        assert_eq!(repr, "TestCell".into());
    }

    #[test]
    fn recursion_is_limited() {
        init_logging();
        let mut ctx = Context::with_settings(ContextSettings {
            max_call_depth: 32,
            ..Default::default()
        });
        let scope = Nameset::with_core_lib().unwrap();
        scope
            .bind(quark("forever"), closure(&[], call(symbol("forever"), &[])))
            .unwrap();

        let error = eval(&mut ctx, &scope, call(symbol("forever"), &[])).unwrap_err();
        assert!(matches!(
            error.kind(),
            ErrorKind::RecursionLimit { limit: 32 }
        ));
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn post_eval_callback() {
        init_logging();
        let count = Arc::new(AtomicUsize::new(0));
        let settings = ContextSettings::default().with_post_eval_callback({
            let count = count.clone();
            move |_: &Value| {
                count.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        });
        let mut ctx = Context::with_settings(settings);
        let scope = Nameset::new();

        let class = Class::new();
        class.construct(&mut ctx, &scope, None).unwrap();
        assert!(count.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn post_eval_errors_are_propagated() {
        init_logging();
        let settings = ContextSettings::default()
            .with_post_eval_callback(|_: &Value| runtime_error!("rejected"));
        let mut ctx = Context::with_settings(settings);
        let scope = Nameset::new();

        let error = Class::new().construct(&mut ctx, &scope, None).unwrap_err();
        assert_eq!(error.to_string(), "rejected");
    }
}
