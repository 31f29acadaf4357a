//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - contract snapshot tests
//! - operator pipelines on the channel engine
//! - declarations loaded from files into a running operator

#[cfg(test)]
mod contract_tests {
    use contracts::{operator_name, SequenceKind, DEFAULT_EMIT};

    #[test]
    fn test_contract_constants() {
        assert_eq!(DEFAULT_EMIT, "__out__");
        assert_eq!(operator_name(false), "merge");
        assert_eq!(operator_name(true), "multi_merge");
        assert_eq!(SequenceKind::default(), SequenceKind::Stream);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use channel_engine::{ChannelFactory, ChannelSource, Engine, EngineError};
    use contracts::{MergeError, SequenceKind, Signal, SourceError, SourceSequence, TargetSequence};
    use merge_op::{MergeOperator, MergeOptions};

    fn erase<T: Clone + Send + 'static>(
        sources: Vec<ChannelSource<T>>,
    ) -> Vec<Arc<dyn SourceSequence<T>>> {
        sources
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn SourceSequence<T>>)
            .collect()
    }

    /// Stream 1, 2, 3 doubled on a single source ends with one stop
    #[tokio::test]
    async fn test_e2e_double_stream() {
        let engine = Engine::new().unwrap();
        let (writer, source) = engine.stream_source::<i64>("numbers");

        let op = MergeOperator::new(
            erase(vec![source]),
            MergeOptions::new().on_next(|dsl, v: i64, _| dsl.emit(v * 2)),
            &ChannelFactory,
        )
        .unwrap();
        op.apply().unwrap();

        for v in [1, 2, 3] {
            writer.next(v).unwrap();
        }
        writer.complete().unwrap();

        let output = op.output().unwrap().output();
        assert_eq!(
            output.collect().await,
            vec![
                Signal::Item(2),
                Signal::Item(4),
                Signal::Item(6),
                Signal::Stop
            ]
        );
        engine.join().await.unwrap();
    }

    /// Concurrent delivery from two sources never overlaps inside callbacks
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_guard_serializes_sources() {
        let engine = Engine::new().unwrap();
        let (writer_a, a) = engine.stream_source::<u32>("a");
        let (writer_b, b) = engine.stream_source::<u32>("b");

        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let per_index = Arc::new(Mutex::new([0usize; 2]));
        let completed = Arc::new(AtomicUsize::new(0));

        let probe_flight = Arc::clone(&in_flight);
        let probe_max = Arc::clone(&max_seen);
        let probe_index = Arc::clone(&per_index);
        let op = MergeOperator::new(
            erase(vec![a, b]),
            MergeOptions::new()
                .singleton(false)
                .on_next(move |dsl, v: u32, index| {
                    let now = probe_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    probe_max.fetch_max(now, Ordering::SeqCst);
                    let index = index.expect("multi-source callbacks carry an index");
                    let expected = if v >= 1000 { 1 } else { 0 };
                    assert_eq!(index, expected);
                    probe_index.lock().unwrap()[index] += 1;
                    std::thread::sleep(std::time::Duration::from_micros(50));
                    probe_flight.fetch_sub(1, Ordering::SeqCst);
                    dsl.emit(v)
                })
                .on_complete(move |dsl, _| {
                    if completed.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                        dsl.done()?;
                    }
                    Ok(())
                }),
            &ChannelFactory,
        )
        .unwrap();
        op.apply().unwrap();

        let feed_a = tokio::task::spawn_blocking(move || {
            for v in 0..200 {
                writer_a.next(v).unwrap();
            }
            writer_a.complete().unwrap();
        });
        let feed_b = tokio::task::spawn_blocking(move || {
            for v in 1000..1200 {
                writer_b.next(v).unwrap();
            }
            writer_b.complete().unwrap();
        });
        feed_a.await.unwrap();
        feed_b.await.unwrap();

        let signals = op.output().unwrap().output().collect().await;
        engine.join().await.unwrap();

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(*per_index.lock().unwrap(), [200, 200]);
        assert_eq!(signals.len(), 401);
        assert_eq!(signals.last(), Some(&Signal::Stop));
    }

    #[tokio::test]
    async fn test_e2e_value_target_written_once() {
        let engine = Engine::new().unwrap();
        let (writer, source) = engine.value_source::<String>("answer");

        let op = MergeOperator::new(
            erase(vec![source]),
            MergeOptions::new().on_next(|dsl, v: String, _| dsl.emit(v.to_uppercase())),
            &ChannelFactory,
        )
        .unwrap();
        assert!(op.is_singleton());
        op.apply().unwrap();

        writer.next("yes".to_string()).unwrap();
        engine.join().await.unwrap();

        let target = op.output().unwrap();
        assert!(target.is_resolved());
        assert!(!target.is_stopped());
        assert_eq!(
            target.output().drain_ready(),
            vec![Signal::Item("YES".to_string())]
        );
    }

    #[tokio::test]
    async fn test_e2e_value_target_never_written_is_stopped() {
        let engine = Engine::new().unwrap();
        let source = engine
            .source_from_iter::<i32, _>("empty", SequenceKind::Value, [])
            .unwrap();

        let op = MergeOperator::new(erase(vec![source]), MergeOptions::new(), &ChannelFactory)
            .unwrap();
        op.apply().unwrap();
        engine.join().await.unwrap();

        assert_eq!(op.output().unwrap().output().collect().await, vec![Signal::Stop]);
    }

    #[tokio::test]
    async fn test_e2e_emit_without_name_in_multi_mode_fails_subscription() {
        let engine = Engine::new().unwrap();
        let source = engine
            .source_from_iter("numbers", SequenceKind::Stream, [1])
            .unwrap();

        let op = MergeOperator::new(
            erase(vec![source]),
            MergeOptions::new()
                .emits(["a", "b"])
                .on_next(|dsl, v: i32, _| dsl.emit(v)),
            &ChannelFactory,
        )
        .unwrap();
        op.apply().unwrap();

        match engine.join().await {
            Err(EngineError::Handler { error, .. }) => assert!(error.is_usage()),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_e2e_source_error_without_handler() {
        let engine = Engine::new().unwrap();
        let (writer, source) = engine.stream_source::<i32>("flaky");

        let op = MergeOperator::new(erase(vec![source]), MergeOptions::new(), &ChannelFactory)
            .unwrap();
        op.apply().unwrap();
        writer.error(SourceError::new("broken pipe")).unwrap();

        assert!(matches!(
            engine.join().await,
            Err(EngineError::UnhandledSourceError { .. })
        ));
        assert!(op.output().unwrap().output().drain_ready().is_empty());
    }

    #[tokio::test]
    async fn test_e2e_source_error_with_handler_emits() {
        let engine = Engine::new().unwrap();
        let (writer_a, a) = engine.stream_source::<String>("a");
        let (writer_b, b) = engine.stream_source::<String>("b");

        let op = MergeOperator::new(
            erase(vec![a, b]),
            MergeOptions::new()
                .emits(["data", "errors"])
                .on_next(|dsl, v: String, _| dsl.emit_to("data", v))
                .on_error(|dsl, error, index| {
                    dsl.emit_to("errors", format!("{index:?}: {}", error.message))
                }),
            &ChannelFactory,
        )
        .unwrap();
        op.apply().unwrap();

        writer_a.next("ok".to_string()).unwrap();
        writer_a.complete().unwrap();
        writer_b.error(SourceError::new("bad record")).unwrap();
        let report = engine.join().await.unwrap();
        assert_eq!(report.errored(), 1);

        let errors = op.output_named("errors").unwrap().output().drain_ready();
        assert_eq!(errors, vec![Signal::Item("Some(1): bad record".to_string())]);
        // Multi-source: closing the outputs is up to the handlers
        assert!(!op.output_named("data").unwrap().is_stopped());
    }

    #[tokio::test]
    async fn test_e2e_done_closes_remaining_outputs_after_refused_stop() {
        let engine = Engine::new().unwrap();
        let (_writer, source) = engine.stream_source::<i32>("s");

        let op = MergeOperator::new(
            erase(vec![source]),
            MergeOptions::new().emits(["a", "b", "c"]),
            &ChannelFactory,
        )
        .unwrap();
        // closed from the engine side before the operator gets to it
        op.output_named("b").unwrap().stop().unwrap();

        let err = op.dsl().done().unwrap_err();
        assert!(matches!(err, MergeError::Target { ref target, .. } if target == "b"));
        op.dsl().done().unwrap();

        for name in ["a", "c"] {
            let target = op.output_named(name).unwrap();
            assert!(target.is_stopped());
            assert_eq!(target.output().collect().await, vec![Signal::Stop]);
        }
    }

    #[test]
    fn test_configuration_error_names_operator() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let engine = Engine::with_handle(runtime.handle().clone());
        let (_writer, source) = engine.stream_source::<i32>("s");

        let options = MergeOptions {
            on_error: Some(merge_op::HandlerOption::not_callable("string \"oops\"")),
            ..MergeOptions::new().emits(["x"])
        };
        let err = MergeOperator::new(erase(vec![source]), options, &ChannelFactory)
            .err()
            .unwrap();
        match err {
            MergeError::Configuration {
                option, operator, ..
            } => {
                assert_eq!(option, "on_error");
                assert_eq!(operator, "multi_merge");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[cfg(test)]
mod config_tests {
    use std::sync::Arc;

    use channel_engine::{ChannelFactory, Engine};
    use config_loader::ConfigLoader;
    use contracts::{Signal, SourceSequence};
    use merge_op::{builtin_registry, MergeOperator, MergeOptions};
    use serde_json::{json, Value};

    /// Declaration file -> loader -> built-in handlers -> running operator
    #[tokio::test]
    async fn test_declaration_file_drives_operator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.toml");
        std::fs::write(
            &path,
            r#"
emits = ["evens", "odds"]
on_next = "route_by_source"
on_complete = "done_when_all_complete"
on_error = "log_error"

[[sources]]
path = "evens.jsonl"

[[sources]]
path = "odds.jsonl"
"#,
        )
        .unwrap();

        let decl = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(decl.operator_name(), "multi_merge");
        assert!(decl.sources[0].path.starts_with(dir.path()));

        let engine = Engine::new().unwrap();
        let inputs = [vec![json!(2), json!(4)], vec![json!(1), json!(3), json!(5)]];
        let sources: Vec<Arc<dyn SourceSequence<Value>>> = decl
            .sources
            .iter()
            .zip(inputs)
            .map(|(source, values)| {
                let label = source.path.display().to_string();
                Arc::new(engine.source_from_iter(label, source.kind, values).unwrap())
                    as Arc<dyn SourceSequence<Value>>
            })
            .collect();

        let registry = builtin_registry(sources.len());
        let op = MergeOperator::new(
            sources,
            MergeOptions::from_decl(&decl, &registry),
            &ChannelFactory,
        )
        .unwrap();
        op.apply().unwrap();
        engine.join().await.unwrap();

        let evens = op.output_named("evens").unwrap().output().collect().await;
        let odds = op.output_named("odds").unwrap().output().collect().await;
        assert_eq!(
            evens,
            vec![Signal::Item(json!(2)), Signal::Item(json!(4)), Signal::Stop]
        );
        assert_eq!(odds.len(), 4);
        assert_eq!(odds.last(), Some(&Signal::Stop));
    }

    #[test]
    fn test_non_callable_declaration_is_rejected_at_build() {
        let decl = ConfigLoader::load_from_str(
            "on_next = 42\n[[sources]]\npath = \"in.jsonl\"\n",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let engine = Engine::with_handle(runtime.handle().clone());
        let (_writer, source) = engine.stream_source::<Value>("in");

        let registry = builtin_registry(1);
        let err = MergeOperator::new(
            vec![Arc::new(source) as Arc<dyn SourceSequence<Value>>],
            MergeOptions::from_decl(&decl, &registry),
            &ChannelFactory,
        )
        .err()
        .unwrap();
        assert!(err.to_string().starts_with("merge: invalid option 'on_next'"));
    }
}
