//! End-to-end scenario tests: capture → group → accumulate → export.

mod common;

use std::time::Duration;

use tickscope::calltree::MergeMode;
use tickscope::capture::ThreadDump;
use tickscope::export::ExportProps;
use tickscope::sampler::{SamplerBuilder, ThreadGrouper};

use common::{frame, thread, ScriptedBackend, TestPlatform};

/// A thread alternating between `test() → testA()` and `test() → testB()`,
/// sampled for two seconds at 10ms: the snapshot must contain one thread
/// entry whose `test` node has both callees as children, with counts
/// bounded by the number of ticks.
#[tokio::test]
async fn recursive_call_pattern_produces_one_merged_tree() {
    const CLASS: &str = "game.test.TestTask";

    let via_a = vec![ThreadDump::new(
        thread(7, "Test Thread"),
        vec![frame(CLASS, "test", 25), frame(CLASS, "testA", 31)],
    )];
    let via_b = vec![ThreadDump::new(
        thread(7, "Test Thread"),
        vec![frame(CLASS, "test", 27), frame(CLASS, "testB", 42)],
    )];
    let backend = ScriptedBackend::cycling("scripted", vec![via_a, via_b]);

    let platform = TestPlatform::with_fallback(backend);
    let sampler = SamplerBuilder::new()
        .thread_grouper(ThreadGrouper::ByPool)
        .sampling_interval(Duration::from_millis(10))
        .complete_after(Duration::from_secs(2))
        .start(&platform)
        .unwrap();

    assert!(sampler.auto_end_time().is_some());
    sampler.wait_until_done().await;

    let snapshot = sampler.export(&ExportProps::new().merge_mode(MergeMode::SeparateMethod));

    assert_eq!(snapshot.threads.len(), 1);
    let entry = &snapshot.threads[0];
    assert_eq!(entry.name, "Test Thread");
    assert_eq!(entry.nodes.len(), 1);

    let test = &entry.nodes[0];
    assert_eq!(test.class_name, CLASS);
    assert_eq!(test.method_name, "test");

    let test_a = test
        .children
        .iter()
        .find(|n| n.method_name == "testA")
        .expect("testA missing under test");
    let test_b = test
        .children
        .iter()
        .find(|n| n.method_name == "testB")
        .expect("testB missing under test");

    assert!(test_a.sample_count > 0);
    assert!(test_b.sample_count > 0);
    assert_eq!(test.sample_count, test_a.sample_count + test_b.sample_count);

    // one root-to-leaf path per capture tick, never more than ticks elapsed
    let ticks = sampler.stats().captures;
    assert!(test.sample_count <= ticks);
}

#[tokio::test]
async fn pool_grouping_collapses_workers_into_one_bucket() {
    let dumps: Vec<ThreadDump> = (1..=5)
        .map(|i| {
            ThreadDump::new(
                thread(i, &format!("Worker-{i}")),
                vec![frame("game.Worker", "work", 12)],
            )
        })
        .collect();

    for (grouper, expected_entries) in [(ThreadGrouper::ByPool, 1), (ThreadGrouper::ByName, 5)] {
        let platform = TestPlatform::with_fallback(ScriptedBackend::fixed("scripted", dumps.clone()));
        let sampler = SamplerBuilder::new()
            .thread_grouper(grouper)
            .sampling_interval(Duration::from_millis(5))
            .complete_after(Duration::from_millis(200))
            .start(&platform)
            .unwrap();
        sampler.wait_until_done().await;

        let snapshot = sampler.export(&ExportProps::new());
        assert_eq!(
            snapshot.threads.len(),
            expected_entries,
            "unexpected bucket count under {grouper:?}"
        );
        if grouper == ThreadGrouper::ByPool {
            assert_eq!(snapshot.threads[0].name, "Worker");
        }
    }
}

#[tokio::test]
async fn filtered_dumper_only_samples_matching_threads() {
    let dumps = vec![
        ThreadDump::new(thread(1, "Server thread"), vec![frame("game.Server", "run", 1)]),
        ThreadDump::new(thread(2, "Worker-1"), vec![frame("game.Worker", "work", 2)]),
    ];
    let platform = TestPlatform::with_fallback(ScriptedBackend::fixed("scripted", dumps));

    let sampler = SamplerBuilder::new()
        .thread_dumper(tickscope::ThreadDumper::filtered(|name| {
            name.starts_with("Worker")
        }))
        .sampling_interval(Duration::from_millis(5))
        .complete_after(Duration::from_millis(100))
        .start(&platform)
        .unwrap();
    sampler.wait_until_done().await;

    let snapshot = sampler.export(&ExportProps::new());
    assert_eq!(snapshot.threads.len(), 1);
    assert_eq!(snapshot.threads[0].name, "Worker");
}
