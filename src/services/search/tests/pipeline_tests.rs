use super::*;
use crate::services::files::format::{FileProperty, FormatTag};
use crate::services::query::operand::Operand;
use crate::services::query::predicate::{
    Predicate, PredicateFlags, PredicateOperator, PredicateProperty,
};
use crate::services::query::rule_tree::{CombineOp, RuleNode};
use crate::test_utils;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Collects events for assertions; delivery order is the emission order.
#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl Recorder {
    fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PipelineObserver for Recorder {
    fn on_event(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// The shared scenario directory: `a.png` (512×384), `b.kra` (1920×1080,
/// >1 KiB), `c.txt`, `d.jpg` (800×600, hidden).
fn scenario_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    test_utils::write_png(&tmp.path().join("a.png"), 512, 384);
    test_utils::write_kra(&tmp.path().join("b.kra"), 1920, 1080);
    std::fs::write(tmp.path().join("c.txt"), vec![b'x'; 1024]).unwrap();
    test_utils::write_jpeg(&tmp.path().join(".d.jpg"), 800, 600);
    tmp
}

fn result_names(outcome: &SearchOutcome) -> Vec<String> {
    outcome
        .results
        .files()
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}

#[test]
fn test_scenario_format_and_width_rule_with_size_sort() {
    let tmp = scenario_dir();

    let rule = RuleNode::Combinator(
        CombineOp::And,
        vec![
            RuleNode::Predicate(
                Predicate::new(
                    PredicateProperty::FileFormat,
                    PredicateOperator::In,
                    Operand::List(vec![
                        Operand::Format(FormatTag::Png),
                        Operand::Format(FormatTag::Kra),
                    ]),
                    PredicateFlags::default(),
                )
                .unwrap(),
            ),
            RuleNode::Predicate(
                Predicate::new(
                    PredicateProperty::ImageWidth,
                    PredicateOperator::Ge,
                    Operand::Int(1000),
                    PredicateFlags::default(),
                )
                .unwrap(),
            ),
        ],
    );

    let pipeline = SearchPipeline::new()
        .add_path(SearchPath::new(tmp.path()).include_hidden(true))
        .with_rule_tree(RuleTree::compile(rule).unwrap())
        .with_sort_keys(vec![SortKey::new(FileProperty::FileSize, false)]);

    let recorder = Recorder::default();
    let outcome = pipeline.execute(&recorder);

    assert_eq!(outcome.status, SearchStatus::Completed);
    assert_eq!(result_names(&outcome), vec!["b.kra"]);
}

#[test]
fn test_scenario_managed_only_excludes_hidden() {
    let tmp = scenario_dir();

    let pipeline = SearchPipeline::new().add_path(
        SearchPath::new(tmp.path())
            .include_managed_only(true)
            .include_hidden(false),
    );

    let recorder = Recorder::default();
    let outcome = pipeline.execute(&recorder);

    let mut names = result_names(&outcome);
    names.sort();
    // `.d.jpg` is hidden, `c.txt` unmanaged.
    assert_eq!(names, vec!["a.png", "b.kra"]);
}

#[test]
fn test_scenario_everything_included_lists_unknown_format() {
    let tmp = scenario_dir();

    let pipeline =
        SearchPipeline::new().add_path(SearchPath::new(tmp.path()).include_hidden(true));

    let recorder = Recorder::default();
    let outcome = pipeline.execute(&recorder);

    let mut names = result_names(&outcome);
    names.sort();
    assert_eq!(names, vec![".d.jpg", "a.png", "b.kra", "c.txt"]);

    let txt = outcome
        .results
        .files()
        .iter()
        .find(|f| f.name() == "c.txt")
        .unwrap();
    assert_eq!(txt.format(), FormatTag::Unknown);
}

#[test]
fn test_event_order_and_terminals() {
    let tmp = scenario_dir();

    let rule = RuleNode::Predicate(
        Predicate::new(
            PredicateProperty::FileSize,
            PredicateOperator::Ge,
            Operand::Int(0),
            PredicateFlags::default(),
        )
        .unwrap(),
    );
    let pipeline = SearchPipeline::new()
        .add_path(SearchPath::new(tmp.path()).include_hidden(true))
        .with_rule_tree(RuleTree::compile(rule).unwrap())
        .with_sort_keys(vec![SortKey::new(FileProperty::FileName, true)]);

    let recorder = Recorder::default();
    let outcome = pipeline.execute(&recorder);
    assert_eq!(outcome.status, SearchStatus::Completed);

    let events = recorder.events();
    let position = |needle: fn(&PipelineEvent) -> bool| events.iter().position(needle).unwrap();

    let path_scanned = position(|e| matches!(e, PipelineEvent::PathScanned { .. }));
    let enum_done = position(|e| matches!(e, PipelineEvent::EnumDone { .. }));
    let analyse_done = position(|e| matches!(e, PipelineEvent::AnalyseDone { .. }));
    let filter_done = position(|e| matches!(e, PipelineEvent::FilterDone { .. }));
    let build_done = position(|e| matches!(e, PipelineEvent::BuildDone { .. }));
    let sort_done = position(|e| matches!(e, PipelineEvent::SortDone { .. }));

    assert!(path_scanned < enum_done);
    assert!(enum_done < analyse_done);
    assert!(analyse_done < filter_done);
    assert!(filter_done < build_done);
    assert!(build_done < sort_done);

    // Progress events precede their phase terminal.
    for (i, event) in events.iter().enumerate() {
        match event {
            PipelineEvent::ProgressAnalyse { .. } => assert!(i < analyse_done),
            PipelineEvent::ProgressFilter { .. } => assert!(i < filter_done),
            _ => {}
        }
    }

    if let PipelineEvent::EnumDone { files, total, .. } = &events[enum_done] {
        assert_eq!(*files, 4);
        assert_eq!(*total, 4);
    }
    if let PipelineEvent::FilterDone { kept, .. } = &events[filter_done] {
        // c.txt is unreadable but still passes a size rule; all four kept.
        assert_eq!(*kept, 4);
    }
    if let PipelineEvent::SortDone { keys, .. } = &events[sort_done] {
        assert_eq!(keys.len(), 1);
        assert!(keys[0].contains("fileName"));
    }
}

#[test]
fn test_directories_first_in_sorted_results() {
    let tmp = TempDir::new().unwrap();
    test_utils::write_png(&tmp.path().join("aaa.png"), 16, 16);
    std::fs::create_dir(tmp.path().join("zzz")).unwrap();

    let pipeline = SearchPipeline::new()
        .add_path(SearchPath::new(tmp.path()))
        .with_directories(true)
        .with_sort_keys(vec![SortKey::new(FileProperty::FileName, true)]);

    let recorder = Recorder::default();
    let outcome = pipeline.execute(&recorder);
    let names = result_names(&outcome);
    assert_eq!(names, vec!["zzz", "aaa.png"]);
}

#[test]
fn test_cancel_before_execution_discards_everything() {
    let tmp = scenario_dir();
    let pipeline = SearchPipeline::new().add_path(SearchPath::new(tmp.path()));
    pipeline.cancel_token().cancel();

    let recorder = Recorder::default();
    let outcome = pipeline.execute(&recorder);

    assert_eq!(outcome.status, SearchStatus::Cancelled);
    assert!(outcome.results.is_empty());
    assert!(recorder
        .events()
        .iter()
        .any(|e| matches!(e, PipelineEvent::Cancelled)));
    // Cancellation is idempotent.
    pipeline.cancel_token().cancel();
    assert!(pipeline.cancel_token().is_cancelled());
}

#[test]
fn test_empty_rule_tree_keeps_everything() {
    let tmp = scenario_dir();
    let pipeline =
        SearchPipeline::new().add_path(SearchPath::new(tmp.path()).include_hidden(true));

    let recorder = Recorder::default();
    let outcome = pipeline.execute(&recorder);
    assert_eq!(outcome.results.len(), 4);
    // No filter phase percent events for the identity tree, but the
    // terminal still fires.
    assert!(recorder
        .events()
        .iter()
        .any(|e| matches!(e, PipelineEvent::FilterDone { kept: 4, .. })));
}

#[test]
fn test_export_forwards_renderer_progress() {
    struct PagedRenderer;
    impl ResultRenderer for PagedRenderer {
        fn page_count(&self, results: &ResultList) -> i64 {
            results.len() as i64
        }
        fn render(
            &self,
            results: &ResultList,
            progress: &mut dyn FnMut(i64),
        ) -> crate::types::errors::CoreResult<String> {
            for page in 0..results.len() as i64 {
                progress(page + 1);
            }
            Ok("@clipboard".to_string())
        }
    }

    let tmp = scenario_dir();
    let pipeline =
        SearchPipeline::new().add_path(SearchPath::new(tmp.path()).include_hidden(true));
    let recorder = Recorder::default();
    let outcome = pipeline.execute(&recorder);

    let sink = pipeline
        .export(&outcome.results, &PagedRenderer, &recorder)
        .unwrap();
    assert_eq!(sink, "@clipboard");

    let events = recorder.events();
    let start = events
        .iter()
        .position(|e| matches!(e, PipelineEvent::ExportStart { pages: 4 }))
        .unwrap();
    let end = events
        .iter()
        .position(|e| matches!(e, PipelineEvent::ExportEnd { .. }))
        .unwrap();
    let progress: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, PipelineEvent::ExportProgress { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(progress.len(), 4);
    assert!(progress.iter().all(|i| *i > start && *i < end));
}

#[test]
fn test_describe_mentions_paths_rules_and_sort() {
    let tmp = TempDir::new().unwrap();
    let rule = RuleNode::Predicate(
        Predicate::new(
            PredicateProperty::FileFormat,
            PredicateOperator::Eq,
            Operand::Format(FormatTag::Kra),
            PredicateFlags::default(),
        )
        .unwrap(),
    );
    let pipeline = SearchPipeline::new()
        .add_path(SearchPath::new(tmp.path()).recursive(true))
        .with_rule_tree(RuleTree::compile(rule).unwrap())
        .with_sort_keys(vec![SortKey::new(FileProperty::FileDate, true)]);

    let description = pipeline.describe();
    assert!(description.contains("search from directory"));
    assert!(description.contains("(and sub-directories)"));
    assert!(description.contains("matching rule"));
    assert!(description.contains("sort by"));
}
