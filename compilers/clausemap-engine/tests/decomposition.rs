use clausemap_engine::{
    BoundaryExpander, CoordinationStatus, CoordinationStrategy, DecompositionRecord, DependencyGraph, Diagnostic,
    EngineConfig, ExpansionOutcome, GroupExample, Pipeline, SentenceView, StaticPopulation,
};
use clausemap_parser::{GreedyParser, ParserAdapter};
use clausemap_protocol::{ParsedSentence, Slot, SlotName, TokenSpan};

const CORPUS: &[&str] = &[
    "The tall man quickly closed the door.",
    "She gave him a book",
    "The door was closed by the wind",
    "What did you see?",
    "The man who lives here closed the door",
    "She can't want to leave",
    "They painted the fence white yesterday",
    "The old red door.",
];

fn pipeline(config: EngineConfig) -> Pipeline {
    Pipeline::with_parser(Box::new(GreedyParser::new()), config).unwrap()
}

fn parse(text: &str) -> ParsedSentence {
    GreedyParser::new().parse(text).unwrap()
}

#[test]
fn merged_result_of_foundation_and_modifier() {
    let record = pipeline(EngineConfig::default())
        .decompose_text("The tall man quickly closed the door.")
        .unwrap();
    let result = &record.result;

    assert_eq!(result.strategy, CoordinationStrategy::FoundationPlusSpecialist);
    assert_eq!(result.text(SlotName::S), Some("The tall man"));
    assert_eq!(result.text(SlotName::V), Some("closed"));
    assert_eq!(result.text(SlotName::O1), Some("the door"));
    assert_eq!(result.text(SlotName::M1), Some("quickly"));
    assert_eq!(result.slots.len(), 4);
}

#[test]
fn missing_modifier_gets_an_empty_column() {
    let pipeline = pipeline(EngineConfig::default());
    let mut population = StaticPopulation::new();
    for (id, text) in [("with", "The tall man quickly closed the door."), ("without", "The man closed the door")] {
        let record = pipeline.decompose_text(text).unwrap();
        population.push("close", GroupExample::new(id, record.result.slots));
    }

    let with = pipeline
        .decompose_in_group("The tall man quickly closed the door.", "close", &population)
        .unwrap();
    let without = pipeline
        .decompose_in_group("The man closed the door", "close", &population)
        .unwrap();

    let with = with.columns.unwrap();
    let without = without.columns.unwrap();
    assert_eq!(with.len(), without.len());
    let m1 = with.iter().position(|c| c.key.path == "M1").unwrap();
    assert!(!with[m1].empty);
    assert!(without[m1].empty);
    assert_eq!(without[m1].text, None);
    // slots after the gap keep their columns
    for (a, b) in with.iter().zip(&without).skip(m1 + 1) {
        assert_eq!(a.key, b.key);
        assert_eq!(a.column, b.column);
        assert!(!b.empty);
    }
}

#[test]
fn lone_pronoun_subject_is_not_expanded() {
    let sentence = parse("She gave him a book");
    let graph = DependencyGraph::from_sentence(&sentence);
    let view = SentenceView::whole(&sentence, &graph);

    let expansion = BoundaryExpander::with_defaults().expand(SlotName::S, TokenSpan::single(sentence.tokens[0].id), &view, &[]);
    assert_eq!(expansion.outcome, ExpansionOutcome::Unchanged);
    assert_eq!(expansion.span, TokenSpan::new(0, 1));
}

#[test]
fn decomposition_is_idempotent() {
    let pipeline = pipeline(EngineConfig { deadline_ms: 0, ..EngineConfig::default() });
    for text in CORPUS {
        let sentence = parse(text);
        let first = pipeline.decompose_parsed(&sentence);
        let second = pipeline.decompose_parsed(&sentence);
        assert_eq!(first, second, "{}", text);
    }
}

#[test]
fn default_config_is_idempotent_within_budget() {
    let pipeline = pipeline(EngineConfig::default());
    for text in CORPUS {
        let sentence = parse(text);
        let first = pipeline.decompose_parsed(&sentence);
        let second = pipeline.decompose_parsed(&sentence);
        let hit_deadline = |r: &DecompositionRecord| {
            r.result.diagnostics.iter().any(|d| matches!(d, Diagnostic::DeadlineExceeded { .. }))
        };
        assert!(!hit_deadline(&first) && !hit_deadline(&second), "{}", text);
        assert_eq!(first, second, "{}", text);
    }
}

fn assert_contained(sentence: &ParsedSentence, parent: &Slot) {
    assert_eq!(parent.text, sentence.span_text(&parent.span));
    for sub in &parent.sub_slots {
        assert!(parent.span.contains_span(&sub.span), "{} escapes {}", sub.label(), parent.label());
        assert_eq!(sub.depth, parent.depth + 1);
        assert_contained(sentence, sub);
    }
    for (i, a) in parent.sub_slots.iter().enumerate() {
        for b in &parent.sub_slots[i + 1..] {
            assert!(!a.span.overlaps(&b.span), "{} overlaps {}", a.label(), b.label());
        }
    }
}

#[test]
fn slots_stay_inside_their_parents() {
    let pipeline = pipeline(EngineConfig { deadline_ms: 0, ..EngineConfig::default() });
    for text in CORPUS {
        let sentence = parse(text);
        let result = pipeline.decompose_parsed(&sentence).result;

        let top: Vec<&Slot> = result.slots.iter().collect();
        for (i, a) in top.iter().enumerate() {
            assert!(sentence.full_span().contains_span(&a.span));
            assert_eq!(a.depth, 0);
            for b in &top[i + 1..] {
                assert!(!a.span.overlaps(&b.span), "{}: {} overlaps {}", text, a.label(), b.label());
            }
            assert_contained(&sentence, a);
        }
        for slot in result.slots.iter() {
            assert!((0.0..=1.0).contains(&slot.confidence));
        }
    }
}

#[test]
fn fragment_reports_no_detector() {
    let record = pipeline(EngineConfig::default()).decompose_text("The old red door.").unwrap();
    assert_eq!(record.result.status, CoordinationStatus::NoApplicableDetector);
    assert!(record.result.slots.is_empty());
}

#[test]
fn config_file_drives_the_pipeline() {
    let config = EngineConfig::from_toml_str(
        r#"
        disabled_detectors = ["modifier"]
        deadline_ms = 0
        "#,
    )
    .unwrap();
    let record = pipeline(config).decompose_text("The tall man quickly closed the door.").unwrap();
    assert_eq!(record.result.strategy, CoordinationStrategy::SingleOptimal);
    assert_eq!(record.result.text(SlotName::M1), None);
}
