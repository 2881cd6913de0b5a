use trace_verifier::{
    Verdict, VerifierConfig, Violation, verify,
    commands::CommandDirectory,
    normalize::normalize,
    orders::Side,
    verifier::Verifier,
};

fn kind(v: &Verdict) -> &'static str {
    v.violation().map(Violation::kind).unwrap_or("Pass")
}

/// Commands for a small two-instrument session driven by several submitters.
const COMMANDS: &[&str] = &[
    "B 0 APPL 2701 10",
    "S 1 TSLA 2704 7",
    "S 2 APPL 2703 5",
    "B 3 APPL 2702 4",
    "S 4 APPL 2700 12",
    "C 2",
    "B 5 TSLA 2705 3",
    "C 1",
    "C 9",
];

/// A correct trace for `COMMANDS`, printed out of order the way interleaved
/// writer threads would print it, with a noise banner and blank lines.
const TRACE: &[&str] = &[
    "--- engine start ---",
    "S 2 APPL 2703 5 3 3",
    "B 0 APPL 2701 10 1 1",
    "S 1 TSLA 2704 7 2 2",
    "",
    "E 3 4 1 2702 4 5 5",
    "B 3 APPL 2702 4 4 4",
    "E 0 4 2 2701 8 5 6",
    "X 2 A 6 7",
    "E 1 5 3 2704 3 7 8",
    "X 1 A 8 9",
    "X 9 R 9 10",
];

#[test]
fn interleaved_session_passes() {
    let v = verify(COMMANDS, TRACE, &VerifierConfig::default());
    assert!(v.is_pass(), "{v}");
    let s = v.summary();
    assert_eq!(s.executions, 3);
    assert_eq!(s.resolved, 9);
    assert_eq!(s.expected, 9);
    // order 0 keeps 2 of its 10 lots
    assert_eq!(s.resting, 1);
}

#[test]
fn replay_exposes_book_state_between_events() {
    let directory = CommandDirectory::from_lines(COMMANDS).unwrap();
    let records = normalize(TRACE, false).unwrap();
    let mut verifier = Verifier::new(directory, VerifierConfig::default());
    let appl = "APPL".parse().unwrap();

    // acks for 0, 1, 2, 3 then the first execution against 3
    for record in &records[..5] {
        verifier.apply(&record.event).unwrap();
    }
    assert_eq!(verifier.books().best(&appl, Side::Buy).unwrap().id, 0);
    assert_eq!(verifier.directory().get(4).unwrap().remaining, 8);

    for record in &records[5..] {
        verifier.apply(&record.event).unwrap();
    }
    let best = verifier.books().best(&appl, Side::Buy).unwrap();
    assert_eq!((best.id, best.remaining), (0, 2));
    assert!(verifier.finish().is_ok());
}

#[test]
fn executing_behind_the_best_bid_is_caught() {
    let mut trace = TRACE.to_vec();
    // hit order 0 before order 3, which bids higher
    trace[5] = "E 0 4 1 2701 4 5 5";
    trace[7] = "E 3 4 2 2702 8 5 6";
    let v = verify(COMMANDS, &trace, &VerifierConfig::default());
    assert_eq!(kind(&v), "PriorityViolation");
}

#[test]
fn dropping_a_cancel_result_is_incomplete() {
    let trace: Vec<&str> = TRACE.iter().copied().filter(|l| !l.starts_with("X 9")).collect();
    let v = verify(COMMANDS, &trace, &VerifierConfig::default());
    assert_eq!(
        v.violation(),
        Some(&Violation::IncompleteResolution {
            resolved: 8,
            expected: 9
        })
    );
}

#[test]
fn duplicated_cancel_result_cannot_cover_a_missing_ack() {
    // order 5 is never acknowledged or executed; a second `X 9` must not
    // make up the count
    let mut trace: Vec<&str> = TRACE
        .iter()
        .copied()
        .filter(|l| !l.starts_with("E 1 5"))
        .collect();
    trace.push("X 9 R 10 11");
    let v = verify(COMMANDS, &trace, &VerifierConfig::default());
    assert_eq!(v.violation(), Some(&Violation::UnrequestedCancel { id: 9 }));
}

#[test]
fn repeated_execution_id_is_a_sequence_violation() {
    let mut trace = TRACE.to_vec();
    trace[9] = "E 1 5 2 2704 3 7 8";
    let v = verify(COMMANDS, &trace, &VerifierConfig::default());
    assert_eq!(kind(&v), "SequenceViolation");
}

#[test]
fn verification_runs_do_not_share_state() {
    let first = verify(COMMANDS, TRACE, &VerifierConfig::default());
    let second = verify(COMMANDS, TRACE, &VerifierConfig::default());
    assert_eq!(first, second);
}

#[test]
fn submitter_tagged_trace_needs_submitter_config() {
    let commands = ["S 1 APPL 100 5", "C 1"];
    let trace = ["S 3 1 APPL 100 5 0 1", "X 3 1 A 0 2"];

    let untagged = verify(commands, trace, &VerifierConfig::default());
    assert_eq!(kind(&untagged), "MalformedFixture");

    let tagged = VerifierConfig {
        submitter_ids: true,
        ..Default::default()
    };
    assert!(verify(commands, trace, &tagged).is_pass());
}
