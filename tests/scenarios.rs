use amber_rs::decision::{decide_termination, decide_termination_with, Config};
use amber_rs::parser::parse_program;
use amber_rs::result::{Answer, WitnessKind};
use amber_rs::rules::Rule;

use test_log::test;

#[test]
fn test_deterministic_countdown() {
    let program = parse_program("x = 10\nwhile x > 0:\n    x = x - 1\nend\n").unwrap();
    let result = decide_termination(&program).unwrap();
    assert_eq!(result.past(), Answer::True);
    assert_eq!(result.ast(), Answer::True);

    let witness = &result.witnesses()[0];
    assert_eq!(witness.kind(), WitnessKind::Past);
    assert_eq!(witness.get("RSM expression"), Some("-1"));
    assert_eq!(witness.get("Change bound"), Some("-1"));
}

#[test]
fn test_fair_random_walk() {
    let program = parse_program("x = 10\nwhile x > 0:\n    x = x - 1 @ 1/2; x + 1\nend\n").unwrap();
    let result = decide_termination(&program).unwrap();
    assert_eq!(result.ast(), Answer::True);
    assert_eq!(result.past(), Answer::False);

    let kinds: Vec<WitnessKind> = result.witnesses().iter().map(|w| w.kind()).collect();
    assert_eq!(kinds, vec![WitnessKind::Ast, WitnessKind::NotPast]);
}

#[test]
fn test_fair_random_walk_repulsing_only() {
    let program = parse_program("x = 10\nwhile x > 0:\n    x = x - 1 @ 1/2; x + 1\nend\n").unwrap();
    let config = Config::new([Rule::RepulsingSupermartingale]);
    let result = decide_termination_with(&program, &config).unwrap();
    assert_eq!(result.past(), Answer::False);
    assert_eq!(result.ast(), Answer::Unknown);
}

#[test]
fn test_biased_random_walk() {
    let program = parse_program("x = 10\nwhile x > 0:\n    x = x + 1 @ 2/3; x - 1\nend\n").unwrap();
    let result = decide_termination(&program).unwrap();
    assert_eq!(result.past(), Answer::False);
    assert_eq!(result.ast(), Answer::False);

    let witness = &result.witnesses()[0];
    assert_eq!(witness.kind(), WitnessKind::NotAst);
    assert_eq!(witness.get("Epsilons"), Some("1/3"));
    assert_eq!(witness.get("Cs"), Some("1"));
}

#[test]
fn test_loop_never_entered() {
    let program = parse_program("x = 0\nwhile x > 0:\n    x = x + 1\nend\n").unwrap();
    let result = decide_termination(&program).unwrap();
    assert_eq!(result.past(), Answer::True);
    assert_eq!(result.ast(), Answer::True);
    assert_eq!(result.witnesses().len(), 1);
    assert_eq!(result.witnesses()[0].get("Initial value"), Some("0"));
}

#[test]
fn test_report_lists_witnesses() {
    let program = parse_program("x = 10\nwhile x > 0:\n    x = x + 1 @ 2/3; x - 1\nend\n").unwrap();
    let report = decide_termination(&program).unwrap().to_string();
    assert!(report.starts_with("PAST: No\nAST: No\n"));
    assert!(report.contains("Not AST"));
    assert!(report.contains("Explanation:"));
}
