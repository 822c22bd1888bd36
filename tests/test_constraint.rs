mod support;

use std::cell::RefCell;
use std::rc::Rc;

use cfg_cky::constraint::{self, BracketConstraint, CellConstraint, FnConstraint};
use cfg_cky::*;
use test_case::test_case;

use support::*;

/// Binary constituents may not have a left child longer than the right one.
fn balanced(start: usize, end: usize, mid: usize, rule: &Rule) -> bool {
    !rule.is_binary() || mid - start <= end - mid
}

fn balanced_constraint() -> SharedConstraint {
    constraint::shared(FnConstraint::new(
        |start, end, mid, rule: &Rule, _score| balanced(start, end, mid, rule),
    ))
}

#[test_case(CellType::Full, ParseType::Viterbi)]
#[test_case(CellType::Hashed, ParseType::Viterbi)]
#[test_case(CellType::DoubleHashed, ParseType::Viterbi)]
#[test_case(CellType::Full, ParseType::Inside)]
#[test_case(CellType::Hashed, ParseType::Inside)]
#[test_case(CellType::DoubleHashed, ParseType::Inside)]
fn test_constrained_chart_matches_enumeration(cell_type: CellType, parse_type: ParseType) {
    init_logging();
    let grammar = pp_attachment_grammar(LoopOrder::LeftChild);
    let config = ChartConfig::new()
        .with_cell_type(cell_type)
        .with_parse_type(parse_type);
    let mut chart = Chart::new(&grammar, config)
        .unwrap()
        .with_constraint(balanced_constraint());
    for text in [
        "the man saw fish",
        "the man saw the fish with the telescope",
        "fish saw fish with fish",
    ] {
        let tokens = sentence(&grammar, text);
        let derivations = enumerate(&grammar, &tokens, &RuleScorer, &balanced);
        chart.parse(&tokens, &RuleScorer).unwrap();
        match parse_type {
            ParseType::Viterbi => {
                assert_eq!(chart.root_score(), best(&derivations), "{}", text);
                if let Some(parse) = chart.viterbi_parse() {
                    for (start, mid, end) in parse.tree.binary_spans() {
                        assert!(mid - start <= end - mid);
                    }
                }
            }
            ParseType::Inside => match chart.root_score() {
                Some(score) => assert_close(score, total(&derivations)),
                None => assert!(derivations.is_empty(), "{}", text),
            },
        }
    }
}

#[test]
fn test_constraint_prunes_derivations() {
    let grammar = bracketing_grammar(LoopOrder::CartesianProduct);
    let x = grammar.terminals().lookup("x").unwrap();
    let tokens = vec![x; 4];
    let config = ChartConfig::new()
        .with_parse_type(ParseType::Inside)
        .with_loop_order(LoopOrder::CartesianProduct);
    let mut free = Chart::new(&grammar, config).unwrap();
    free.parse(&tokens, &RuleScorer).unwrap();
    let mut constrained = Chart::new(&grammar, config)
        .unwrap()
        .with_constraint(balanced_constraint());
    constrained.parse(&tokens, &RuleScorer).unwrap();
    // Five bracketings of four tokens, of which `(x (x (x x)))` and `(x x) (x x)` are balanced.
    assert_close(free.root_score().unwrap(), 5f64.ln() - 4.0);
    assert_close(constrained.root_score().unwrap(), 2f64.ln() - 4.0);
}

#[test]
fn test_bracket_constraint() {
    let grammar = bracketing_grammar(LoopOrder::LeftChild);
    let x = grammar.terminals().lookup("x").unwrap();
    let tokens = vec![x; 4];
    let brackets = Rc::new(RefCell::new(BracketConstraint::from_brackets(4, &[(1, 3)])));
    assert!(brackets.borrow().is_forbidden(0, 2));
    assert!(brackets.borrow().is_forbidden(2, 4));
    assert!(!brackets.borrow().is_forbidden(1, 3));
    assert!(!brackets.borrow().is_forbidden(0, 4));

    let config = ChartConfig::new().with_parse_type(ParseType::Inside);
    let mut chart = Chart::new(&grammar, config)
        .unwrap()
        .with_constraint(brackets.clone());
    chart.parse(&tokens, &RuleScorer).unwrap();
    assert_eq!(brackets.borrow().sentence_len(), 4);
    assert!(!chart.cell(0, 2).contains(grammar.root()));
    // `((x (x x)) x)` and `(x ((x x) x))`.
    assert_close(chart.root_score().unwrap(), 2f64.ln() - 4.0);
    let io = InsideOutside::new(&chart, &RuleScorer).unwrap();
    assert!((io.marginal(grammar.root(), 1, 3) - 1.0).abs() < 1e-9);
    assert!((io.marginal(grammar.root(), 0, 3) - 0.5).abs() < 1e-9);
    assert_eq!(io.marginal(grammar.root(), 2, 4), 0.0);
}

#[test]
fn test_bracket_constraint_grows_with_sentence() {
    let grammar = bracketing_grammar(LoopOrder::LeftChild);
    let x = grammar.terminals().lookup("x").unwrap();
    let mut bracket = BracketConstraint::new(2);
    bracket.forbid(0, 2);
    let brackets = Rc::new(RefCell::new(bracket));
    let mut chart = Chart::new(&grammar, ChartConfig::new())
        .unwrap()
        .with_constraint(brackets.clone());
    chart.parse(&vec![x; 6], &RuleScorer).unwrap();
    assert_eq!(brackets.borrow().sentence_len(), 6);
    assert!(brackets.borrow().is_forbidden(0, 2));
    assert!(!brackets.borrow().is_forbidden(4, 6));
    let parse = chart.viterbi_parse().unwrap();
    assert!(parse.tree.binary_spans().iter().all(|&(start, _, end)| (start, end) != (0, 2)));
}

#[test]
fn test_score_bound_pruning() {
    let grammar = bracketing_grammar(LoopOrder::LeftChild);
    let x = grammar.terminals().lookup("x").unwrap();
    let bound = constraint::shared(FnConstraint::new(|_, _, _, _: &Rule, score| score >= -2.0));
    let mut chart = Chart::new(&grammar, ChartConfig::new())
        .unwrap()
        .with_constraint(bound);
    chart.parse(&[x, x], &RuleScorer).unwrap();
    assert_eq!(chart.root_score(), Some(-1.5));
    chart.parse(&[x, x, x], &RuleScorer).unwrap();
    assert_eq!(chart.root_score(), None);
}

struct RecordingConstraint {
    sentences: Vec<Vec<Symbol>>,
}

impl CellConstraint for RecordingConstraint {
    fn set_sentence(&mut self, sentence: &[Symbol]) {
        self.sentences.push(sentence.to_vec());
    }

    fn should_update_cell(&self, _: usize, _: usize, _: usize, _: &Rule, _: f64) -> bool {
        true
    }
}

#[test]
fn test_constraint_sees_each_sentence() {
    let grammar = dog_grammar(LoopOrder::LeftChild);
    let recording = Rc::new(RefCell::new(RecordingConstraint { sentences: vec![] }));
    let jitter = JitterSource::seed_from_u64(0);
    let config = ChartConfig::new().with_cell_type(CellType::TieBreaking);
    let mut chart = Chart::with_jitter(&grammar, config, jitter)
        .unwrap()
        .with_constraint(recording.clone());
    let first = sentence(&grammar, "the dog barks");
    let second = sentence(&grammar, "dog barks");
    chart.parse(&first, &RuleScorer).unwrap();
    assert_eq!(chart.root_score(), Some(-3.0));
    chart.parse(&second, &RuleScorer).unwrap();
    assert_eq!(recording.borrow().sentences, vec![first, second]);
}

/// Parses `tokens` under `allow` with every cell type, checks the root score against the best
/// derivation that `allow` admits, and checks that every back pointer is admitted. Returns the
/// best score.
fn parse_filtered<A>(grammar: &CnfGrammar, tokens: &[Symbol], allow: A) -> Option<f64>
where
    A: Fn(usize, usize, usize, &Rule) -> bool + Copy + 'static,
{
    let expected = best(&enumerate(grammar, tokens, &RuleScorer, &allow));
    for cell_type in CELL_TYPES {
        let config = ChartConfig::new()
            .with_cell_type(cell_type)
            .with_loop_order(grammar.loop_order());
        let mut chart = Chart::new(grammar, config)
            .unwrap()
            .with_constraint(constraint::shared(FnConstraint::new(
                move |start, end, mid, rule: &Rule, _score| allow(start, end, mid, rule),
            )));
        chart.parse(tokens, &RuleScorer).unwrap();
        assert_eq!(chart.root_score(), expected, "{:?}", cell_type);
        for start in 0..tokens.len() {
            for end in start + 1..=tokens.len() {
                for sym in (0..grammar.num_nonterminals()).map(Symbol::from) {
                    if let Some(BackPointer::Derivation { rule, mid }) =
                        chart.back_pointer(sym, start, end)
                    {
                        assert!(
                            allow(start, end, mid, grammar.rule(rule)),
                            "{:?} [{}, {}) split at {}",
                            cell_type,
                            start,
                            end,
                            mid
                        );
                    }
                }
            }
        }
    }
    expected
}

#[test]
fn test_odd_midpoints_rejected() {
    let grammar = pp_attachment_grammar(LoopOrder::LeftChild);
    let tokens = sentence(&grammar, "the man saw fish");
    // Lexical rules at odd positions are rejected too, so nothing covers the second token.
    let even = |_: usize, _: usize, mid: usize, _: &Rule| mid % 2 == 0;
    assert_eq!(parse_filtered(&grammar, &tokens, even), None);

    // The lowest binary node above the first token always splits at 1, so rejecting odd
    // binary midpoints outright leaves no parse either. Exempt two-token spans.
    let even_wide = |start: usize, end: usize, mid: usize, rule: &Rule| {
        !rule.is_binary() || end - start <= 2 || mid % 2 == 0
    };
    let unfiltered = best(&enumerate_all(&grammar, &tokens));
    let filtered = parse_filtered(&grammar, &tokens, even_wide);
    // Only `(S (NP the man) (VP saw fish))` splits the whole sentence at 2.
    assert!(filtered.is_some());
    assert!(filtered <= unfiltered);

    let grammar = bracketing_grammar(LoopOrder::RightChild);
    let x = grammar.terminals().lookup("x").unwrap();
    // `(x x) (x x)` and, over six tokens, the trees splitting at 2 or 4 at every wide span.
    assert_eq!(parse_filtered(&grammar, &[x; 4], even_wide), Some(-3.0 - 4.0 * 0.25));
    assert_eq!(parse_filtered(&grammar, &[x; 6], even_wide), Some(-5.0 - 6.0 * 0.25));
}
