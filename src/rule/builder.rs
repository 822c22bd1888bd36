//! Grammar rules can be built with the builder pattern.

use crate::rule::container::RuleContainer;
use crate::rule::Rule;
use crate::symbol::Symbol;

/// The rule builder.
pub struct RuleBuilder<C>
where
    C: RuleContainer,
{
    lhs: Option<Symbol>,
    rules: C,
}

impl<C> RuleBuilder<C>
where
    C: RuleContainer,
{
    /// Creates a rule builder.
    pub fn new(rules: C) -> RuleBuilder<C> {
        RuleBuilder { lhs: None, rules }
    }

    /// Starts building a new rule with the given LHS.
    pub fn rule(mut self, lhs: Symbol) -> Self {
        self.lhs = Some(lhs);
        self
    }

    fn lhs(&self) -> Symbol {
        self.lhs.expect("rule builder: LHS must be set with `rule` first")
    }

    /// Adds an alternative of the form `lhs ::= terminal`.
    pub fn lexical(mut self, terminal: Symbol, score: f64) -> Self {
        let rule = Rule::lexical(self.lhs(), terminal, score);
        self.rules.add_rule(rule);
        self
    }

    /// Adds an alternative of the form `lhs ::= child`.
    pub fn unary(mut self, child: Symbol, score: f64) -> Self {
        let rule = Rule::unary(self.lhs(), child, score);
        self.rules.add_rule(rule);
        self
    }

    /// Adds an alternative of the form `lhs ::= left right`.
    pub fn binary(mut self, left: Symbol, right: Symbol, score: f64) -> Self {
        let rule = Rule::binary(self.lhs(), left, right, score);
        self.rules.add_rule(rule);
        self
    }
}

#[test]
fn test_rule_builder_into_vec() {
    let [s, a, b, x] = [0usize, 1, 2, 0].map(Symbol::from);
    let mut rules: Vec<Rule> = vec![];
    RuleBuilder::new(&mut rules)
        .rule(s)
        .binary(a, b, -0.5)
        .unary(a, -2.0)
        .rule(a)
        .lexical(x, 0.0);
    assert_eq!(rules.len(), 3);
    assert!(rules[0].is_binary());
    assert_eq!(rules[1].parent(), s);
    assert!(rules[2].is_lexical());
    assert_eq!(rules[2].parent(), a);
}
