//! Abstraction for collections of rules.

use crate::rule::Rule;

/// Trait for rule containers.
pub trait RuleContainer {
    /// Inserts a rule.
    fn add_rule(&mut self, rule: Rule);

    /// Retains only the rules specified by the predicate.
    fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&Rule) -> bool;
}

impl<'a, D> RuleContainer for &'a mut D
where
    D: RuleContainer,
{
    fn add_rule(&mut self, rule: Rule) {
        (**self).add_rule(rule);
    }

    fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&Rule) -> bool,
    {
        (**self).retain(f);
    }
}

impl RuleContainer for Vec<Rule> {
    fn add_rule(&mut self, rule: Rule) {
        self.push(rule);
    }

    fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&Rule) -> bool,
    {
        Vec::retain(self, f);
    }
}
