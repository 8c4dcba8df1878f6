//! Rule-tree to WHERE-clause compiler.

use tracing::trace;

use crate::processor::{FormatOptions, RuleProcessor};
use crate::rules::{RuleGroup, RuleNode};

/// Compile `tree` into clause text.
///
/// Children of a group are joined with the group's combinator followed by a
/// line break. Nested groups are parenthesized, negated groups render as
/// `NOT (...)`. Groups and rules that render to nothing are skipped, so an
/// empty tree yields an empty string.
pub fn compile(tree: &RuleGroup, processor: &RuleProcessor, options: &FormatOptions) -> String {
    render_group(tree, processor, options, false)
}

fn render_group(
    group: &RuleGroup,
    processor: &RuleProcessor,
    options: &FormatOptions,
    nested: bool,
) -> String {
    let parts: Vec<String> = group
        .rules
        .iter()
        .map(|node| match node {
            RuleNode::Rule(rule) => processor.render(rule, options),
            RuleNode::Group(child) => render_group(child, processor, options, true),
        })
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        trace!(nested, "group rendered empty");
        return String::new();
    }

    let joined = parts.join(&format!(" {}\n", group.combinator.keyword()));
    if group.not {
        format!("NOT ({})", joined)
    } else if nested {
        format!("({})", joined)
    } else {
        joined
    }
}

/// A processor and its options bundled for repeated compilation
#[derive(Debug, Clone, Default)]
pub struct RuleCompiler {
    processor: RuleProcessor,
    options: FormatOptions,
}

impl RuleCompiler {
    pub fn new(processor: RuleProcessor, options: FormatOptions) -> Self {
        Self { processor, options }
    }

    pub fn compile(&self, tree: &RuleGroup) -> String {
        compile(tree, &self.processor, &self.options)
    }

    pub fn processor(&self) -> &RuleProcessor {
        &self.processor
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Combinator, Operator, Rule};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compiler() -> RuleCompiler {
        RuleCompiler::new(RuleProcessor::case_insensitive(), FormatOptions::default())
    }

    #[test]
    fn test_flat_and_group() {
        let tree = RuleGroup::and(vec![])
            .with_rule(Rule::new("averageRating", Operator::GreaterThanOrEqual, "7.2"))
            .with_rule(Rule::new("title", Operator::Contains, "matrix"));

        assert_eq!(
            compiler().compile(&tree),
            "averageRating >= 7.2 AND\nUPPER(title) LIKE UPPER('%matrix%')"
        );
    }

    #[test]
    fn test_nested_groups_are_parenthesized() {
        let tree = RuleGroup::and(vec![])
            .with_rule(Rule::new("startYear", Operator::GreaterThan, "2010"))
            .with_group(
                RuleGroup::or(vec![])
                    .with_rule(Rule::new("titleType", Operator::Equal, "movie"))
                    .with_rule(Rule::new("titleType", Operator::Equal, "tvMovie")),
            );

        assert_eq!(
            compiler().compile(&tree),
            "startYear > 2010 AND\n(titleType = 'movie' OR\ntitleType = 'tvMovie')"
        );
    }

    #[test]
    fn test_empty_group_is_omitted() {
        let tree = RuleGroup::and(vec![])
            .with_rule(Rule::new("a", Operator::Equal, 1))
            .with_group(RuleGroup::new(Combinator::Or))
            .with_rule(Rule::new("b", Operator::Equal, 2));

        assert_eq!(compiler().compile(&tree), "a = 1 AND\nb = 2");
        assert_eq!(compiler().compile(&RuleGroup::default()), "");
    }

    #[test]
    fn test_group_of_only_empty_children_is_empty() {
        let tree = RuleGroup::or(vec![])
            .with_group(RuleGroup::default())
            .with_rule(Rule::new("titleType", Operator::In, json!([])));
        assert_eq!(compiler().compile(&tree), "");
    }

    #[test]
    fn test_negated_group() {
        let tree = RuleGroup::and(vec![])
            .with_rule(Rule::new("a", Operator::Equal, 1))
            .with_group(RuleGroup::and(vec![]).negated().with_rule(Rule::new("b", Operator::Null, json!(null))));

        assert_eq!(compiler().compile(&tree), "a = 1 AND\nNOT (b IS NULL)");
    }

    #[test]
    fn test_combinator_words_inside_literals_untouched() {
        let tree = RuleGroup::or(vec![])
            .with_rule(Rule::new("title", Operator::Equal, "War and Peace"))
            .with_rule(Rule::new("title", Operator::Equal, "this or that"));

        assert_eq!(
            compiler().compile(&tree),
            "title = 'War and Peace' OR\ntitle = 'this or that'"
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let tree = crate::defaults::default_rule_tree();
        let c = compiler();
        assert_eq!(c.compile(&tree), c.compile(&tree));
    }
}
