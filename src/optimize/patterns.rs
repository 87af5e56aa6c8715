use std::sync::Arc;

use fxhash::FxHashSet;
use hashbrown::HashMap;
use indexmap::{ IndexMap, IndexSet };
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::errors::PluthonResult;
use crate::sugar::{ pvar, plambda, scheme_name };
use crate::term::{ Term, InnerTerm, PatternKind, mk_var, mk_apply, mk_delay, mk_force, mk_program, mk_let };
use crate::visit::{ NodeVisitor, NodeTransformer };

/// Pattern sharing. Recurring pattern kinds are written out once as
/// shared functions bound at the program root and every occurrence
/// becomes a call. UPLC is call-by-value, so a parameter the pattern
/// body only evaluates conditionally must be delayed at the call site
/// and forced inside the shared body; which parameters those are is
/// decided by the taint analysis below.

struct EvaluatedVariableCollector {
    evaluated_variables : FxHashSet<String>,
}

impl EvaluatedVariableCollector {
    fn new() -> Self {
        EvaluatedVariableCollector { evaluated_variables : FxHashSet::default() }
    }
}

impl NodeVisitor for EvaluatedVariableCollector {
    fn visit_var(&mut self, node : &Term) {
        if let InnerTerm::Var { name } = node.as_ref() {
            self.evaluated_variables.insert(name.clone());
        }
    }
}

fn evaluated_variables(t : &Term) -> FxHashSet<String> {
    let mut collector = EvaluatedVariableCollector::new();
    collector.visit(t);
    collector.evaluated_variables
}

/// Collects every variable mentioned in a conditionally-evaluated
/// position : inside a branch of an `Ite`, the body of a `Delay`, or
/// the body of a `Lambda`. A conservative upper bound; the handlers do
/// not descend further into the nodes they handle, and `Apply`
/// arguments are only reached through the default recursion (so only
/// when they are themselves one of the three node kinds above, or
/// contain one).
struct ConditionallyEvaluatedVariableCollector {
    conditionally_evaluated_variables : FxHashSet<String>,
}

impl ConditionallyEvaluatedVariableCollector {
    fn new() -> Self {
        ConditionallyEvaluatedVariableCollector {
            conditionally_evaluated_variables : FxHashSet::default(),
        }
    }
}

impl NodeVisitor for ConditionallyEvaluatedVariableCollector {
    fn visit_ite(&mut self, node : &Term) {
        if let InnerTerm::Ite { then, other, .. } = node.as_ref() {
            self.conditionally_evaluated_variables.extend(evaluated_variables(then));
            self.conditionally_evaluated_variables.extend(evaluated_variables(other));
        }
    }

    fn visit_delay(&mut self, node : &Term) {
        if let InnerTerm::Delay { inner } = node.as_ref() {
            self.conditionally_evaluated_variables.extend(evaluated_variables(inner));
        }
    }

    fn visit_lambda(&mut self, node : &Term) {
        if let InnerTerm::Lambda { body, .. } = node.as_ref() {
            self.conditionally_evaluated_variables.extend(evaluated_variables(body));
        }
    }
}

static TAINT_CACHE : Lazy<RwLock<HashMap<String, Arc<FxHashSet<String>>>>> = Lazy::new(|| {
    RwLock::new(HashMap::new())
});

/// Which of a pattern kind's parameters are used conditionally in its
/// body. Those get wrapped in `Delay` at every call site and in `Force`
/// inside the shared body, restoring the evaluation order the inline
/// composition had. Memoised per kind name; kinds are pure in their
/// fields, so the answer never changes.
pub fn conditionally_evaluated_params(kind : &Arc<dyn PatternKind>) -> Arc<FxHashSet<String>> {
    let key = kind.name();
    if let Some(hit) = TAINT_CACHE.read().get(&key) {
        return hit.clone()
    }

    // fresh, uniquely-renamed variables for each declared field; a
    // field is tainted iff its unique name surfaces as conditionally
    // evaluated in the realised body
    let fields = kind.field_names();
    let unique_names = fields.iter()
                             .map(|f| scheme_name(&format!("{}_{}", f, Uuid::new_v4().simple())))
                             .collect::<Vec<String>>();
    let realised = kind.compose(&unique_names.iter()
                                             .map(|n| mk_var(n.clone()))
                                             .collect::<Vec<Term>>());
    let mut collector = ConditionallyEvaluatedVariableCollector::new();
    collector.visit(&realised);

    let mut tainted = FxHashSet::default();
    for (field, unique) in fields.iter().zip(unique_names.iter()) {
        if collector.conditionally_evaluated_variables.contains(unique) {
            tainted.insert(String::from(*field));
        }
    }
    debug!("taint({}) = {:?}", key, tainted);

    let tainted = Arc::new(tainted);
    TAINT_CACHE.write().insert(key, tainted.clone());
    tainted
}

static ABSTRACT_CACHE : Lazy<RwLock<HashMap<String, Term>>> = Lazy::new(|| {
    RwLock::new(HashMap::new())
});

/// The shared function for a kind : its parameters are the declared
/// fields, tainted ones arriving delayed and forced on use. A kind
/// without fields is shared as a plain value.
pub fn make_abstract_function(kind : &Arc<dyn PatternKind>) -> Term {
    let key = kind.name();
    if let Some(hit) = ABSTRACT_CACHE.read().get(&key) {
        return hit.clone()
    }

    let fields = kind.field_names();
    let function = if !fields.is_empty() {
        let cep = conditionally_evaluated_params(kind);
        let args = fields.iter()
                         .map(|f| if cep.contains(*f) { mk_force(pvar(f)) } else { pvar(f) })
                         .collect::<Vec<Term>>();
        plambda(fields, kind.compose(&args))
    } else {
        kind.compose(&[])
    };

    ABSTRACT_CACHE.write().insert(key, function.clone());
    function
}

pub fn make_abstract_function_name(kind : &Arc<dyn PatternKind>) -> String {
    format!("p_{}", kind.name())
}

/// Collects the kinds of every pattern reachable from a term,
/// composition included, in first-encountered order.
struct PatternCollector {
    patterns : IndexMap<String, Arc<dyn PatternKind>>,
}

impl PatternCollector {
    fn new() -> Self {
        PatternCollector { patterns : IndexMap::new() }
    }
}

impl NodeVisitor for PatternCollector {
    fn visit_pattern(&mut self, node : &Term) {
        if let InnerTerm::Pattern { kind, fields } = node.as_ref() {
            self.patterns.entry(kind.name()).or_insert_with(|| kind.clone());
            self.visit(&kind.compose(fields));
        }
    }
}

/// Builds `deps[kind] = kinds appearing in the kind's abstract body`.
/// Dependencies are read off the *abstract* composition (plain field
/// variables) so patterns passed in as actual field terms are not
/// mistaken for dependencies of the kind itself; the actual composition
/// is then visited to discover those argument patterns on their own.
pub struct PatternDepBuilder {
    pattern_deps : IndexMap<String, IndexSet<String>>,
    kinds : IndexMap<String, Arc<dyn PatternKind>>,
}

impl PatternDepBuilder {
    pub fn new() -> Self {
        PatternDepBuilder {
            pattern_deps : IndexMap::new(),
            kinds : IndexMap::new(),
        }
    }

    /// Deps-first topological order; ties broken by first-encountered
    /// order. The outermost emitted binding is the first element.
    pub fn patterns_in_dep_order(&self) -> Vec<Arc<dyn PatternKind>> {
        let mut order = Vec::with_capacity(self.kinds.len());
        let mut emitted : IndexSet<&String> = IndexSet::new();
        loop {
            let mut progressed = false;
            for (name, deps) in self.pattern_deps.iter() {
                if emitted.contains(name) {
                    continue
                }
                if deps.iter().all(|d| emitted.contains(d)) {
                    emitted.insert(name);
                    order.push(self.kinds[name].clone());
                    progressed = true;
                }
            }
            if !progressed {
                break
            }
        }
        order
    }
}

impl NodeVisitor for PatternDepBuilder {
    fn visit_pattern(&mut self, node : &Term) {
        if let InnerTerm::Pattern { kind, fields } = node.as_ref() {
            let mut subpattern_collector = PatternCollector::new();
            subpattern_collector.visit(&make_abstract_function(kind));

            self.kinds.entry(kind.name()).or_insert_with(|| kind.clone());
            let entry = self.pattern_deps.entry(kind.name()).or_insert_with(IndexSet::new);
            for (sub_name, _) in subpattern_collector.patterns.iter() {
                entry.insert(sub_name.clone());
            }
            for (sub_name, sub_kind) in subpattern_collector.patterns.iter() {
                self.kinds.entry(sub_name.clone()).or_insert_with(|| sub_kind.clone());
            }

            self.visit(&kind.compose(fields));
        }
    }
}

/// Counts actual pattern occurrences in the tree (fields are traversed,
/// compositions are not).
struct PatternCounter {
    counts : HashMap<String, usize>,
}

impl PatternCounter {
    fn new() -> Self {
        PatternCounter { counts : HashMap::new() }
    }
}

impl NodeVisitor for PatternCounter {
    fn visit_pattern(&mut self, node : &Term) {
        if let InnerTerm::Pattern { kind, .. } = node.as_ref() {
            *self.counts.entry(kind.name()).or_insert(0) += 1;
        }
        self.generic_visit(node)
    }
}

fn replacement_call(kind : &Arc<dyn PatternKind>, fields : &[Term]) -> Term {
    let pattern_var = pvar(&make_abstract_function_name(kind));
    if fields.is_empty() {
        return pattern_var
    }
    let cep = conditionally_evaluated_params(kind);
    let args = kind.field_names()
                   .iter()
                   .zip(fields.iter())
                   .map(|(name, field)| {
                       if cep.contains(*name) {
                           mk_delay(field.clone())
                       } else {
                           field.clone()
                       }
                   })
                   .collect::<Vec<Term>>();
    mk_apply(pattern_var, args)
}

/// All-at-once mode : every collected kind is bound in one flat `Let`
/// at the program root, in dependency order, and every occurrence in
/// the body (and in the shared bodies themselves) becomes a call.
pub struct AllPatternReplacer;

impl NodeTransformer for AllPatternReplacer {
    fn transform_pattern(&mut self, node : &Term) -> PluthonResult<Term> {
        if let InnerTerm::Pattern { kind, fields } = node.as_ref() {
            let call = replacement_call(kind, fields);
            // the call's arguments may themselves contain patterns
            return self.transform(&call)
        }
        self.generic_transform(node)
    }

    fn transform_program(&mut self, node : &Term) -> PluthonResult<Term> {
        if let InnerTerm::Program { version, body } = node.as_ref() {
            let mut builder = PatternDepBuilder::new();
            builder.visit(node);
            let kinds = builder.patterns_in_dep_order();
            if kinds.is_empty() {
                return Ok(node.clone())
            }
            debug!("sharing {} pattern kinds", kinds.len());

            let mut bindings = Vec::with_capacity(kinds.len());
            for kind in kinds.iter() {
                bindings.push((
                    scheme_name(&make_abstract_function_name(kind)),
                    self.transform(&make_abstract_function(kind))?,
                ));
            }
            let new_body = self.transform(body)?;
            return Ok(mk_program(*version, mk_let(bindings, new_body)))
        }
        self.generic_transform(node)
    }
}

/// Replaces every occurrence of one kind with a call to its shared name.
struct SingleKindCallReplacer {
    target : String,
}

impl NodeTransformer for SingleKindCallReplacer {
    fn transform_pattern(&mut self, node : &Term) -> PluthonResult<Term> {
        if let InnerTerm::Pattern { kind, fields } = node.as_ref() {
            if kind.name() == self.target {
                let call = replacement_call(kind, fields);
                return self.transform(&call)
            }
        }
        self.generic_transform(node)
    }
}

/// Substitutes the composition of one kind directly at its (single)
/// occurrence.
struct SingleKindInliner {
    target : String,
}

impl NodeTransformer for SingleKindInliner {
    fn transform_pattern(&mut self, node : &Term) -> PluthonResult<Term> {
        if let InnerTerm::Pattern { kind, fields } = node.as_ref() {
            if kind.name() == self.target {
                // nested patterns inside the composition are left for
                // the next driver iteration
                return Ok(kind.compose(fields))
            }
        }
        self.generic_transform(node)
    }
}

/// Iterative mode : per driver iteration, extract only the kind that is
/// last in dependency order among those still occurring in the tree.
/// Later iterations extract its dependencies, whose bindings then wrap
/// *outside* the earlier ones, so every `p_*` reference stays in scope.
/// A kind occurring exactly once is inlined instead of bound; deeply
/// nested single-use patterns melt away entirely under this mode.
pub struct OncePatternReplacer;

impl NodeTransformer for OncePatternReplacer {
    fn transform_program(&mut self, node : &Term) -> PluthonResult<Term> {
        if let InnerTerm::Program { version, body } = node.as_ref() {
            let mut builder = PatternDepBuilder::new();
            builder.visit(node);
            let order = builder.patterns_in_dep_order();

            let mut counter = PatternCounter::new();
            counter.visit(node);

            let target = match order.iter()
                                    .rev()
                                    .find(|k| counter.counts.get(&k.name()).copied().unwrap_or(0) > 0) {
                Some(kind) => kind.clone(),
                None => return Ok(node.clone()),
            };
            let occurrences = counter.counts[&target.name()];

            if occurrences == 1 {
                debug!("inlining single-use pattern {}", target.name());
                let mut inliner = SingleKindInliner { target : target.name() };
                let new_body = inliner.transform(body)?;
                return Ok(mk_program(*version, new_body))
            }

            debug!("extracting pattern {} ({} occurrences)", target.name(), occurrences);
            let mut replacer = SingleKindCallReplacer { target : target.name() };
            let new_body = replacer.transform(body)?;
            let binding = (
                scheme_name(&make_abstract_function_name(&target)),
                make_abstract_function(&target),
            );
            return Ok(mk_program(*version, mk_let(vec![binding], new_body)))
        }
        self.generic_transform(node)
    }
}

#[cfg(test)]
mod pattern_tests {
    use super::*;
    use crate::sugar::*;
    use crate::term::*;

    fn kind_of(t : &Term) -> Arc<dyn PatternKind> {
        match t.as_ref() {
            InnerTerm::Pattern { kind, .. } => kind.clone(),
            _ => panic!("expected a pattern"),
        }
    }

    #[test]
    fn iff_taints_exactly_y() {
        let probe = iff(mk_var("a"), mk_var("b"));
        let tainted = conditionally_evaluated_params(&kind_of(&probe));
        assert!(tainted.contains("y"));
        assert!(!tainted.contains("x"));
        assert_eq!(tainted.len(), 1);
    }

    #[test]
    fn fold_list_taints_the_function_but_not_the_list() {
        let probe = fold_list(mk_var("l"), mk_var("f"), mk_var("a"));
        let tainted = conditionally_evaluated_params(&kind_of(&probe));
        assert!(tainted.contains("f"));
        assert!(!tainted.contains("l"));
    }

    #[test]
    fn rec_fun_taints_nothing() {
        let probe = rec_fun(mk_var("f"));
        let tainted = conditionally_evaluated_params(&kind_of(&probe));
        assert!(tainted.is_empty());
    }

    #[test]
    fn abstract_function_forces_tainted_parameters() {
        let probe = iff(mk_var("a"), mk_var("b"));
        let f = make_abstract_function(&kind_of(&probe));
        let dump = f.dumps();
        assert!(dump.starts_with("(\\0x_ 0y_ ->"));
        assert!(dump.contains("(! 0y_)"));
        assert!(!dump.contains("(! 0x_)"));
    }

    #[test]
    fn fieldless_kinds_are_shared_as_values() {
        let probe = none_data();
        let f = make_abstract_function(&kind_of(&probe));
        assert!(!f.dumps().starts_with("(\\"));
    }

    #[test]
    fn dep_builder_orders_dependencies_first() {
        let program = mk_program((1, 0, 0), length_list(mk_var("l")));
        let mut builder = PatternDepBuilder::new();
        builder.visit(&program);
        let order = builder.patterns_in_dep_order()
                           .iter()
                           .map(|k| k.name())
                           .collect::<Vec<String>>();
        let pos = |n : &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("RecFun") < pos("FoldList"));
        assert!(pos("FoldList") < pos("LengthList"));
    }

    #[test]
    fn all_replacer_shares_three_fold_uses_under_one_binding() {
        let body = mk_apply(
            mk_var("combine"),
            vec![
                fold_list(mk_var("xs"), mk_var("f"), mk_integer(0)),
                fold_list(mk_var("ys"), mk_var("g"), mk_integer(1)),
                fold_list(mk_var("zs"), mk_var("h"), mk_integer(2)),
            ],
        );
        let program = mk_program((1, 0, 0), body);
        let out = AllPatternReplacer.transform(&program).unwrap();
        let dump = out.dumps();
        assert_eq!(dump.matches("0p_FoldList_ = ").count(), 1);
        assert_eq!(dump.matches("(0p_FoldList_ ").count(), 3);
        assert!(!out_contains_pattern(&out));
    }

    #[test]
    fn call_sites_delay_tainted_arguments() {
        let program = mk_program(
            (1, 0, 0),
            iff(mk_var("a"), mk_var("b")),
        );
        let out = AllPatternReplacer.transform(&program).unwrap();
        // x strict, y delayed
        assert!(out.dumps().contains("(0p_Iff_ a (# b))"));
    }

    #[test]
    fn fieldless_occurrences_become_bare_variables() {
        let program = mk_program(
            (1, 0, 0),
            mk_apply(mk_var("f"), vec![none_data(), none_data()]),
        );
        let out = AllPatternReplacer.transform(&program).unwrap();
        assert!(out.dumps().contains("(f 0p_NoneData_ 0p_NoneData_)"));
    }

    #[test]
    fn once_replacer_inlines_single_use_patterns() {
        let program = mk_program((1, 0, 0), not(mk_var("c")));
        let out = OncePatternReplacer.transform(&program).unwrap();
        // one occurrence : substituted, not bound
        assert!(!out.dumps().contains("0p_Not_"));
        assert_eq!(out.dumps(), "(if c then False else True)");
    }

    #[test]
    fn once_replacer_extracts_innermost_kind_first() {
        let body = mk_apply(
            mk_var("pair"),
            vec![
                length_list(mk_var("xs")),
                length_list(mk_var("ys")),
            ],
        );
        let program = mk_program((1, 0, 0), body);
        let out = OncePatternReplacer.transform(&program).unwrap();
        let dump = out.dumps();
        // LengthList is bound; its dependencies are still raw patterns
        assert_eq!(dump.matches("0p_LengthList_ = ").count(), 1);
        assert!(dump.contains("<[FoldList]>"));
    }

    #[test]
    fn all_replacer_is_idempotent_once_patterns_are_gone() {
        let program = mk_program(
            (1, 0, 0),
            mk_apply(mk_var("f"), vec![length_list(mk_var("xs")), none_data()]),
        );
        let once = AllPatternReplacer.transform(&program).unwrap();
        let twice = AllPatternReplacer.transform(&once).unwrap();
        assert_eq!(once.dumps(), twice.dumps());
    }

    #[test]
    fn emitted_bindings_only_reference_earlier_names() {
        let program = mk_program(
            (1, 0, 0),
            mk_apply(mk_var("f"), vec![length_list(mk_var("xs")), length_list(mk_var("ys"))]),
        );
        let out = AllPatternReplacer.transform(&program).unwrap();
        let body = match out.as_ref() {
            InnerTerm::Program { body, .. } => body.clone(),
            _ => panic!("expected a program"),
        };
        let bindings = match body.as_ref() {
            InnerTerm::Let { bindings, .. } => bindings.clone(),
            _ => panic!("expected the shared bindings at the root"),
        };
        let mut bound_so_far : Vec<String> = Vec::new();
        for (name, value) in bindings.iter() {
            for referenced in evaluated_variables(value) {
                if referenced.starts_with("0p_") {
                    assert!(
                        bound_so_far.contains(&referenced),
                        "{} references {} before it is bound", name, referenced
                    );
                }
            }
            bound_so_far.push(name.clone());
        }
    }

    fn out_contains_pattern(t : &Term) -> bool {
        struct Finder { found : bool }
        impl NodeVisitor for Finder {
            fn visit_pattern(&mut self, node : &Term) {
                self.found = true;
                self.generic_visit(node)
            }
        }
        let mut f = Finder { found : false };
        f.visit(t);
        f.found
    }
}
