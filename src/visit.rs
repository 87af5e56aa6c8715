use crate::errors::PluthonResult;
use crate::term::{ Term,
                   InnerTerm,
                   mk_program,
                   mk_lambda,
                   mk_apply,
                   mk_force,
                   mk_delay,
                   mk_let,
                   mk_ite,
                   mk_pattern };

/// Read-only pre-order traversal with a hook per node kind. The default
/// for every hook is `generic_visit`, which recurses into the node's
/// ordered children; overriding a hook replaces the recursion for that
/// kind entirely, so an override that still wants the children must
/// call `generic_visit` itself.
pub trait NodeVisitor {
    fn visit(&mut self, node : &Term) {
        match node.as_ref() {
            InnerTerm::Program {..} => self.visit_program(node),
            InnerTerm::Var {..} => self.visit_var(node),
            InnerTerm::Lambda {..} => self.visit_lambda(node),
            InnerTerm::Apply {..} => self.visit_apply(node),
            InnerTerm::Force {..} => self.visit_force(node),
            InnerTerm::Delay {..} => self.visit_delay(node),
            InnerTerm::Let {..} => self.visit_let(node),
            InnerTerm::Ite {..} => self.visit_ite(node),
            InnerTerm::Pattern {..} => self.visit_pattern(node),
            _ => self.generic_visit(node),
        }
    }

    fn visit_program(&mut self, node : &Term) { self.generic_visit(node) }
    fn visit_var(&mut self, node : &Term) { self.generic_visit(node) }
    fn visit_lambda(&mut self, node : &Term) { self.generic_visit(node) }
    fn visit_apply(&mut self, node : &Term) { self.generic_visit(node) }
    fn visit_force(&mut self, node : &Term) { self.generic_visit(node) }
    fn visit_delay(&mut self, node : &Term) { self.generic_visit(node) }
    fn visit_let(&mut self, node : &Term) { self.generic_visit(node) }
    fn visit_ite(&mut self, node : &Term) { self.generic_visit(node) }
    /// Patterns are visited as opaque nodes : the default descends into
    /// the ordered fields, not into the composition.
    fn visit_pattern(&mut self, node : &Term) { self.generic_visit(node) }

    fn generic_visit(&mut self, node : &Term) {
        for child in node.children() {
            self.visit(child)
        }
    }
}

/// Rewriting traversal; each hook returns the replacement for its node.
/// The default rebuilds the node with every child replaced by the
/// result of transforming it. Hooks are fallible so passes can abort
/// the compile (negative constant index and friends) with `?`.
pub trait NodeTransformer {
    fn transform(&mut self, node : &Term) -> PluthonResult<Term> {
        match node.as_ref() {
            InnerTerm::Program {..} => self.transform_program(node),
            InnerTerm::Var {..} => self.transform_var(node),
            InnerTerm::Lambda {..} => self.transform_lambda(node),
            InnerTerm::Apply {..} => self.transform_apply(node),
            InnerTerm::Force {..} => self.transform_force(node),
            InnerTerm::Delay {..} => self.transform_delay(node),
            InnerTerm::Let {..} => self.transform_let(node),
            InnerTerm::Ite {..} => self.transform_ite(node),
            InnerTerm::Pattern {..} => self.transform_pattern(node),
            _ => self.generic_transform(node),
        }
    }

    fn transform_program(&mut self, node : &Term) -> PluthonResult<Term> { self.generic_transform(node) }
    fn transform_var(&mut self, node : &Term) -> PluthonResult<Term> { self.generic_transform(node) }
    fn transform_lambda(&mut self, node : &Term) -> PluthonResult<Term> { self.generic_transform(node) }
    fn transform_apply(&mut self, node : &Term) -> PluthonResult<Term> { self.generic_transform(node) }
    fn transform_force(&mut self, node : &Term) -> PluthonResult<Term> { self.generic_transform(node) }
    fn transform_delay(&mut self, node : &Term) -> PluthonResult<Term> { self.generic_transform(node) }
    fn transform_let(&mut self, node : &Term) -> PluthonResult<Term> { self.generic_transform(node) }
    fn transform_ite(&mut self, node : &Term) -> PluthonResult<Term> { self.generic_transform(node) }
    /// Default keeps the pattern abstract : fields are rewritten in
    /// place, the composition is left alone. The pattern optimiser
    /// overrides this.
    fn transform_pattern(&mut self, node : &Term) -> PluthonResult<Term> { self.generic_transform(node) }

    fn generic_transform(&mut self, node : &Term) -> PluthonResult<Term> {
        let rebuilt = match node.as_ref() {
            InnerTerm::Program { version, body } => {
                mk_program(*version, self.transform(body)?)
            },
            InnerTerm::Lambda { params, body } => {
                mk_lambda(params.clone(), self.transform(body)?)
            },
            InnerTerm::Apply { fun, args } => {
                let new_fun = self.transform(fun)?;
                let new_args = args.iter()
                                   .map(|a| self.transform(a))
                                   .collect::<PluthonResult<Vec<Term>>>()?;
                mk_apply(new_fun, new_args)
            },
            InnerTerm::Force { inner } => mk_force(self.transform(inner)?),
            InnerTerm::Delay { inner } => mk_delay(self.transform(inner)?),
            InnerTerm::Let { bindings, body } => {
                let new_bindings = bindings.iter()
                                           .map(|(n, t)| Ok((n.clone(), self.transform(t)?)))
                                           .collect::<PluthonResult<Vec<(String, Term)>>>()?;
                mk_let(new_bindings, self.transform(body)?)
            },
            InnerTerm::Ite { cond, then, other } => {
                mk_ite(self.transform(cond)?, self.transform(then)?, self.transform(other)?)
            },
            InnerTerm::Pattern { kind, fields } => {
                let new_fields = fields.iter()
                                       .map(|f| self.transform(f))
                                       .collect::<PluthonResult<Vec<Term>>>()?;
                mk_pattern(kind.clone(), new_fields)
            },
            _ => node.clone(),
        };
        Ok(rebuilt)
    }
}

/// Identity pass.
pub struct NoOp;

impl NodeTransformer for NoOp {}

#[cfg(test)]
mod visit_tests {
    use super::*;
    use crate::term::*;

    struct VarCounter {
        count : usize,
    }

    impl NodeVisitor for VarCounter {
        fn visit_var(&mut self, _node : &Term) {
            self.count += 1;
        }
    }

    #[test]
    fn default_visit_reaches_let_bindings_and_body() {
        let t = mk_let(
            vec![
                (format!("a"), mk_var("x")),
                (format!("b"), mk_var("y")),
            ],
            mk_apply(mk_var("f"), vec![mk_var("a")]),
        );
        let mut counter = VarCounter { count : 0 };
        counter.visit(&t);
        assert_eq!(counter.count, 4);
    }

    #[test]
    fn noop_transformer_leaves_trees_unchanged() {
        let t = mk_ite(
            mk_var("c"),
            mk_lambda(vec![format!("x")], mk_var("x")),
            mk_integer(9),
        );
        let out = NoOp.transform(&t).unwrap();
        assert_eq!(out.dumps(), t.dumps());
    }
}
