use std::sync::Arc;

use num_bigint::BigInt;

use crate::errors::{ PluthonResult, PluthonErr::* };
use crate::uplc;
use crate::uplc::{ mk_uplc_var,
                   mk_uplc_lambda,
                   mk_uplc_apply,
                   mk_uplc_force,
                   mk_uplc_delay,
                   mk_uplc_constant,
                   mk_uplc_builtin,
                   mk_uplc_error,
                   mk_empty_list_constant };

use InnerTerm::*;

/// A pattern kind : the identity of an abstract, parameterised AST node.
/// `compose` must be referentially transparent in its field terms (same
/// fields, alpha-equivalent result) and must refer to its parameters
/// only through the field terms it is handed; this is what lets the
/// strictness analysis instantiate a kind with fresh variables and read
/// off which parameters end up in a conditionally-evaluated position.
/// Parameterised families (`ConstantIndexAccessList` and friends) fold
/// their parameter into `name`, which is the key for every cache and
/// for the shared binding `p_<name>`.
pub trait PatternKind : Send + Sync {
    fn name(&self) -> String;
    /// Ordered; `compose` receives the field terms in this order.
    fn field_names(&self) -> &'static [&'static str];
    fn compose(&self, fields : &[Term]) -> Term;
}

/// Arc wrapper around `InnerTerm`. Terms are shared freely between the
/// rewrite passes; every rewrite builds a new tree, so subtrees are
/// never mutated behind the Arc.
#[derive(Clone)]
pub struct Term(Arc<InnerTerm>);

pub enum InnerTerm {
    Program { version : uplc::Version, body : Term },
    Var { name : String },
    /// Multi-parameter shorthand; lowered right-to-left into curried
    /// single-parameter UPLC lambdas. Zero parameters is rejected at
    /// lowering time.
    Lambda { params : Vec<String>, body : Term },
    Apply { fun : Term, args : Vec<Term> },
    Force { inner : Term },
    Delay { inner : Term },
    /// Bindings are in source order; the *last* binding becomes the
    /// innermost lambda at lowering, so later bindings may reference
    /// earlier ones.
    Let { bindings : Vec<(String, Term)>, body : Term },
    Integer { x : BigInt },
    ByteString { x : Vec<u8> },
    Text { x : String },
    Bool { x : bool },
    Unit,
    /// Escape hatch for a raw UPLC constant.
    Raw { constant : uplc::Constant },
    BuiltIn { op : uplc::BuiltInFun },
    Error,
    Ite { cond : Term, then : Term, other : Term },
    /// Typed empty list witness; the sample constant fixes the element
    /// type for the UPLC runtime.
    EmptyList { sample : uplc::Constant },
    Pattern { kind : Arc<dyn PatternKind>, fields : Vec<Term> },
}

pub fn mk_program(version : uplc::Version, body : Term) -> Term {
    Program { version, body }.into()
}

pub fn mk_var(name : impl Into<String>) -> Term {
    Var { name : name.into() }.into()
}

pub fn mk_lambda(params : Vec<String>, body : Term) -> Term {
    Lambda { params, body }.into()
}

pub fn mk_apply(fun : Term, args : Vec<Term>) -> Term {
    Apply { fun, args }.into()
}

pub fn mk_force(inner : Term) -> Term {
    Force { inner }.into()
}

pub fn mk_delay(inner : Term) -> Term {
    Delay { inner }.into()
}

pub fn mk_let(bindings : Vec<(String, Term)>, body : Term) -> Term {
    Let { bindings, body }.into()
}

pub fn mk_integer(x : impl Into<BigInt>) -> Term {
    Integer { x : x.into() }.into()
}

pub fn mk_bytestring(x : impl Into<Vec<u8>>) -> Term {
    ByteString { x : x.into() }.into()
}

pub fn mk_text(x : impl Into<String>) -> Term {
    Text { x : x.into() }.into()
}

pub fn mk_bool(x : bool) -> Term {
    Bool { x }.into()
}

pub fn mk_unit() -> Term {
    Unit.into()
}

pub fn mk_raw(constant : uplc::Constant) -> Term {
    Raw { constant }.into()
}

pub fn mk_builtin(op : uplc::BuiltInFun) -> Term {
    BuiltIn { op }.into()
}

/// A diverging term. Lowering wraps it in a dummy lambda so the
/// back-end can never reduce it eagerly; emitters that want it to fire
/// apply the wrapper to a throwaway argument (see `sugar::trace_error`).
pub fn mk_error() -> Term {
    Error.into()
}

pub fn mk_ite(cond : Term, then : Term, other : Term) -> Term {
    Ite { cond, then, other }.into()
}

pub fn mk_empty_list(sample : uplc::Constant) -> Term {
    EmptyList { sample }.into()
}

pub fn mk_pattern(kind : Arc<dyn PatternKind>, fields : Vec<Term>) -> Term {
    Pattern { kind, fields }.into()
}

impl Term {
    /// The node's direct children in fixed pre-order (left to right).
    /// `Let` yields its binding values in source order, then the body.
    /// `Pattern` yields its fields, never its composition; passes that
    /// want the composition ask for it explicitly.
    pub fn children(&self) -> Vec<&Term> {
        match self.as_ref() {
            Program { body, .. } => vec![body],
            Var {..} => vec![],
            Lambda { body, .. } => vec![body],
            Apply { fun, args } => {
                let mut v = Vec::with_capacity(1 + args.len());
                v.push(fun);
                v.extend(args.iter());
                v
            },
            Force { inner } | Delay { inner } => vec![inner],
            Let { bindings, body } => {
                let mut v = Vec::with_capacity(1 + bindings.len());
                v.extend(bindings.iter().map(|(_, t)| t));
                v.push(body);
                v
            },
            Integer {..} | ByteString {..} | Text {..} | Bool {..}
            | Unit | Raw {..} | BuiltIn {..} | Error | EmptyList {..} => vec![],
            Ite { cond, then, other } => vec![cond, then, other],
            Pattern { fields, .. } => fields.iter().collect(),
        }
    }

    /// Realise a `Pattern` node as the concrete term its kind stands
    /// for. `None` on any other node.
    pub fn composed(&self) -> Option<Term> {
        match self.as_ref() {
            Pattern { kind, fields } => Some(kind.compose(fields)),
            _ => None,
        }
    }

    pub fn is_pattern(&self) -> bool {
        match self.as_ref() {
            Pattern {..} => true,
            _ => false,
        }
    }

    /// Deterministic human-readable form. Not a stable format; the
    /// fixpoint driver compares these strings to detect convergence,
    /// and that is the only contract.
    pub fn dumps(&self) -> String {
        match self.as_ref() {
            Program { body, .. } => body.dumps(),
            Var { name } => name.clone(),
            Lambda { params, body } => format!("(\\{} -> {})", params.join(" "), body.dumps()),
            Apply { fun, args } => {
                let rendered = args.iter().map(|x| x.dumps()).collect::<Vec<String>>().join(" ");
                format!("({} {})", fun.dumps(), rendered)
            },
            Force { inner } => format!("(! {})", inner.dumps()),
            Delay { inner } => format!("(# {})", inner.dumps()),
            Let { bindings, body } => {
                let rendered = bindings.iter()
                                       .map(|(n, t)| format!("{} = {}", n, t.dumps()))
                                       .collect::<Vec<String>>()
                                       .join(";");
                format!("(let {} in {})", rendered, body.dumps())
            },
            Integer { x } => format!("{}", x),
            ByteString { x } => {
                let mut s = String::with_capacity(2 + x.len() * 2);
                s.push_str("0x");
                for b in x.iter() {
                    s.push_str(&format!("{:02x}", b));
                }
                s
            },
            Text { x } => format!("{:?}", x),
            Bool { x } => if *x { format!("True") } else { format!("False") },
            Unit => format!("()"),
            Raw { constant } => format!("uplc[{}]", uplc::Term::Constant(constant.clone()).dumps()),
            BuiltIn { op } => format!("{}", op.name()),
            Error => format!("Error"),
            Ite { cond, then, other } => {
                format!("(if {} then {} else {})", cond.dumps(), then.dumps(), other.dumps())
            },
            EmptyList { sample } => format!("[]<{}>", sample.tipe().dumps()),
            Pattern { kind, fields } => {
                format!("<[{}]> {}", kind.name(), kind.compose(fields).dumps())
            },
        }
    }

    /// Structural translation into the back-end's term language.
    /// `Program` nodes lower to their body; the driver pairs the result
    /// with the program version when handing off.
    pub fn compile_to_uplc(&self) -> PluthonResult<uplc::Term> {
        let t = match self.as_ref() {
            Program { body, .. } => body.compile_to_uplc()?,
            Var { name } => mk_uplc_var(name.clone()),
            Lambda { params, body } => {
                if params.is_empty() {
                    return Err(EmptyLambdaErr(file!(), line!()))
                }
                let mut t = body.compile_to_uplc()?;
                for param in params.iter().rev() {
                    t = mk_uplc_lambda(param.clone(), t);
                }
                t
            },
            Apply { fun, args } => {
                let mut t = fun.compile_to_uplc()?;
                for arg in args.iter() {
                    t = mk_uplc_apply(t, arg.compile_to_uplc()?);
                }
                t
            },
            Force { inner } => mk_uplc_force(inner.compile_to_uplc()?),
            Delay { inner } => mk_uplc_delay(inner.compile_to_uplc()?),
            Let { bindings, body } => {
                let mut t = body.compile_to_uplc()?;
                for (name, value) in bindings.iter().rev() {
                    t = mk_uplc_apply(mk_uplc_lambda(name.clone(), t), value.compile_to_uplc()?);
                }
                t
            },
            Integer { x } => mk_uplc_constant(uplc::Constant::Integer(x.clone())),
            ByteString { x } => mk_uplc_constant(uplc::Constant::ByteString(x.clone())),
            Text { x } => mk_uplc_constant(uplc::Constant::String(x.clone())),
            Bool { x } => mk_uplc_constant(uplc::Constant::Bool(*x)),
            Unit => mk_uplc_constant(uplc::Constant::Unit),
            Raw { constant } => mk_uplc_constant(constant.clone()),
            BuiltIn { op } => mk_uplc_builtin(*op),
            // Wrapped so the back-end can never evaluate it at compile
            // time; sugar that wants the error to fire applies the
            // wrapper to a throwaway unit.
            Error => mk_uplc_lambda("_", mk_uplc_error()),
            Ite { cond, then, other } => {
                mk_uplc_force(
                    mk_uplc_apply(
                        mk_uplc_apply(
                            mk_uplc_apply(
                                mk_uplc_force(mk_uplc_builtin(uplc::BuiltInFun::IfThenElse)),
                                cond.compile_to_uplc()?,
                            ),
                            mk_uplc_delay(then.compile_to_uplc()?),
                        ),
                        mk_uplc_delay(other.compile_to_uplc()?),
                    )
                )
            },
            EmptyList { sample } => mk_uplc_constant(mk_empty_list_constant(sample)),
            Pattern { kind, fields } => kind.compose(fields).compile_to_uplc()?,
        };
        Ok(t)
    }
}

impl std::fmt::Debug for Term {
    fn fmt(&self, f : &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.dumps())
    }
}

impl std::convert::AsRef<InnerTerm> for Term {
    fn as_ref(&self) -> &InnerTerm {
        match self {
            Term(arc) => arc.as_ref()
        }
    }
}

impl From<InnerTerm> for Term {
    fn from(x : InnerTerm) -> Term {
        Term(Arc::new(x))
    }
}

#[cfg(test)]
mod term_tests {
    use super::*;

    #[test]
    fn lambda_curries_right_to_left() {
        let t = mk_lambda(vec![format!("a"), format!("b")], mk_var("a"));
        let lowered = t.compile_to_uplc().unwrap();
        assert_eq!(lowered.dumps(), "(lam a (lam b a))");
    }

    #[test]
    fn empty_lambda_is_rejected() {
        let t = mk_lambda(vec![], mk_unit());
        assert!(t.compile_to_uplc().is_err());
    }

    #[test]
    fn apply_lowers_left_associatively() {
        let t = mk_apply(mk_var("f"), vec![mk_var("x"), mk_var("y")]);
        assert_eq!(t.compile_to_uplc().unwrap().dumps(), "[[f x] y]");
    }

    #[test]
    fn let_pops_bindings_from_the_end() {
        // later bindings are innermost, so `b` may reference `a`
        let t = mk_let(
            vec![
                (format!("a"), mk_integer(1)),
                (format!("b"), mk_var("a")),
            ],
            mk_var("b"),
        );
        let lowered = t.compile_to_uplc().unwrap();
        assert_eq!(lowered.dumps(), "[(lam a [(lam b b) a]) (con integer 1)]");
    }

    #[test]
    fn error_lowers_behind_a_dummy_lambda() {
        assert_eq!(mk_error().compile_to_uplc().unwrap().dumps(), "(lam _ (error))");
    }

    #[test]
    fn ite_lowers_with_delayed_branches() {
        let t = mk_ite(mk_bool(true), mk_integer(1), mk_integer(2));
        assert_eq!(
            t.compile_to_uplc().unwrap().dumps(),
            "(force [[[(force (builtin IfThenElse)) (con bool True)] (delay (con integer 1))] (delay (con integer 2))])"
        );
    }

    #[test]
    fn dumps_is_deterministic() {
        let t = mk_let(
            vec![(format!("x"), mk_integer(42))],
            mk_apply(mk_var("f"), vec![mk_var("x"), mk_bytestring(vec![0xde, 0xad])]),
        );
        assert_eq!(t.dumps(), t.dumps());
        assert_eq!(t.dumps(), "(let x = 42 in (f x 0xdead))");
    }
}
