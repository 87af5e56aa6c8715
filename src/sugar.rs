use std::sync::Arc;

use crate::term::{ Term,
                   PatternKind,
                   mk_var,
                   mk_lambda,
                   mk_apply,
                   mk_force,
                   mk_delay,
                   mk_let,
                   mk_integer,
                   mk_text,
                   mk_bool,
                   mk_unit,
                   mk_builtin,
                   mk_error,
                   mk_ite,
                   mk_empty_list,
                   mk_pattern };
use crate::uplc;
use crate::uplc::BuiltInFun;

/// Pluto abstractions over the raw term language. Constructs come in
/// two flavors : pattern kinds, which are data carriers the optimiser
/// may hoist into shared functions, and plain builder functions, used
/// where explicit `Delay`/`Force` placement would make sharing unsound.

/// Compiler-introduced names are wrapped as `0<name>_`. User code that
/// avoids names of that shape is guaranteed never to collide with
/// anything the sugar layer or the optimiser emits.
pub fn scheme_name(x : &str) -> String {
    format!("0{}_", x)
}

pub fn pvar(x : &str) -> Term {
    mk_var(scheme_name(x))
}

pub fn plambda(params : &[&str], body : Term) -> Term {
    mk_lambda(params.iter().map(|p| scheme_name(p)).collect(), body)
}

pub fn plet(bindings : Vec<(&str, Term)>, body : Term) -> Term {
    mk_let(bindings.into_iter().map(|(n, t)| (scheme_name(n), t)).collect(), body)
}

// ## Builtin wrappers
//
// Each wrapper instantiates the builtin's type parameters with the
// right number of forces and applies it saturated. The six-arity form
// exists for data elimination (ChooseData).

fn builtin_unop(op : BuiltInFun, x : Term) -> Term {
    mk_apply(mk_builtin(op), vec![x])
}

fn builtin_unop_force(op : BuiltInFun, x : Term) -> Term {
    mk_apply(mk_force(mk_builtin(op)), vec![x])
}

fn builtin_unop_force_force(op : BuiltInFun, x : Term) -> Term {
    mk_apply(mk_force(mk_force(mk_builtin(op))), vec![x])
}

fn builtin_binop(op : BuiltInFun, x : Term, y : Term) -> Term {
    mk_apply(mk_builtin(op), vec![x, y])
}

fn builtin_binop_force(op : BuiltInFun, x : Term, y : Term) -> Term {
    mk_apply(mk_force(mk_builtin(op)), vec![x, y])
}

fn builtin_ternop(op : BuiltInFun, x : Term, y : Term, z : Term) -> Term {
    mk_apply(mk_builtin(op), vec![x, y, z])
}

fn builtin_ternop_force(op : BuiltInFun, x : Term, y : Term, z : Term) -> Term {
    mk_apply(mk_force(mk_builtin(op)), vec![x, y, z])
}

fn builtin_ternop_force_force(op : BuiltInFun, x : Term, y : Term, z : Term) -> Term {
    mk_apply(mk_force(mk_force(mk_builtin(op))), vec![x, y, z])
}

fn builtin_hexop_force(op : BuiltInFun, d : Term, v : Term, w : Term, x : Term, y : Term, z : Term) -> Term {
    mk_apply(mk_force(mk_builtin(op)), vec![d, v, w, x, y, z])
}

pub fn add_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::AddInteger, x, y) }
pub fn subtract_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::SubtractInteger, x, y) }
pub fn multiply_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::MultiplyInteger, x, y) }
pub fn divide_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::DivideInteger, x, y) }
pub fn quotient_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::QuotientInteger, x, y) }
pub fn remainder_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::RemainderInteger, x, y) }
pub fn mod_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::ModInteger, x, y) }
pub fn equals_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::EqualsInteger, x, y) }
pub fn less_than_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::LessThanInteger, x, y) }
pub fn less_than_equals_integer(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::LessThanEqualsInteger, x, y) }
pub fn append_byte_string(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::AppendByteString, x, y) }
pub fn cons_byte_string(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::ConsByteString, x, y) }
pub fn slice_byte_string(x : Term, y : Term, z : Term) -> Term { builtin_ternop(BuiltInFun::SliceByteString, x, y, z) }
pub fn length_of_byte_string(x : Term) -> Term { builtin_unop(BuiltInFun::LengthOfByteString, x) }
pub fn index_byte_string(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::IndexByteString, x, y) }
pub fn equals_byte_string(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::EqualsByteString, x, y) }
pub fn less_than_byte_string(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::LessThanByteString, x, y) }
pub fn less_than_equals_byte_string(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::LessThanEqualsByteString, x, y) }
pub fn sha2_256(x : Term) -> Term { builtin_unop(BuiltInFun::Sha2_256, x) }
pub fn sha3_256(x : Term) -> Term { builtin_unop(BuiltInFun::Sha3_256, x) }
pub fn blake2b_256(x : Term) -> Term { builtin_unop(BuiltInFun::Blake2b_256, x) }
pub fn verify_signature(x : Term, y : Term, z : Term) -> Term { builtin_ternop(BuiltInFun::VerifySignature, x, y, z) }
pub fn append_string(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::AppendString, x, y) }
pub fn equals_string(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::EqualsString, x, y) }
pub fn encode_utf8(x : Term) -> Term { builtin_unop(BuiltInFun::EncodeUtf8, x) }
pub fn decode_utf8(x : Term) -> Term { builtin_unop(BuiltInFun::DecodeUtf8, x) }
// Note : prefer `mk_ite`; the raw builtin evaluates both branches.
pub fn if_then_else(c : Term, t : Term, e : Term) -> Term { builtin_ternop_force(BuiltInFun::IfThenElse, c, t, e) }
pub fn choose_unit(u : Term, v : Term) -> Term { builtin_binop_force(BuiltInFun::ChooseUnit, u, v) }
pub fn trace(msg : Term, value : Term) -> Term { builtin_binop_force(BuiltInFun::Trace, msg, value) }
pub fn fst_pair(p : Term) -> Term { builtin_unop_force_force(BuiltInFun::FstPair, p) }
pub fn snd_pair(p : Term) -> Term { builtin_unop_force_force(BuiltInFun::SndPair, p) }
pub fn choose_list(l : Term, x : Term, y : Term) -> Term { builtin_ternop_force_force(BuiltInFun::ChooseList, l, x, y) }
pub fn prepend_list(x : Term, xs : Term) -> Term { builtin_binop_force(BuiltInFun::MkCons, x, xs) }
pub fn head_list(l : Term) -> Term { builtin_unop_force(BuiltInFun::HeadList, l) }
pub fn tail_list(l : Term) -> Term { builtin_unop_force(BuiltInFun::TailList, l) }
pub fn null_list(l : Term) -> Term { builtin_unop_force(BuiltInFun::NullList, l) }
pub fn choose_data(d : Term, v : Term, w : Term, x : Term, y : Term, z : Term) -> Term { builtin_hexop_force(BuiltInFun::ChooseData, d, v, w, x, y, z) }
pub fn constr_data(tag : Term, fs : Term) -> Term { builtin_binop(BuiltInFun::ConstrData, tag, fs) }
pub fn map_data(x : Term) -> Term { builtin_unop(BuiltInFun::MapData, x) }
pub fn list_data(x : Term) -> Term { builtin_unop(BuiltInFun::ListData, x) }
pub fn i_data(x : Term) -> Term { builtin_unop(BuiltInFun::IData, x) }
pub fn b_data(x : Term) -> Term { builtin_unop(BuiltInFun::BData, x) }
pub fn un_constr_data(x : Term) -> Term { builtin_unop(BuiltInFun::UnConstrData, x) }
pub fn un_map_data(x : Term) -> Term { builtin_unop(BuiltInFun::UnMapData, x) }
pub fn un_list_data(x : Term) -> Term { builtin_unop(BuiltInFun::UnListData, x) }
pub fn un_i_data(x : Term) -> Term { builtin_unop(BuiltInFun::UnIData, x) }
pub fn un_b_data(x : Term) -> Term { builtin_unop(BuiltInFun::UnBData, x) }
pub fn equals_data(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::EqualsData, x, y) }
pub fn serialise_data(x : Term) -> Term { builtin_unop(BuiltInFun::SerialiseData, x) }
pub fn mk_pair_data(x : Term, y : Term) -> Term { builtin_binop(BuiltInFun::MkPairData, x, y) }
pub fn mk_nil_data(x : Term) -> Term { builtin_unop(BuiltInFun::MkNilData, x) }
pub fn mk_nil_pair_data(x : Term) -> Term { builtin_unop(BuiltInFun::MkNilPairData, x) }

// ## Generic helpers

pub fn trace_const(msg : &str, value : Term) -> Term {
    trace(mk_text(msg), value)
}

/// Emit `msg` and diverge. `Error` lowers behind a dummy lambda, so the
/// trace builtin sees a plain value, prints, and hands the wrapper back;
/// applying it to unit is what actually fires the error.
pub fn trace_error(msg : &str) -> Term {
    mk_apply(trace_const(msg, mk_error()), vec![mk_unit()])
}

pub fn equals_bool(x : Term, y : Term) -> Term {
    iff(x, y)
}

// ## One-shot builders
//
// These place `Delay`/`Force` by hand and must not be shared, so they
// stay plain functions rather than pattern kinds.

/// Branch on emptiness of `l`; only the taken branch is evaluated.
pub fn ite_null_list(l : Term, when_empty : Term, when_nonempty : Term) -> Term {
    mk_force(choose_list(l, mk_delay(when_empty), mk_delay(when_nonempty)))
}

/// Eliminate a data value by tag; only the matching case is evaluated.
pub fn delayed_choose_data(d : Term,
                           constr_case : Term,
                           map_case : Term,
                           list_case : Term,
                           int_case : Term,
                           bytes_case : Term) -> Term {
    mk_force(choose_data(
        d,
        mk_delay(constr_case),
        mk_delay(map_case),
        mk_delay(list_case),
        mk_delay(int_case),
        mk_delay(bytes_case),
    ))
}

/// Empty list of data elements (runtime-constructed; the element type
/// comes from MkNilData itself).
pub fn empty_data_list() -> Term {
    mk_nil_data(mk_unit())
}

pub fn empty_pair_list() -> Term {
    mk_nil_pair_data(mk_unit())
}

/// Typed empty list witness for builtin integer elements.
pub fn empty_integer_list() -> Term {
    mk_empty_list(uplc::mk_integer_constant(0))
}

// ## Pattern kinds
//
// Every kind composes through `pvar`-schemed names only, so nothing
// here can capture a user variable. Field terms are referenced exactly
// as handed in; the optimiser relies on that when it swaps them for
// fresh variables or force-wrapped parameters.

/// Recursion by self-application : `RecFun(f)` binds `f` to itself, so
/// `f` receives itself as its first argument and can call back through
/// it.
pub struct RecFun;

impl PatternKind for RecFun {
    fn name(&self) -> String { format!("RecFun") }
    fn field_names(&self) -> &'static [&'static str] { &["f"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let f = fields[0].clone();
        plet(vec![("g", f)], mk_apply(pvar("g"), vec![pvar("g")]))
    }
}

pub fn rec_fun(f : Term) -> Term {
    mk_pattern(Arc::new(RecFun), vec![f])
}

pub struct Not;

impl PatternKind for Not {
    fn name(&self) -> String { format!("Not") }
    fn field_names(&self) -> &'static [&'static str] { &["x"] }
    fn compose(&self, fields : &[Term]) -> Term {
        mk_ite(fields[0].clone(), mk_bool(false), mk_bool(true))
    }
}

pub fn not(x : Term) -> Term {
    mk_pattern(Arc::new(Not), vec![x])
}

pub struct Iff;

impl PatternKind for Iff {
    fn name(&self) -> String { format!("Iff") }
    fn field_names(&self) -> &'static [&'static str] { &["x", "y"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (x, y) = (fields[0].clone(), fields[1].clone());
        mk_ite(x, y.clone(), not(y))
    }
}

pub fn iff(x : Term, y : Term) -> Term {
    mk_pattern(Arc::new(Iff), vec![x, y])
}

pub struct And;

impl PatternKind for And {
    fn name(&self) -> String { format!("And") }
    fn field_names(&self) -> &'static [&'static str] { &["x", "y"] }
    fn compose(&self, fields : &[Term]) -> Term {
        mk_ite(fields[0].clone(), fields[1].clone(), mk_bool(false))
    }
}

pub fn and(x : Term, y : Term) -> Term {
    mk_pattern(Arc::new(And), vec![x, y])
}

pub struct Or;

impl PatternKind for Or {
    fn name(&self) -> String { format!("Or") }
    fn field_names(&self) -> &'static [&'static str] { &["x", "y"] }
    fn compose(&self, fields : &[Term]) -> Term {
        mk_ite(fields[0].clone(), mk_bool(true), fields[1].clone())
    }
}

pub fn or(x : Term, y : Term) -> Term {
    mk_pattern(Arc::new(Or), vec![x, y])
}

pub struct Xor;

impl PatternKind for Xor {
    fn name(&self) -> String { format!("Xor") }
    fn field_names(&self) -> &'static [&'static str] { &["x", "y"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (x, y) = (fields[0].clone(), fields[1].clone());
        mk_ite(x, not(y.clone()), y)
    }
}

pub fn xor(x : Term, y : Term) -> Term {
    mk_pattern(Arc::new(Xor), vec![x, y])
}

pub struct Implies;

impl PatternKind for Implies {
    fn name(&self) -> String { format!("Implies") }
    fn field_names(&self) -> &'static [&'static str] { &["x", "y"] }
    fn compose(&self, fields : &[Term]) -> Term {
        mk_ite(fields[0].clone(), fields[1].clone(), mk_bool(true))
    }
}

pub fn implies(x : Term, y : Term) -> Term {
    mk_pattern(Arc::new(Implies), vec![x, y])
}

pub struct NotEqualsInteger;

impl PatternKind for NotEqualsInteger {
    fn name(&self) -> String { format!("NotEqualsInteger") }
    fn field_names(&self) -> &'static [&'static str] { &["a", "b"] }
    fn compose(&self, fields : &[Term]) -> Term {
        not(equals_integer(fields[0].clone(), fields[1].clone()))
    }
}

pub fn not_equals_integer(a : Term, b : Term) -> Term {
    mk_pattern(Arc::new(NotEqualsInteger), vec![a, b])
}

pub struct Negate;

impl PatternKind for Negate {
    fn name(&self) -> String { format!("Negate") }
    fn field_names(&self) -> &'static [&'static str] { &["x"] }
    fn compose(&self, fields : &[Term]) -> Term {
        subtract_integer(mk_integer(0), fields[0].clone())
    }
}

pub fn negate(x : Term) -> Term {
    mk_pattern(Arc::new(Negate), vec![x])
}

pub struct SingleDataList;

impl PatternKind for SingleDataList {
    fn name(&self) -> String { format!("SingleDataList") }
    fn field_names(&self) -> &'static [&'static str] { &["x"] }
    fn compose(&self, fields : &[Term]) -> Term {
        prepend_list(fields[0].clone(), empty_data_list())
    }
}

pub fn single_data_list(x : Term) -> Term {
    mk_pattern(Arc::new(SingleDataList), vec![x])
}

pub struct SingleDataPairList;

impl PatternKind for SingleDataPairList {
    fn name(&self) -> String { format!("SingleDataPairList") }
    fn field_names(&self) -> &'static [&'static str] { &["x"] }
    fn compose(&self, fields : &[Term]) -> Term {
        prepend_list(fields[0].clone(), empty_pair_list())
    }
}

pub fn single_data_pair_list(x : Term) -> Term {
    mk_pattern(Arc::new(SingleDataPairList), vec![x])
}

/// Left fold : `f` receives the accumulator and the next element.
pub struct FoldList;

impl PatternKind for FoldList {
    fn name(&self) -> String { format!("FoldList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "f", "a"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, f, a) = (fields[0].clone(), fields[1].clone(), fields[2].clone());
        mk_apply(
            rec_fun(plambda(
                &["fold", "xs", "acc"],
                ite_null_list(
                    pvar("xs"),
                    pvar("acc"),
                    mk_apply(pvar("fold"), vec![
                        pvar("fold"),
                        tail_list(pvar("xs")),
                        mk_apply(f, vec![pvar("acc"), head_list(pvar("xs"))]),
                    ]),
                ),
            )),
            vec![l, a],
        )
    }
}

pub fn fold_list(l : Term, f : Term, a : Term) -> Term {
    mk_pattern(Arc::new(FoldList), vec![l, f, a])
}

/// Right fold : `f` receives the next element and the folded rest.
pub struct RFoldList;

impl PatternKind for RFoldList {
    fn name(&self) -> String { format!("RFoldList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "f", "a"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, f, a) = (fields[0].clone(), fields[1].clone(), fields[2].clone());
        mk_apply(
            rec_fun(plambda(
                &["fold", "xs"],
                ite_null_list(
                    pvar("xs"),
                    a,
                    mk_apply(f, vec![
                        head_list(pvar("xs")),
                        mk_apply(pvar("fold"), vec![pvar("fold"), tail_list(pvar("xs"))]),
                    ]),
                ),
            )),
            vec![l],
        )
    }
}

pub fn r_fold_list(l : Term, f : Term, a : Term) -> Term {
    mk_pattern(Arc::new(RFoldList), vec![l, f, a])
}

/// `e` is the empty-list witness that fixes the result element type.
pub struct MapList;

impl PatternKind for MapList {
    fn name(&self) -> String { format!("MapList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "f", "e"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, f, e) = (fields[0].clone(), fields[1].clone(), fields[2].clone());
        mk_apply(
            rec_fun(plambda(
                &["map", "xs"],
                ite_null_list(
                    pvar("xs"),
                    e,
                    prepend_list(
                        mk_apply(f, vec![head_list(pvar("xs"))]),
                        mk_apply(pvar("map"), vec![pvar("map"), tail_list(pvar("xs"))]),
                    ),
                ),
            )),
            vec![l],
        )
    }
}

pub fn map_list(l : Term, f : Term, e : Term) -> Term {
    mk_pattern(Arc::new(MapList), vec![l, f, e])
}

pub struct FilterList;

impl PatternKind for FilterList {
    fn name(&self) -> String { format!("FilterList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "k", "e"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, k, e) = (fields[0].clone(), fields[1].clone(), fields[2].clone());
        mk_apply(
            rec_fun(plambda(
                &["filter", "xs"],
                ite_null_list(
                    pvar("xs"),
                    e,
                    plet(
                        vec![
                            ("head", head_list(pvar("xs"))),
                            ("tail", mk_apply(pvar("filter"), vec![pvar("filter"), tail_list(pvar("xs"))])),
                        ],
                        mk_ite(
                            mk_apply(k, vec![pvar("head")]),
                            prepend_list(pvar("head"), pvar("tail")),
                            pvar("tail"),
                        ),
                    ),
                ),
            )),
            vec![l],
        )
    }
}

pub fn filter_list(l : Term, k : Term, e : Term) -> Term {
    mk_pattern(Arc::new(FilterList), vec![l, k, e])
}

/// Filter with `k`, then map the survivors with `f`, in one traversal.
pub struct MapFilterList;

impl PatternKind for MapFilterList {
    fn name(&self) -> String { format!("MapFilterList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "k", "f", "e"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, k, f, e) = (fields[0].clone(), fields[1].clone(), fields[2].clone(), fields[3].clone());
        mk_apply(
            rec_fun(plambda(
                &["mapf", "xs"],
                ite_null_list(
                    pvar("xs"),
                    e,
                    plet(
                        vec![
                            ("head", head_list(pvar("xs"))),
                            ("tail", mk_apply(pvar("mapf"), vec![pvar("mapf"), tail_list(pvar("xs"))])),
                        ],
                        mk_ite(
                            mk_apply(k, vec![pvar("head")]),
                            prepend_list(mk_apply(f, vec![pvar("head")]), pvar("tail")),
                            pvar("tail"),
                        ),
                    ),
                ),
            )),
            vec![l],
        )
    }
}

pub fn map_filter_list(l : Term, k : Term, f : Term, e : Term) -> Term {
    mk_pattern(Arc::new(MapFilterList), vec![l, k, f, e])
}

/// First element satisfying `k`, else the default `d`.
pub struct FindList;

impl PatternKind for FindList {
    fn name(&self) -> String { format!("FindList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "k", "d"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, k, d) = (fields[0].clone(), fields[1].clone(), fields[2].clone());
        mk_apply(
            rec_fun(plambda(
                &["find", "xs"],
                ite_null_list(
                    pvar("xs"),
                    d,
                    plet(
                        vec![("head", head_list(pvar("xs")))],
                        mk_ite(
                            mk_apply(k, vec![pvar("head")]),
                            pvar("head"),
                            mk_apply(pvar("find"), vec![pvar("find"), tail_list(pvar("xs"))]),
                        ),
                    ),
                ),
            )),
            vec![l],
        )
    }
}

pub fn find_list(l : Term, k : Term, d : Term) -> Term {
    mk_pattern(Arc::new(FindList), vec![l, k, d])
}

pub struct AnyList;

impl PatternKind for AnyList {
    fn name(&self) -> String { format!("AnyList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "k"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, k) = (fields[0].clone(), fields[1].clone());
        mk_apply(
            rec_fun(plambda(
                &["any", "xs"],
                ite_null_list(
                    pvar("xs"),
                    mk_bool(false),
                    mk_ite(
                        mk_apply(k, vec![head_list(pvar("xs"))]),
                        mk_bool(true),
                        mk_apply(pvar("any"), vec![pvar("any"), tail_list(pvar("xs"))]),
                    ),
                ),
            )),
            vec![l],
        )
    }
}

pub fn any_list(l : Term, k : Term) -> Term {
    mk_pattern(Arc::new(AnyList), vec![l, k])
}

pub struct AllList;

impl PatternKind for AllList {
    fn name(&self) -> String { format!("AllList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "k"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, k) = (fields[0].clone(), fields[1].clone());
        mk_apply(
            rec_fun(plambda(
                &["all", "xs"],
                ite_null_list(
                    pvar("xs"),
                    mk_bool(true),
                    mk_ite(
                        mk_apply(k, vec![head_list(pvar("xs"))]),
                        mk_apply(pvar("all"), vec![pvar("all"), tail_list(pvar("xs"))]),
                        mk_bool(false),
                    ),
                ),
            )),
            vec![l],
        )
    }
}

pub fn all_list(l : Term, k : Term) -> Term {
    mk_pattern(Arc::new(AllList), vec![l, k])
}

pub struct LengthList;

impl PatternKind for LengthList {
    fn name(&self) -> String { format!("LengthList") }
    fn field_names(&self) -> &'static [&'static str] { &["l"] }
    fn compose(&self, fields : &[Term]) -> Term {
        fold_list(
            fields[0].clone(),
            plambda(&["acc", "x"], add_integer(pvar("acc"), mk_integer(1))),
            mk_integer(0),
        )
    }
}

pub fn length_list(l : Term) -> Term {
    mk_pattern(Arc::new(LengthList), vec![l])
}

/// First `n` elements; shorter lists are returned whole. `e` witnesses
/// the element type.
pub struct TakeList;

impl PatternKind for TakeList {
    fn name(&self) -> String { format!("TakeList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "n", "e"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, n, e) = (fields[0].clone(), fields[1].clone(), fields[2].clone());
        mk_apply(
            rec_fun(plambda(
                &["take", "i", "xs"],
                mk_ite(
                    less_than_equals_integer(pvar("i"), mk_integer(0)),
                    e.clone(),
                    ite_null_list(
                        pvar("xs"),
                        e,
                        prepend_list(
                            head_list(pvar("xs")),
                            mk_apply(pvar("take"), vec![
                                pvar("take"),
                                subtract_integer(pvar("i"), mk_integer(1)),
                                tail_list(pvar("xs")),
                            ]),
                        ),
                    ),
                ),
            )),
            vec![n, l],
        )
    }
}

pub fn take_list(l : Term, n : Term, e : Term) -> Term {
    mk_pattern(Arc::new(TakeList), vec![l, n, e])
}

pub struct DropList;

impl PatternKind for DropList {
    fn name(&self) -> String { format!("DropList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "n"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, n) = (fields[0].clone(), fields[1].clone());
        mk_apply(
            rec_fun(plambda(
                &["drop", "i", "xs"],
                mk_ite(
                    less_than_equals_integer(pvar("i"), mk_integer(0)),
                    pvar("xs"),
                    ite_null_list(
                        pvar("xs"),
                        pvar("xs"),
                        mk_apply(pvar("drop"), vec![
                            pvar("drop"),
                            subtract_integer(pvar("i"), mk_integer(1)),
                            tail_list(pvar("xs")),
                        ]),
                    ),
                ),
            )),
            vec![n, l],
        )
    }
}

pub fn drop_list(l : Term, n : Term) -> Term {
    mk_pattern(Arc::new(DropList), vec![l, n])
}

/// Elements from `start` (inclusive) to `end` (exclusive).
pub struct SliceList;

impl PatternKind for SliceList {
    fn name(&self) -> String { format!("SliceList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "start", "end", "e"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, start, end, e) = (fields[0].clone(), fields[1].clone(), fields[2].clone(), fields[3].clone());
        take_list(
            drop_list(l, start.clone()),
            subtract_integer(end, start),
            e,
        )
    }
}

pub fn slice_list(l : Term, start : Term, end : Term, e : Term) -> Term {
    mk_pattern(Arc::new(SliceList), vec![l, start, end, e])
}

pub struct AppendList;

impl PatternKind for AppendList {
    fn name(&self) -> String { format!("AppendList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "r"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, r) = (fields[0].clone(), fields[1].clone());
        mk_apply(
            rec_fun(plambda(
                &["append", "xs"],
                ite_null_list(
                    pvar("xs"),
                    r,
                    prepend_list(
                        head_list(pvar("xs")),
                        mk_apply(pvar("append"), vec![pvar("append"), tail_list(pvar("xs"))]),
                    ),
                ),
            )),
            vec![l],
        )
    }
}

pub fn append_list(l : Term, r : Term) -> Term {
    mk_pattern(Arc::new(AppendList), vec![l, r])
}

/// Index into a list with a runtime bound check; exhausting the list
/// raises a traced `IndexError`.
pub struct IndexAccessList;

impl PatternKind for IndexAccessList {
    fn name(&self) -> String { format!("IndexAccessList") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "i"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, i) = (fields[0].clone(), fields[1].clone());
        plet(
            vec![(
                "g",
                plambda(
                    &["i", "xs", "f"],
                    ite_null_list(
                        pvar("xs"),
                        trace_error("IndexError"),
                        mk_ite(
                            equals_integer(pvar("i"), mk_integer(0)),
                            head_list(pvar("xs")),
                            mk_apply(pvar("f"), vec![
                                subtract_integer(pvar("i"), mk_integer(1)),
                                tail_list(pvar("xs")),
                                pvar("f"),
                            ]),
                        ),
                    ),
                ),
            )],
            mk_apply(pvar("g"), vec![i, l, pvar("g")]),
        )
    }
}

pub fn index_access_list(l : Term, i : Term) -> Term {
    mk_pattern(Arc::new(IndexAccessList), vec![l, i])
}

/// Unguarded sibling of `IndexAccessList`; out-of-range indices hit the
/// bare `TailList`/`HeadList` failure instead of a traced IndexError.
pub struct IndexAccessListFast;

impl PatternKind for IndexAccessListFast {
    fn name(&self) -> String { format!("IndexAccessListFast") }
    fn field_names(&self) -> &'static [&'static str] { &["l", "i"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (l, i) = (fields[0].clone(), fields[1].clone());
        plet(
            vec![(
                "g",
                plambda(
                    &["i", "xs", "f"],
                    mk_ite(
                        equals_integer(pvar("i"), mk_integer(0)),
                        head_list(pvar("xs")),
                        mk_apply(pvar("f"), vec![
                            subtract_integer(pvar("i"), mk_integer(1)),
                            tail_list(pvar("xs")),
                            pvar("f"),
                        ]),
                    ),
                ),
            )],
            mk_apply(pvar("g"), vec![i, l, pvar("g")]),
        )
    }
}

pub fn index_access_list_fast(l : Term, i : Term) -> Term {
    mk_pattern(Arc::new(IndexAccessListFast), vec![l, i])
}

/// Integers from `start` (inclusive) to `limit` (exclusive), stepping
/// by `step`.
pub struct Range;

impl PatternKind for Range {
    fn name(&self) -> String { format!("Range") }
    fn field_names(&self) -> &'static [&'static str] { &["limit", "start", "step"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let (limit, start, step) = (fields[0].clone(), fields[1].clone(), fields[2].clone());
        mk_apply(
            rec_fun(plambda(
                &["range", "cur"],
                mk_ite(
                    less_than_integer(pvar("cur"), limit),
                    prepend_list(
                        pvar("cur"),
                        mk_apply(pvar("range"), vec![pvar("range"), add_integer(pvar("cur"), step)]),
                    ),
                    empty_integer_list(),
                ),
            )),
            vec![start],
        )
    }
}

pub fn range(limit : Term, start : Term, step : Term) -> Term {
    mk_pattern(Arc::new(Range), vec![limit, start, step])
}

/// Constructor tag of a data value.
pub struct Constructor;

impl PatternKind for Constructor {
    fn name(&self) -> String { format!("Constructor") }
    fn field_names(&self) -> &'static [&'static str] { &["d"] }
    fn compose(&self, fields : &[Term]) -> Term {
        fst_pair(un_constr_data(fields[0].clone()))
    }
}

pub fn constructor(d : Term) -> Term {
    mk_pattern(Arc::new(Constructor), vec![d])
}

/// Field list of a data value.
pub struct Fields;

impl PatternKind for Fields {
    fn name(&self) -> String { format!("Fields") }
    fn field_names(&self) -> &'static [&'static str] { &["d"] }
    fn compose(&self, fs : &[Term]) -> Term {
        snd_pair(un_constr_data(fs[0].clone()))
    }
}

pub fn fields(d : Term) -> Term {
    mk_pattern(Arc::new(Fields), vec![d])
}

pub struct NthField;

impl PatternKind for NthField {
    fn name(&self) -> String { format!("NthField") }
    fn field_names(&self) -> &'static [&'static str] { &["d", "n"] }
    fn compose(&self, fs : &[Term]) -> Term {
        index_access_list(fields(fs[0].clone()), fs[1].clone())
    }
}

pub fn nth_field(d : Term, n : Term) -> Term {
    mk_pattern(Arc::new(NthField), vec![d, n])
}

pub struct NoneData;

impl PatternKind for NoneData {
    fn name(&self) -> String { format!("NoneData") }
    fn field_names(&self) -> &'static [&'static str] { &[] }
    fn compose(&self, _fields : &[Term]) -> Term {
        constr_data(mk_integer(0), empty_data_list())
    }
}

pub fn none_data() -> Term {
    mk_pattern(Arc::new(NoneData), vec![])
}

/// Note : `x` must already be of type data.
pub struct SomeData;

impl PatternKind for SomeData {
    fn name(&self) -> String { format!("SomeData") }
    fn field_names(&self) -> &'static [&'static str] { &["x"] }
    fn compose(&self, fields : &[Term]) -> Term {
        constr_data(mk_integer(1), single_data_list(fields[0].clone()))
    }
}

pub fn some_data(x : Term) -> Term {
    mk_pattern(Arc::new(SomeData), vec![x])
}

// ## Parameterised kind families
//
// One kind per index encountered; the index is folded into the kind
// name, so each distinct index is cached, shared and bound on its own.

/// Unrolled list access at a fixed index : `index` tail steps then a
/// head, each guarded by an emptiness check that raises `IndexError`.
pub struct ConstantIndexAccessList {
    pub index : usize,
}

impl PatternKind for ConstantIndexAccessList {
    fn name(&self) -> String { format!("ConstantIndexAccessList_{}", self.index) }
    fn field_names(&self) -> &'static [&'static str] { &["l"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let l = fields[0].clone();
        let var = |k : usize| format!("x{}", k);
        let mut body = ite_null_list(
            pvar(&var(self.index)),
            trace_error("IndexError"),
            head_list(pvar(&var(self.index))),
        );
        for k in (0..self.index).rev() {
            body = ite_null_list(
                pvar(&var(k)),
                trace_error("IndexError"),
                plet(vec![(var(k + 1).as_str(), tail_list(pvar(&var(k))))], body),
            );
        }
        plet(vec![("x0", l)], body)
    }
}

pub fn constant_index_access_list(l : Term, index : usize) -> Term {
    mk_pattern(Arc::new(ConstantIndexAccessList { index }), vec![l])
}

/// Unguarded unroll : `index` bare tails and a head.
pub struct ConstantIndexAccessListFast {
    pub index : usize,
}

impl PatternKind for ConstantIndexAccessListFast {
    fn name(&self) -> String { format!("ConstantIndexAccessListFast_{}", self.index) }
    fn field_names(&self) -> &'static [&'static str] { &["l"] }
    fn compose(&self, fields : &[Term]) -> Term {
        let mut t = fields[0].clone();
        for _ in 0..self.index {
            t = tail_list(t);
        }
        head_list(t)
    }
}

pub fn constant_index_access_list_fast(l : Term, index : usize) -> Term {
    mk_pattern(Arc::new(ConstantIndexAccessListFast { index }), vec![l])
}

pub struct ConstantNthField {
    pub index : usize,
}

impl PatternKind for ConstantNthField {
    fn name(&self) -> String { format!("ConstantNthField_{}", self.index) }
    fn field_names(&self) -> &'static [&'static str] { &["d"] }
    fn compose(&self, fs : &[Term]) -> Term {
        constant_index_access_list(fields(fs[0].clone()), self.index)
    }
}

pub fn constant_nth_field(d : Term, index : usize) -> Term {
    mk_pattern(Arc::new(ConstantNthField { index }), vec![d])
}

#[cfg(test)]
mod sugar_tests {
    use super::*;

    #[test]
    fn scheme_wraps_with_zero_and_underscore() {
        assert_eq!(scheme_name("fold"), "0fold_");
        assert_eq!(pvar("g").dumps(), "0g_");
    }

    #[test]
    fn plambda_schemes_every_parameter() {
        let t = plambda(&["a", "b"], pvar("a"));
        assert_eq!(t.dumps(), "(\\0a_ 0b_ -> 0a_)");
    }

    #[test]
    fn not_composes_to_an_ite() {
        let t = not(mk_var("c"));
        let composed = t.composed().unwrap();
        assert_eq!(composed.dumps(), "(if c then False else True)");
    }

    #[test]
    fn trace_error_applies_the_wrapped_error() {
        let t = trace_error("IndexError");
        assert_eq!(t.dumps(), "(((! Trace) \"IndexError\" Error) ())");
    }

    #[test]
    fn constant_index_unrolls_guarded_tail_chain() {
        let k = ConstantIndexAccessList { index : 2 };
        let composed = k.compose(&[mk_var("xs")]);
        let dump = composed.dumps();
        // two tail steps, one head, three guards
        assert_eq!(dump.matches("TailList").count(), 2);
        assert_eq!(dump.matches("HeadList").count(), 1);
        assert_eq!(dump.matches("\"IndexError\"").count(), 3);
        assert!(dump.starts_with("(let 0x0_ = xs in"));
    }

    #[test]
    fn constant_index_fast_has_no_guards() {
        let k = ConstantIndexAccessListFast { index : 3 };
        let composed = k.compose(&[mk_var("xs")]);
        assert_eq!(
            composed.dumps(),
            "((! HeadList) ((! TailList) ((! TailList) ((! TailList) xs))))"
        );
    }

    #[test]
    fn parameterised_kinds_fold_the_index_into_the_name() {
        assert_eq!(ConstantIndexAccessList { index : 5 }.name(), "ConstantIndexAccessList_5");
        assert_eq!(ConstantNthField { index : 1 }.name(), "ConstantNthField_1");
    }

    #[test]
    fn poly_builtins_carry_their_forces() {
        assert_eq!(head_list(mk_var("l")).dumps(), "((! HeadList) l)");
        assert_eq!(fst_pair(mk_var("p")).dumps(), "((! (! FstPair)) p)");
        assert_eq!(
            choose_list(mk_var("l"), mk_var("a"), mk_var("b")).dumps(),
            "((! (! ChooseList)) l a b)"
        );
    }
}
