use num_bigint::BigInt;
use once_cell::sync::Lazy;

use BuiltInFun::*;

/// Boundary to the UPLC back-end. The front-end only needs three things
/// from it : constant construction, term construction, and
/// `uplc_compile`, which packages a term as a program and applies the
/// back-end's own configuration. Evaluation, cost accounting and binary
/// serialisation all live on the other side of this boundary and are
/// intentionally absent here.

pub type Version = (u64, u64, u64);

/// The type tag of a UPLC constant. Needed to parameterise empty lists;
/// an empty list with no element type is meaningless to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantType {
    Integer,
    ByteString,
    String,
    Bool,
    Unit,
    List(Box<ConstantType>),
    Pair(Box<ConstantType>, Box<ConstantType>),
}

impl ConstantType {
    pub fn dumps(&self) -> String {
        match self {
            ConstantType::Integer => format!("integer"),
            ConstantType::ByteString => format!("bytestring"),
            ConstantType::String => format!("string"),
            ConstantType::Bool => format!("bool"),
            ConstantType::Unit => format!("unit"),
            ConstantType::List(t) => format!("(list {})", t.dumps()),
            ConstantType::Pair(a, b) => format!("(pair {} {})", a.dumps(), b.dumps()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Integer(BigInt),
    ByteString(Vec<u8>),
    String(String),
    Bool(bool),
    Unit,
    /// A list constant; the element type is carried explicitly so the
    /// empty list is well-formed.
    ProtoList(ConstantType, Vec<Constant>),
    ProtoPair(Box<Constant>, Box<Constant>),
}

pub fn mk_integer_constant(x : impl Into<BigInt>) -> Constant {
    Constant::Integer(x.into())
}

pub fn mk_bytestring_constant(x : impl Into<Vec<u8>>) -> Constant {
    Constant::ByteString(x.into())
}

pub fn mk_string_constant(x : impl Into<String>) -> Constant {
    Constant::String(x.into())
}

pub fn mk_bool_constant(x : bool) -> Constant {
    Constant::Bool(x)
}

pub fn mk_unit_constant() -> Constant {
    Constant::Unit
}

/// An empty list whose element type is taken from a sample constant.
pub fn mk_empty_list_constant(sample : &Constant) -> Constant {
    Constant::ProtoList(sample.tipe(), Vec::new())
}

pub fn mk_pair_constant(fst : Constant, snd : Constant) -> Constant {
    Constant::ProtoPair(Box::new(fst), Box::new(snd))
}

impl Constant {
    pub fn tipe(&self) -> ConstantType {
        match self {
            Constant::Integer(..) => ConstantType::Integer,
            Constant::ByteString(..) => ConstantType::ByteString,
            Constant::String(..) => ConstantType::String,
            Constant::Bool(..) => ConstantType::Bool,
            Constant::Unit => ConstantType::Unit,
            Constant::ProtoList(t, _) => ConstantType::List(Box::new(t.clone())),
            Constant::ProtoPair(a, b) => ConstantType::Pair(Box::new(a.tipe()), Box::new(b.tipe())),
        }
    }

    pub fn dumps(&self) -> String {
        match self {
            Constant::Integer(x) => format!("{}", x),
            Constant::ByteString(x) => {
                let mut s = String::with_capacity(2 + x.len() * 2);
                s.push_str("#");
                for b in x.iter() {
                    s.push_str(&format!("{:02x}", b));
                }
                s
            },
            Constant::String(x) => format!("{:?}", x),
            Constant::Bool(x) => if *x { format!("True") } else { format!("False") },
            Constant::Unit => format!("()"),
            Constant::ProtoList(t, xs) => {
                let elems = xs.iter().map(|x| x.dumps()).collect::<Vec<String>>().join(", ");
                format!("[{}]{}", elems, t.dumps())
            },
            Constant::ProtoPair(a, b) => format!("({}, {})", a.dumps(), b.dumps()),
        }
    }
}

/// The UPLC builtin zoo. "Poly" builtins carry type parameters which the
/// runtime requires to be instantiated with one `force` each; the count
/// is exposed through `type_params` so callers can wrap correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltInFun {
    AddInteger,
    SubtractInteger,
    MultiplyInteger,
    DivideInteger,
    QuotientInteger,
    RemainderInteger,
    ModInteger,
    EqualsInteger,
    LessThanInteger,
    LessThanEqualsInteger,
    AppendByteString,
    ConsByteString,
    SliceByteString,
    LengthOfByteString,
    IndexByteString,
    EqualsByteString,
    LessThanByteString,
    LessThanEqualsByteString,
    Sha2_256,
    Sha3_256,
    Blake2b_256,
    VerifySignature,
    AppendString,
    EqualsString,
    EncodeUtf8,
    DecodeUtf8,
    IfThenElse,
    ChooseUnit,
    Trace,
    FstPair,
    SndPair,
    ChooseList,
    MkCons,
    HeadList,
    TailList,
    NullList,
    ChooseData,
    ConstrData,
    MapData,
    ListData,
    IData,
    BData,
    UnConstrData,
    UnMapData,
    UnListData,
    UnIData,
    UnBData,
    EqualsData,
    SerialiseData,
    MkPairData,
    MkNilData,
    MkNilPairData,
}

impl BuiltInFun {
    /// Number of type parameters, i.e. the number of `force`s a fully
    /// instantiated reference needs.
    pub fn type_params(&self) -> usize {
        match self {
            IfThenElse | ChooseUnit | Trace | MkCons
            | HeadList | TailList | NullList | ChooseData => 1,
            FstPair | SndPair | ChooseList => 2,
            _ => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AddInteger => "AddInteger",
            SubtractInteger => "SubtractInteger",
            MultiplyInteger => "MultiplyInteger",
            DivideInteger => "DivideInteger",
            QuotientInteger => "QuotientInteger",
            RemainderInteger => "RemainderInteger",
            ModInteger => "ModInteger",
            EqualsInteger => "EqualsInteger",
            LessThanInteger => "LessThanInteger",
            LessThanEqualsInteger => "LessThanEqualsInteger",
            AppendByteString => "AppendByteString",
            ConsByteString => "ConsByteString",
            SliceByteString => "SliceByteString",
            LengthOfByteString => "LengthOfByteString",
            IndexByteString => "IndexByteString",
            EqualsByteString => "EqualsByteString",
            LessThanByteString => "LessThanByteString",
            LessThanEqualsByteString => "LessThanEqualsByteString",
            Sha2_256 => "Sha2_256",
            Sha3_256 => "Sha3_256",
            Blake2b_256 => "Blake2b_256",
            VerifySignature => "VerifySignature",
            AppendString => "AppendString",
            EqualsString => "EqualsString",
            EncodeUtf8 => "EncodeUtf8",
            DecodeUtf8 => "DecodeUtf8",
            IfThenElse => "IfThenElse",
            ChooseUnit => "ChooseUnit",
            Trace => "Trace",
            FstPair => "FstPair",
            SndPair => "SndPair",
            ChooseList => "ChooseList",
            MkCons => "MkCons",
            HeadList => "HeadList",
            TailList => "TailList",
            NullList => "NullList",
            ChooseData => "ChooseData",
            ConstrData => "ConstrData",
            MapData => "MapData",
            ListData => "ListData",
            IData => "IData",
            BData => "BData",
            UnConstrData => "UnConstrData",
            UnMapData => "UnMapData",
            UnListData => "UnListData",
            UnIData => "UnIData",
            UnBData => "UnBData",
            EqualsData => "EqualsData",
            SerialiseData => "SerialiseData",
            MkPairData => "MkPairData",
            MkNilData => "MkNilData",
            MkNilPairData => "MkNilPairData",
        }
    }
}

/// A bare UPLC term. The back-end owns this tree after `uplc_compile`;
/// the front-end only ever constructs it, so a plain boxed enum is
/// enough here (contrast with the front-end `Term`, which is shared and
/// rewritten and therefore reference counted).
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Variable(String),
    Lambda { param : String, body : Box<Term> },
    Apply { fun : Box<Term>, arg : Box<Term> },
    Force(Box<Term>),
    Delay(Box<Term>),
    Constant(Constant),
    BuiltIn(BuiltInFun),
    Error,
}

pub fn mk_uplc_var(name : impl Into<String>) -> Term {
    Term::Variable(name.into())
}

pub fn mk_uplc_lambda(param : impl Into<String>, body : Term) -> Term {
    Term::Lambda { param : param.into(), body : Box::new(body) }
}

pub fn mk_uplc_apply(fun : Term, arg : Term) -> Term {
    Term::Apply { fun : Box::new(fun), arg : Box::new(arg) }
}

pub fn mk_uplc_force(inner : Term) -> Term {
    Term::Force(Box::new(inner))
}

pub fn mk_uplc_delay(inner : Term) -> Term {
    Term::Delay(Box::new(inner))
}

pub fn mk_uplc_constant(c : Constant) -> Term {
    Term::Constant(c)
}

pub fn mk_uplc_builtin(b : BuiltInFun) -> Term {
    Term::BuiltIn(b)
}

pub fn mk_uplc_error() -> Term {
    Term::Error
}

impl Term {
    pub fn dumps(&self) -> String {
        match self {
            Term::Variable(name) => name.clone(),
            Term::Lambda { param, body } => format!("(lam {} {})", param, body.dumps()),
            Term::Apply { fun, arg } => format!("[{} {}]", fun.dumps(), arg.dumps()),
            Term::Force(inner) => format!("(force {})", inner.dumps()),
            Term::Delay(inner) => format!("(delay {})", inner.dumps()),
            Term::Constant(c) => format!("(con {} {})", c.tipe().dumps(), c.dumps()),
            Term::BuiltIn(b) => format!("(builtin {})", b.name()),
            Term::Error => format!("(error)"),
        }
    }
}

/// The back-end's own knobs. Opaque to the front-end apart from the
/// merge rule; O-level presets fill them in and explicit caller values
/// survive the merge (non-null wins, right-hand side wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationConfig {
    pub unique_variable_names : Option<bool>,
    pub remove_force_delay : Option<bool>,
    pub constant_folding : Option<bool>,
}

impl CompilationConfig {
    pub fn update(&self, other : &CompilationConfig) -> CompilationConfig {
        CompilationConfig {
            unique_variable_names : other.unique_variable_names.or(self.unique_variable_names),
            remove_force_delay : other.remove_force_delay.or(self.remove_force_delay),
            constant_folding : other.constant_folding.or(self.constant_folding),
        }
    }
}

pub static UPLC_OPT_O0_CONFIG : Lazy<CompilationConfig> = Lazy::new(|| {
    CompilationConfig {
        unique_variable_names : Some(false),
        remove_force_delay : Some(false),
        constant_folding : Some(false),
    }
});

pub static UPLC_OPT_O1_CONFIG : Lazy<CompilationConfig> = Lazy::new(|| {
    UPLC_OPT_O0_CONFIG.update(&CompilationConfig {
        remove_force_delay : Some(true),
        ..CompilationConfig::default()
    })
});

pub static UPLC_OPT_O2_CONFIG : Lazy<CompilationConfig> = Lazy::new(|| {
    UPLC_OPT_O1_CONFIG.update(&CompilationConfig {
        constant_folding : Some(true),
        ..CompilationConfig::default()
    })
});

pub static UPLC_OPT_O3_CONFIG : Lazy<CompilationConfig> = Lazy::new(|| {
    UPLC_OPT_O2_CONFIG.update(&CompilationConfig {
        unique_variable_names : Some(true),
        ..CompilationConfig::default()
    })
});

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub version : Version,
    pub term : Term,
    pub config : CompilationConfig,
}

impl Program {
    pub fn dumps(&self) -> String {
        let (x, y, z) = self.version;
        format!("(program {}.{}.{} {})", x, y, z, self.term.dumps())
    }
}

/// Hand a lowered term to the back-end. The interesting work (its own
/// simplifier, de Bruijn conversion, flat encoding) happens downstream
/// of this crate; here the term is packaged together with the resolved
/// back-end configuration.
pub fn uplc_compile(version : Version, term : Term, config : &CompilationConfig) -> Program {
    Program {
        version,
        term,
        config : config.clone(),
    }
}

#[cfg(test)]
mod uplc_tests {
    use super::*;

    #[test]
    fn config_merge_non_null_wins() {
        let base = CompilationConfig {
            unique_variable_names : Some(false),
            remove_force_delay : Some(true),
            constant_folding : None,
        };
        let over = CompilationConfig {
            unique_variable_names : Some(true),
            remove_force_delay : None,
            constant_folding : None,
        };
        let merged = base.update(&over);
        assert_eq!(merged.unique_variable_names, Some(true));
        assert_eq!(merged.remove_force_delay, Some(true));
        assert_eq!(merged.constant_folding, None);
    }

    #[test]
    fn empty_list_constant_keeps_sample_type() {
        let e = mk_empty_list_constant(&mk_integer_constant(0));
        assert_eq!(e.tipe(), ConstantType::List(Box::new(ConstantType::Integer)));
        assert_eq!(e.dumps(), "[]integer");
    }
}
