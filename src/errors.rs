/// Compile-time failures. The pipeline has no local recovery; every
/// variant aborts the compile with a descriptive message. Run-time
/// failures of the *compiled program* (IndexError, KeyError, ...) are
/// emitted as traced UPLC errors and are not represented here.

pub type PluthonResult<T> = Result<T, PluthonErr>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluthonErr {
    /// A `Lambda` with no parameters reached lowering; UPLC lambdas
    /// bind exactly one variable, so there is nothing to curry.
    EmptyLambdaErr(&'static str, u32),
    /// Access into a functional tuple of size 0.
    EmptyTupleAccessErr(&'static str, u32),
    /// The constant-index specialiser saw a negative literal index.
    NegativeConstantIndexErr(&'static str, u32, String),
    /// The driver's fixpoint loop hit its iteration cap without the
    /// serialised program stabilising.
    FixpointDivergedErr(usize),
}

impl std::fmt::Display for PluthonErr {
    fn fmt(&self, f : &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PluthonErr::EmptyLambdaErr(file, loc) => write!(f, "Got a fatal error at {} line {}; tried to lower a Lambda with no parameters, but UPLC lambdas require at least one.\n", file, loc),
            PluthonErr::EmptyTupleAccessErr(file, loc) => write!(f, "Got a fatal error at {} line {}; cannot access elements of a functional tuple of size 0.\n", file, loc),
            PluthonErr::NegativeConstantIndexErr(file, loc, idx) => write!(f, "Got a fatal error at {} line {}; list index specialisation requires a non-negative literal index, but got {}.\n", file, loc, idx),
            PluthonErr::FixpointDivergedErr(cap) => write!(f, "Internal compiler error; the optimisation fixpoint failed to converge within {} iterations.\n", cap),
        }
    }
}

impl std::error::Error for PluthonErr {}
