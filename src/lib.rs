#![forbid(unsafe_code)]

use log::debug;

pub mod errors;
pub mod uplc;
pub mod term;
pub mod visit;
pub mod sugar;
pub mod functional;
pub mod config;
pub mod optimize;

pub use crate::config::{ CompilationConfig,
                         CONFIG_HELP,
                         DEFAULT_CONFIG,
                         OPT_O0_CONFIG,
                         OPT_O1_CONFIG,
                         OPT_O2_CONFIG,
                         OPT_O3_CONFIG };
pub use crate::errors::{ PluthonErr, PluthonResult };
pub use crate::functional::*;
pub use crate::sugar::*;
pub use crate::term::*;
pub use crate::visit::{ NodeVisitor, NodeTransformer, NoOp };

use crate::errors::PluthonErr::*;
use crate::optimize::constant_index_access_list::IndexAccessOptimizer;
use crate::optimize::patterns::{ AllPatternReplacer, OncePatternReplacer };
use crate::optimize::remove_trace::RemoveTrace;
use crate::term::InnerTerm;

/// Iterative extraction converges in one step per pattern kind, so the
/// cap only ever fires on a genuinely broken pass.
pub const MAX_FIXPOINT_ITERATIONS : usize = 64;

/// Lower a program to UPLC, applying the passes enabled in `config`
/// until the serialised tree stops changing, then hand the result to
/// the back-end. A term that is not already a `Program` is wrapped with
/// version 1.0.0.
pub fn compile(program : &Term, config : &CompilationConfig) -> PluthonResult<uplc::Program> {
    let (version, mut current) = match program.as_ref() {
        InnerTerm::Program { version, .. } => (*version, program.clone()),
        _ => ((1, 0, 0), mk_program((1, 0, 0), program.clone())),
    };

    let mut dump = current.dumps();
    let mut converged = false;
    for iteration in 0..MAX_FIXPOINT_ITERATIONS {
        if config.constant_index_access_list.unwrap_or(false) {
            current = IndexAccessOptimizer.transform(&current)?;
        }
        if config.compress_patterns.unwrap_or(false) {
            if config.iterative_unfold_patterns.unwrap_or(false) {
                current = OncePatternReplacer.transform(&current)?;
            } else {
                current = AllPatternReplacer.transform(&current)?;
            }
        }
        if config.remove_trace.unwrap_or(false) {
            current = RemoveTrace.transform(&current)?;
        }

        let new_dump = current.dumps();
        if new_dump == dump {
            debug!("optimisation fixpoint reached after {} iterations", iteration);
            converged = true;
            break
        }
        dump = new_dump;
    }
    if !converged {
        return Err(FixpointDivergedErr(MAX_FIXPOINT_ITERATIONS))
    }

    let lowered = current.compile_to_uplc()?;
    Ok(uplc::uplc_compile(version, lowered, &config.uplc))
}

/// Textual form of a term; see `Term::dumps`.
pub fn dumps(t : &Term) -> String {
    t.dumps()
}

#[cfg(test)]
mod driver_tests {
    use super::*;

    #[test]
    fn o0_is_a_plain_lowering() {
        let program = mk_program((1, 0, 0), not(mk_var("c")));
        let out = compile(&program, &OPT_O0_CONFIG).unwrap();
        // the pattern composes inline; no shared bindings appear
        assert!(!out.term.dumps().contains("0p_"));
    }

    #[test]
    fn shared_patterns_land_in_one_root_binding() {
        let body = mk_apply(
            mk_var("combine"),
            vec![
                fold_list(mk_var("xs"), mk_var("f"), mk_integer(0)),
                fold_list(mk_var("ys"), mk_var("g"), mk_integer(0)),
                fold_list(mk_var("zs"), mk_var("h"), mk_integer(0)),
            ],
        );
        let program = mk_program((1, 0, 0), body);
        let out = compile(&program, &OPT_O1_CONFIG).unwrap();
        let dump = out.term.dumps();
        assert_eq!(dump.matches("(lam 0p_FoldList_").count(), 1);
        assert_eq!(dump.matches("[0p_FoldList_").count(), 3);
    }

    #[test]
    fn constant_index_is_specialised_and_shared() {
        let xs = prepend_list(
            mk_integer(10),
            prepend_list(mk_integer(20), prepend_list(mk_integer(30), empty_integer_list())),
        );
        let program = mk_program((1, 0, 0), index_access_list(xs, mk_integer(2)));
        let out = compile(&program, &OPT_O1_CONFIG).unwrap();
        let dump = out.term.dumps();
        assert!(dump.contains("0p_ConstantIndexAccessList_2_"));
        // bound checks stay : the unrolled chain still traces IndexError
        assert!(dump.contains("IndexError"));
    }

    #[test]
    fn negative_index_aborts() {
        let program = mk_program((1, 0, 0), index_access_list(mk_var("xs"), mk_integer(-3)));
        match compile(&program, &OPT_O1_CONFIG) {
            Err(PluthonErr::NegativeConstantIndexErr(_, _, idx)) => assert_eq!(idx, "-3"),
            other => panic!("expected the negative index to be rejected, got {:?}", other),
        }
    }

    #[test]
    fn trace_removal_is_literal_only() {
        let traced = trace_const("dbg", mk_integer(7));
        let out = compile(&mk_program((1, 0, 0), traced.clone()), &OPT_O3_CONFIG).unwrap();
        assert!(!out.term.dumps().contains("Trace"));

        let kept = trace(append_string(mk_text("a"), mk_text("b")), mk_integer(7));
        let out = compile(&mk_program((1, 0, 0), kept), &OPT_O3_CONFIG).unwrap();
        assert!(out.term.dumps().contains("Trace"));

        // and O1 keeps even literal traces
        let out = compile(&mk_program((1, 0, 0), traced), &OPT_O1_CONFIG).unwrap();
        assert!(out.term.dumps().contains("Trace"));
    }

    #[test]
    fn iterative_mode_converges_on_nested_patterns() {
        // LengthList pulls in FoldList which pulls in RecFun; the once
        // replacer needs one driver iteration per kind
        let body = mk_apply(
            mk_var("pair"),
            vec![
                length_list(mk_var("xs")),
                length_list(mk_var("ys")),
                index_access_list(mk_var("zs"), mk_integer(1)),
                index_access_list(mk_var("ws"), mk_integer(1)),
            ],
        );
        let program = mk_program((1, 0, 0), body);
        let out = compile(&program, &OPT_O3_CONFIG);
        assert!(out.is_ok());
    }

    #[test]
    fn all_mode_also_converges_on_nested_patterns() {
        let body = mk_apply(
            mk_var("pair"),
            vec![length_list(mk_var("xs")), length_list(mk_var("ys"))],
        );
        let program = mk_program((1, 0, 0), body);
        assert!(compile(&program, &OPT_O1_CONFIG).is_ok());
    }

    #[test]
    fn wrapping_bare_terms_defaults_the_version() {
        let out = compile(&mk_integer(5), &OPT_O0_CONFIG).unwrap();
        assert_eq!(out.version, (1, 0, 0));
        assert_eq!(out.term.dumps(), "(con integer 5)");
    }

    #[test]
    fn compiler_names_stay_inside_the_scheme() {
        // every name the optimiser introduces starts with 0 and ends
        // with _, so user code avoiding that shape cannot collide
        let body = mk_apply(
            mk_var("user_name"),
            vec![length_list(mk_var("xs")), length_list(mk_var("ys"))],
        );
        let program = mk_program((1, 0, 0), body);
        let out = compile(&program, &OPT_O1_CONFIG).unwrap();
        let dump = out.term.dumps();
        for needle in ["0p_LengthList_", "0p_FoldList_", "0p_RecFun_"].iter() {
            assert!(dump.contains(needle), "missing {}", needle);
        }
        assert!(dump.contains("user_name"));
    }
}
