use log::debug;

use crate::errors::PluthonResult;
use crate::term::{ Term, InnerTerm };
use crate::uplc::BuiltInFun;
use crate::visit::NodeTransformer;

/// Replaces `trace msg value` with just `value`, but only when `msg` is
/// a literal string. An arbitrary message expression may have
/// observable evaluation (divergence, nested traces) that must not be
/// elided.
pub struct RemoveTrace;

impl NodeTransformer for RemoveTrace {
    fn transform_apply(&mut self, node : &Term) -> PluthonResult<Term> {
        if let InnerTerm::Apply { fun, args } = node.as_ref() {
            if let InnerTerm::Force { inner } = fun.as_ref() {
                if let InnerTerm::BuiltIn { op : BuiltInFun::Trace } = inner.as_ref() {
                    if args.len() == 2 {
                        if let InnerTerm::Text { x } = args[0].as_ref() {
                            debug!("removing trace {:?}", x);
                            return Ok(args[1].clone())
                        }
                    }
                }
            }
        }
        self.generic_transform(node)
    }
}

#[cfg(test)]
mod remove_trace_tests {
    use super::*;
    use crate::sugar::{ trace, trace_const, append_string };
    use crate::term::{ mk_integer, mk_text };

    #[test]
    fn literal_trace_is_dropped() {
        let t = trace_const("dbg", mk_integer(7));
        let out = RemoveTrace.transform(&t).unwrap();
        assert_eq!(out.dumps(), "7");
    }

    #[test]
    fn computed_message_is_kept() {
        let msg = append_string(mk_text("a"), mk_text("b"));
        let t = trace(msg, mk_integer(7));
        let out = RemoveTrace.transform(&t).unwrap();
        assert_eq!(out.dumps(), t.dumps());
    }
}
