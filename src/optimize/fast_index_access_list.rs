use crate::errors::PluthonResult;
use crate::sugar::{ index_access_list_fast, constant_index_access_list_fast };
use crate::term::{ Term, InnerTerm };
use crate::visit::NodeTransformer;

/// Trades the bound checks of list indexing for size : guarded accesses
/// become their unguarded `Fast` counterparts. Out-of-range indices
/// then fail on the bare head/tail builtins without a traced
/// `IndexError`, so this pass is not wired to any config flag; callers
/// apply it only when every index is known to be in range.
pub struct FastIndexAccessOptimizer;

impl NodeTransformer for FastIndexAccessOptimizer {
    fn transform_pattern(&mut self, node : &Term) -> PluthonResult<Term> {
        if let InnerTerm::Pattern { kind, fields } = node.as_ref() {
            let name = kind.name();
            if name == "IndexAccessList" {
                let l = self.transform(&fields[0])?;
                let i = self.transform(&fields[1])?;
                return Ok(index_access_list_fast(l, i))
            }
            if let Some(suffix) = name.strip_prefix("ConstantIndexAccessList_") {
                if let Ok(index) = suffix.parse::<usize>() {
                    let l = self.transform(&fields[0])?;
                    return Ok(constant_index_access_list_fast(l, index))
                }
            }
        }
        self.generic_transform(node)
    }
}

#[cfg(test)]
mod fast_index_tests {
    use super::*;
    use crate::sugar::{ index_access_list, constant_index_access_list };
    use crate::term::{ mk_var, mk_integer };

    #[test]
    fn guarded_access_becomes_fast() {
        let t = index_access_list(mk_var("xs"), mk_var("i"));
        let out = FastIndexAccessOptimizer.transform(&t).unwrap();
        assert!(out.dumps().starts_with("<[IndexAccessListFast]>"));
    }

    #[test]
    fn constant_access_keeps_its_index() {
        let t = constant_index_access_list(mk_var("xs"), 4);
        let out = FastIndexAccessOptimizer.transform(&t).unwrap();
        assert!(out.dumps().starts_with("<[ConstantIndexAccessListFast_4]>"));
    }

    #[test]
    fn already_fast_accesses_are_untouched() {
        let t = index_access_list_fast(mk_var("xs"), mk_integer(1));
        let out = FastIndexAccessOptimizer.transform(&t).unwrap();
        assert!(out.dumps().starts_with("<[IndexAccessListFast]>"));
    }
}
