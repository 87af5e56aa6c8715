use std::convert::TryFrom;

use log::debug;
use num_bigint::Sign;

use crate::errors::{ PluthonResult, PluthonErr::* };
use crate::sugar::{ constant_index_access_list,
                    constant_index_access_list_fast,
                    constant_nth_field };
use crate::term::{ Term, InnerTerm };
use crate::visit::NodeTransformer;

/// Replaces index accesses at literal indices with unrolled constant
/// accesses. The runtime loop goes away entirely; combined with pattern
/// sharing this also shrinks the script, since the unrolled chains for
/// a given index collapse into one shared function.
pub struct IndexAccessOptimizer;

/// Literal index of an `Integer` node, if the node is one. Negative
/// literals are a programmer error; indices too large to unroll are
/// left for the runtime loop.
fn literal_index(term : &Term) -> PluthonResult<Option<usize>> {
    if let InnerTerm::Integer { x } = term.as_ref() {
        if x.sign() == Sign::Minus {
            return Err(NegativeConstantIndexErr(file!(), line!(), x.to_string()))
        }
        return Ok(usize::try_from(x).ok())
    }
    Ok(None)
}

impl NodeTransformer for IndexAccessOptimizer {
    fn transform_pattern(&mut self, node : &Term) -> PluthonResult<Term> {
        if let InnerTerm::Pattern { kind, fields } = node.as_ref() {
            match kind.name().as_str() {
                "IndexAccessList" => {
                    if let Some(i) = literal_index(&fields[1])? {
                        debug!("specialising IndexAccessList at index {}", i);
                        return Ok(constant_index_access_list(self.transform(&fields[0])?, i))
                    }
                },
                "NthField" => {
                    if let Some(i) = literal_index(&fields[1])? {
                        debug!("specialising NthField at index {}", i);
                        return Ok(constant_nth_field(self.transform(&fields[0])?, i))
                    }
                },
                "IndexAccessListFast" => {
                    if let Some(i) = literal_index(&fields[1])? {
                        return Ok(constant_index_access_list_fast(self.transform(&fields[0])?, i))
                    }
                },
                _ => (),
            }
        }
        self.generic_transform(node)
    }
}

#[cfg(test)]
mod constant_index_tests {
    use super::*;
    use crate::sugar::{ index_access_list, nth_field };
    use crate::term::{ mk_var, mk_integer, mk_program };

    #[test]
    fn literal_index_is_specialised() {
        let t = index_access_list(mk_var("xs"), mk_integer(2));
        let out = IndexAccessOptimizer.transform(&t).unwrap();
        assert!(out.dumps().starts_with("<[ConstantIndexAccessList_2]>"));
    }

    #[test]
    fn non_literal_index_is_left_alone() {
        let t = index_access_list(mk_var("xs"), mk_var("i"));
        let out = IndexAccessOptimizer.transform(&t).unwrap();
        assert!(out.dumps().starts_with("<[IndexAccessList]>"));
    }

    #[test]
    fn negative_literal_index_aborts_the_compile() {
        let t = index_access_list(mk_var("xs"), mk_integer(-1));
        assert!(IndexAccessOptimizer.transform(&t).is_err());
    }

    #[test]
    fn nth_field_specialises_to_constant_nth_field() {
        let program = mk_program((1, 0, 0), nth_field(mk_var("d"), mk_integer(0)));
        let out = IndexAccessOptimizer.transform(&program).unwrap();
        assert!(out.dumps().starts_with("<[ConstantNthField_0]>"));
    }
}
