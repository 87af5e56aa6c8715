use num_bigint::BigInt;

use crate::errors::{ PluthonResult, PluthonErr::* };
use crate::sugar::{ pvar,
                    plambda,
                    equals_byte_string,
                    equals_integer,
                    equals_bool,
                    trace_error };
use crate::term::{ Term,
                   mk_apply,
                   mk_force,
                   mk_delay,
                   mk_integer,
                   mk_bytestring,
                   mk_bool,
                   mk_unit,
                   mk_ite };

/// Functional data structures that can store anything (as opposed to
/// PlutusData derivatives). Built on wrapped lambda terms : a map is a
/// function from key and default to value, a tuple is a function that
/// feeds its delayed components to a selector. Pure construction
/// helpers; nothing here participates in pattern sharing.

/// Key of a functional map entry. Keys are compile-time values; the
/// stored terms are arbitrary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapKey {
    Bytes(Vec<u8>),
    Str(String),
    Int(BigInt),
    Bool(bool),
}

impl MapKey {
    fn as_term(&self) -> Term {
        match self {
            MapKey::Bytes(b) => mk_bytestring(b.clone()),
            MapKey::Str(s) => mk_bytestring(s.as_bytes().to_vec()),
            MapKey::Int(i) => mk_integer(i.clone()),
            MapKey::Bool(b) => mk_bool(*b),
        }
    }

    fn equals(&self, other : Term) -> Term {
        match self {
            MapKey::Bytes(..) | MapKey::Str(..) => equals_byte_string(self.as_term(), other),
            MapKey::Int(..) => equals_integer(self.as_term(), other),
            MapKey::Bool(..) => equals_bool(self.as_term(), other),
        }
    }
}

/// Extend a functional map with additional entries. Entries are chained
/// in front of the old map, so later entries shadow earlier ones and
/// every entry shadows the map being extended.
pub fn functional_map_extend(old : Term, entries : &[(MapKey, Term)]) -> Term {
    let mut lookup = mk_apply(old, vec![pvar("x"), pvar("def")]);
    for (key, value) in entries.iter() {
        lookup = mk_ite(
            key.equals(pvar("x")),
            mk_delay(value.clone()),
            lookup,
        );
    }
    plambda(&["x", "def"], lookup)
}

/// A map from the given entries; with no entries, every lookup yields
/// the caller's default.
pub fn functional_map(entries : &[(MapKey, Term)]) -> Term {
    let empty = plambda(&["x", "def"], pvar("def"));
    if entries.is_empty() {
        empty
    } else {
        functional_map_extend(empty, entries)
    }
}

/// Look `k` up in `m`, evaluating to `default` on a miss. Stored values
/// are delayed inside the map, hence the outer force.
pub fn functional_map_access(m : Term, k : Term, default : Term) -> Term {
    mk_force(mk_apply(m, vec![k, mk_delay(default)]))
}

/// The reserved key under which a wrapped value stores its primitive.
pub const TO_PRIMITIVE_VALUE : &[u8] = b"0";

/// A primitive bundled with a functional map of attributes; the
/// primitive itself hides under the reserved key.
pub fn wrapped_value(uplc_obj : Term, attributes : Term) -> Term {
    functional_map_extend(attributes, &[(MapKey::Bytes(TO_PRIMITIVE_VALUE.to_vec()), uplc_obj)])
}

pub fn from_primitive(p : Term, attributes : Term) -> Term {
    wrapped_value(p, attributes)
}

pub fn to_primitive(wv : Term) -> Term {
    functional_map_access(
        wv,
        mk_bytestring(TO_PRIMITIVE_VALUE.to_vec()),
        trace_error("KeyError"),
    )
}

/// A tuple as a selector-feeding lambda. Components are delayed so that
/// constructing the tuple evaluates none of them.
pub fn functional_tuple(vs : Vec<Term>) -> Term {
    if vs.is_empty() {
        return mk_unit()
    }
    let delayed = vs.into_iter().map(mk_delay).collect::<Vec<Term>>();
    plambda(&["f"], mk_apply(pvar("f"), delayed))
}

/// Project component `index` out of a tuple of `size` components.
pub fn functional_tuple_access(tuple : Term, index : usize, size : usize) -> PluthonResult<Term> {
    if size == 0 {
        return Err(EmptyTupleAccessErr(file!(), line!()))
    }
    let names = (0..size).map(|i| format!("v{}", i)).collect::<Vec<String>>();
    let params = names.iter().map(|n| n.as_str()).collect::<Vec<&str>>();
    let selector = plambda(&params, mk_force(pvar(&format!("v{}", index))));
    Ok(mk_apply(tuple, vec![selector]))
}

#[cfg(test)]
mod functional_tests {
    use super::*;

    #[test]
    fn empty_tuple_is_unit() {
        assert_eq!(functional_tuple(vec![]).dumps(), "()");
    }

    #[test]
    fn tuple_access_selects_and_forces() {
        let t = functional_tuple(vec![mk_integer(1), mk_integer(2)]);
        let second = functional_tuple_access(t, 1, 2).unwrap();
        assert_eq!(
            second.dumps(),
            "((\\0f_ -> (0f_ (# 1) (# 2))) (\\0v0_ 0v1_ -> (! 0v1_)))"
        );
    }

    #[test]
    fn zero_size_tuple_access_is_rejected() {
        assert!(functional_tuple_access(mk_unit(), 0, 0).is_err());
    }

    #[test]
    fn map_miss_hits_the_default() {
        let m = functional_map(&[]);
        let access = functional_map_access(m, mk_integer(1), mk_integer(99));
        assert_eq!(
            access.dumps(),
            "(! ((\\0x_ 0def_ -> 0def_) 1 (# 99)))"
        );
    }

    #[test]
    fn later_entries_shadow_earlier_ones() {
        let m = functional_map(&[
            (MapKey::Int(1.into()), mk_integer(10)),
            (MapKey::Int(1.into()), mk_integer(20)),
        ]);
        let dump = m.dumps();
        // the second entry's comparison is the outermost branch
        let first = dump.find("20").unwrap();
        let second = dump.find("10").unwrap();
        assert!(first < second);
    }
}
