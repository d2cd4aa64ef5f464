//! Structural deep equality
//!
//! Compares two graphs by content. Handle pairs already under comparison are
//! assumed equal, which terminates cycles. Traversal uses an explicit stack.

use crate::value::{Entry, Persistent, Value};
use std::collections::HashSet;

/// Structurally equal graphs
///
/// Objects must have the same runtime type and equal members; arrays and
/// ordered containers compare element-wise in enumeration order; persistent
/// sets and maps compare without regard to order. Aliasing shape is not
/// compared.
#[must_use]
pub fn deep_eq(a: &Value, b: &Value) -> bool {
    GraphComparer::default().equal(a, b)
}

#[derive(Default)]
struct GraphComparer {
    assumed: HashSet<(usize, usize)>,
}

impl GraphComparer {
    fn equal(&mut self, a: &Value, b: &Value) -> bool {
        let mut pending = vec![(a.clone(), b.clone())];
        while let Some((a, b)) = pending.pop() {
            if !self.step(&a, &b, &mut pending) {
                return false;
            }
        }
        true
    }

    fn step(&mut self, a: &Value, b: &Value, pending: &mut Vec<(Value, Value)>) -> bool {
        match (a, b) {
            (Value::Object(x), Value::Object(y)) => {
                if !self.assume(x.identity(), y.identity()) {
                    return true;
                }
                if x.type_key() != y.type_key() {
                    return false;
                }
                pending.extend(x.fields().into_iter().zip(y.fields()));
                true
            }
            (Value::Array(x), Value::Array(y)) => {
                if !self.assume(x.identity(), y.identity()) {
                    return true;
                }
                let (xs, ys) = (x.items(), y.items());
                if xs.len() != ys.len() {
                    return false;
                }
                pending.extend(xs.into_iter().zip(ys));
                true
            }
            (Value::Container(x), Value::Container(y)) => {
                if !self.assume(x.identity(), y.identity()) {
                    return true;
                }
                if x.kind() != y.kind() {
                    return false;
                }
                push_entries(x.entries(), y.entries(), pending)
            }
            (Value::Persistent(x), Value::Persistent(y)) => self.persistent(x, y, pending),
            _ => a == b,
        }
    }

    fn persistent(
        &mut self,
        x: &Persistent,
        y: &Persistent,
        pending: &mut Vec<(Value, Value)>,
    ) -> bool {
        if x.kind() != y.kind() || x.len() != y.len() {
            return false;
        }
        if x.ptr_eq(y) {
            return true;
        }
        if let (Persistent::List(_), Persistent::List(_)) = (x, y) {
            return push_entries(x.entries(), y.entries(), pending);
        }

        // Unordered: match every left entry to a distinct right entry.
        let mut right = y.entries();
        for entry in x.entries() {
            match right.iter().position(|candidate| self.trial(&entry, candidate)) {
                Some(i) => {
                    right.swap_remove(i);
                }
                None => return false,
            }
        }
        true
    }

    fn trial(&mut self, a: &Entry, b: &Entry) -> bool {
        let snapshot = self.assumed.clone();
        let mut pairs = Vec::new();
        let matched = push_entries(vec![a.clone()], vec![b.clone()], &mut pairs)
            && pairs.iter().all(|(p, q)| self.equal(p, q));
        if !matched {
            self.assumed = snapshot;
        }
        matched
    }

    fn assume(&mut self, a: usize, b: usize) -> bool {
        self.assumed.insert((a, b))
    }
}

fn push_entries(xs: Vec<Entry>, ys: Vec<Entry>, pending: &mut Vec<(Value, Value)>) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    for (x, y) in xs.into_iter().zip(ys) {
        match (x, y) {
            (Entry::Element(a), Entry::Element(b)) => pending.push((a, b)),
            (Entry::Pair(ka, va), Entry::Pair(kb, vb)) => {
                pending.push((ka, kb));
                pending.push((va, vb));
            }
            _ => return false,
        }
    }
    true
}
